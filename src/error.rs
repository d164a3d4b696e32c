//! Error types for storefront API operations
//!
//! Every failed call is classified into a small, cause-based taxonomy
//! ([`ErrorKind`]) carried by [`ApiError`] together with the HTTP status and
//! the parsed error payload the backend returned.
//!
//! # Example
//! ```rust,ignore
//! use storefront_sync::{ApiError, ErrorKind};
//!
//! let error = ApiError::classify(404, None, "Not Found");
//! assert_eq!(error.kind, ErrorKind::NotFound);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Cause-based classification of a failed API call.
///
/// When serialized to JSON, kinds are converted to SCREAMING_SNAKE_CASE
/// (e.g., `NotFound` becomes `"NOT_FOUND"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The session is missing or expired (HTTP 401)
    Unauthenticated,
    /// The authenticated user lacks permission (HTTP 403)
    Forbidden,
    /// The requested resource was not found (HTTP 404)
    NotFound,
    /// The backend failed (HTTP 5xx)
    ServerError,
    /// The backend rejected the request (any other non-2xx)
    RequestError,
    /// No response reached the client (status 0)
    NetworkError,
}

impl ErrorKind {
    /// Returns the string representation of the error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
            Self::RequestError => "REQUEST_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
        }
    }

    /// Returns true if a retry of the same call could plausibly succeed.
    ///
    /// Unauthenticated is deliberately excluded: retrying cannot succeed
    /// without re-authentication.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestError | Self::ServerError | Self::NetworkError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// API error with classification, HTTP status, and the backend's payload.
///
/// The payload is kept so callers can render field-level validation
/// messages the way the backend shaped them.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{kind}] {message}")]
pub struct ApiError {
    /// Cause-based classification
    pub kind: ErrorKind,
    /// HTTP status code; 0 when no response was received
    pub status: u16,
    /// Human-readable error message
    pub message: String,
    /// Parsed error payload from the backend, when one was returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiError {
    /// Create a new error with kind, status, and message.
    pub fn new(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Attach the backend's parsed error payload.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Classify a non-2xx response into the taxonomy.
    ///
    /// The 401/403/404/5xx classes carry fixed user-facing messages; any
    /// other rejection derives its message from the backend's payload and
    /// falls back to the HTTP status text.
    pub fn classify(status: u16, body: Option<Value>, status_text: &str) -> Self {
        let (kind, message) = match status {
            401 => (
                ErrorKind::Unauthenticated,
                "Authentication required. Please log in.".to_string(),
            ),
            403 => (
                ErrorKind::Forbidden,
                "You do not have permission to perform this action.".to_string(),
            ),
            404 => (
                ErrorKind::NotFound,
                "The requested resource was not found.".to_string(),
            ),
            s if s >= 500 => (
                ErrorKind::ServerError,
                "Server error. Please try again later.".to_string(),
            ),
            _ => {
                let message = body
                    .as_ref()
                    .and_then(derive_message)
                    .unwrap_or_else(|| status_fallback(status, status_text));
                (ErrorKind::RequestError, message)
            }
        };
        Self {
            kind,
            status,
            message,
            body,
        }
    }

    /// Create a NETWORK_ERROR error (no response reached the client).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, 0, message)
    }

    /// Create a REQUEST_ERROR for a response that did not match the
    /// expected payload shape.
    pub fn decode(cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::RequestError,
            0,
            format!("Unexpected response shape: {cause}"),
        )
    }
}

/// Derive a message from a backend error payload.
///
/// Recognized shapes, in order of preference:
/// 1. `{ "error": "message" }`
/// 2. `{ "detail": "message" }`
/// 3. `{ "field": ["msg", ...], ... }` joined as `field: msg, ...; ...`
pub fn derive_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;

    if let Some(Value::String(message)) = object.get("error") {
        return Some(message.clone());
    }
    if let Some(Value::String(message)) = object.get("detail") {
        return Some(message.clone());
    }

    let mut parts = Vec::new();
    for (field, errors) in object {
        match errors {
            Value::Array(items) => {
                let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !messages.is_empty() {
                    parts.push(format!("{}: {}", field, messages.join(", ")));
                }
            }
            Value::String(message) => parts.push(format!("{field}: {message}")),
            _ => {}
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn status_fallback(status: u16, status_text: &str) -> String {
    if status_text.is_empty() {
        format!("HTTP {status} Error")
    } else {
        status_text.to_string()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(
            ApiError::classify(401, None, "Unauthorized").kind,
            ErrorKind::Unauthenticated
        );
        assert_eq!(
            ApiError::classify(403, None, "Forbidden").kind,
            ErrorKind::Forbidden
        );
        assert_eq!(
            ApiError::classify(404, None, "Not Found").kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            ApiError::classify(500, None, "Internal Server Error").kind,
            ErrorKind::ServerError
        );
        assert_eq!(
            ApiError::classify(503, None, "Service Unavailable").kind,
            ErrorKind::ServerError
        );
        assert_eq!(
            ApiError::classify(400, None, "Bad Request").kind,
            ErrorKind::RequestError
        );
    }

    #[test]
    fn test_derive_message_prefers_error_field() {
        let body = json!({"error": "Product not found", "detail": "ignored"});
        assert_eq!(derive_message(&body).as_deref(), Some("Product not found"));
    }

    #[test]
    fn test_derive_message_detail_field() {
        let body = json!({"detail": "Not found."});
        assert_eq!(derive_message(&body).as_deref(), Some("Not found."));
    }

    #[test]
    fn test_derive_message_field_errors() {
        let body = json!({"email": ["Invalid email format"]});
        assert_eq!(
            derive_message(&body).as_deref(),
            Some("email: Invalid email format")
        );
    }

    #[test]
    fn test_derive_message_joins_multiple_field_errors() {
        let body = json!({"email": ["Invalid email format"], "password": ["Too short", "Too common"]});
        let message = derive_message(&body).unwrap();
        assert!(message.contains("email: Invalid email format"));
        assert!(message.contains("password: Too short, Too common"));
        assert!(message.contains("; "));
    }

    #[test]
    fn test_derive_message_none_for_unrecognized_shapes() {
        assert!(derive_message(&json!({})).is_none());
        assert!(derive_message(&json!("plain text")).is_none());
        assert!(derive_message(&json!({"count": 3})).is_none());
    }

    #[test]
    fn test_classify_falls_back_to_status_text() {
        let error = ApiError::classify(418, Some(json!({})), "I'm a teapot");
        assert_eq!(error.message, "I'm a teapot");

        let error = ApiError::classify(418, None, "");
        assert_eq!(error.message, "HTTP 418 Error");
    }

    #[test]
    fn test_network_error_has_status_zero() {
        let error = ApiError::network("Network error. Please check your connection.");
        assert_eq!(error.status, 0);
        assert_eq!(error.kind, ErrorKind::NetworkError);
    }

    #[test]
    fn test_transience() {
        assert!(ErrorKind::RequestError.is_transient());
        assert!(ErrorKind::ServerError.is_transient());
        assert!(ErrorKind::NetworkError.is_transient());
        assert!(!ErrorKind::Unauthenticated.is_transient());
        assert!(!ErrorKind::Forbidden.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
    }

    #[test]
    fn test_error_display_format() {
        let error = ApiError::classify(404, None, "Not Found");
        assert_eq!(
            format!("{error}"),
            "[NOT_FOUND] The requested resource was not found."
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
        prop_oneof![
            Just(ErrorKind::Unauthenticated),
            Just(ErrorKind::Forbidden),
            Just(ErrorKind::NotFound),
            Just(ErrorKind::ServerError),
            Just(ErrorKind::RequestError),
            Just(ErrorKind::NetworkError),
        ]
    }

    proptest! {
        /// Serialized errors always carry `kind`, `status`, and `message`,
        /// and survive a JSON round trip unchanged.
        #[test]
        fn prop_error_serialization_roundtrip(
            kind in arb_error_kind(),
            status in 0u16..600,
            message in ".*",
        ) {
            let error = ApiError::new(kind, status, message);
            let json = serde_json::to_value(&error).expect("serialize error");

            prop_assert!(json.get("kind").is_some());
            prop_assert!(json.get("status").is_some());
            prop_assert!(json.get("message").is_some());

            let restored: ApiError = serde_json::from_value(json).expect("deserialize error");
            prop_assert_eq!(error.kind, restored.kind);
            prop_assert_eq!(error.status, restored.status);
            prop_assert_eq!(error.message, restored.message);
        }

        /// Kinds serialize to SCREAMING_SNAKE_CASE matching `as_str`.
        #[test]
        fn prop_kind_serializes_to_screaming_snake_case(kind in arb_error_kind()) {
            let json = serde_json::to_value(kind).expect("serialize kind");
            let text = json.as_str().expect("kind should be a string");
            prop_assert!(text.chars().all(|c| c.is_uppercase() || c == '_'));
            prop_assert_eq!(text, kind.as_str());
        }

        /// Field-error derivation always mentions every populated field.
        #[test]
        fn prop_field_errors_mention_fields(
            fields in proptest::collection::btree_map("[a-z]{1,8}", "[A-Za-z ]{1,20}", 1..4),
        ) {
            let body = serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::json!([v])))
                    .collect(),
            );
            let message = derive_message(&body).expect("derived message");
            for field in fields.keys() {
                prop_assert!(message.contains(field.as_str()));
            }
        }
    }
}
