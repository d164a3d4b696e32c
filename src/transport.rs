//! Fetch layer: wire boundary and response classification
//!
//! [`Backend`] is the seam between the synchronization client and the
//! transport: one object-safe method that executes a [`WireRequest`] and
//! returns the raw [`WireResponse`]. [`ReqwestBackend`] is the production
//! implementation (cookie-backed sessions over HTTP); the in-memory
//! [`MockBackend`](crate::MockBackend) serves mock mode and tests.
//!
//! [`Fetcher`] sits above the backend and owns the per-call policy that is
//! the same for every transport: attaching the anti-forgery token to
//! mutating verbs (bootstrapping it once per session when absent), decoding
//! empty/JSON/text bodies, and classifying non-2xx responses into the
//! [`ErrorKind`](crate::ErrorKind) taxonomy. It holds no cached data.

use crate::config::SyncConfig;
use crate::error::{ApiError, ApiResult};
pub use futures::future::BoxFuture;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of the anti-forgery cookie set by the backend.
const CSRF_COOKIE: &str = "csrftoken";
/// Header carrying the anti-forgery token on mutating calls.
const CSRF_HEADER: &str = "X-CSRFToken";
/// Lightweight endpoint whose only job here is to set the CSRF cookie.
const CSRF_BOOTSTRAP_PATH: &str = "/schema/";

/// HTTP method of a wire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// True for state-changing verbs that must carry the anti-forgery token.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outbound call, expressed independently of the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    /// Path below the configured base URL, e.g. `/products/`.
    pub path: String,
    /// Query parameters; encoding is the backend's concern.
    pub query: Vec<(String, String)>,
    /// Anti-forgery token to attach, when the verb requires one.
    pub csrf_token: Option<String>,
    /// JSON request body.
    pub body: Option<Value>,
}

impl WireRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            csrf_token: None,
            body: None,
        }
    }
}

/// Raw response as seen on the wire.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Build a JSON response (used by in-memory backends).
    pub fn json(status: u16, value: Value) -> Self {
        let body = value.to_string().into_bytes();
        Self {
            status,
            status_text: String::new(),
            content_type: Some("application/json".to_string()),
            content_length: Some(body.len() as u64),
            body,
        }
    }

    /// Build a bodyless response such as 204 No Content.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
            content_type: None,
            content_length: Some(0),
            body: Vec::new(),
        }
    }
}

/// Transport seam: executes wire requests and owns the cookie state.
pub trait Backend: Send + Sync {
    /// Perform the call. The only error this may return is
    /// [`ErrorKind::NetworkError`](crate::ErrorKind::NetworkError) — any
    /// response, whatever its status, is returned as a [`WireResponse`].
    fn execute<'a>(&'a self, request: WireRequest) -> BoxFuture<'a, ApiResult<WireResponse>>;

    /// Current value of the anti-forgery cookie, if the backend has one.
    fn csrf_token(&self) -> Option<String>;
}

/// Stateless-per-call fetch layer over a [`Backend`].
///
/// The single piece of retained state is the bootstrapped anti-forgery
/// token; the async mutex around it makes concurrent callers share one
/// bootstrap round trip.
pub struct Fetcher {
    backend: Arc<dyn Backend>,
    csrf: Mutex<Option<String>>,
}

impl Fetcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            csrf: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Issue a call and decode the response.
    ///
    /// Empty bodies (204, or 201 with zero content length) resolve to `{}`;
    /// JSON content parses as JSON; anything else is returned as a string.
    /// Non-2xx responses are classified into [`ApiError`].
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let csrf_token = if method.is_mutating() {
            self.mutation_token().await
        } else {
            None
        };

        tracing::debug!(%method, path, "dispatching request");
        let request = WireRequest {
            method,
            path: path.to_string(),
            query,
            csrf_token,
            body,
        };
        let response = self.backend.execute(request).await?;
        Self::digest(response)
    }

    /// Resolve the anti-forgery token for a mutating call.
    ///
    /// Cookie value wins when present; otherwise the cached token from an
    /// earlier bootstrap; otherwise one bootstrap round trip. The lock is
    /// held across the bootstrap so concurrent callers wait for it instead
    /// of issuing their own.
    async fn mutation_token(&self) -> Option<String> {
        let mut cached = self.csrf.lock().await;
        if let Some(token) = self.backend.csrf_token() {
            *cached = Some(token.clone());
            return Some(token);
        }
        if let Some(token) = cached.clone() {
            return Some(token);
        }

        tracing::debug!("bootstrapping anti-forgery token");
        let bootstrap = WireRequest::new(Method::Get, CSRF_BOOTSTRAP_PATH);
        match self.backend.execute(bootstrap).await {
            Ok(_) => *cached = self.backend.csrf_token(),
            // A failed bootstrap is not fatal; the mutation proceeds
            // without a token and the backend decides.
            Err(error) => {
                tracing::warn!(%error, "anti-forgery bootstrap failed");
            }
        }
        cached.clone()
    }

    fn digest(response: WireResponse) -> ApiResult<Value> {
        let empty_created = response.status == 201 && response.content_length == Some(0);
        if response.status == 204 || empty_created {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let is_json = response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"));
        let body = if is_json {
            serde_json::from_slice(&response.body).ok()
        } else {
            Some(Value::String(
                String::from_utf8_lossy(&response.body).into_owned(),
            ))
        };

        if (200..300).contains(&response.status) {
            Ok(body.unwrap_or(Value::Null))
        } else {
            Err(ApiError::classify(
                response.status,
                body,
                &response.status_text,
            ))
        }
    }
}

/// Production backend: HTTP via `reqwest` with a cookie jar for the
/// session and anti-forgery cookies.
pub struct ReqwestBackend {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: String,
    cookie_url: reqwest::Url,
}

impl ReqwestBackend {
    pub fn new(config: &SyncConfig) -> ApiResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {e}")))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let cookie_url = reqwest::Url::parse(&base_url)
            .map_err(|e| ApiError::network(format!("Invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            jar,
            base_url,
            cookie_url,
        })
    }

    fn url_for(&self, path: &str, query: &[(String, String)]) -> ApiResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::network(format!("Invalid request URL for '{path}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

impl Backend for ReqwestBackend {
    fn execute<'a>(&'a self, request: WireRequest) -> BoxFuture<'a, ApiResult<WireResponse>> {
        Box::pin(async move {
            let url = self.url_for(&request.path, &request.query)?;
            let mut builder = match request.method {
                Method::Get => self.client.get(url),
                Method::Post => self.client.post(url),
                Method::Put => self.client.put(url),
                Method::Patch => self.client.patch(url),
                Method::Delete => self.client.delete(url),
            };
            builder = builder.header(CONTENT_TYPE, "application/json");
            if let Some(token) = &request.csrf_token {
                builder = builder.header(CSRF_HEADER, token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                ApiError::network("Network error. Please check your connection.")
                    .with_body(Value::String(e.to_string()))
            })?;

            let status = response.status();
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let content_length = response.content_length();
            let body = response
                .bytes()
                .await
                .map_err(|e| ApiError::network(format!("Failed to read response body: {e}")))?
                .to_vec();

            Ok(WireResponse {
                status: status.as_u16(),
                status_text,
                content_type,
                content_length,
                body,
            })
        })
    }

    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.cookie_url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == CSRF_COOKIE).then(|| value.to_string())
        })
    }
}
