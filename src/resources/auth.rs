//! Session lifecycle and profile
//!
//! The session principal lives under the `user` family; `profile` is a
//! separate family because the backend serves it from a different resource.
//! Logging out evicts the principal together with everything it gates —
//! orders, cart, profile — in one atomic sweep, matching what the global
//! failure policy does when a session expires on its own.

use super::Storefront;
use super::orders::ShippingAddress;
use super::{cart, orders};
use crate::client::{MutationRequest, MutationSpec, QueryRequest, QuerySpec};
use crate::error::ApiResult;
use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn user_key() -> ResourceKey {
    ResourceKey::new("user")
}

pub fn profile_key() -> ResourceKey {
    ResourceKey::new("profile")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: ShippingAddress,
}

/// Partial profile update; unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

impl Storefront {
    /// The session principal, from the backend's session cookie.
    ///
    /// Never auto-retried: a 401 here means there is no session, and
    /// retrying cannot change that.
    pub async fn current_user(&self) -> ApiResult<User> {
        let staleness = self.client().config().session_staleness;
        self.client()
            .query(
                QuerySpec::new(user_key(), staleness).retry(0),
                QueryRequest::new("/auth/me/"),
            )
            .await
    }

    /// Establish a session. The returned principal is written straight
    /// into the session cache entry.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        let staleness = self.client().config().session_staleness;
        let spec = MutationSpec::new()
            .write_result_to(user_key(), staleness)
            .restores_session();
        let body = serde_json::to_value(credentials).unwrap_or(Value::Null);
        self.client()
            .mutate(spec, MutationRequest::post("/auth/login/", body))
            .await
    }

    /// Create an account and establish a session.
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<User> {
        let staleness = self.client().config().session_staleness;
        let spec = MutationSpec::new()
            .write_result_to(user_key(), staleness)
            .restores_session();
        let body = serde_json::to_value(request).unwrap_or(Value::Null);
        self.client()
            .mutate(spec, MutationRequest::post("/auth/signup/", body))
            .await
    }

    /// End the session and drop every session-gated cache family.
    pub async fn logout(&self) -> ApiResult<()> {
        let spec = MutationSpec::new()
            .evicts(user_key())
            .evicts(orders::root_key())
            .evicts(cart::root_key())
            .evicts(profile_key());
        let _: Value = self
            .client()
            .mutate(spec, MutationRequest::post_empty("/auth/logout/"))
            .await?;
        Ok(())
    }

    /// The current user's profile.
    pub async fn profile(&self) -> ApiResult<Profile> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(profile_key(), config.session_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/auth/profile/"),
            )
            .await
    }

    /// Update the profile. The returned payload overwrites the cached one.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<Profile> {
        let staleness = self.client().config().session_staleness;
        let spec = MutationSpec::new().write_result_to(profile_key(), staleness);
        let body = serde_json::to_value(update).unwrap_or(Value::Null);
        self.client()
            .mutate(spec, MutationRequest::put("/auth/profile/", body))
            .await
    }
}
