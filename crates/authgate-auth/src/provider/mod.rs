//! Identity provider abstraction.
//!
//! [`Provider`] is the full capability set the proxy consumes from an
//! upstream identity/authorization backend. The [`GroupCache`] decorator in
//! this module wraps any `Provider` and caches the group-validation
//! operation; everything else passes through unchanged.

mod group_cache;

pub use group_cache::GroupCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use authgate_metrics::MetricsSink;

use crate::AuthResult;
use crate::session::SessionState;

// =============================================================================
// Provider Data
// =============================================================================

/// Static metadata describing an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderData {
    /// Human-readable provider name (e.g. "Google").
    pub provider_name: String,

    /// Endpoint users are sent to for sign-in.
    pub sign_in_url: Url,

    /// Endpoint where authorization codes are redeemed for sessions.
    pub redeem_url: Url,

    /// Endpoint serving profile information.
    pub profile_url: Url,

    /// Endpoint used to validate access tokens.
    pub validate_url: Url,

    /// OAuth scopes requested at sign-in.
    pub scope: String,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// The authoritative identity/authorization backend.
///
/// Implementations are the source of truth for sessions and group
/// membership. Decorators such as [`GroupCache`] are polymorphic over this
/// trait and must forward every operation they do not intercept.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider's static metadata.
    fn data(&self) -> &ProviderData;

    /// Redeems an authorization code for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider rejects the code.
    async fn redeem(&self, redirect_url: &str, code: &str) -> AuthResult<SessionState>;

    /// Checks whether the session is still valid upstream.
    async fn validate_session_state(&self, session: &SessionState) -> bool;

    /// Builds the sign-in URL users are redirected to.
    fn sign_in_url(&self, redirect_uri: &str, final_redirect: &str) -> Url;

    /// Refreshes the session if its refresh deadline has passed.
    ///
    /// Returns `true` if a refresh was performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh attempt fails upstream.
    async fn refresh_session_if_needed(&self, session: &mut SessionState) -> AuthResult<bool>;

    /// Determines which of `allowed_groups` the identity belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream membership check fails; no partial
    /// results are returned.
    async fn validate_group_membership(
        &self,
        email: &str,
        allowed_groups: &[String],
        access_token: &str,
    ) -> AuthResult<Vec<String>>;

    /// Revokes the session upstream.
    ///
    /// # Errors
    ///
    /// Returns an error if revocation fails upstream.
    async fn revoke(&self, session: &SessionState) -> AuthResult<()>;

    /// Exchanges a refresh token for a new access token and its lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails upstream.
    async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<(String, Duration)>;

    /// Rewires where the provider emits its counters.
    fn set_metrics_sink(&self, sink: Arc<dyn MetricsSink>);

    /// Stops background work owned by the provider.
    fn stop(&self);
}
