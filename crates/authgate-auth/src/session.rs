//! Session state passed through provider operations.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Authenticated session as held by the proxy.
///
/// Carried opaquely through the group-cache decorator; only the upstream
/// provider interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Email address identifying the session's subject.
    pub email: String,

    /// Username at the upstream provider.
    pub user: String,

    /// Access token for upstream API calls.
    pub access_token: String,

    /// Refresh token used to extend the session.
    pub refresh_token: String,

    /// When the access token should be refreshed.
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_deadline: OffsetDateTime,

    /// Hard end of the session, regardless of refreshes.
    #[serde(with = "time::serde::rfc3339")]
    pub lifetime_deadline: OffsetDateTime,

    /// Groups granted to the session at sign-in time.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl SessionState {
    /// Returns `true` once the refresh deadline has passed.
    #[must_use]
    pub fn refresh_period_expired(&self) -> bool {
        self.refresh_deadline <= OffsetDateTime::now_utc()
    }

    /// Returns `true` once the session lifetime has been exhausted.
    #[must_use]
    pub fn lifetime_expired(&self) -> bool {
        self.lifetime_deadline <= OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn session(refresh_in: Duration, lifetime_in: Duration) -> SessionState {
        let now = OffsetDateTime::now_utc();
        SessionState {
            email: "u@x.com".to_string(),
            user: "u".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            refresh_deadline: now + refresh_in,
            lifetime_deadline: now + lifetime_in,
            groups: vec!["eng".to_string()],
        }
    }

    #[test]
    fn fresh_session_is_not_expired() {
        let session = session(Duration::hours(1), Duration::hours(8));
        assert!(!session.refresh_period_expired());
        assert!(!session.lifetime_expired());
    }

    #[test]
    fn past_deadlines_report_expiry() {
        let session = session(Duration::seconds(-5), Duration::seconds(-1));
        assert!(session.refresh_period_expired());
        assert!(session.lifetime_expired());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let session = session(Duration::hours(1), Duration::hours(8));
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("accessToken").is_some());
        assert!(json.get("refreshDeadline").is_some());
    }
}
