//! Cached group-membership validation.
//!
//! [`GroupCache`] wraps any [`Provider`] and applies cache-aside policy to
//! `validate_group_membership` only: check the local store first, consult
//! the upstream provider on a miss, then write the answer back. Every other
//! provider operation is pure delegation.
//!
//! A cached record is a usable hit only when its canonical allowed-group
//! set exactly equals the canonical requested set **and** its matched set
//! is non-empty. "No groups matched" results are written but never served,
//! so negative answers are always re-validated upstream.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use url::Url;

use authgate_groups::{Entry, LocalCache, canonicalize};
use authgate_metrics::{MetricTag, MetricsSink, names};

use crate::AuthResult;
use crate::config::GroupCacheConfig;
use crate::provider::{Provider, ProviderData};
use crate::session::SessionState;

/// Group-membership caching decorator over an upstream [`Provider`].
///
/// Concurrent misses for the same identity are coalesced: a per-key
/// in-flight gate ensures one upstream call per identity at a time, and
/// callers that waited on the gate re-check the cache before going
/// upstream themselves.
pub struct GroupCache<P> {
    provider: P,
    cache: LocalCache,
    sink: RwLock<Arc<dyn MetricsSink>>,
    tags: Vec<MetricTag>,
    enabled: bool,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl<P: Provider> GroupCache<P> {
    /// Wraps `provider` with a cache whose entries live for `ttl`.
    ///
    /// Must be called within a Tokio runtime when `ttl` is positive (the
    /// store spawns its sweep task).
    #[must_use]
    pub fn new(
        provider: P,
        ttl: Duration,
        sink: Arc<dyn MetricsSink>,
        tags: Vec<MetricTag>,
    ) -> Self {
        let cache = LocalCache::new(ttl, Arc::clone(&sink), tags.clone());
        Self::with_cache(provider, cache, sink, tags)
    }

    /// Builds the decorator from configuration.
    #[must_use]
    pub fn from_config(provider: P, config: &GroupCacheConfig, sink: Arc<dyn MetricsSink>) -> Self {
        let cache = LocalCache::with_sweep_interval(
            config.ttl,
            config.sweep_interval.unwrap_or(config.ttl),
            Arc::clone(&sink),
            config.tags.clone(),
        );
        let mut decorator = Self::with_cache(provider, cache, sink, config.tags.clone());
        decorator.enabled = config.enabled;
        decorator
    }

    /// Wraps `provider` around an existing store.
    #[must_use]
    pub fn with_cache(
        provider: P,
        cache: LocalCache,
        sink: Arc<dyn MetricsSink>,
        tags: Vec<MetricTag>,
    ) -> Self {
        Self {
            provider,
            cache,
            sink: RwLock::new(sink),
            tags,
            enabled: true,
            inflight: DashMap::new(),
        }
    }

    /// The underlying store, e.g. for explicit purges on sign-out.
    #[must_use]
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Returns the cached matched groups for `email` if the stored record
    /// covers exactly the canonical `requested` set and matched at least one
    /// group.
    fn cached_matches(&self, email: &str, requested: &[String]) -> Option<Vec<String>> {
        let entry = self.cache.get(email)?;
        (entry.data.allowed_groups == requested && !entry.data.matched_groups.is_empty())
            .then_some(entry.data.matched_groups)
    }

    async fn validate_via_cache(
        &self,
        email: &str,
        allowed_groups: &[String],
        access_token: &str,
    ) -> AuthResult<Vec<String>> {
        let requested = canonicalize(allowed_groups);

        if let Some(matched) = self.cached_matches(email, &requested) {
            self.emit_result("hit");
            return Ok(matched);
        }
        self.emit_result("miss");

        let gate = self
            .inflight
            .entry(email.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = self
            .validate_upstream(&gate, email, &requested, access_token)
            .await;
        // Drop the gate once only the map still holds it.
        self.inflight
            .remove_if(email, |_, gate| Arc::strong_count(gate) <= 2);
        result
    }

    async fn validate_upstream(
        &self,
        gate: &Arc<Mutex<()>>,
        email: &str,
        requested: &[String],
        access_token: &str,
    ) -> AuthResult<Vec<String>> {
        let _inflight = gate.lock().await;

        // A concurrent caller may have validated while we waited on the gate.
        if let Some(matched) = self.cached_matches(email, requested) {
            self.emit_result("coalesced_hit");
            return Ok(matched);
        }

        let matched = self
            .provider
            .validate_group_membership(email, requested, access_token)
            .await?;

        // The upstream answer is authoritative; a failed cache write must
        // never fail the call.
        if let Err(err) = self.cache.set(Entry::new(email, requested, &matched)) {
            tracing::warn!(email = %email, error = %err, "failed to cache group membership");
            self.emit_result("store_error");
        }
        Ok(matched)
    }

    fn emit_result(&self, result: &str) {
        let sink = Arc::clone(
            &self
                .sink
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let mut tags = self.tags.clone();
        tags.push(MetricTag::new("action", "validate_group_membership"));
        tags.push(MetricTag::new("result", result));
        sink.increment(names::PROVIDER_GROUP_CACHE_TOTAL, &tags, 1.0);
    }
}

#[async_trait]
impl<P: Provider> Provider for GroupCache<P> {
    fn data(&self) -> &ProviderData {
        self.provider.data()
    }

    async fn redeem(&self, redirect_url: &str, code: &str) -> AuthResult<SessionState> {
        self.provider.redeem(redirect_url, code).await
    }

    async fn validate_session_state(&self, session: &SessionState) -> bool {
        self.provider.validate_session_state(session).await
    }

    fn sign_in_url(&self, redirect_uri: &str, final_redirect: &str) -> Url {
        self.provider.sign_in_url(redirect_uri, final_redirect)
    }

    async fn refresh_session_if_needed(&self, session: &mut SessionState) -> AuthResult<bool> {
        self.provider.refresh_session_if_needed(session).await
    }

    async fn validate_group_membership(
        &self,
        email: &str,
        allowed_groups: &[String],
        access_token: &str,
    ) -> AuthResult<Vec<String>> {
        if !self.enabled {
            return self
                .provider
                .validate_group_membership(email, allowed_groups, access_token)
                .await;
        }
        self.validate_via_cache(email, allowed_groups, access_token)
            .await
    }

    async fn revoke(&self, session: &SessionState) -> AuthResult<()> {
        self.provider.revoke(session).await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<(String, Duration)> {
        self.provider.refresh_access_token(refresh_token).await
    }

    fn set_metrics_sink(&self, sink: Arc<dyn MetricsSink>) {
        *self
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&sink);
        self.provider.set_metrics_sink(sink);
    }

    fn stop(&self) {
        self.cache.shutdown();
        self.provider.stop();
    }
}

// =============================================================================
// Tests
// =============================================================================
