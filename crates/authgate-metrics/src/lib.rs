//! # authgate-metrics
//!
//! Metrics sink abstraction for the authgate SSO proxy.
//!
//! The cache layers do not talk to a concrete metrics backend. They are
//! constructed with an [`MetricsSink`] trait object plus a fixed set of
//! [`MetricTag`]s, and emit counters through it. Production code installs
//! [`RecorderSink`], which forwards to the globally installed [`metrics`]
//! recorder (e.g. a Prometheus exporter); tests install counting doubles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric names as constants for consistency.
pub mod names {
    /// Store-level hit counter, emitted by every cache read that finds a
    /// live entry.
    pub const GROUP_CACHE_HITS_TOTAL: &str = "group_cache_hits_total";

    /// Store-level miss counter (absent or expired entry).
    pub const GROUP_CACHE_MISSES_TOTAL: &str = "group_cache_misses_total";

    /// Store-level write counter, tagged with `outcome=success|error`.
    pub const GROUP_CACHE_SETS_TOTAL: &str = "group_cache_sets_total";

    /// Decorator-level counter for the group-validation path, tagged with
    /// `action` and `result` (`hit`, `miss`, `coalesced_hit`, `store_error`).
    pub const PROVIDER_GROUP_CACHE_TOTAL: &str = "provider_group_cache_total";
}

// =============================================================================
// Metric Tags
// =============================================================================

/// A single key/value label attached to an emitted counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTag {
    /// Label name (e.g. `service`).
    pub key: String,
    /// Label value (e.g. `sso-proxy`).
    pub value: String,
}

impl MetricTag {
    /// Creates a new tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for MetricTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

// =============================================================================
// Metrics Sink
// =============================================================================

/// Destination for cache counters.
///
/// `sample_rate` follows the statsd convention (`1.0` = unsampled). Sinks
/// backed by aggregating recorders are free to ignore it.
pub trait MetricsSink: Send + Sync {
    /// Increment the named counter by one with the given tags.
    fn increment(&self, name: &str, tags: &[MetricTag], sample_rate: f64);
}

/// Sink that forwards counters to the globally installed [`metrics`]
/// recorder.
///
/// Sampling is left to the recorder; `sample_rate` is accepted for contract
/// compatibility and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderSink;

impl RecorderSink {
    /// Creates a new recorder-backed sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for RecorderSink {
    fn increment(&self, name: &str, tags: &[MetricTag], _sample_rate: f64) {
        let labels: Vec<metrics::Label> = tags
            .iter()
            .map(|tag| metrics::Label::new(tag.key.clone(), tag.value.clone()))
            .collect();
        metrics::counter!(name.to_string(), labels).increment(1);
    }
}

/// Sink that discards everything. Useful when metrics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn increment(&self, _name: &str, _tags: &[MetricTag], _sample_rate: f64) {}
}
