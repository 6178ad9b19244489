//! # authgate-groups
//!
//! Concurrency-safe, TTL-expiring store for group-membership lookups.
//!
//! The store maps an identity (email or subject identifier) to the group
//! sets observed at validation time. It knows nothing about identity
//! providers; the cache-aside policy lives in `authgate-auth`.
//!
//! ## Modules
//!
//! - [`cache`] - The [`LocalCache`] store with lazy expiry and background sweep
//! - [`types`] - [`Entry`] / [`UserGroupData`] records and canonicalization

pub mod cache;
pub mod types;

pub use cache::{CacheError, LocalCache};
pub use types::{Entry, UserGroupData, canonicalize};
