//! # authgate-auth
//!
//! Provider abstraction and cached group-membership validation for the
//! authgate SSO proxy.
//!
//! This crate provides:
//! - The [`Provider`] trait: the capability set consumed from an upstream
//!   identity/authorization backend
//! - The [`GroupCache`] decorator: cache-aside group validation over any
//!   provider, with pass-through for everything else
//! - Session and configuration types shared by provider implementations
//!
//! ## Modules
//!
//! - [`config`] - Group-cache configuration
//! - [`error`] - Error types for provider operations
//! - [`provider`] - The provider trait and the caching decorator
//! - [`session`] - Session state carried through provider operations

pub mod config;
pub mod error;
pub mod provider;
pub mod session;

pub use config::GroupCacheConfig;
pub use error::AuthError;
pub use provider::{GroupCache, Provider, ProviderData};
pub use session::SessionState;

// Store types, re-exported for callers that seed or purge the cache.
pub use authgate_groups::{CacheError, Entry, LocalCache, UserGroupData};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
