//! Authentication module
//!
//! Supports: static bearer token and OAuth2 refresh-token flow.
//!
//! The `Authenticator` applies credentials to outgoing requests and caches
//! refreshed access tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken};
