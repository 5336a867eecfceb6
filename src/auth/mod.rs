//! Authentication module
//!
//! Supports: Bearer, API Key, OAuth2 refresh token, Custom Headers
//!
//! The [`Authenticator`] trait is the seam the request loop uses; a
//! [`ConfiguredAuthenticator`] covers the common cases and caches OAuth2
//! access tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::{Authenticator, ConfiguredAuthenticator};
pub use types::{AuthConfig, CachedToken, DEFAULT_TOKEN_URL};
