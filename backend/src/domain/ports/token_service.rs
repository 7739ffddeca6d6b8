//! Port abstraction for the identity token service.
//!
//! The external collaborator issues and verifies signed session tokens
//! carrying a user identifier and platform-role claim. Verification outcomes
//! distinguish expiry from any other malformation so adapters can surface
//! distinct messages.

use std::time::Duration;

use crate::domain::{PlatformRole, User, UserId};

/// Claims resolved from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthClaims {
    /// Token subject.
    pub user_id: UserId,
    /// Platform-wide role claim embedded at issue time.
    pub role: PlatformRole,
}

/// Failures raised while issuing or verifying tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature checked out but the token is past its expiry.
    #[error("Token expired, please login again")]
    Expired,
    /// Malformed token or invalid signature.
    #[error("Invalid token")]
    Invalid,
    /// The signing material is unusable.
    #[error("token service misconfigured: {message}")]
    Configuration {
        /// Adapter-specific failure description.
        message: String,
    },
}

/// Issues and verifies signed session tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Sign a token for the user, valid for `ttl`.
    fn issue(&self, user: &User, ttl: Duration) -> Result<String, TokenError>;

    /// Verify signature and expiry, returning the embedded claims.
    fn verify(&self, token: &str) -> Result<AuthClaims, TokenError>;
}
