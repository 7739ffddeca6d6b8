//! JWT adapter for the token service port.
//!
//! Tokens are HS256-signed with the shared service secret and carry the
//! subject id, platform role, and issue/expiry timestamps. Verification
//! runs with zero leeway so an expired token is rejected the second it
//! lapses.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{AuthClaims, TokenError, TokenService};
use crate::domain::{PlatformRole, User, UserId};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    role: PlatformRole,
    iat: i64,
    exp: i64,
}

/// HS256 implementation of the token service port.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    /// Build a service signing and verifying with the given secret bytes.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User, ttl: Duration) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).map_err(|_| TokenError::Configuration {
            message: "token ttl exceeds representable range".to_owned(),
        })?;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + ttl,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|error| {
            TokenError::Configuration {
                message: error.to_string(),
            }
        })
    }

    fn verify(&self, token: &str) -> Result<AuthClaims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|error| {
            match error.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        Ok(AuthClaims {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}
