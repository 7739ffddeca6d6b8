//! Environment-driven server configuration.
//!
//! Configuration is validated once at startup; a missing or undersized token
//! secret is fatal rather than a per-request error. Debug builds may opt into
//! an ephemeral secret for local work, which invalidates all tokens on
//! restart.

use std::net::SocketAddr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

const TOKEN_SECRET_ENV: &str = "AUTH_TOKEN_SECRET";
const ALLOW_EPHEMERAL_ENV: &str = "AUTH_ALLOW_EPHEMERAL_SECRET";
const BIND_ADDR_ENV: &str = "BIND_ADDR";

/// Minimum accepted secret length in bytes.
pub const TOKEN_SECRET_MIN_LEN: usize = 32;
const BIND_ADDR_DEFAULT: &str = "0.0.0.0:8080";

/// Errors raised while validating startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The token secret is absent and no ephemeral fallback applies.
    #[error("missing required environment variable: {TOKEN_SECRET_ENV}")]
    MissingSecret,
    /// The token secret is present but too short to sign with.
    #[error(
        "{TOKEN_SECRET_ENV} too short: need >= {TOKEN_SECRET_MIN_LEN} bytes, got {length}"
    )]
    SecretTooShort {
        /// Length of the supplied secret.
        length: usize,
    },
    /// A variable is present but cannot be parsed.
    #[error("invalid value for {name}='{value}'")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Validated application configuration.
pub struct AppConfig {
    /// Signing secret for the token service.
    pub token_secret: Vec<u8>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token_secret: read_secret()?,
            bind_addr: read_parsed_default(BIND_ADDR_ENV, BIND_ADDR_DEFAULT)?,
        })
    }
}

fn read_secret() -> Result<Vec<u8>, ConfigError> {
    match std::env::var(TOKEN_SECRET_ENV) {
        Ok(secret) if secret.len() >= TOKEN_SECRET_MIN_LEN => Ok(secret.into_bytes()),
        Ok(secret) => Err(ConfigError::SecretTooShort {
            length: secret.len(),
        }),
        Err(_) => {
            let allow_ephemeral =
                std::env::var(ALLOW_EPHEMERAL_ENV).ok().as_deref() == Some("1");
            if cfg!(debug_assertions) && allow_ephemeral {
                warn!("using ephemeral token secret (dev only); tokens expire on restart");
                let mut rng = SmallRng::from_entropy();
                Ok((0..64).map(|_| rng.r#gen::<u8>()).collect())
            } else {
                Err(ConfigError::MissingSecret)
            }
        }
    }
}

fn read_parsed_default<T: std::str::FromStr>(
    name: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_owned());
    raw.parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value: raw })
}
