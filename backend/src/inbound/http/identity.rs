//! Bearer-token request identity.
//!
//! [`RequestIdentity`] is the extractor protected routes take as a handler
//! argument. It walks the full verification chain on every request: parse
//! the `Authorization` header, verify the token through the token service
//! port, then re-fetch the user from the directory so revoked or
//! deactivated accounts are rejected even while their tokens remain
//! cryptographically valid.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use crate::domain::ports::{TokenError, UserDirectoryError};
use crate::domain::{Error, PlatformRole, User, UserId};

use super::state::HttpState;

/// Verified caller identity attached to a request.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    user: User,
}

impl RequestIdentity {
    /// Identifier of the verified caller.
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// The full directory record backing this identity.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Gate for platform-admin routes. Community roles are irrelevant here;
    /// only the platform-wide role on the directory record counts.
    pub fn require_platform_admin(&self) -> Result<(), Error> {
        match self.user.role {
            PlatformRole::Admin => Ok(()),
            PlatformRole::User => {
                Err(Error::forbidden("Access denied. Admin privileges required."))
            }
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Result<String, Error> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or_else(|| Error::unauthorized("Not authorized, no token"))
}

fn map_token_error(error: TokenError) -> Error {
    match error {
        TokenError::Expired | TokenError::Invalid => Error::unauthorized(error.to_string()),
        TokenError::Configuration { message } => {
            Error::internal(format!("token verification misconfigured: {message}"))
        }
    }
}

fn map_directory_error(error: UserDirectoryError) -> Error {
    match error {
        UserDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("user directory unavailable: {message}"))
        }
        UserDirectoryError::Query { message } => {
            Error::internal(format!("user directory error: {message}"))
        }
    }
}

async fn resolve_identity(req: HttpRequest) -> Result<RequestIdentity, Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state not configured"))?;

    let token = bearer_token(&req)?;
    let claims = state.tokens.verify(&token).map_err(map_token_error)?;
    let user = state
        .directory
        .find_by_id(&claims.user_id)
        .await
        .map_err(map_directory_error)?
        .ok_or_else(|| Error::unauthorized("Not authorized, user not found"))?;
    if !user.is_active {
        return Err(Error::unauthorized("Account has been deactivated"));
    }
    Ok(RequestIdentity { user })
}

impl FromRequest for RequestIdentity {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(resolve_identity(req))
    }
}

/// Soft-fail variant of [`RequestIdentity`] for routes that personalise
/// their response when a valid identity is present but serve anonymous
/// callers all the same.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<RequestIdentity>);

impl FromRequest for OptionalIdentity {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match resolve_identity(req).await {
                Ok(identity) => Ok(Self(Some(identity))),
                Err(error) => {
                    debug!(%error, "optional identity not established");
                    Ok(Self(None))
                }
            }
        })
    }
}
