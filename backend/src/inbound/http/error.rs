//! HTTP mapping for domain errors.
//!
//! Keeps the domain error type transport-agnostic while letting Actix
//! handlers return it directly. Internal errors are logged in full and
//! redacted before leaving the process.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode};
use crate::middleware::trace::{TRACE_ID_HEADER, TraceId};

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Attach the scoped trace id if the error lacks one, then strip internal
/// detail from anything classified as an internal error.
fn response_body(error: &Error) -> Error {
    let mut body = if matches!(error.code(), ErrorCode::InternalError) {
        error!(message = error.message(), "internal error surfaced to client");
        Error::internal("Internal server error")
    } else {
        error.clone()
    };
    if body.trace_id().is_none()
        && let Some(id) = TraceId::current()
    {
        body = body.with_trace_id(id.to_string());
    }
    body
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let body = response_body(self);
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = body.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(body)
    }
}
