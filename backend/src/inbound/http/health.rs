//! Liveness and readiness probes for orchestration.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};

/// Shared probe state: readiness flips on once wiring completes, liveness
/// flips off when a graceful shutdown begins.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Start not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service ready to take traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness probes so orchestrators stop routing before shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Current readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Current liveness state.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe: 200 once dependencies are wired, 503 before that.
#[utoipa::path(
    get,
    path = "/healthz/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Ready to handle traffic"),
        (status = 503, description = "Not ready")
    )
)]
#[get("/healthz/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe: 200 while the process is healthy, 503 once draining.
#[utoipa::path(
    get,
    path = "/healthz/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Alive"),
        (status = 503, description = "Shutting down")
    )
)]
#[get("/healthz/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}
