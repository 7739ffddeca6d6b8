//! Server construction and wiring.
//!
//! Builds the dependency graph (adapters behind `Arc<dyn Port>` handles) and
//! assembles the actix application. Integration tests call [`build_app`] with
//! their own seeded adapters; `main` calls [`run`].

pub mod config;

pub use config::{AppConfig, ConfigError};

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use crate::domain::CommunityService;
use crate::domain::ports::CommunityCommand;
use crate::inbound::http::admin::community_stats;
use crate::inbound::http::communities::{
    community_detail, create_community, delete_community, demote_member, join_community,
    joined_communities, leave_community, promote_member, remove_member, search_communities,
    update_community,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;
use crate::outbound::{InMemoryCommunityStore, InMemoryUserDirectory, JwtTokenService};

/// Wire the default adapter set: in-memory persistence and JWT tokens.
pub fn build_http_state(
    secret: &[u8],
    store: Arc<InMemoryCommunityStore>,
    directory: Arc<InMemoryUserDirectory>,
) -> HttpState {
    let service = Arc::new(CommunityService::new(store, Arc::clone(&directory)));
    let commands: Arc<dyn CommunityCommand> = service.clone();
    HttpState::new(
        commands,
        service,
        Arc::new(JwtTokenService::new(secret)),
        directory,
    )
}

/// Assemble the actix application around the given state.
///
/// Literal segments (`joined`, `search`, `join`) register ahead of the
/// `{id}` routes so they are matched first.
pub fn build_app(
    http_state: web::Data<HttpState>,
    health_state: web::Data<HealthState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .app_data(http_state)
        .service(create_community)
        .service(join_community)
        .service(joined_communities)
        .service(search_communities)
        .service(leave_community)
        .service(promote_member)
        .service(demote_member)
        .service(remove_member)
        .service(community_detail)
        .service(update_community)
        .service(delete_community)
        .service(community_stats);

    let app = App::new()
        .app_data(health_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = {
        use utoipa::OpenApi;
        app.route(
            "/api-docs/openapi.json",
            web::get().to(|| async { web::Json(crate::doc::ApiDoc::openapi()) }),
        )
    };

    app
}

/// Bind and run the HTTP server until shutdown.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let store = Arc::new(InMemoryCommunityStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let http_state = web::Data::new(build_http_state(&config.token_secret, store, directory));

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(http_state.clone(), server_health_state.clone())
    })
    .bind(config.bind_addr)?;

    info!(addr = %config.bind_addr, "listening");
    health_state.mark_ready();
    server.run().await
}
