//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST path and the schemas their bodies use so
//! tooling can generate clients against the service.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer-token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Community membership API",
        description = "Invite-code community membership with bearer-token authorization."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::communities::create_community,
        crate::inbound::http::communities::join_community,
        crate::inbound::http::communities::joined_communities,
        crate::inbound::http::communities::search_communities,
        crate::inbound::http::communities::community_detail,
        crate::inbound::http::communities::update_community,
        crate::inbound::http::communities::leave_community,
        crate::inbound::http::communities::delete_community,
        crate::inbound::http::communities::promote_member,
        crate::inbound::http::communities::demote_member,
        crate::inbound::http::communities::remove_member,
        crate::inbound::http::admin::community_stats,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        crate::domain::Error,
        crate::domain::ErrorCode,
        crate::domain::ports::CreatedCommunity,
        crate::domain::ports::JoinedCommunity,
        crate::domain::ports::CommunityOverview,
        crate::domain::ports::CommunityDetail,
        crate::domain::ports::MemberDetail,
        crate::domain::ports::UpdatedCommunity,
        crate::domain::ports::CommunitySearchHit,
        crate::domain::ports::CommunityStats,
        crate::inbound::http::communities::CreateCommunityBody,
        crate::inbound::http::communities::JoinCommunityBody,
        crate::inbound::http::communities::UpdateCommunityBody,
        crate::inbound::http::communities::JoinedCommunitiesResponse,
        crate::inbound::http::communities::SearchCommunitiesResponse,
        crate::inbound::http::communities::MessageResponse,
    ))
)]
pub struct ApiDoc;
