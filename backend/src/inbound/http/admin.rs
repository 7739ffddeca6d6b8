//! Platform-admin reporting handlers.

use actix_web::{get, web};

use crate::domain::ports::CommunityStats;
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::RequestIdentity;
use crate::inbound::http::state::HttpState;

/// Aggregate community statistics for platform operators.
#[utoipa::path(
    get,
    path = "/api/v1/admin/communities/stats",
    responses(
        (status = 200, description = "Aggregate statistics", body = CommunityStats),
        (status = 401, description = "Unauthorised", body = crate::domain::Error),
        (status = 403, description = "Caller is not a platform admin", body = crate::domain::Error)
    ),
    tags = ["admin"],
    operation_id = "getCommunityStats"
)]
#[get("/admin/communities/stats")]
pub async fn community_stats(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
) -> ApiResult<web::Json<CommunityStats>> {
    identity.require_platform_admin()?;
    let stats = state.communities_query.platform_stats().await?;
    Ok(web::Json(stats))
}
