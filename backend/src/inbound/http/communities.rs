//! Community membership HTTP handlers.
//!
//! ```text
//! POST   /api/v1/communities
//! POST   /api/v1/communities/join
//! GET    /api/v1/communities/joined
//! GET    /api/v1/communities/search?q=
//! GET    /api/v1/communities/{id}
//! PUT    /api/v1/communities/{id}
//! DELETE /api/v1/communities/{id}
//! DELETE /api/v1/communities/{id}/leave
//! PUT    /api/v1/communities/{id}/promote/{member_id}
//! PUT    /api/v1/communities/{id}/demote/{member_id}
//! DELETE /api/v1/communities/{id}/members/{member_id}
//! ```
//!
//! All routes require a verified [`RequestIdentity`]. Handlers stay thin:
//! path parsing and response envelopes here, every business rule behind the
//! driving ports.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CommunityOverview, CommunitySearchHit, CreateCommunityRequest, UpdateCommunityRequest,
};
use crate::domain::{CommunityId, SettingsPatch, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::RequestIdentity;
use crate::inbound::http::state::HttpState;

/// Community creation payload.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityBody {
    /// Display name, 3 to 100 characters after trimming.
    pub name: String,
    /// Optional free-form description, up to 500 characters.
    pub description: Option<String>,
    /// Optional settings overrides; omitted fields keep their defaults.
    pub settings: Option<SettingsPatch>,
}

/// Join payload carrying the four-digit invite code.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinCommunityBody {
    /// Four-digit invite code shared out of band.
    pub code: String,
}

/// Partial update payload; omitted fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommunityBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<SettingsPatch>,
}

/// List envelope for the caller's communities.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinedCommunitiesResponse {
    pub count: usize,
    pub communities: Vec<CommunityOverview>,
}

/// List envelope for search results.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchCommunitiesResponse {
    pub count: usize,
    pub communities: Vec<CommunitySearchHit>,
}

/// Acknowledgement body for operations with no data to return.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Search query string.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Create a community with the caller as its first admin member.
#[utoipa::path(
    post,
    path = "/api/v1/communities",
    request_body = CreateCommunityBody,
    responses(
        (status = 201, description = "Community created", body = crate::domain::ports::CreatedCommunity),
        (status = 400, description = "Invalid name, description, or settings", body = crate::domain::Error),
        (status = 401, description = "Unauthorised", body = crate::domain::Error),
        (status = 409, description = "Code space contention", body = crate::domain::Error),
        (status = 503, description = "Code space exhausted or store unavailable", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "createCommunity"
)]
#[post("/communities")]
pub async fn create_community(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    payload: web::Json<CreateCommunityBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let created = state
        .communities
        .create(
            identity.user_id(),
            CreateCommunityRequest {
                name: body.name,
                description: body.description,
                settings: body.settings,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(created))
}

/// Join a community by invite code.
#[utoipa::path(
    post,
    path = "/api/v1/communities/join",
    request_body = JoinCommunityBody,
    responses(
        (status = 200, description = "Joined", body = crate::domain::ports::JoinedCommunity),
        (status = 400, description = "Malformed code", body = crate::domain::Error),
        (status = 401, description = "Unauthorised", body = crate::domain::Error),
        (status = 404, description = "No community holds this code", body = crate::domain::Error),
        (status = 409, description = "Already a member or community full", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "joinCommunity"
)]
#[post("/communities/join")]
pub async fn join_community(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    payload: web::Json<JoinCommunityBody>,
) -> ApiResult<HttpResponse> {
    let joined = state
        .communities
        .join(identity.user_id(), &payload.code)
        .await?;
    Ok(HttpResponse::Ok().json(joined))
}

/// List the caller's active communities, newest activity first.
#[utoipa::path(
    get,
    path = "/api/v1/communities/joined",
    responses(
        (status = 200, description = "Caller's communities", body = JoinedCommunitiesResponse),
        (status = 401, description = "Unauthorised", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "getJoinedCommunities"
)]
#[get("/communities/joined")]
pub async fn joined_communities(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
) -> ApiResult<web::Json<JoinedCommunitiesResponse>> {
    let communities = state.communities_query.joined(identity.user_id()).await?;
    Ok(web::Json(JoinedCommunitiesResponse {
        count: communities.len(),
        communities,
    }))
}

/// Name search across the caller's communities.
#[utoipa::path(
    get,
    path = "/api/v1/communities/search",
    params(("q" = String, Query, description = "Name fragment, case-insensitive")),
    responses(
        (status = 200, description = "Matches, capped at 20", body = SearchCommunitiesResponse),
        (status = 400, description = "Empty query", body = crate::domain::Error),
        (status = 401, description = "Unauthorised", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "searchCommunities"
)]
#[get("/communities/search")]
pub async fn search_communities(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    params: web::Query<SearchParams>,
) -> ApiResult<web::Json<SearchCommunitiesResponse>> {
    let communities = state
        .communities_query
        .search(identity.user_id(), &params.q)
        .await?;
    Ok(web::Json(SearchCommunitiesResponse {
        count: communities.len(),
        communities,
    }))
}

/// Full community detail, members only.
#[utoipa::path(
    get,
    path = "/api/v1/communities/{id}",
    params(("id" = String, Path, description = "Community id")),
    responses(
        (status = 200, description = "Full detail", body = crate::domain::ports::CommunityDetail),
        (status = 401, description = "Unauthorised", body = crate::domain::Error),
        (status = 403, description = "Caller is not a member", body = crate::domain::Error),
        (status = 404, description = "No such community", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "getCommunityById"
)]
#[get("/communities/{id}")]
pub async fn community_detail(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = CommunityId::new(path.into_inner())?;
    let detail = state
        .communities_query
        .by_id(identity.user_id(), &id)
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Apply a partial update; community admins only.
#[utoipa::path(
    put,
    path = "/api/v1/communities/{id}",
    params(("id" = String, Path, description = "Community id")),
    request_body = UpdateCommunityBody,
    responses(
        (status = 200, description = "Updated community", body = crate::domain::ports::UpdatedCommunity),
        (status = 400, description = "Invalid field value", body = crate::domain::Error),
        (status = 403, description = "Caller is not a community admin", body = crate::domain::Error),
        (status = 404, description = "No such community", body = crate::domain::Error),
        (status = 409, description = "Lost a concurrent update race", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "updateCommunity"
)]
#[put("/communities/{id}")]
pub async fn update_community(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<String>,
    payload: web::Json<UpdateCommunityBody>,
) -> ApiResult<HttpResponse> {
    let id = CommunityId::new(path.into_inner())?;
    let body = payload.into_inner();
    let updated = state
        .communities
        .update(
            identity.user_id(),
            &id,
            UpdateCommunityRequest {
                name: body.name,
                description: body.description,
                settings: body.settings,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Remove the caller's own membership.
#[utoipa::path(
    delete,
    path = "/api/v1/communities/{id}/leave",
    params(("id" = String, Path, description = "Community id")),
    responses(
        (status = 200, description = "Left the community", body = MessageResponse),
        (status = 403, description = "The creator cannot leave", body = crate::domain::Error),
        (status = 404, description = "No such community", body = crate::domain::Error),
        (status = 409, description = "Caller is not a member", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "leaveCommunity"
)]
#[delete("/communities/{id}/leave")]
pub async fn leave_community(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = CommunityId::new(path.into_inner())?;
    let name = state.communities.leave(identity.user_id(), &id).await?;
    Ok(web::Json(MessageResponse::new(format!(
        "You have left {name}"
    ))))
}

/// Hard-delete a community; creator only.
#[utoipa::path(
    delete,
    path = "/api/v1/communities/{id}",
    params(("id" = String, Path, description = "Community id")),
    responses(
        (status = 200, description = "Community deleted", body = MessageResponse),
        (status = 403, description = "Caller is not the creator", body = crate::domain::Error),
        (status = 404, description = "No such community", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "deleteCommunity"
)]
#[delete("/communities/{id}")]
pub async fn delete_community(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = CommunityId::new(path.into_inner())?;
    let name = state.communities.delete(identity.user_id(), &id).await?;
    Ok(web::Json(MessageResponse::new(format!(
        "{name} has been deleted successfully"
    ))))
}

fn member_path(path: web::Path<(String, String)>) -> ApiResult<(CommunityId, UserId)> {
    let (community, member) = path.into_inner();
    Ok((CommunityId::new(community)?, UserId::new(member)?))
}

/// Grant the community admin role to a member; admins only.
#[utoipa::path(
    put,
    path = "/api/v1/communities/{id}/promote/{member_id}",
    params(
        ("id" = String, Path, description = "Community id"),
        ("member_id" = String, Path, description = "Member to promote")
    ),
    responses(
        (status = 200, description = "Promoted", body = MessageResponse),
        (status = 403, description = "Caller is not a community admin", body = crate::domain::Error),
        (status = 404, description = "Community or member not found", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "promoteMember"
)]
#[put("/communities/{id}/promote/{member_id}")]
pub async fn promote_member(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<MessageResponse>> {
    let (id, member) = member_path(path)?;
    state
        .communities
        .promote_member(identity.user_id(), &id, &member)
        .await?;
    Ok(web::Json(MessageResponse::new(
        "Member promoted to admin successfully",
    )))
}

/// Revoke the community admin role; creator only.
#[utoipa::path(
    put,
    path = "/api/v1/communities/{id}/demote/{member_id}",
    params(
        ("id" = String, Path, description = "Community id"),
        ("member_id" = String, Path, description = "Admin to demote")
    ),
    responses(
        (status = 200, description = "Demoted", body = MessageResponse),
        (status = 400, description = "The creator cannot be demoted", body = crate::domain::Error),
        (status = 403, description = "Caller is not the creator", body = crate::domain::Error),
        (status = 404, description = "Community or member not found", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "demoteMember"
)]
#[put("/communities/{id}/demote/{member_id}")]
pub async fn demote_member(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<MessageResponse>> {
    let (id, member) = member_path(path)?;
    state
        .communities
        .demote_member(identity.user_id(), &id, &member)
        .await?;
    Ok(web::Json(MessageResponse::new(
        "Admin demoted to member successfully",
    )))
}

/// Remove another member; admins only, and never the creator.
#[utoipa::path(
    delete,
    path = "/api/v1/communities/{id}/members/{member_id}",
    params(
        ("id" = String, Path, description = "Community id"),
        ("member_id" = String, Path, description = "Member to remove")
    ),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 403, description = "Caller lacks the admin role or targeted the creator", body = crate::domain::Error),
        (status = 404, description = "Community or member not found", body = crate::domain::Error)
    ),
    tags = ["communities"],
    operation_id = "removeMember"
)]
#[delete("/communities/{id}/members/{member_id}")]
pub async fn remove_member(
    state: web::Data<HttpState>,
    identity: RequestIdentity,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<MessageResponse>> {
    let (id, member) = member_path(path)?;
    state
        .communities
        .remove_member(identity.user_id(), &id, &member)
        .await?;
    Ok(web::Json(MessageResponse::new("Member removed successfully")))
}
