//! Driving ports for community membership operations.
//!
//! Inbound adapters (HTTP handlers) depend on these traits and the view
//! structs they return; the domain service implements them. All operations
//! take the resolved caller identity established by the authorization layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    CommunityId, CommunityName, CommunitySettings, Description, Error, InviteCode, MemberRole,
    SettingsPatch, UserId, UserProfile,
};

use super::CommunityStats;

/// Inputs for community creation. Raw strings are validated by the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCommunityRequest {
    /// Requested display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional settings overrides, merged over defaults.
    pub settings: Option<SettingsPatch>,
}

/// Inputs for a community update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateCommunityRequest {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Settings overrides, shallow-merged into the stored settings.
    pub settings: Option<SettingsPatch>,
}

/// Summary returned after creating a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCommunity {
    /// New community identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Description.
    pub description: Description,
    /// Allocated invite code.
    pub code: InviteCode,
    /// Current member count (always 1 at creation).
    pub member_count: usize,
    /// Always true for the creator.
    pub is_admin: bool,
    /// Creator's public profile.
    pub created_by: UserProfile,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Summary returned after joining a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinedCommunity {
    /// Community identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Description.
    pub description: Description,
    /// Invite code used to join.
    pub code: InviteCode,
    /// Member count including the new member.
    pub member_count: usize,
    /// Always false immediately after joining.
    pub is_admin: bool,
}

/// One entry in the caller's joined-communities listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityOverview {
    /// Community identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Description.
    pub description: Description,
    /// Invite code.
    pub code: InviteCode,
    /// Current member count.
    pub member_count: usize,
    /// Whether the caller holds the community admin role.
    pub is_admin: bool,
    /// Whether the caller created the community.
    pub is_creator: bool,
    /// Creator's public profile.
    pub created_by: UserProfile,
    /// When the caller joined.
    pub joined_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Most recent member- or settings-related mutation.
    pub last_activity: DateTime<Utc>,
}

/// Fully projected member entry inside a community detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    /// Public profile of the member.
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Role held inside the community.
    pub role: MemberRole,
    /// When the member joined.
    pub joined_at: DateTime<Utc>,
}

/// Full community detail visible to members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityDetail {
    /// Community identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Description.
    pub description: Description,
    /// Invite code.
    pub code: InviteCode,
    /// Creator's public profile.
    pub created_by: UserProfile,
    /// Projected member list in join order.
    pub members: Vec<MemberDetail>,
    /// Current member count.
    pub member_count: usize,
    /// Whether the caller holds the community admin role.
    pub is_admin: bool,
    /// Whether the caller created the community.
    pub is_creator: bool,
    /// Stored settings.
    pub settings: CommunitySettings,
    /// Whether the community appears in directory listings.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Most recent member- or settings-related mutation.
    pub last_activity: DateTime<Utc>,
}

/// Summary returned after a community update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCommunity {
    /// Community identifier.
    pub id: CommunityId,
    /// Display name after the update.
    pub name: CommunityName,
    /// Description after the update.
    pub description: Description,
    /// Settings after the merge.
    pub settings: CommunitySettings,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Reduced projection returned by the search operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySearchHit {
    /// Community identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Description.
    pub description: Description,
    /// Invite code.
    pub code: InviteCode,
    /// Current member count.
    pub member_count: usize,
    /// Whether the caller holds the community admin role.
    pub is_admin: bool,
    /// Creator's public profile.
    pub created_by: UserProfile,
}

/// Mutating community operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityCommand: Send + Sync {
    /// Create a community with the caller as its first admin member.
    async fn create(
        &self,
        caller: &UserId,
        request: CreateCommunityRequest,
    ) -> Result<CreatedCommunity, Error>;

    /// Join an active community by invite code.
    async fn join(&self, caller: &UserId, code: &str) -> Result<JoinedCommunity, Error>;

    /// Apply a partial update; community admins only.
    async fn update(
        &self,
        caller: &UserId,
        id: &CommunityId,
        request: UpdateCommunityRequest,
    ) -> Result<UpdatedCommunity, Error>;

    /// Remove the caller's own membership; the creator must delete instead.
    async fn leave(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityName, Error>;

    /// Hard-delete a community; creator only.
    async fn delete(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityName, Error>;

    /// Grant the community admin role to a member; admins only.
    async fn promote_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error>;

    /// Revoke the community admin role; creator only.
    async fn demote_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error>;

    /// Remove another member; admins only, and never the creator.
    async fn remove_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error>;
}

/// Read-only community operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityQuery: Send + Sync {
    /// All active communities the caller belongs to, newest activity first.
    async fn joined(&self, caller: &UserId) -> Result<Vec<CommunityOverview>, Error>;

    /// Full detail for one community; members only.
    async fn by_id(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityDetail, Error>;

    /// Name search across the caller's communities.
    async fn search(&self, caller: &UserId, query: &str)
    -> Result<Vec<CommunitySearchHit>, Error>;

    /// Aggregate statistics for platform-admin reporting.
    async fn platform_stats(&self) -> Result<CommunityStats, Error>;
}
