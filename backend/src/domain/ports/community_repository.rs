//! Port abstraction for the community store.
//!
//! Implementations provide whole-document persistence for [`Community`]
//! aggregates. The unique-code constraint and per-document revision check
//! live here: the service's allocator pre-check is an optimisation, the
//! insert-time [`CommunityRepositoryError::DuplicateCode`] conflict is the
//! correctness backstop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Community, CommunityId, InviteCode, UserId};

/// Persistence errors raised by community store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunityRepositoryError {
    /// Store connection could not be established.
    #[error("community store connection failed: {message}")]
    Connection {
        /// Adapter-specific failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("community store query failed: {message}")]
    Query {
        /// Adapter-specific failure description.
        message: String,
    },
    /// Insert violated the unique invite-code constraint. Retryable.
    #[error("invite code {code} is already assigned")]
    DuplicateCode {
        /// The contested code.
        code: String,
    },
    /// Save raced a concurrent writer; re-read and retry.
    #[error("community was modified concurrently (stored revision {actual})")]
    RevisionConflict {
        /// Revision currently held by the store.
        actual: u64,
    },
}

/// Aggregate statistics over the community store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    /// All communities, active and inactive.
    pub total_communities: u64,
    /// Communities with `is_active = true`.
    pub active_communities: u64,
    /// Sum of member counts across active communities.
    pub total_members: u64,
    /// Rounded mean member count across active communities.
    pub average_members: u64,
}

/// Whole-document persistence for community aggregates.
///
/// # Revision semantics
///
/// - `insert` stores the document with revision 1.
/// - `save` succeeds only when the caller's `community.revision` matches the
///   stored revision, and bumps the stored revision by one. A mismatch is
///   reported as [`CommunityRepositoryError::RevisionConflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// Persist a new community, enforcing invite-code uniqueness.
    async fn insert(&self, community: &Community) -> Result<(), CommunityRepositoryError>;

    /// Fetch a community by identifier, active or not.
    async fn find_by_id(
        &self,
        id: &CommunityId,
    ) -> Result<Option<Community>, CommunityRepositoryError>;

    /// Active communities containing the user, newest activity first.
    async fn find_by_member(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Community>, CommunityRepositoryError>;

    /// Look up an active community by invite code.
    async fn find_by_code(
        &self,
        code: &InviteCode,
    ) -> Result<Option<Community>, CommunityRepositoryError>;

    /// Whether any community, active or inactive, holds this code.
    async fn code_exists(&self, code: &InviteCode) -> Result<bool, CommunityRepositoryError>;

    /// Case-insensitive name search across the caller's active communities,
    /// newest activity first, capped at 20 results.
    async fn search(
        &self,
        user_id: &UserId,
        query: &str,
    ) -> Result<Vec<Community>, CommunityRepositoryError>;

    /// Persist mutations to an existing community (revision-guarded).
    async fn save(&self, community: &Community) -> Result<(), CommunityRepositoryError>;

    /// Hard-delete a community.
    async fn delete(&self, id: &CommunityId) -> Result<(), CommunityRepositoryError>;

    /// Aggregate statistics for platform-admin reporting.
    async fn stats(&self) -> Result<CommunityStats, CommunityRepositoryError>;
}
