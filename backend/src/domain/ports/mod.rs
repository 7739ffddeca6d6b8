//! Domain ports and supporting types for the hexagonal boundary.

mod community_repository;
mod community_use_cases;
mod token_service;
mod user_directory;

#[cfg(test)]
pub use community_repository::MockCommunityRepository;
pub use community_repository::{CommunityRepository, CommunityRepositoryError, CommunityStats};
#[cfg(test)]
pub use community_use_cases::{MockCommunityCommand, MockCommunityQuery};
pub use community_use_cases::{
    CommunityCommand, CommunityDetail, CommunityOverview, CommunityQuery, CommunitySearchHit,
    CreateCommunityRequest, CreatedCommunity, JoinedCommunity, MemberDetail,
    UpdateCommunityRequest, UpdatedCommunity,
};
#[cfg(test)]
pub use token_service::MockTokenService;
pub use token_service::{AuthClaims, TokenError, TokenService};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{UserDirectory, UserDirectoryError};
