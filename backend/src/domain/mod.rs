//! Core domain model for community membership and authorization.
//!
//! The domain layer owns the entities, validation rules, and membership
//! invariants. It talks to the outside world exclusively through the port
//! traits in [`ports`]; adapters live under `inbound` and `outbound`.

pub mod code_allocator;
mod community;
mod community_service;
mod error;
pub mod ports;
mod user;

pub use code_allocator::{AllocationError, CodeAllocator, MAX_ATTEMPTS};
pub use community::{
    Community, CommunityId, CommunityName, CommunitySettings, CommunityValidationError,
    DESCRIPTION_MAX, Description, InviteCode, MAX_MEMBERS_DEFAULT, MAX_MEMBERS_MAX,
    MAX_MEMBERS_MIN, MemberRole, Membership, MembershipError, NAME_MAX, NAME_MIN, SettingsPatch,
};
pub use community_service::CommunityService;
pub use error::{Error, ErrorCode};
pub use user::{
    Email, PasswordHash, PlatformRole, User, UserId, UserProfile, UserValidationError, Username,
};
