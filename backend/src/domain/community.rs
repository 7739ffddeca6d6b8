//! Community aggregate: membership list, settings, and invite code.
//!
//! The aggregate enforces its own invariants at the boundary:
//! the creator is a permanent admin member, a user appears at most once in
//! the member list, and the list never exceeds `settings.max_members`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Error, UserId};

/// Minimum community name length (after trimming).
pub const NAME_MIN: usize = 3;
/// Maximum community name length.
pub const NAME_MAX: usize = 100;
/// Maximum description length.
pub const DESCRIPTION_MAX: usize = 500;
/// Smallest permitted member cap.
pub const MAX_MEMBERS_MIN: u32 = 2;
/// Largest permitted member cap.
pub const MAX_MEMBERS_MAX: u32 = 1000;
/// Member cap applied when no override is supplied.
pub const MAX_MEMBERS_DEFAULT: u32 = 100;

/// Validation errors raised by the community value-type constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunityValidationError {
    /// Name was blank once trimmed.
    #[error("Community name is required")]
    NameEmpty,
    /// Name was shorter than [`NAME_MIN`] characters.
    #[error("Community name must be at least {NAME_MIN} characters")]
    NameTooShort,
    /// Name exceeded [`NAME_MAX`] characters.
    #[error("Community name cannot exceed {NAME_MAX} characters")]
    NameTooLong,
    /// Description exceeded [`DESCRIPTION_MAX`] characters.
    #[error("Description cannot exceed {DESCRIPTION_MAX} characters")]
    DescriptionTooLong,
    /// Invite code was not exactly four ASCII digits.
    #[error("Invalid community code. Code must be 4 digits.")]
    InvalidCode,
}

impl From<CommunityValidationError> for Error {
    fn from(err: CommunityValidationError) -> Self {
        Self::invalid_request(err.to_string())
    }
}

/// Stable community identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CommunityId(Uuid);

impl CommunityId {
    /// Parse and validate a [`CommunityId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, Error> {
        Uuid::parse_str(id.as_ref())
            .map(Self)
            .map_err(|_| Error::invalid_request("community id must be a valid UUID"))
    }

    /// Generate a new random [`CommunityId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for CommunityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Community display name, trimmed and length-bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct CommunityName(String);

impl CommunityName {
    /// Trim and validate a raw community name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CommunityValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CommunityValidationError::NameEmpty);
        }
        let length = trimmed.chars().count();
        if length < NAME_MIN {
            return Err(CommunityValidationError::NameTooShort);
        }
        if length > NAME_MAX {
            return Err(CommunityValidationError::NameTooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for CommunityName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CommunityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CommunityName> for String {
    fn from(value: CommunityName) -> Self {
        value.0
    }
}

impl TryFrom<String> for CommunityName {
    type Error = CommunityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Community description, trimmed and capped at [`DESCRIPTION_MAX`] characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct Description(String);

impl Description {
    /// Trim and validate a raw description. Empty input is allowed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CommunityValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.chars().count() > DESCRIPTION_MAX {
            return Err(CommunityValidationError::DescriptionTooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Description> for String {
    fn from(value: Description) -> Self {
        value.0
    }
}

impl TryFrom<String> for Description {
    type Error = CommunityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Four-digit numeric invite code.
///
/// Stored uppercase for parity with the persistence contract, although the
/// digit-only constraint makes case irrelevant in practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct InviteCode(String);

impl InviteCode {
    /// Validate a raw invite code: exactly four ASCII digits.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CommunityValidationError> {
        let trimmed = raw.as_ref().trim().to_uppercase();
        if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommunityValidationError::InvalidCode);
        }
        Ok(Self(trimmed))
    }

    /// Build a code from an integer draw. Values outside `[1000, 9999]` fold
    /// back into the range so the constructor stays infallible.
    pub fn from_number(value: u32) -> Self {
        let folded = if (1000..=9999).contains(&value) {
            value
        } else {
            1000 + value % 9000
        };
        Self(folded.to_string())
    }
}

impl AsRef<str> for InviteCode {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<InviteCode> for String {
    fn from(value: InviteCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for InviteCode {
    type Error = CommunityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Role held inside one community.
///
/// Independent of the platform-wide role claim carried in auth tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Elevated rights within this community.
    Admin,
    /// Regular participant.
    Member,
}

/// One user's participation in a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Reference to the directory-owned user record.
    pub user: UserId,
    /// Role held inside this community.
    pub role: MemberRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

/// Stored community configuration.
///
/// `is_public`, `allow_member_invite`, and `auto_approve` are persisted and
/// returned to clients but do not gate join or visibility behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySettings {
    /// Whether the community advertises itself in public listings.
    pub is_public: bool,
    /// Upper bound on the membership list, within `[2, 1000]`.
    pub max_members: u32,
    /// Whether regular members may share the invite code.
    pub allow_member_invite: bool,
    /// Whether joins are admitted without review.
    pub auto_approve: bool,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            is_public: false,
            max_members: MAX_MEMBERS_DEFAULT,
            allow_member_invite: true,
            auto_approve: true,
        }
    }
}

impl CommunitySettings {
    /// Merge defaults with caller-supplied overrides, clamping the member cap.
    pub fn from_patch(patch: &SettingsPatch) -> Self {
        let mut settings = Self::default();
        settings.apply_patch(patch);
        settings
    }

    /// Shallow-merge the provided fields only, clamping the member cap.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(max_members) = patch.max_members {
            self.max_members = max_members.clamp(MAX_MEMBERS_MIN, MAX_MEMBERS_MAX);
        }
        if let Some(allow_member_invite) = patch.allow_member_invite {
            self.allow_member_invite = allow_member_invite;
        }
        if let Some(auto_approve) = patch.auto_approve {
            self.auto_approve = auto_approve;
        }
    }
}

/// Optional settings overrides supplied by clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// Override for [`CommunitySettings::is_public`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Override for [`CommunitySettings::max_members`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
    /// Override for [`CommunitySettings::allow_member_invite`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_member_invite: Option<bool>,
    /// Override for [`CommunitySettings::auto_approve`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve: Option<bool>,
}

/// Membership mutations rejected by the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    /// The user already appears in the member list.
    #[error("You are already a member of this community")]
    AlreadyMember,
    /// The member list is at `settings.max_members`.
    #[error("Community has reached maximum members limit")]
    CommunityFull,
    /// The user does not appear in the member list.
    #[error("Member not found in this community")]
    NotAMember,
    /// The creator's membership cannot be removed or demoted.
    #[error("Cannot remove the community creator")]
    CreatorProtected,
}

impl From<MembershipError> for Error {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::AlreadyMember | MembershipError::CommunityFull => {
                Self::conflict(err.to_string())
            }
            MembershipError::NotAMember => Self::not_found(err.to_string()),
            MembershipError::CreatorProtected => Self::forbidden(err.to_string()),
        }
    }
}

/// A named group with an embedded membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Stable identifier.
    pub id: CommunityId,
    /// Display name.
    pub name: CommunityName,
    /// Free-form description.
    pub description: Description,
    /// Globally unique invite code.
    pub code: InviteCode,
    /// The user who created the community; permanently an admin member.
    pub created_by: UserId,
    /// Ordered membership list.
    pub members: Vec<Membership>,
    /// Stored configuration.
    pub settings: CommunitySettings,
    /// Whether the community appears in directory listings.
    pub is_active: bool,
    /// Refreshed on every member- or settings-related mutation.
    pub last_activity: DateTime<Utc>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token owned by the store; 0 before first insert.
    pub revision: u64,
}

impl Community {
    /// Construct a new community with the creator as its first admin member.
    pub fn create(
        name: CommunityName,
        description: Description,
        code: InviteCode,
        created_by: UserId,
        settings: CommunitySettings,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CommunityId::random(),
            name,
            description,
            code,
            created_by,
            members: vec![Membership {
                user: created_by,
                role: MemberRole::Admin,
                joined_at: now,
            }],
            settings,
            is_active: true,
            last_activity: now,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Number of members, including the creator.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Membership entry for the given user, if present.
    pub fn member(&self, user_id: &UserId) -> Option<&Membership> {
        self.members.iter().find(|m| m.user == *user_id)
    }

    /// Whether the user appears in the member list.
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.member(user_id).is_some()
    }

    /// Whether the user holds the community admin role.
    pub fn is_admin(&self, user_id: &UserId) -> bool {
        matches!(self.member(user_id), Some(m) if m.role == MemberRole::Admin)
    }

    /// Whether the user created the community.
    pub fn is_creator(&self, user_id: &UserId) -> bool {
        self.created_by == *user_id
    }

    /// Append a membership entry, enforcing uniqueness and the member cap.
    pub fn add_member(&mut self, user_id: UserId, role: MemberRole) -> Result<(), MembershipError> {
        if self.is_member(&user_id) {
            return Err(MembershipError::AlreadyMember);
        }
        if self.member_count() >= self.settings.max_members as usize {
            return Err(MembershipError::CommunityFull);
        }
        let now = Utc::now();
        self.members.push(Membership {
            user: user_id,
            role,
            joined_at: now,
        });
        self.touch(now);
        Ok(())
    }

    /// Remove a membership entry. The creator's entry is immovable.
    pub fn remove_member(&mut self, user_id: &UserId) -> Result<(), MembershipError> {
        if self.is_creator(user_id) {
            return Err(MembershipError::CreatorProtected);
        }
        if !self.is_member(user_id) {
            return Err(MembershipError::NotAMember);
        }
        self.members.retain(|m| m.user != *user_id);
        self.touch(Utc::now());
        Ok(())
    }

    /// Change a member's role.
    pub fn set_member_role(
        &mut self,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<(), MembershipError> {
        if self.is_creator(user_id) && role != MemberRole::Admin {
            return Err(MembershipError::CreatorProtected);
        }
        let member = self
            .members
            .iter_mut()
            .find(|m| m.user == *user_id)
            .ok_or(MembershipError::NotAMember)?;
        member.role = role;
        self.touch(Utc::now());
        Ok(())
    }

    /// Refresh activity and update timestamps after a mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.updated_at = now;
    }
}
