//! User identity records and their validation rules.
//!
//! The directory owns these records; communities reference them by id only.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Error, ErrorCode};

/// Validation errors raised by the user value-type constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Identifier was empty or not a valid UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
    /// Username was blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Username was shorter than the minimum length.
    #[error("username must be at least {USERNAME_MIN} characters")]
    UsernameTooShort,
    /// Username was longer than the maximum length.
    #[error("username must be at most {USERNAME_MAX} characters")]
    UsernameTooLong,
    /// Username contained characters outside `[a-z0-9._-]`.
    #[error("username may only contain lowercase letters, digits, dots, dashes, or underscores")]
    UsernameInvalidCharacters,
    /// Email did not match the `local@domain.tld` shape.
    #[error("email address is not valid")]
    InvalidEmail,
}

impl From<UserValidationError> for Error {
    fn from(err: UserValidationError) -> Self {
        Self::new(ErrorCode::InvalidRequest, err.to_string())
    }
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Parse and validate a [`UserId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Uuid::parse_str(id.as_ref())
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Minimum allowed length for a username.
pub const USERNAME_MIN: usize = 3;
/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 30;

/// Unique handle, normalised to lowercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Trim, lowercase, and validate a raw username.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if normalised.chars().count() < USERNAME_MIN {
            return Err(UserValidationError::UsernameTooShort);
        }
        if normalised.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong);
        }
        if !normalised
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
        {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address, normalised to lowercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Trim, lowercase, and validate a raw email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(UserValidationError::InvalidEmail);
        };
        let shape_ok = !local.is_empty()
            && !domain.is_empty()
            && domain.contains('.')
            && !normalised.chars().any(char::is_whitespace)
            && !domain.contains('@');
        if !shape_ok {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Platform-wide role claim carried in auth tokens.
///
/// Independent of per-community [`MemberRole`](super::MemberRole): a platform
/// admin has no special privileges inside a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRole {
    /// Regular account.
    User,
    /// Platform operator with access to admin-only routes.
    Admin,
}

/// Opaque credential material, as produced by the (external) hasher.
pub type PasswordHash = String;

/// Directory-owned identity record.
///
/// Never hard-deleted by this subsystem; deactivation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Unique lowercase handle.
    pub username: Username,
    /// Unique lowercase email.
    pub email: Email,
    /// Absent for externally-authenticated identities.
    pub password_hash: Option<PasswordHash>,
    /// Subject identifier at the external identity provider, if any.
    pub external_subject: Option<String>,
    /// Platform-wide role.
    pub role: PlatformRole,
    /// Soft-deactivation flag; inactive users cannot authenticate.
    pub is_active: bool,
    /// Name shown to other members.
    pub display_name: String,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Free-form profile text.
    pub bio: Option<String>,
    /// Timestamp of the most recent login.
    pub last_login: DateTime<Utc>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Construct an active record with the given identity fields.
    pub fn new(id: UserId, username: Username, email: Email, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            email,
            password_hash: None,
            external_subject: None,
            role: PlatformRole::User,
            is_active: true,
            display_name: display_name.into(),
            avatar: None,
            bio: None,
            last_login: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fields safe to expose to other members.
    pub fn public_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.display_name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
        }
    }

    /// Whether the profile is complete enough to create or join communities.
    pub fn has_complete_profile(&self) -> bool {
        !self.display_name.trim().is_empty()
    }

    /// Resolve the stored password credential for a password login attempt.
    ///
    /// Accounts provisioned through an external identity provider have no
    /// password credential; the attempt fails before any comparison runs.
    pub fn password_credential(&self) -> Result<&PasswordHash, Error> {
        self.password_hash.as_ref().ok_or_else(|| {
            Error::invalid_request("This account uses external login; password login is unavailable")
        })
    }
}

/// Public profile projection embedded in community payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique handle.
    pub username: Username,
    /// Contact address.
    pub email: Email,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Free-form profile text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_user() -> User {
        User::new(
            UserId::random(),
            Username::new("ada.l").expect("valid username"),
            Email::new("ada@example.com").expect("valid email"),
            "Ada Lovelace",
        )
    }

    #[rstest]
    #[case("", UserValidationError::EmptyUsername)]
    #[case("  ", UserValidationError::EmptyUsername)]
    #[case("ab", UserValidationError::UsernameTooShort)]
    #[case("has space", UserValidationError::UsernameInvalidCharacters)]
    #[case("p@t", UserValidationError::UsernameInvalidCharacters)]
    fn invalid_usernames_are_rejected(#[case] raw: &str, #[case] expected: UserValidationError) {
        let err = Username::new(raw).expect_err("invalid username must fail");
        assert_eq!(err, expected);
    }

    #[test]
    fn usernames_are_lowercased_and_trimmed() {
        let username = Username::new("  GreenThumb_7  ").expect("valid username");
        assert_eq!(username.as_ref(), "greenthumb_7");
    }

    #[rstest]
    #[case("plainaddress")]
    #[case("no@tld")]
    #[case("two@@example.com")]
    #[case("spaced name@example.com")]
    fn invalid_emails_are_rejected(#[case] raw: &str) {
        assert_eq!(
            Email::new(raw).expect_err("invalid email must fail"),
            UserValidationError::InvalidEmail
        );
    }

    #[test]
    fn emails_are_normalised_to_lowercase() {
        let email = Email::new(" Ada@Example.COM ").expect("valid email");
        assert_eq!(email.as_ref(), "ada@example.com");
    }

    #[test]
    fn external_accounts_refuse_password_login() {
        let mut user = sample_user();
        user.external_subject = Some("google:123".into());

        let err = user.password_credential().expect_err("must not compare");
        assert_eq!(err.code(), crate::domain::ErrorCode::InvalidRequest);
        assert!(err.message().contains("external login"));
    }

    #[test]
    fn stored_credential_is_returned_for_password_accounts() {
        let mut user = sample_user();
        user.password_hash = Some("argon2-opaque".into());

        assert_eq!(
            user.password_credential().expect("credential present"),
            "argon2-opaque"
        );
    }

    #[test]
    fn blank_display_name_is_an_incomplete_profile() {
        let mut user = sample_user();
        assert!(user.has_complete_profile());
        user.display_name = "   ".into();
        assert!(!user.has_complete_profile());
    }
}
