//! Port abstraction for the user directory.
//!
//! The directory owns identity records; this subsystem only reads them, by
//! primary key for authorization and in bulk for member-list projections.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{Email, User, UserId, UserProfile};

/// Lookup errors raised by user directory adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserDirectoryError {
    /// Directory connection could not be established.
    #[error("user directory connection failed: {message}")]
    Connection {
        /// Adapter-specific failure description.
        message: String,
    },
    /// Query failed during execution.
    #[error("user directory query failed: {message}")]
    Query {
        /// Adapter-specific failure description.
        message: String,
    },
}

/// Read access to directory-owned identity records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError>;

    /// Fetch a user by normalised email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserDirectoryError>;

    /// Public profile projections for the given ids. Unknown ids are omitted.
    async fn find_profiles(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserProfile>, UserDirectoryError>;
}
