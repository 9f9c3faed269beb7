//! db
//!
//! Persistence interface for users, remote identities, and courses.
//!
//! # Architecture
//!
//! Request handling talks to storage only through the [`Database`] trait.
//! [`MemoryDatabase`] is the bundled implementation; a relational backend
//! plugs in behind the same trait.
//!
//! # Invariants
//!
//! Implementations must enforce:
//! - at most one remote identity per `(provider, remote_id)` system-wide
//! - at most one remote identity per `(user, provider)`
//! - course creation and the creator's enrollment happen together or not at all
//!
//! # Security
//!
//! Error messages never include access tokens.

mod memory;

pub use memory::MemoryDatabase;

use thiserror::Error;

use crate::models::{Course, RemoteIdentity, User};

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// No record matches.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The write would violate a uniqueness invariant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("database error: {0}")]
    Internal(String),
}

/// Storage operations used by the login flow and the API.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait Database: Send + Sync {
    /// Get a user, including their remote identities.
    fn get_user(&self, id: u64) -> Result<User, DbError>;

    /// Get all users, ordered by id.
    fn get_users(&self) -> Result<Vec<User>, DbError>;

    /// Find the user owning the identity `(provider, remote_id)`.
    fn get_user_by_remote_identity(&self, provider: &str, remote_id: u64)
        -> Result<User, DbError>;

    /// Store a new user together with their first remote identity.
    ///
    /// Ids in the arguments are ignored and assigned by the store.
    fn create_user_from_remote_identity(
        &self,
        user: User,
        identity: RemoteIdentity,
    ) -> Result<User, DbError>;

    /// Attach another provider's identity to an existing user.
    fn add_remote_identity(&self, user_id: u64, identity: RemoteIdentity)
        -> Result<User, DbError>;

    /// Replace the access token of `(provider, remote_id)`.
    fn update_access_token(
        &self,
        provider: &str,
        remote_id: u64,
        access_token: &str,
    ) -> Result<(), DbError>;

    /// Store a course and enroll its creator.
    fn create_course(&self, course: Course, creator_id: u64) -> Result<Course, DbError>;

    /// Get all courses, ordered by id.
    fn get_courses(&self) -> Result<Vec<Course>, DbError>;

    /// Get the courses `user_id` is enrolled in, ordered by id.
    fn get_courses_for_user(&self, user_id: u64) -> Result<Vec<Course>, DbError>;
}
