//! models
//!
//! Records shared by the database, the login flow, and the HTTP layer.
//!
//! # Security
//!
//! [`RemoteIdentity`] carries a provider access token. Any value that crosses
//! the API boundary is passed through [`Sanitize`] first, which drops every
//! remote identity. The token field is additionally never serialized and is
//! redacted from `Debug`.

mod course;
mod sanitize;

pub use course::{Course, NewCourseRequest};
pub use sanitize::Sanitize;

use serde::{Deserialize, Serialize};

/// A local user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Local id (> 0 once stored)
    pub id: u64,
    /// Administrator flag
    #[serde(default)]
    pub is_admin: bool,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: String,
    /// Identities at external providers
    #[serde(default)]
    pub remote_identities: Vec<RemoteIdentity>,
}

impl User {
    /// The identity this user holds at `provider`, if any.
    pub fn identity(&self, provider: &str) -> Option<&RemoteIdentity> {
        self.remote_identities
            .iter()
            .find(|ri| ri.provider == provider)
    }
}

/// A user's identity at one provider, with that provider's access token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Local id
    pub id: u64,
    /// Provider name ("github", "gitlab", "fake")
    pub provider: String,
    /// Provider-native user id
    pub remote_id: u64,
    /// OAuth access token
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// Owning user
    pub user_id: u64,
}

impl std::fmt::Debug for RemoteIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteIdentity")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("remote_id", &self.remote_id)
            .field("access_token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// A group of users within a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Local id
    pub id: u64,
    /// Course the group belongs to
    pub course_id: u64,
    /// Members
    #[serde(default)]
    pub users: Vec<User>,
}
