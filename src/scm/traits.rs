//! scm::traits
//!
//! The `Scm` trait and the types shared by every provider adapter.
//!
//! # Design
//!
//! The trait is async because every operation is a network call to the
//! provider. All methods return `Result` and map provider failures onto
//! [`ScmError`] so callers never see provider-specific error shapes.
//!
//! Provider adapters:
//! - Normalize organizations (GitHub) and groups (GitLab) into [`Directory`]
//! - Report unsupported operations as [`ScmError::NotSupported`], never as a
//!   generic failure
//! - Perform no retries; failures surface immediately
//!
//! # Example
//!
//! ```ignore
//! use agportal::scm::{Scm, ScmError};
//!
//! async fn pick_directory(scm: &dyn Scm, id: u64) -> Result<String, ScmError> {
//!     let directory = scm.get_directory(id).await?;
//!     Ok(directory.name)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from SCM operations.
///
/// Messages never include the access token used for the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScmError {
    /// No adapter exists for the requested provider name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The directory does not exist or is not visible to the token.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider has no API for this operation.
    #[error("method {method} not supported by {provider} SCM")]
    NotSupported {
        /// Provider name (e.g., "github")
        provider: String,
        /// Operation name (e.g., "CreateDirectory")
        method: String,
    },

    /// The token was rejected or lacks the required scope.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The call exceeded its deadline.
    #[error("provider call timed out")]
    Timeout,

    /// The provider answered with an error status.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ScmError {
    /// Build a `NotSupported` error for `method` on `provider`.
    pub fn not_supported(provider: impl Into<String>, method: impl Into<String>) -> Self {
        ScmError::NotSupported {
            provider: provider.into(),
            method: method.into(),
        }
    }
}

/// A provider entity able to own repositories and manage access to them.
///
/// GitHub organizations and GitLab groups both project onto this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Provider-native numeric id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Avatar URL, when the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// How a new directory should be created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CreateDirectoryOptions {
    /// URL path segment of the new directory
    pub path: String,
    /// Display name of the new directory
    pub name: String,
}

/// Common interface over source code management providers.
///
/// Implementations must be `Send + Sync`: a single client is shared by every
/// request presenting the same access token.
///
/// # Errors
///
/// - `NotFound`: the directory is absent or invisible to the token
/// - `NotSupported`: the provider cannot perform the operation
/// - `AuthFailed`: the token is invalid, expired, or under-scoped
/// - `ApiError` / `NetworkError`: the provider call failed
#[async_trait]
pub trait Scm: Send + Sync {
    /// Provider name (e.g., "github", "gitlab", "fake").
    fn name(&self) -> &'static str;

    /// List directories the token's principal administers.
    ///
    /// Order is provider-defined; callers must not rely on it.
    async fn list_directories(&self) -> Result<Vec<Directory>, ScmError>;

    /// Create a new directory.
    ///
    /// Not idempotent. Repeating a call with the same path fails or creates a
    /// duplicate depending on the provider.
    async fn create_directory(&self, opts: CreateDirectoryOptions)
        -> Result<Directory, ScmError>;

    /// Get a directory by its provider-native id.
    async fn get_directory(&self, id: u64) -> Result<Directory, ScmError>;
}
