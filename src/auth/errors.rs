//! auth::errors
//!
//! Error types for the OAuth login flow.
//!
//! # Design
//!
//! Error messages never contain access tokens, authorization codes, or state
//! values. Provider error descriptions are passed through because they are
//! written for the end user.
//!
//! # Example
//!
//! ```
//! use agportal::auth::AuthError;
//!
//! let err = AuthError::UnknownProvider("bitbucket".to_string());
//! assert_eq!(err.to_string(), "unknown provider: bitbucket");
//! assert!(!err.clears_session());
//! assert!(AuthError::CsrfMismatch.clears_session());
//! ```

use thiserror::Error;

use crate::db::DbError;

/// Errors from the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No provider is registered under this name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The callback's state does not match the one stored at login begin,
    /// or no login was pending.
    #[error("state mismatch; login aborted")]
    CsrfMismatch,

    /// The provider reported an error on the callback (e.g. consent declined).
    #[error("provider denied authorization: {0}")]
    Denied(String),

    /// The callback carried no authorization code.
    #[error("callback is missing the authorization code")]
    MissingCode,

    /// Exchanging the authorization code for a token failed.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// Fetching the remote profile with a fresh token failed.
    #[error("could not fetch remote profile: {0}")]
    Profile(String),

    /// The provider call exceeded its deadline.
    #[error("provider call timed out")]
    Timeout,

    /// Network error talking to the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The logged-in user already holds a different identity at this provider.
    #[error("identity conflict: {0}")]
    IdentityConflict(String),

    /// Reading or writing the user record failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Whether the login attempt must discard the pending session.
    ///
    /// Everything except an unknown provider name happens after a login was
    /// begun, so the pending state is replaced (see
    /// [`LoginState::after_failed_callback`](super::LoginState::after_failed_callback)).
    pub fn clears_session(&self) -> bool {
        !matches!(self, AuthError::UnknownProvider(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.without_url().to_string())
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(detail) => AuthError::IdentityConflict(detail),
            other => AuthError::Storage(other.to_string()),
        }
    }
}
