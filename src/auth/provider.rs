//! auth::provider
//!
//! The `OAuthProvider` trait and the callback/profile types it exchanges.

use async_trait::async_trait;
use serde::Deserialize;

use super::errors::AuthError;

/// Query parameters of an OAuth callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    /// Anti-CSRF state echoed back by the provider
    #[serde(default)]
    pub state: Option<String>,
    /// Authorization code
    #[serde(default)]
    pub code: Option<String>,
    /// Error code set when the user declines or the provider fails
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable error description
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// The provider-reported error, if any, as a single message.
    pub fn denial(&self) -> Option<String> {
        self.error.as_ref().map(|error| match &self.error_description {
            Some(desc) if !desc.is_empty() => format!("{}: {}", error, desc),
            _ => error.clone(),
        })
    }
}

/// A user's profile as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteProfile {
    /// Provider-native user id
    pub remote_id: u64,
    /// Login / username
    pub login: String,
    /// Display name
    pub name: Option<String>,
    /// Public email
    pub email: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// Result of a completed authorization: who the user is and their token.
#[derive(Clone, PartialEq, Eq)]
pub struct CompletedAuth {
    /// Remote profile
    pub profile: RemoteProfile,
    /// Access token for provider API calls
    pub access_token: String,
}

impl std::fmt::Debug for CompletedAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletedAuth")
            .field("profile", &self.profile)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// An OAuth2 authorization-code provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Name the provider is registered under (route segment).
    fn name(&self) -> &str;

    /// URL to redirect the user agent to, carrying `state`.
    fn begin_auth(&self, state: &str) -> Result<String, AuthError>;

    /// Exchange callback parameters for a profile and access token.
    ///
    /// # Errors
    ///
    /// - `Denied` if the callback carries an `error`
    /// - `MissingCode` if it carries no code
    /// - `Exchange` / `Profile` / `Network` if a provider call fails
    async fn complete_auth(&self, params: &CallbackParams) -> Result<CompletedAuth, AuthError>;
}
