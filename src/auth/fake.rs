//! auth::fake
//!
//! Deterministic OAuth provider that never touches the network.
//!
//! `begin_auth` redirects straight to the provider's own callback with the
//! state and a fixed code, so a browser completes the whole login round trip
//! locally. `complete_auth` accepts only that code and returns a canned
//! profile and token.
//!
//! The provider can be registered under any name. Tests register it as
//! `github` to drive the real route names.

use async_trait::async_trait;
use reqwest::Url;

use super::errors::AuthError;
use super::provider::{CallbackParams, CompletedAuth, OAuthProvider, RemoteProfile};

/// The only authorization code the fake accepts.
pub const FAKE_CODE: &str = "fake-code";

/// Fake provider.
#[derive(Clone)]
pub struct FakeOAuthProvider {
    name: String,
    callback_url: String,
    profile: RemoteProfile,
    access_token: String,
}

impl std::fmt::Debug for FakeOAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeOAuthProvider")
            .field("name", &self.name)
            .field("callback_url", &self.callback_url)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl FakeOAuthProvider {
    /// Create a fake registered as `name` that redirects to `callback_url`.
    pub fn new(name: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callback_url: callback_url.into(),
            profile: RemoteProfile {
                remote_id: 1,
                login: "fake-user".into(),
                name: Some("Fake User".into()),
                email: Some("fake@example.com".into()),
                avatar_url: None,
            },
            access_token: "fake-token".into(),
        }
    }

    /// Return `profile` from completed logins.
    pub fn with_profile(mut self, profile: RemoteProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Return `token` from completed logins.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_auth(&self, state: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.callback_url,
            &[("state", state), ("code", FAKE_CODE)],
        )
        .map_err(|e| AuthError::Exchange(format!("invalid callback URL: {}", e)))?;
        Ok(url.into())
    }

    async fn complete_auth(&self, params: &CallbackParams) -> Result<CompletedAuth, AuthError> {
        if let Some(denial) = params.denial() {
            return Err(AuthError::Denied(denial));
        }
        match params.code.as_deref() {
            None | Some("") => Err(AuthError::MissingCode),
            Some(FAKE_CODE) => Ok(CompletedAuth {
                profile: self.profile.clone(),
                access_token: self.access_token.clone(),
            }),
            Some(_) => Err(AuthError::Exchange("bad_verification_code".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> FakeOAuthProvider {
        FakeOAuthProvider::new("fake", "https://localhost/auth/fake/callback")
    }

    #[test]
    fn begin_redirects_to_own_callback() {
        let url = Url::parse(&provider().begin_auth("st4te").unwrap()).unwrap();
        assert_eq!(url.path(), "/auth/fake/callback");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("state".into(), "st4te".into())));
        assert!(pairs.contains(&("code".into(), FAKE_CODE.into())));
    }

    #[tokio::test]
    async fn complete_returns_canned_identity() {
        let fake = provider().with_token("tok-9").with_profile(RemoteProfile {
            remote_id: 9,
            login: "nine".into(),
            ..Default::default()
        });
        let done = fake
            .complete_auth(&CallbackParams {
                state: Some("s".into()),
                code: Some(FAKE_CODE.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(done.access_token, "tok-9");
        assert_eq!(done.profile.remote_id, 9);
    }

    #[tokio::test]
    async fn complete_rejects_other_codes() {
        let err = provider()
            .complete_auth(&CallbackParams {
                code: Some("forged".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Exchange(_)));
    }

    #[tokio::test]
    async fn complete_reports_denial() {
        let err = provider()
            .complete_auth(&CallbackParams {
                error: Some("access_denied".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Denied("access_denied".into()));
    }

    #[test]
    fn debug_redacts_token() {
        let fake = provider().with_token("secret-token");
        assert!(!format!("{:?}", fake).contains("secret-token"));
    }
}
