//! auth::oauth2
//!
//! OAuth2 authorization-code provider for GitHub and GitLab.
//!
//! # Flow
//!
//! 1. [`begin_auth`](OAuthProvider::begin_auth) builds the authorize URL with
//!    `client_id`, `redirect_uri`, `scope`, `state` and `response_type=code`
//! 2. The provider redirects back to the callback with `code` and `state`
//! 3. [`complete_auth`](OAuthProvider::complete_auth) exchanges the code at the
//!    token endpoint, then fetches the user's profile with the new token
//!
//! Both providers accept the same form-encoded token request; they differ only
//! in endpoints, scopes, and the name of the login field in the profile
//! (`login` on GitHub, `username` on GitLab).
//!
//! # Endpoints
//!
//! Endpoints are overridable for self-hosted instances and tests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::errors::AuthError;
use super::provider::{CallbackParams, CompletedAuth, OAuthProvider, RemoteProfile};

/// User-Agent header for OAuth requests.
const USER_AGENT_VALUE: &str = "agportal";

/// Provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Consent page the browser is redirected to
    pub authorize_url: String,
    /// Code exchange endpoint
    pub token_url: String,
    /// Authenticated-user profile endpoint
    pub profile_url: String,
}

impl Endpoints {
    /// github.com endpoints.
    pub fn github() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            profile_url: "https://api.github.com/user".into(),
        }
    }

    /// gitlab.com endpoints.
    pub fn gitlab() -> Self {
        Self {
            authorize_url: "https://gitlab.com/oauth/authorize".into(),
            token_url: "https://gitlab.com/oauth/token".into(),
            profile_url: "https://gitlab.com/api/v4/user".into(),
        }
    }
}

/// Authorization-code client for one provider.
#[derive(Clone)]
pub struct OAuth2Provider {
    name: String,
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    endpoints: Endpoints,
}

// Custom Debug to avoid exposing the client secret
impl std::fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl OAuth2Provider {
    /// Create a provider with explicit endpoints.
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
        scopes: &[&str],
        endpoints: Endpoints,
    ) -> Self {
        Self {
            name: name.into(),
            client: Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            endpoints,
        }
    }

    /// GitHub with scopes `user repo`.
    pub fn github(client_id: &str, client_secret: &str, redirect_url: &str) -> Self {
        Self::new(
            "github",
            client_id,
            client_secret,
            redirect_url,
            &["user", "repo"],
            Endpoints::github(),
        )
    }

    /// GitLab with scope `api`.
    pub fn gitlab(client_id: &str, client_secret: &str, redirect_url: &str) -> Self {
        Self::new(
            "gitlab",
            client_id,
            client_secret,
            redirect_url,
            &["api"],
            Endpoints::gitlab(),
        )
    }

    /// Replace the endpoints (self-hosted instances, tests).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let request = TokenRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code,
            redirect_uri: &self.redirect_url,
            grant_type: "authorization_code",
        };

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .headers(self.headers())
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // GitHub answers 200 with an error body, GitLab uses 4xx; check both shapes.
        if let Ok(token) = serde_json::from_str::<TokenResponse>(&body) {
            if status.is_success() && !token.access_token.is_empty() {
                return Ok(token.access_token);
            }
        }
        match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) => Err(AuthError::Exchange(match err.error_description {
                Some(desc) if !desc.is_empty() => format!("{}: {}", err.error, desc),
                _ => err.error,
            })),
            Err(_) => Err(AuthError::Exchange(format!(
                "unexpected response (status {})",
                status.as_u16()
            ))),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<RemoteProfile, AuthError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| AuthError::Exchange("provider returned a malformed token".into()))?;

        let response = self
            .client
            .get(&self.endpoints.profile_url)
            .headers(self.headers())
            .header(AUTHORIZATION, bearer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Profile(format!("status {}", status.as_u16())));
        }

        let user: ProfileResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Profile(format!("failed to parse profile: {}", e)))?;
        Ok(user.into())
    }
}

#[async_trait]
impl OAuthProvider for OAuth2Provider {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_auth(&self, state: &str) -> Result<String, AuthError> {
        let scope = self.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::Exchange(format!("invalid authorize URL: {}", e)))?;
        Ok(url.into())
    }

    async fn complete_auth(&self, params: &CallbackParams) -> Result<CompletedAuth, AuthError> {
        if let Some(denial) = params.denial() {
            return Err(AuthError::Denied(denial));
        }
        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let access_token = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        Ok(CompletedAuth {
            profile,
            access_token,
        })
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    id: u64,
    #[serde(alias = "username")]
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<ProfileResponse> for RemoteProfile {
    fn from(p: ProfileResponse) -> Self {
        RemoteProfile {
            remote_id: p.id,
            login: p.login,
            name: p.name.filter(|s| !s.is_empty()),
            email: p.email.filter(|s| !s.is_empty()),
            avatar_url: p.avatar_url.filter(|s| !s.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoints_for(server: &MockServer) -> Endpoints {
        Endpoints {
            authorize_url: format!("{}/login/oauth/authorize", server.uri()),
            token_url: format!("{}/login/oauth/access_token", server.uri()),
            profile_url: format!("{}/user", server.uri()),
        }
    }

    fn callback(code: &str) -> CallbackParams {
        CallbackParams {
            state: Some("s".into()),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    mod begin_auth {
        use super::*;

        #[test]
        fn github_authorize_url_carries_state_and_scopes() {
            let provider = OAuth2Provider::github(
                "cid",
                "secret",
                "https://ag.example.com/auth/github/callback",
            );
            let url = Url::parse(&provider.begin_auth("abc123").unwrap()).unwrap();

            assert_eq!(url.host_str(), Some("github.com"));
            assert_eq!(url.path(), "/login/oauth/authorize");
            let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
            assert_eq!(query["client_id"], "cid");
            assert_eq!(query["state"], "abc123");
            assert_eq!(query["scope"], "user repo");
            assert_eq!(query["response_type"], "code");
            assert_eq!(
                query["redirect_uri"],
                "https://ag.example.com/auth/github/callback"
            );
        }

        #[test]
        fn gitlab_uses_api_scope() {
            let provider = OAuth2Provider::gitlab("cid", "secret", "https://x/auth/gitlab/callback");
            let url = Url::parse(&provider.begin_auth("s").unwrap()).unwrap();
            assert_eq!(url.host_str(), Some("gitlab.com"));
            assert!(url.query_pairs().any(|(k, v)| k == "scope" && v == "api"));
        }

        #[test]
        fn debug_redacts_client_secret() {
            let provider = OAuth2Provider::github("cid", "very-secret", "https://x/cb");
            let debug = format!("{:?}", provider);
            assert!(debug.contains("cid"));
            assert!(!debug.contains("very-secret"));
        }
    }

    mod complete_auth {
        use super::*;

        #[tokio::test]
        async fn exchanges_code_and_fetches_github_profile() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/login/oauth/access_token"))
                .and(body_string_contains("code=the-code"))
                .and(body_string_contains("grant_type=authorization_code"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "gho_new",
                    "token_type": "bearer",
                    "scope": "repo,user"
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/user"))
                .and(header("authorization", "Bearer gho_new"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": 583231,
                    "login": "octocat",
                    "name": "The Octocat",
                    "email": null,
                    "avatar_url": "https://avatars.example.com/u/583231"
                })))
                .mount(&server)
                .await;

            let provider = OAuth2Provider::github("cid", "secret", "https://x/cb")
                .with_endpoints(endpoints_for(&server));
            let done = provider.complete_auth(&callback("the-code")).await.unwrap();

            assert_eq!(done.access_token, "gho_new");
            assert_eq!(done.profile.remote_id, 583231);
            assert_eq!(done.profile.login, "octocat");
            assert_eq!(done.profile.name.as_deref(), Some("The Octocat"));
            assert_eq!(done.profile.email, None);
        }

        #[tokio::test]
        async fn gitlab_profile_uses_username() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/login/oauth/access_token"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({"access_token": "glpat"})),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/user"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": 7, "username": "gitlab-user", "name": "G User"
                })))
                .mount(&server)
                .await;

            let provider = OAuth2Provider::gitlab("cid", "secret", "https://x/cb")
                .with_endpoints(endpoints_for(&server));
            let done = provider.complete_auth(&callback("c")).await.unwrap();
            assert_eq!(done.profile.login, "gitlab-user");
            assert_eq!(done.profile.remote_id, 7);
        }

        #[tokio::test]
        async fn error_body_with_200_is_an_exchange_failure() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/login/oauth/access_token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "error": "bad_verification_code",
                    "error_description": "The code passed is incorrect or expired."
                })))
                .mount(&server)
                .await;

            let provider = OAuth2Provider::github("cid", "secret", "https://x/cb")
                .with_endpoints(endpoints_for(&server));
            let err = provider.complete_auth(&callback("stale")).await.unwrap_err();
            assert_eq!(
                err,
                AuthError::Exchange(
                    "bad_verification_code: The code passed is incorrect or expired.".into()
                )
            );
        }

        #[tokio::test]
        async fn profile_failure_is_reported() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/login/oauth/access_token"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "t"})),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/user"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let provider = OAuth2Provider::github("cid", "secret", "https://x/cb")
                .with_endpoints(endpoints_for(&server));
            let err = provider.complete_auth(&callback("c")).await.unwrap_err();
            assert_eq!(err, AuthError::Profile("status 401".into()));
        }

        #[tokio::test]
        async fn denial_short_circuits_without_network() {
            let provider = OAuth2Provider::github("cid", "secret", "https://x/cb").with_endpoints(
                Endpoints {
                    authorize_url: "http://127.0.0.1:1/a".into(),
                    token_url: "http://127.0.0.1:1/t".into(),
                    profile_url: "http://127.0.0.1:1/u".into(),
                },
            );
            let params = CallbackParams {
                error: Some("access_denied".into()),
                ..Default::default()
            };
            assert_eq!(
                provider.complete_auth(&params).await,
                Err(AuthError::Denied("access_denied".into()))
            );
        }

        #[tokio::test]
        async fn missing_code_is_rejected() {
            let provider = OAuth2Provider::github("cid", "secret", "https://x/cb");
            let params = CallbackParams {
                state: Some("s".into()),
                ..Default::default()
            };
            assert_eq!(
                provider.complete_auth(&params).await,
                Err(AuthError::MissingCode)
            );
        }
    }
}
