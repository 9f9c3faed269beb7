//! scm::github
//!
//! GitHub adapter: organizations are directories.
//!
//! # Design
//!
//! Uses the REST API only:
//! - `GET /user/memberships/orgs` lists organizations the user administers
//! - `GET /organizations/{id}` fetches an organization by numeric id; a 403
//!   there means the token cannot see the organization and reads as `NotFound`
//!
//! GitHub offers no API for creating organizations, so `create_directory`
//! returns [`ScmError::NotSupported`].
//!
//! # Rate Limiting
//!
//! A 429 or a rate-limit 403 surfaces as an `ApiError`; no retry is attempted.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::traits::{CreateDirectoryOptions, Directory, Scm, ScmError};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "agportal";

/// Page size for list calls.
const PER_PAGE: u32 = 100;

/// GitHub SCM client bound to a single access token.
pub struct GitHubScm {
    /// HTTP client for making requests
    client: Client,
    /// OAuth access token
    token: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubScm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubScm")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitHubScm {
    /// Create a GitHub client for `token` against api.github.com.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a GitHub client with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn headers(&self) -> Result<HeaderMap, ScmError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ScmError::AuthFailed("access token is not a valid header".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    async fn get(&self, url: String) -> Result<Response, ScmError> {
        self.client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ScmError::NetworkError(e.without_url().to_string()))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, ScmError> {
        handle_response(self.get(url).await?).await
    }
}

fn is_rate_limited(response: &Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .is_some_and(|v| v.as_bytes() == b"0")
}

/// Map a GitHub response to a value or an [`ScmError`].
async fn handle_response<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ScmError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| ScmError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        });
    }

    let rate_limited = is_rate_limited(&response);
    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => ScmError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN if rate_limited => ScmError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub rate limit exceeded: {}", message),
        },
        StatusCode::FORBIDDEN => ScmError::AuthFailed(format!("Permission denied: {}", message)),
        StatusCode::NOT_FOUND => ScmError::NotFound(message),
        _ if status.is_server_error() => ScmError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => ScmError::ApiError {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl Scm for GitHubScm {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_directories(&self) -> Result<Vec<Directory>, ScmError> {
        let url = self.url(&format!(
            "user/memberships/orgs?state=active&per_page={}",
            PER_PAGE
        ));
        let memberships: Vec<GitHubMembership> = self.get_json(url).await?;

        Ok(memberships
            .into_iter()
            .filter(|m| m.role == "admin")
            .map(|m| m.organization.into())
            .collect())
    }

    async fn create_directory(
        &self,
        _opts: CreateDirectoryOptions,
    ) -> Result<Directory, ScmError> {
        Err(ScmError::not_supported(self.name(), "CreateDirectory"))
    }

    async fn get_directory(&self, id: u64) -> Result<Directory, ScmError> {
        let response = self.get(self.url(&format!("organizations/{}", id))).await?;
        if response.status() == StatusCode::FORBIDDEN && !is_rate_limited(&response) {
            return Err(ScmError::NotFound(format!("organization {}", id)));
        }
        let org: GitHubOrganization = handle_response(response).await?;
        Ok(org.into())
    }
}

// =============================================================================
// GitHub API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GitHubMembership {
    role: String,
    organization: GitHubOrganization,
}

#[derive(Debug, Deserialize)]
struct GitHubOrganization {
    id: u64,
    login: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<GitHubOrganization> for Directory {
    fn from(org: GitHubOrganization) -> Self {
        Directory {
            id: org.id,
            name: org.login,
            avatar: org.avatar_url.filter(|a| !a.is_empty()),
        }
    }
}
