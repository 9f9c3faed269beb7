//! scm::gitlab
//!
//! GitLab adapter: groups are directories.
//!
//! # Design
//!
//! Uses the v4 REST API:
//! - `GET /groups?min_access_level=50` lists groups the user owns
//! - `POST /groups` creates a group
//! - `GET /groups/{id}` fetches a group; a 403 there reads as `NotFound`
//!
//! Creating a group with a path that already exists is rejected by GitLab
//! with a 400, surfaced unchanged as an `ApiError`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{CreateDirectoryOptions, Directory, Scm, ScmError};

/// Default GitLab API base URL.
const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// Owner access level.
const OWNER_ACCESS_LEVEL: u32 = 50;

/// GitLab SCM client bound to a single access token.
#[derive(Clone)]
pub struct GitLabScm {
    /// HTTP client for making requests
    client: Client,
    /// OAuth access token
    token: String,
    /// API base URL (for self-hosted GitLab)
    api_base: String,
}

impl std::fmt::Debug for GitLabScm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabScm")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitLabScm {
    /// Create a GitLab client for `token` against gitlab.com.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a GitLab client with a custom API base URL.
    ///
    /// Use this for self-hosted GitLab (`https://gitlab.example.com/api/v4`).
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
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("agportal"));
        Ok(headers)
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ScmError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| ScmError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        });
    }

    // GitLab reports errors as {"message": ...} or {"error": ...}; message may be an object.
    let message = match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("message")
            .or_else(|| body.get("error"))
            .map(|m| match m {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "Unknown error".to_string()),
        Err(_) => "Unknown error".to_string(),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => ScmError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN => ScmError::AuthFailed(format!("Permission denied: {}", message)),
        StatusCode::NOT_FOUND => ScmError::NotFound(message),
        _ if status.is_server_error() => ScmError::ApiError {
            status: status.as_u16(),
            message: format!("GitLab server error: {}", message),
        },
        _ => ScmError::ApiError {
            status: status.as_u16(),
            message,
        },
    })
}

fn network(e: reqwest::Error) -> ScmError {
    ScmError::NetworkError(e.without_url().to_string())
}

#[async_trait]
impl Scm for GitLabScm {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn list_directories(&self) -> Result<Vec<Directory>, ScmError> {
        let response = self
            .client
            .get(self.url("groups"))
            .headers(self.headers()?)
            .query(&[
                ("min_access_level", OWNER_ACCESS_LEVEL.to_string()),
                ("per_page", "100".to_string()),
            ])
            .send()
            .await
            .map_err(network)?;

        let groups: Vec<GitLabGroup> = handle_response(response).await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    async fn create_directory(&self, opts: CreateDirectoryOptions) -> Result<Directory, ScmError> {
        let body = CreateGroupBody {
            name: &opts.name,
            path: &opts.path,
        };
        let response = self
            .client
            .post(self.url("groups"))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        let group: GitLabGroup = handle_response(response).await?;
        Ok(group.into())
    }

    async fn get_directory(&self, id: u64) -> Result<Directory, ScmError> {
        let response = self
            .client
            .get(self.url(&format!("groups/{}", id)))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(ScmError::NotFound(format!("group {}", id)));
        }

        let group: GitLabGroup = handle_response(response).await?;
        Ok(group.into())
    }
}

// =============================================================================
// GitLab API types
// =============================================================================

#[derive(Serialize)]
struct CreateGroupBody<'a> {
    name: &'a str,
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitLabGroup {
    id: u64,
    name: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<GitLabGroup> for Directory {
    fn from(group: GitLabGroup) -> Self {
        Directory {
            id: group.id,
            name: group.name,
            avatar: group.avatar_url.filter(|a| !a.is_empty()),
        }
    }
}
