//! web::directories
//!
//! `POST /api/v1/directories` lists the directories reachable with the
//! caller's token. The body is optional; `{"provider": "gitlab"}` selects one
//! of the caller's other identities instead of the login provider.

use axum::body::Bytes;
use axum::{Extension, Json};
use serde::Deserialize;

use super::error::ApiError;
use super::gate::Caller;
use crate::scm::{bounded, Directory};

#[derive(Debug, Default, Deserialize)]
struct DirectoriesRequest {
    #[serde(default)]
    provider: Option<String>,
}

/// `POST /api/v1/directories`
pub async fn list(
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<Vec<Directory>>, ApiError> {
    let request: DirectoriesRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DirectoriesRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| ApiError::Validation(vec!["provider".to_string()]))?
    };

    let client = match request.provider.as_deref() {
        Some(provider) => caller.clients.get(provider)?,
        None => caller.login_client()?,
    };
    let directories = bounded(client.list_directories()).await?;
    Ok(Json(directories))
}
