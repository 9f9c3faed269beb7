//! web::users
//!
//! User routes. Every user leaving here is sanitized.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};

use super::error::ApiError;
use super::found;
use super::gate::Caller;
use super::state::AppState;
use crate::models::{Sanitize, User};

/// `GET /api/v1/user`: redirect to the caller's own record.
pub async fn current(Extension(caller): Extension<Caller>) -> Response {
    found(&format!("/api/v1/users/{}", caller.user.id))
}

/// `GET /api/v1/users/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = match id.parse::<u64>() {
        Ok(id) if id > 0 => id,
        _ => return Err(ApiError::BadRequest("invalid user id".to_string())),
    };
    let user = state.db.get_user(id)?;
    Ok(Json(user.sanitized()))
}

/// `GET /api/v1/users`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.get_users()?.sanitized()))
}
