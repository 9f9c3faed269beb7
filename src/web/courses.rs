//! web::courses
//!
//! Course routes.
//!
//! Creation verifies the directory through the caller's own token before
//! anything is stored. A failed lookup leaves no course behind.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::error::ApiError;
use super::gate::Caller;
use super::state::AppState;
use crate::models::{Course, NewCourseRequest};
use crate::scm::bounded;

/// Query of `GET /api/v1/courses`.
#[derive(Debug, Default, Deserialize)]
pub struct CoursesQuery {
    /// Only courses this user is enrolled in; absent or `0` means all.
    pub user: Option<String>,
}

impl CoursesQuery {
    fn user_filter(&self) -> Result<Option<u64>, ApiError> {
        match self.user.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => Ok(None),
                Ok(id) => Ok(Some(id)),
                Err(_) => Err(ApiError::Validation(vec!["user".to_string()])),
            },
        }
    }
}

/// `GET /api/v1/courses`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CoursesQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = match query.user_filter()? {
        Some(user_id) => state.db.get_courses_for_user(user_id)?,
        None => state.db.get_courses()?,
    };
    Ok(Json(courses))
}

/// `POST /api/v1/courses`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<NewCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected course payload");
        ApiError::Validation(vec!["body".to_string()])
    })?;
    request.validate().map_err(ApiError::Validation)?;

    let client = caller.clients.get(&request.provider)?;
    let directory = bounded(client.get_directory(request.directory_id)).await?;

    let course = state
        .db
        .create_course(request.into_course(directory.id), caller.user.id)?;
    tracing::info!(
        course_id = course.id,
        user_id = caller.user.id,
        provider = %course.provider,
        directory = %directory.name,
        "course created"
    );
    Ok((StatusCode::CREATED, Json(course)))
}
