//! web
//!
//! HTTP surface: OAuth routes, the access gate, and the `/api/v1` handlers.
//!
//! # Architecture
//!
//! Handlers see providers only through [`crate::scm::Scm`] clients handed
//! to them by the gate in a [`Caller`]. Nothing here names a concrete
//! adapter. Every error a handler returns is an [`ApiError`].

mod app;
mod courses;
mod directories;
mod error;
mod gate;
mod oauth;
mod state;
mod users;

pub use app::router;
pub use error::ApiError;
pub use gate::{resolve_caller, Caller, ScmClients};
pub use state::{session_key, AppState};

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// A 302 to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
