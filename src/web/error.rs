//! web::error
//!
//! One error type for every HTTP handler, and its mapping onto status codes.
//!
//! Bodies are JSON `{"error": ..., "code": ...}` except for `NotFound`, which
//! answers with an empty body. Upstream details are logged here and replaced
//! with a generic message in the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::scm::ScmError;

/// Errors returned by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed or incomplete request; lists the offending fields.
    #[error("invalid payload: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// A request parameter is malformed.
    #[error("{0}")]
    BadRequest(String),

    /// No provider is registered under this name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The caller has no SCM client for this provider.
    #[error("provider {0} not registered")]
    ProviderNotRegistered(String),

    /// No valid session, or the session's identity is gone.
    #[error("not authenticated")]
    Unauthenticated,

    /// Login failed at the provider.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The login callback's state did not match.
    #[error("state mismatch; login aborted")]
    CsrfMismatch,

    /// The login would give the user a second identity at one provider.
    #[error("{0}")]
    Conflict(String),

    /// No such user, course, or directory.
    #[error("not found")]
    NotFound,

    /// The provider cannot perform this operation.
    #[error("method {method} not supported by {provider} SCM")]
    NotSupported { provider: String, method: String },

    /// A provider call exceeded its deadline.
    #[error("provider call timed out")]
    Timeout,

    /// Provider or storage failure. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::UnknownProvider(_)
            | ApiError::ProviderNotRegistered(_)
            | ApiError::NotSupported { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::AuthFailed(_) | ApiError::CsrfMismatch => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnknownProvider(_) => "unknown_provider",
            ApiError::ProviderNotRegistered(_) => "provider_not_registered",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::AuthFailed(_) => "auth_failed",
            ApiError::CsrfMismatch => "csrf_mismatch",
            ApiError::Conflict(_) => "identity_conflict",
            ApiError::NotFound => "not_found",
            ApiError::NotSupported { .. } => "not_supported",
            ApiError::Timeout => "timeout",
            ApiError::Upstream(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::NotFound => return status.into_response(),
            ApiError::Upstream(detail) => {
                tracing::error!(detail = %detail, "upstream failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let (provider, method) = match &self {
            ApiError::NotSupported { provider, method } => {
                (Some(provider.as_str()), Some(method.as_str()))
            }
            _ => (None, None),
        };
        let fields = match &self {
            ApiError::Validation(fields) => Some(fields.as_slice()),
            _ => None,
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
            fields,
            provider,
            method,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ScmError> for ApiError {
    fn from(err: ScmError) -> Self {
        match err {
            ScmError::UnknownProvider(p) => ApiError::UnknownProvider(p),
            ScmError::NotFound(_) => ApiError::NotFound,
            ScmError::NotSupported { provider, method } => {
                ApiError::NotSupported { provider, method }
            }
            ScmError::AuthFailed(reason) => ApiError::AuthFailed(reason),
            ScmError::Timeout => ApiError::Timeout,
            other @ (ScmError::ApiError { .. } | ScmError::NetworkError(_)) => {
                ApiError::Upstream(other.to_string())
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownProvider(p) => ApiError::UnknownProvider(p),
            AuthError::CsrfMismatch => ApiError::CsrfMismatch,
            AuthError::Timeout => ApiError::Timeout,
            AuthError::IdentityConflict(detail) => {
                ApiError::Conflict(format!("identity conflict: {detail}"))
            }
            AuthError::Storage(detail) => ApiError::Upstream(detail),
            other => ApiError::AuthFailed(other.to_string()),
        }
    }
}
