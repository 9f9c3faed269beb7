//! web::app
//!
//! Router assembly and the cross-cutting layers.
//!
//! # Routes
//!
//! ```text
//! GET  /auth/{provider}             begin login
//! GET  /auth/{provider}/callback    complete login
//! GET  /logout
//! GET  /app, /app/*                 single-page entry point
//! /api/v1/*                         behind the access gate
//! ```
//!
//! Layers, outermost first: request log, security headers, panic containment.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::FutureExt;

use super::error::ApiError;
use super::gate::require_caller;
use super::state::AppState;
use super::{courses, directories, oauth, users};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/user", get(users::current))
        .route("/users", get(users::list))
        .route("/users/{id}", get(users::get))
        .route("/courses", get(courses::list).post(courses::create))
        .route("/directories", post(directories::list))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_caller));

    let router = Router::new()
        .route("/auth/{provider}", get(oauth::login))
        .route("/auth/{provider}/callback", get(oauth::callback))
        .route("/logout", get(oauth::logout))
        .route("/app", get(app_entry))
        .route("/app/{*rest}", get(app_entry))
        .nest("/api/v1", api)
        .with_state(state);

    with_layers(router)
}

fn with_layers(router: Router) -> Router {
    router
        .layer(middleware::from_fn(catch_panic))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(log_requests))
}

async fn app_entry(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.entry_point).await {
        Ok(html) => ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response(),
        Err(e) => {
            tracing::debug!(path = %state.entry_point.display(), error = %e, "entry point unavailable");
            ApiError::NotFound.into_response()
        }
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    response
}

async fn catch_panic(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            ApiError::Upstream(format!("handler panicked: {}", message)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum_extra::extract::cookie::Key;
    use tower::ServiceExt;

    use crate::auth::ProviderRegistry;
    use crate::db::MemoryDatabase;
    use crate::scm::ProviderScmFactory;

    fn state_with_entry(entry_point: std::path::PathBuf) -> AppState {
        AppState::new(
            Arc::new(MemoryDatabase::new()),
            ProviderRegistry::new(),
            Arc::new(ProviderScmFactory::new()),
            Key::generate(),
            entry_point,
        )
    }

    fn state() -> AppState {
        state_with_entry("/nonexistent/index.html".into())
    }

    async fn send(app: Router, uri: &str) -> Response {
        let request = match Request::builder().uri(uri).body(Body::empty()) {
            Ok(request) => request,
            Err(e) => panic!("request: {e}"),
        };
        match app.oneshot(request).await {
            Ok(response) => response,
            Err(e) => panic!("oneshot: {e}"),
        }
    }

    async fn body(response: Response) -> String {
        match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => panic!("body: {e}"),
        }
    }

    mod layers {
        use super::*;

        #[tokio::test]
        async fn security_headers_on_every_response() {
            let response = send(router(state()), "/no-such-route").await;
            let headers = response.headers();
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
            assert_eq!(headers[header::X_XSS_PROTECTION], "1; mode=block");
        }

        #[tokio::test]
        async fn panicking_handler_returns_500() {
            async fn boom() -> &'static str {
                panic!("boom")
            }
            let app = with_layers(Router::new().route("/boom", get(boom)));
            let response = send(app, "/boom").await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!body(response).await.contains("boom"));
        }
    }

    mod gate {
        use super::*;

        #[tokio::test]
        async fn api_requires_session() {
            for uri in ["/api/v1/user", "/api/v1/users", "/api/v1/users/1", "/api/v1/courses"] {
                let response = send(router(state()), uri).await;
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
                assert!(body(response).await.contains("unauthenticated"));
            }
        }
    }

    mod auth_routes {
        use super::*;

        #[tokio::test]
        async fn unknown_provider_is_400() {
            let response = send(router(state()), "/auth/bitbucket").await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body(response).await.contains("unknown_provider"));
        }

        #[tokio::test]
        async fn logout_redirects_home() {
            let response = send(router(state()), "/logout").await;
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[header::LOCATION], "/");
        }
    }

    mod entry_point {
        use super::*;

        #[tokio::test]
        async fn serves_index_for_app_paths() {
            let dir = match tempfile::tempdir() {
                Ok(dir) => dir,
                Err(e) => panic!("tempdir: {e}"),
            };
            let index = dir.path().join("index.html");
            if let Err(e) = std::fs::write(&index, "<html>portal</html>") {
                panic!("write: {e}");
            }

            for uri in ["/app", "/app/courses/3"] {
                let response = send(router(state_with_entry(index.clone())), uri).await;
                assert_eq!(response.status(), StatusCode::OK, "{uri}");
                assert_eq!(
                    response.headers()[header::CONTENT_TYPE],
                    "text/html; charset=utf-8"
                );
                assert_eq!(body(response).await, "<html>portal</html>");
            }
        }

        #[tokio::test]
        async fn missing_index_is_404() {
            let response = send(router(state()), "/app").await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}
