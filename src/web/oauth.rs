//! web::oauth
//!
//! Login, callback, and logout routes.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;

use super::error::ApiError;
use super::found;
use super::state::AppState;
use crate::auth::{CallbackParams, LoginState};
use crate::session::{self, Session};

/// `GET /auth/{provider}`: store a pending login and redirect to consent.
pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Response), ApiError> {
    let current = session::login_state(&jar);
    let redirect = state.flow.begin(&current, &provider)?;
    let jar = session::put(jar, &Session::new(redirect.state))
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok((jar, found(&redirect.url)))
}

/// `GET /auth/{provider}/callback`: finish the login and start a fresh session.
///
/// Failures after a login was begun reset the session to anonymous, except a
/// refused identity link, which restores the login it was begun from.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: PrivateCookieJar,
) -> Response {
    let current = session::login_state(&jar);
    match state.flow.complete(&current, &provider, &params).await {
        Ok(login) => match session::put(jar, &Session::new(login)) {
            Ok(jar) => (jar, found("/")).into_response(),
            Err(e) => ApiError::Upstream(e.to_string()).into_response(),
        },
        Err(e) => {
            tracing::info!(provider = %provider, error = %e, "login failed");
            let jar = if e.clears_session() {
                reset(jar, current.after_failed_callback(&e))
            } else {
                jar
            };
            (jar, ApiError::from(e)).into_response()
        }
    }
}

fn reset(jar: PrivateCookieJar, login: LoginState) -> PrivateCookieJar {
    if login == LoginState::Anonymous {
        return session::clear(jar);
    }
    match session::put(jar.clone(), &Session::new(login)) {
        Ok(jar) => jar,
        Err(e) => {
            tracing::warn!(error = %e, "could not restore session");
            session::clear(jar)
        }
    }
}

/// `GET /logout`: drop the session and go home.
///
/// Cached SCM clients are left alone.
pub async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Response) {
    if let Some(user_id) = session::login_state(&jar).user_id() {
        tracing::info!(user_id, "logout");
    }
    (session::clear(jar), found("/"))
}
