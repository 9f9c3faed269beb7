//! session
//!
//! Encrypted cookie session.
//!
//! # Design
//!
//! The whole session lives client-side in one cookie, encrypted and
//! authenticated with the server key through [`PrivateCookieJar`]. A cookie
//! that fails to decrypt, fails to parse, or is older than
//! [`SESSION_MAX_AGE_DAYS`] reads as no session at all.
//!
//! The cookie is `HttpOnly`, `Secure`, `Path=/`, and `SameSite=Lax`. Lax (not
//! Strict) is required so the cookie survives the top-level redirect back
//! from the provider to the callback.
//!
//! Each completed login writes a session with a fresh id, so an id seen
//! before login is never reused after it.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::LoginState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "agportal_session";

/// Sessions older than this are ignored.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be encoded into the cookie.
    #[error("failed to encode session: {0}")]
    Encode(String),
}

/// Server-recognized cookie payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session id
    pub id: Uuid,
    /// When the session was written
    pub issued_at: DateTime<Utc>,
    /// Login state
    pub login: LoginState,
}

impl Session {
    /// A new session with a fresh id.
    pub fn new(login: LoginState) -> Self {
        Self {
            id: Uuid::new_v4(),
            issued_at: Utc::now(),
            login,
        }
    }

    /// Whether the session is past its maximum age.
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.issued_at > Duration::days(SESSION_MAX_AGE_DAYS)
    }
}

/// Read the session from `jar`.
///
/// Returns `None` for a missing, undecryptable, malformed, or expired cookie.
pub fn get(jar: &PrivateCookieJar) -> Option<Session> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let session: Session = match serde_json::from_str(cookie.value()) {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(error = %e, "discarding malformed session cookie");
            return None;
        }
    };
    if session.is_expired() {
        tracing::debug!(session = %session.id, "discarding expired session");
        return None;
    }
    Some(session)
}

/// The login state in `jar`, `Anonymous` if there is no valid session.
pub fn login_state(jar: &PrivateCookieJar) -> LoginState {
    get(jar).map(|s| s.login).unwrap_or_default()
}

/// Write `session` into `jar`.
pub fn put(jar: PrivateCookieJar, session: &Session) -> Result<PrivateCookieJar, SessionError> {
    let value = serde_json::to_string(session).map_err(|e| SessionError::Encode(e.to_string()))?;
    let cookie = Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/");
    Ok(jar.add(cookie))
}

/// Remove the session cookie.
pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn jar() -> PrivateCookieJar {
        PrivateCookieJar::new(Key::generate())
    }

    fn authenticated() -> LoginState {
        LoginState::Authenticated {
            user_id: 1,
            provider: "github".into(),
        }
    }

    #[test]
    fn put_then_get() {
        let session = Session::new(authenticated());
        let jar = put(jar(), &session).unwrap();
        assert_eq!(get(&jar), Some(session));
    }

    #[test]
    fn cookie_attributes() {
        let jar = put(jar(), &Session::new(authenticated())).unwrap();
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn empty_jar_is_anonymous() {
        assert_eq!(get(&jar()), None);
        assert_eq!(login_state(&jar()), LoginState::Anonymous);
    }

    #[test]
    fn clear_removes_session() {
        let jar = put(jar(), &Session::new(authenticated())).unwrap();
        let jar = clear(jar);
        assert_eq!(get(&jar), None);
    }

    #[test]
    fn expired_session_is_ignored() {
        let mut session = Session::new(authenticated());
        session.issued_at = Utc::now() - Duration::days(SESSION_MAX_AGE_DAYS + 1);
        let jar = put(jar(), &session).unwrap();
        assert_eq!(get(&jar), None);
    }

    #[test]
    fn new_sessions_get_fresh_ids() {
        assert_ne!(
            Session::new(LoginState::Anonymous).id,
            Session::new(LoginState::Anonymous).id
        );
    }
}
