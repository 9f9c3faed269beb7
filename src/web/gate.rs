//! web::gate
//!
//! Access control for `/api/v1`.
//!
//! # Chain
//!
//! ```text
//! session ─▶ user ─▶ login identity ─▶ token ─▶ client cache ─▶ Caller
//! ```
//!
//! Each link must succeed or the request is answered with 401 before any
//! handler runs. On success a [`Caller`] is placed in the request extensions,
//! holding the user and one SCM client per remote identity the user has.
//! The client for the login provider is mandatory; clients for the user's
//! other identities are best effort.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::LoginState;
use crate::db::DbError;
use crate::models::User;
use crate::scm::{token_fingerprint, Scm};
use crate::session;

/// SCM clients of the caller, keyed by provider name.
#[derive(Clone, Default)]
pub struct ScmClients(BTreeMap<String, Arc<dyn Scm>>);

impl std::fmt::Debug for ScmClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

impl ScmClients {
    /// The client for `provider`.
    ///
    /// # Errors
    ///
    /// `ProviderNotRegistered` if the caller has no identity with `provider`.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn Scm>, ApiError> {
        self.0
            .get(provider)
            .cloned()
            .ok_or_else(|| ApiError::ProviderNotRegistered(provider.to_string()))
    }
}

/// Authenticated caller, available to protected handlers as
/// `Extension<Caller>`.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The user, including remote identities. Sanitize before returning it.
    pub user: User,
    /// Provider the session logged in with
    pub provider: String,
    /// SCM clients
    pub clients: ScmClients,
}

impl Caller {
    /// Client for the login provider.
    pub fn login_client(&self) -> Result<Arc<dyn Scm>, ApiError> {
        self.clients.get(&self.provider)
    }
}

/// Middleware admitting only requests with a resolvable [`Caller`].
pub async fn require_caller(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state, &jar).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Walk the chain from session to caller.
///
/// # Errors
///
/// `Unauthenticated` for any missing link; `Upstream` if storage fails.
pub async fn resolve_caller(state: &AppState, jar: &PrivateCookieJar) -> Result<Caller, ApiError> {
    let (user_id, provider) = match session::login_state(jar) {
        LoginState::Authenticated { user_id, provider } => (user_id, provider),
        _ => return Err(ApiError::Unauthenticated),
    };

    let user = match state.db.get_user(user_id) {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => {
            tracing::warn!(user_id, "session refers to a missing user");
            return Err(ApiError::Unauthenticated);
        }
        Err(e) => return Err(e.into()),
    };

    if user.identity(&provider).is_none() {
        tracing::warn!(user_id, provider = %provider, "login identity missing");
        return Err(ApiError::Unauthenticated);
    }

    let mut clients = BTreeMap::new();
    for identity in &user.remote_identities {
        match state
            .scm_cache
            .get_or_create(&identity.provider, &identity.access_token)
            .await
        {
            Ok(client) => {
                clients.insert(identity.provider.clone(), client);
            }
            Err(e) if identity.provider == provider => {
                tracing::warn!(
                    user_id,
                    provider = %provider,
                    token = %token_fingerprint(&identity.access_token),
                    error = %e,
                    "no SCM client for login provider"
                );
                return Err(ApiError::Unauthenticated);
            }
            Err(e) => {
                tracing::debug!(
                    user_id,
                    provider = %identity.provider,
                    error = %e,
                    "skipping SCM client"
                );
            }
        }
    }

    Ok(Caller {
        user,
        provider,
        clients: ScmClients(clients),
    })
}
