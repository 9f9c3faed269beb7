//! auth::flow
//!
//! The OAuth login state machine.
//!
//! # States
//!
//! ```text
//! Anonymous ──begin──▶ PendingCallback ──complete──▶ Authenticated
//!     ▲                      │                            │
//!     └──── mismatch/error ──┘◀────────── logout ─────────┘
//! ```
//!
//! The login spans two otherwise unrelated requests (begin and callback). The
//! only thing bridging them is the [`LoginState`] stored in the session
//! cookie, so every transition is a pure function of the current state and
//! the request. No browser is needed to test it.
//!
//! Beginning a login while already authenticated remembers the current login,
//! and the callback then attaches the new provider identity to that user
//! instead of registering a new one. If the user already holds a different
//! identity at that provider, the link is refused and the remembered login is
//! restored.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::AuthError;
use super::provider::{CallbackParams, RemoteProfile};
use super::registry::ProviderRegistry;
use super::state_token::StateToken;
use crate::db::{Database, DbError};
use crate::models::{RemoteIdentity, User};
use crate::scm::{token_fingerprint, MAX_WAIT};

/// Where a browser is in the login flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginState {
    /// No user bound.
    #[default]
    Anonymous,

    /// Redirected to `provider`, awaiting its callback.
    PendingCallback {
        /// Provider the login was begun with
        provider: String,
        /// Expected `state` on the callback
        state: StateToken,
        /// Login to attach the new identity to, when already logged in
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linking: Option<Linking>,
    },

    /// Logged in.
    Authenticated {
        /// Local user id
        user_id: u64,
        /// Provider used for this login
        provider: String,
    },
}

/// The login in progress when a second provider login was begun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linking {
    /// Local user id
    pub user_id: u64,
    /// Provider of the login being extended
    pub provider: String,
}

impl LoginState {
    /// The bound user, when authenticated.
    pub fn user_id(&self) -> Option<u64> {
        match self {
            LoginState::Authenticated { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    /// The login provider, when authenticated.
    pub fn provider(&self) -> Option<&str> {
        match self {
            LoginState::Authenticated { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Whether a user is bound.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginState::Authenticated { .. })
    }

    /// The state to store after a callback failed with `err`.
    ///
    /// A refused link puts the user back where they were; every other
    /// failure leaves the browser anonymous.
    pub fn after_failed_callback(&self, err: &AuthError) -> LoginState {
        match (self, err) {
            (
                LoginState::PendingCallback {
                    linking: Some(linking),
                    ..
                },
                AuthError::IdentityConflict(_),
            ) => LoginState::Authenticated {
                user_id: linking.user_id,
                provider: linking.provider.clone(),
            },
            _ => LoginState::Anonymous,
        }
    }

    fn linking(&self) -> Option<Linking> {
        match self {
            LoginState::Authenticated { user_id, provider } => Some(Linking {
                user_id: *user_id,
                provider: provider.clone(),
            }),
            _ => None,
        }
    }
}

/// Result of beginning a login.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    /// State to store in the session
    pub state: LoginState,
    /// Provider consent URL
    pub url: String,
}

/// Drives logins against the provider registry and the user store.
#[derive(Clone)]
pub struct LoginFlow {
    registry: Arc<ProviderRegistry>,
    db: Arc<dyn Database>,
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl LoginFlow {
    /// Create a flow.
    pub fn new(registry: Arc<ProviderRegistry>, db: Arc<dyn Database>) -> Self {
        Self { registry, db }
    }

    /// The provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// `Anonymous | Authenticated → PendingCallback`.
    ///
    /// # Errors
    ///
    /// `UnknownProvider` if `provider` is not registered. The current state
    /// is left untouched in that case.
    pub fn begin(&self, current: &LoginState, provider: &str) -> Result<LoginRedirect, AuthError> {
        let oauth = self.registry.get(provider)?;
        let state = StateToken::generate();
        let url = oauth.begin_auth(state.as_str())?;

        tracing::debug!(provider, "login begun");
        Ok(LoginRedirect {
            state: LoginState::PendingCallback {
                provider: provider.to_string(),
                state,
                linking: current.linking(),
            },
            url,
        })
    }

    /// `PendingCallback → Authenticated`.
    ///
    /// On any error the caller must replace the pending session with
    /// [`LoginState::after_failed_callback`] (see [`AuthError::clears_session`]).
    ///
    /// # Errors
    ///
    /// - `UnknownProvider` if `provider` is not registered
    /// - `CsrfMismatch` if no login is pending for `provider`, or the
    ///   returned state differs from the stored one
    /// - `Denied` / `MissingCode` / `Exchange` / `Profile` / `Network` from
    ///   the provider
    /// - `Timeout` if the provider exchange exceeds its deadline
    /// - `IdentityConflict` if the logged-in user already holds another
    ///   identity at `provider`
    /// - `Storage` if the user record cannot be written
    pub async fn complete(
        &self,
        current: &LoginState,
        provider: &str,
        params: &CallbackParams,
    ) -> Result<LoginState, AuthError> {
        let oauth = self.registry.get(provider)?;

        let linking_user = match current {
            LoginState::PendingCallback {
                provider: pending_provider,
                state,
                linking,
            } if pending_provider == provider
                && params.state.as_deref().is_some_and(|s| state.verify(s)) =>
            {
                linking.as_ref().map(|l| l.user_id)
            }
            _ => {
                tracing::warn!(provider, "login state mismatch");
                return Err(AuthError::CsrfMismatch);
            }
        };

        let completed = tokio::time::timeout(MAX_WAIT, oauth.complete_auth(params))
            .await
            .map_err(|_| AuthError::Timeout)??;

        let user = self.bind_identity(
            provider,
            linking_user,
            &completed.profile,
            &completed.access_token,
        )?;

        tracing::info!(
            provider,
            user_id = user.id,
            token = %token_fingerprint(&completed.access_token),
            "login completed"
        );
        Ok(LoginState::Authenticated {
            user_id: user.id,
            provider: provider.to_string(),
        })
    }

    /// Find, link, or register the user owning `(provider, profile.remote_id)`.
    fn bind_identity(
        &self,
        provider: &str,
        linking_user: Option<u64>,
        profile: &RemoteProfile,
        access_token: &str,
    ) -> Result<User, AuthError> {
        match self.db.get_user_by_remote_identity(provider, profile.remote_id) {
            Ok(user) => {
                // Providers rotate tokens; keep the newest one.
                self.db
                    .update_access_token(provider, profile.remote_id, access_token)?;
                Ok(user)
            }
            Err(DbError::NotFound(_)) => {
                let identity = RemoteIdentity {
                    provider: provider.to_string(),
                    remote_id: profile.remote_id,
                    access_token: access_token.to_string(),
                    ..Default::default()
                };
                let user = match linking_user {
                    Some(user_id) => self.db.add_remote_identity(user_id, identity)?,
                    None => self.db.create_user_from_remote_identity(
                        User {
                            name: profile.name.clone().unwrap_or_else(|| profile.login.clone()),
                            email: profile.email.clone().unwrap_or_default(),
                            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
                            ..Default::default()
                        },
                        identity,
                    )?,
                };
                tracing::info!(provider, user_id = user.id, "remote identity registered");
                Ok(user)
            }
            Err(e) => Err(e.into()),
        }
    }
}
