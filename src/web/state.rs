//! web::state
//!
//! Shared state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::auth::{LoginFlow, ProviderRegistry};
use crate::config::Config;
use crate::db::Database;
use crate::scm::{ScmClientCache, ScmFactory};

/// Process-wide components, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    /// User and course store
    pub db: Arc<dyn Database>,
    /// OAuth login state machine
    pub flow: LoginFlow,
    /// SCM clients keyed by access token
    pub scm_cache: Arc<ScmClientCache>,
    /// Session cookie key
    pub key: Key,
    /// `index.html` served under `/app`
    pub entry_point: PathBuf,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("flow", &self.flow)
            .field("scm_cache", &self.scm_cache)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the components together.
    pub fn new(
        db: Arc<dyn Database>,
        registry: ProviderRegistry,
        factory: Arc<dyn ScmFactory>,
        key: Key,
        entry_point: PathBuf,
    ) -> Self {
        Self {
            flow: LoginFlow::new(Arc::new(registry), db.clone()),
            db,
            scm_cache: Arc::new(ScmClientCache::new(factory)),
            key,
            entry_point,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// The configured session key, or a random one.
///
/// A random key invalidates every session on restart, so it is logged.
pub fn session_key(config: &Config) -> Key {
    match config.session_key.as_deref().map(Key::try_from) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "configured session key unusable; generating one");
            Key::generate()
        }
        None => {
            tracing::warn!("no session key configured; sessions will not survive a restart");
            Key::generate()
        }
    }
}
