//! scm
//!
//! Abstraction over source code management providers (GitHub, GitLab).
//!
//! # Architecture
//!
//! The [`Scm`] trait is the only surface handlers see. Clients are obtained
//! through the [`ScmClientCache`], which builds them with an [`ScmFactory`];
//! handlers never construct an adapter themselves.
//!
//! Every provider call made on behalf of a request is wrapped in [`bounded`],
//! which enforces [`MAX_WAIT`]. If the inbound request is dropped (client
//! disconnect), the handler future is dropped with it and the outstanding
//! provider call is abandoned.
//!
//! # Modules
//!
//! - `traits`: `Scm` trait, `Directory`, `ScmError`
//! - [`github`]: organizations as directories
//! - [`gitlab`]: groups as directories
//! - [`fake`]: in-memory provider for the `fake` login and for tests
//! - `factory`: provider selection
//! - `cache`: per-token client cache

mod cache;
mod factory;
pub mod fake;
pub mod github;
pub mod gitlab;
mod traits;

use std::future::Future;
use std::time::Duration;

pub use cache::{token_fingerprint, ScmClientCache};
pub use factory::{create_scm, ProviderScmFactory, ScmFactory, ScmProvider};
pub use traits::*;

/// Deadline for a single outbound provider call.
pub const MAX_WAIT: Duration = Duration::from_secs(10);

/// Run a provider call under [`MAX_WAIT`], mapping expiry to [`ScmError::Timeout`].
pub async fn bounded<T, F>(call: F) -> Result<T, ScmError>
where
    F: Future<Output = Result<T, ScmError>>,
{
    bounded_by(MAX_WAIT, call).await
}

/// Run a provider call under an explicit deadline.
pub async fn bounded_by<T, F>(deadline: Duration, call: F) -> Result<T, ScmError>
where
    F: Future<Output = Result<T, ScmError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(ScmError::Timeout))
}
