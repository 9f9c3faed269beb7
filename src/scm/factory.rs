//! scm::factory
//!
//! SCM client selection and creation.
//!
//! # Design
//!
//! Handlers never import a concrete adapter. They obtain clients from the
//! [`ScmClientCache`](super::ScmClientCache), which in turn calls an
//! [`ScmFactory`]. The default factory, [`ProviderScmFactory`], dispatches on
//! the provider name with an explicit `match`; there is no global registration.
//!
//! # Example
//!
//! ```
//! use agportal::scm::{create_scm, ScmError};
//!
//! let scm = create_scm("gitlab", "glpat-token").unwrap();
//! assert_eq!(scm.name(), "gitlab");
//!
//! assert!(matches!(
//!     create_scm("bitbucket", "token"),
//!     Err(ScmError::UnknownProvider(_))
//! ));
//! ```

use std::sync::Arc;

use super::fake::FakeScm;
use super::github::GitHubScm;
use super::gitlab::GitLabScm;
use super::traits::{Directory, Scm, ScmError};

/// Supported SCM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScmProvider {
    /// GitHub (organizations)
    GitHub,
    /// GitLab (groups)
    GitLab,
    /// Deterministic in-memory provider
    Fake,
}

impl ScmProvider {
    /// The provider name used in routes and persisted records.
    pub fn name(&self) -> &'static str {
        match self {
            ScmProvider::GitHub => "github",
            ScmProvider::GitLab => "gitlab",
            ScmProvider::Fake => "fake",
        }
    }

    /// Parse a provider name. Names are matched exactly.
    ///
    /// ```
    /// use agportal::scm::ScmProvider;
    ///
    /// assert_eq!(ScmProvider::parse("github"), Some(ScmProvider::GitHub));
    /// assert_eq!(ScmProvider::parse("GitHub"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "github" => Some(ScmProvider::GitHub),
            "gitlab" => Some(ScmProvider::GitLab),
            "fake" => Some(ScmProvider::Fake),
            _ => None,
        }
    }

    /// Whether courses may be hosted on this provider.
    pub fn hosts_courses(&self) -> bool {
        matches!(self, ScmProvider::GitHub | ScmProvider::GitLab)
    }
}

impl std::fmt::Display for ScmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create an SCM client for `provider` authenticated with `token`.
///
/// # Errors
///
/// `ScmError::UnknownProvider` if `provider` names no adapter.
pub fn create_scm(provider: &str, token: &str) -> Result<Box<dyn Scm>, ScmError> {
    let provider = ScmProvider::parse(provider)
        .ok_or_else(|| ScmError::UnknownProvider(provider.to_string()))?;

    Ok(match provider {
        ScmProvider::GitHub => Box::new(GitHubScm::new(token)),
        ScmProvider::GitLab => Box::new(GitLabScm::new(token)),
        ScmProvider::Fake => Box::new(FakeScm::new()),
    })
}

/// Constructs SCM clients for the client cache.
///
/// Implementations are called at most once per distinct `(provider, token)`
/// pair for the lifetime of the cache.
pub trait ScmFactory: Send + Sync {
    /// Build a client for `provider` authenticated with `token`.
    fn create(&self, provider: &str, token: &str) -> Result<Arc<dyn Scm>, ScmError>;
}

/// Default factory: real adapters for GitHub/GitLab, a seeded fake for `fake`.
#[derive(Debug, Clone, Default)]
pub struct ProviderScmFactory {
    /// Directories exposed by every client built for the `fake` provider.
    fake_directories: Vec<Directory>,
}

impl ProviderScmFactory {
    /// Create the default factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the directories exposed by `fake` provider clients.
    pub fn with_fake_directories(mut self, directories: Vec<Directory>) -> Self {
        self.fake_directories = directories;
        self
    }
}

impl ScmFactory for ProviderScmFactory {
    fn create(&self, provider: &str, token: &str) -> Result<Arc<dyn Scm>, ScmError> {
        match ScmProvider::parse(provider) {
            Some(ScmProvider::Fake) => {
                Ok(Arc::new(FakeScm::with_directories(self.fake_directories.clone())))
            }
            _ => create_scm(provider, token).map(Arc::from),
        }
    }
}
