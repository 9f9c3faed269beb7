//! scm::fake
//!
//! Deterministic in-memory SCM for the `fake` provider and for tests.
//!
//! # Design
//!
//! The fake stores directories in memory, records every operation, and can be
//! configured to fail a specific operation or to stall before answering so
//! deadline handling can be exercised.
//!
//! # Example
//!
//! ```
//! use agportal::scm::fake::FakeScm;
//! use agportal::scm::{Directory, Scm};
//!
//! # tokio_test::block_on(async {
//! let scm = FakeScm::with_directories(vec![Directory {
//!     id: 42,
//!     name: "uis-dat320".to_string(),
//!     avatar: None,
//! }]);
//!
//! let dir = scm.get_directory(42).await.unwrap();
//! assert_eq!(dir.name, "uis-dat320");
//! # });
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::traits::{CreateDirectoryOptions, Directory, Scm, ScmError};

/// Fake SCM.
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct FakeScm {
    inner: Arc<Mutex<FakeScmInner>>,
}

#[derive(Debug)]
struct FakeScmInner {
    /// Directories by id.
    directories: BTreeMap<u64, Directory>,
    /// Paths claimed by create_directory.
    paths: BTreeSet<String>,
    /// Next id handed out by create_directory.
    next_id: u64,
    /// Operation to fail.
    fail_on: Option<FailOn>,
    /// Delay applied before every operation.
    delay: Option<Duration>,
    /// Recorded operations.
    operations: Vec<FakeOperation>,
}

/// Which operation should fail, and with what.
#[derive(Debug, Clone)]
pub enum FailOn {
    ListDirectories(ScmError),
    CreateDirectory(ScmError),
    GetDirectory(ScmError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOperation {
    ListDirectories,
    CreateDirectory { path: String, name: String },
    GetDirectory { id: u64 },
}

impl FakeScm {
    /// Create an empty fake.
    pub fn new() -> Self {
        Self::with_directories(Vec::new())
    }

    /// Create a fake exposing `directories`.
    pub fn with_directories(directories: Vec<Directory>) -> Self {
        let next_id = directories.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        Self {
            inner: Arc::new(Mutex::new(FakeScmInner {
                directories: directories.into_iter().map(|d| (d.id, d)).collect(),
                paths: BTreeSet::new(),
                next_id,
                fail_on: None,
                delay: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Configure the fake to fail an operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Stall every operation for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// All recorded operations.
    pub fn operations(&self) -> Vec<FakeOperation> {
        self.lock().operations.clone()
    }

    /// Number of stored directories.
    pub fn directory_count(&self) -> usize {
        self.lock().directories.len()
    }

    fn lock(&self) -> MutexGuard<'_, FakeScmInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `op`, honour the delay, and return the configured failure if it matches.
    async fn enter(&self, op: FakeOperation) -> Result<(), ScmError> {
        let delay = {
            let mut inner = self.lock();
            inner.operations.push(op.clone());
            inner.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        match (&inner.fail_on, &op) {
            (Some(FailOn::ListDirectories(e)), FakeOperation::ListDirectories)
            | (Some(FailOn::CreateDirectory(e)), FakeOperation::CreateDirectory { .. })
            | (Some(FailOn::GetDirectory(e)), FakeOperation::GetDirectory { .. }) => {
                Err(e.clone())
            }
            _ => Ok(()),
        }
    }
}

impl Default for FakeScm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scm for FakeScm {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_directories(&self) -> Result<Vec<Directory>, ScmError> {
        self.enter(FakeOperation::ListDirectories).await?;
        Ok(self.lock().directories.values().cloned().collect())
    }

    async fn create_directory(&self, opts: CreateDirectoryOptions) -> Result<Directory, ScmError> {
        self.enter(FakeOperation::CreateDirectory {
            path: opts.path.clone(),
            name: opts.name.clone(),
        })
        .await?;

        let mut inner = self.lock();
        if !inner.paths.insert(opts.path.clone()) {
            return Err(ScmError::ApiError {
                status: 400,
                message: format!("path '{}' has already been taken", opts.path),
            });
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let directory = Directory {
            id,
            name: opts.name,
            avatar: None,
        };
        inner.directories.insert(id, directory.clone());
        Ok(directory)
    }

    async fn get_directory(&self, id: u64) -> Result<Directory, ScmError> {
        self.enter(FakeOperation::GetDirectory { id }).await?;
        self.lock()
            .directories
            .get(&id)
            .cloned()
            .ok_or_else(|| ScmError::NotFound(format!("directory {}", id)))
    }
}
