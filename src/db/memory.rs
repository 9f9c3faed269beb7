//! db::memory
//!
//! In-memory [`Database`]. Every operation runs under one lock, so multi-step
//! writes are atomic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Database, DbError};
use crate::models::{Course, RemoteIdentity, User};

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<u64, User>,
    courses: BTreeMap<u64, Course>,
    /// (user_id, course_id)
    enrollments: BTreeSet<(u64, u64)>,
    next_user_id: u64,
    next_identity_id: u64,
    next_course_id: u64,
}

impl Inner {
    fn identity_exists(&self, provider: &str, remote_id: u64) -> bool {
        self.users.values().any(|u| {
            u.remote_identities
                .iter()
                .any(|ri| ri.provider == provider && ri.remote_id == remote_id)
        })
    }

    fn next(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

impl MemoryDatabase {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Database for MemoryDatabase {
    fn get_user(&self, id: u64) -> Result<User, DbError> {
        self.lock()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("user {}", id)))
    }

    fn get_users(&self) -> Result<Vec<User>, DbError> {
        Ok(self.lock().users.values().cloned().collect())
    }

    fn get_user_by_remote_identity(
        &self,
        provider: &str,
        remote_id: u64,
    ) -> Result<User, DbError> {
        self.lock()
            .users
            .values()
            .find(|u| {
                u.remote_identities
                    .iter()
                    .any(|ri| ri.provider == provider && ri.remote_id == remote_id)
            })
            .cloned()
            .ok_or_else(|| {
                DbError::NotFound(format!("{} identity {}", provider, remote_id))
            })
    }

    fn create_user_from_remote_identity(
        &self,
        mut user: User,
        mut identity: RemoteIdentity,
    ) -> Result<User, DbError> {
        let mut inner = self.lock();
        if inner.identity_exists(&identity.provider, identity.remote_id) {
            return Err(DbError::Conflict(format!(
                "{} identity {} already registered",
                identity.provider, identity.remote_id
            )));
        }

        user.id = Inner::next(&mut inner.next_user_id);
        identity.id = Inner::next(&mut inner.next_identity_id);
        identity.user_id = user.id;
        user.remote_identities = vec![identity];
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn add_remote_identity(
        &self,
        user_id: u64,
        mut identity: RemoteIdentity,
    ) -> Result<User, DbError> {
        let mut inner = self.lock();
        if inner.identity_exists(&identity.provider, identity.remote_id) {
            return Err(DbError::Conflict(format!(
                "{} identity {} already registered",
                identity.provider, identity.remote_id
            )));
        }

        let Inner {
            users,
            next_identity_id,
            ..
        } = &mut *inner;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| DbError::NotFound(format!("user {}", user_id)))?;
        if user.identity(&identity.provider).is_some() {
            return Err(DbError::Conflict(format!(
                "user {} already has a {} identity",
                user_id, identity.provider
            )));
        }
        identity.id = Inner::next(next_identity_id);
        identity.user_id = user_id;
        user.remote_identities.push(identity);
        Ok(user.clone())
    }

    fn update_access_token(
        &self,
        provider: &str,
        remote_id: u64,
        access_token: &str,
    ) -> Result<(), DbError> {
        let mut inner = self.lock();
        let identity = inner
            .users
            .values_mut()
            .flat_map(|u| u.remote_identities.iter_mut())
            .find(|ri| ri.provider == provider && ri.remote_id == remote_id)
            .ok_or_else(|| DbError::NotFound(format!("{} identity {}", provider, remote_id)))?;
        identity.access_token = access_token.to_string();
        Ok(())
    }

    fn create_course(&self, mut course: Course, creator_id: u64) -> Result<Course, DbError> {
        let mut inner = self.lock();
        if !inner.users.contains_key(&creator_id) {
            return Err(DbError::NotFound(format!("user {}", creator_id)));
        }
        course.id = Inner::next(&mut inner.next_course_id);
        inner.courses.insert(course.id, course.clone());
        inner.enrollments.insert((creator_id, course.id));
        Ok(course)
    }

    fn get_courses(&self) -> Result<Vec<Course>, DbError> {
        Ok(self.lock().courses.values().cloned().collect())
    }

    fn get_courses_for_user(&self, user_id: u64) -> Result<Vec<Course>, DbError> {
        let inner = self.lock();
        Ok(inner
            .enrollments
            .range((user_id, 0)..=(user_id, u64::MAX))
            .filter_map(|(_, course_id)| inner.courses.get(course_id).cloned())
            .collect())
    }
}
