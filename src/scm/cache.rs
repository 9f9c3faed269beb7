//! scm::cache
//!
//! Process-wide SCM client cache keyed by access token.
//!
//! # Design
//!
//! Entitlements belong to the token, not to the user, so clients are keyed by
//! `(provider, token)`. Each key owns a [`tokio::sync::OnceCell`]:
//!
//! - The map lock is held only long enough to fetch or insert the cell, so
//!   lookups for unrelated tokens never wait on each other
//! - Concurrent callers for the same key all await the same cell, and the
//!   factory runs exactly once for it
//! - A failed construction leaves the cell empty, so the next caller retries
//!
//! Entries are never evicted. A revoked token keeps its client until the
//! process exits; logging out does not touch the cache.
//!
//! # Security
//!
//! Tokens never appear in logs or `Debug` output. Log lines identify a token
//! by [`token_fingerprint`].

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use super::factory::ScmFactory;
use super::traits::{Scm, ScmError};

type CacheKey = (String, String);
type Slot = Arc<OnceCell<Arc<dyn Scm>>>;

/// Shared cache of constructed SCM clients.
pub struct ScmClientCache {
    factory: Arc<dyn ScmFactory>,
    clients: Mutex<HashMap<CacheKey, Slot>>,
}

impl std::fmt::Debug for ScmClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScmClientCache")
            .field("clients", &self.len())
            .finish_non_exhaustive()
    }
}

impl ScmClientCache {
    /// Create an empty cache backed by `factory`.
    pub fn new(factory: Arc<dyn ScmFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Return the client for `(provider, token)`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Whatever the factory returns, typically `ScmError::UnknownProvider`.
    pub async fn get_or_create(
        &self,
        provider: &str,
        token: &str,
    ) -> Result<Arc<dyn Scm>, ScmError> {
        let slot = {
            let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
            clients
                .entry((provider.to_string(), token.to_string()))
                .or_default()
                .clone()
        };

        let client = slot
            .get_or_try_init(|| async {
                tracing::debug!(
                    provider,
                    token = %token_fingerprint(token),
                    "constructing SCM client"
                );
                self.factory.create(provider, token)
            })
            .await?;

        Ok(Arc::clone(client))
    }

    /// Number of keys seen, including ones whose construction failed.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no client has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Short, stable identifier for a token: the first 8 hex chars of its SHA-256.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::fake::FakeScm;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Factory that counts constructions and optionally stalls inside `create`.
    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl ScmFactory for CountingFactory {
        fn create(&self, provider: &str, _token: &str) -> Result<Arc<dyn Scm>, ScmError> {
            if provider == "bogus" {
                return Err(ScmError::UnknownProvider(provider.to_string()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            // Widen the race window between concurrent callers.
            std::thread::sleep(Duration::from_millis(5));
            Ok(Arc::new(FakeScm::new()))
        }
    }

    #[tokio::test]
    async fn same_token_returns_same_client() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ScmClientCache::new(factory.clone());

        let a = cache.get_or_create("fake", "tok").await.unwrap();
        let b = cache.get_or_create("fake", "tok").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_tokens_get_distinct_clients() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ScmClientCache::new(factory.clone());

        let a = cache.get_or_create("fake", "tok-a").await.unwrap();
        let b = cache.get_or_create("fake", "tok-b").await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn same_token_different_provider_is_a_different_key() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ScmClientCache::new(factory.clone());

        cache.get_or_create("fake", "tok").await.unwrap();
        cache.get_or_create("github", "tok").await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_construct_once() {
        let factory = Arc::new(CountingFactory::default());
        let cache = Arc::new(ScmClientCache::new(factory.clone()));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_or_create("fake", "shared").await })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn failed_construction_is_not_cached() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ScmClientCache::new(factory.clone());

        assert!(matches!(
            cache.get_or_create("bogus", "tok").await,
            Err(ScmError::UnknownProvider(_))
        ));
        assert!(cache.get_or_create("bogus", "tok").await.is_err());
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn debug_hides_tokens() {
        let cache = ScmClientCache::new(Arc::new(CountingFactory::default()));
        cache.get_or_create("fake", "gho_secret").await.unwrap();
        let debug = format!("{:?}", cache);
        assert!(debug.contains("clients: 1"));
        assert!(!debug.contains("gho_secret"));
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let fp = token_fingerprint("gho_abc");
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, token_fingerprint("gho_abc"));
        assert_ne!(fp, token_fingerprint("gho_abd"));
        assert!(!fp.contains("gho"));
    }
}
