//! Integration test support for eshop.
//!
//! Provides a scripted in-memory remote store so the synchronization
//! scenarios (merge precedence, debounce coalescing, identity transitions)
//! run deterministically under `tokio::test(start_paused = true)`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use eshop_core::UserId;
use eshop_sync::{CollectionDoc, CollectionItem, RemoteError, RemoteStore};

/// A scripted remote store.
///
/// Holds documents in memory, counts calls, and can be told to fail or to
/// delay fetches for specific users (to exercise stale-load discarding).
pub struct MockRemote<T> {
    docs: Mutex<HashMap<UserId, Vec<CollectionItem<T>>>>,
    fetch_delays: Mutex<HashMap<UserId, Duration>>,
    fetch_calls: AtomicU32,
    upsert_calls: AtomicU32,
    fail_fetches: AtomicBool,
    fail_upserts: AtomicBool,
}

impl<T> Default for MockRemote<T> {
    fn default() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            fetch_delays: Mutex::new(HashMap::new()),
            fetch_calls: AtomicU32::new(0),
            upsert_calls: AtomicU32::new(0),
            fail_fetches: AtomicBool::new(false),
            fail_upserts: AtomicBool::new(false),
        }
    }
}

impl<T: Clone> MockRemote<T> {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a document for a user.
    pub fn seed(&self, user: &UserId, items: Vec<CollectionItem<T>>) {
        lock(&self.docs).insert(user.clone(), items);
    }

    /// The stored document for a user, if any.
    #[must_use]
    pub fn doc(&self, user: &UserId) -> Option<Vec<CollectionItem<T>>> {
        lock(&self.docs).get(user).cloned()
    }

    /// Delay every fetch for this user (the call is counted on entry).
    pub fn delay_fetch(&self, user: &UserId, delay: Duration) {
        lock(&self.fetch_delays).insert(user.clone(), delay);
    }

    /// Number of fetch calls so far.
    #[must_use]
    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of upsert calls so far (including failed ones).
    #[must_use]
    pub fn upsert_count(&self) -> u32 {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent fetches fail with a transport error.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent upserts fail with a backend error.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<T> RemoteStore<T> for MockRemote<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn fetch(&self, user: &UserId) -> Result<Option<CollectionDoc<T>>, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = lock(&self.fetch_delays).get(user).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("mock fetch failure".to_owned()));
        }

        Ok(lock(&self.docs)
            .get(user)
            .map(|items| CollectionDoc {
                items: items.clone(),
            }))
    }

    async fn upsert(&self, user: &UserId, items: &[CollectionItem<T>]) -> Result<(), RemoteError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(RemoteError::Backend {
                status: 503,
                detail: "mock upsert failure".to_owned(),
            });
        }

        lock(&self.docs).insert(user.clone(), items.to_vec());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Poll a condition until it holds.
///
/// Under a paused runtime the sleeps auto-advance, so this settles
/// instantly in wall-clock terms.
///
/// # Panics
///
/// Panics if the condition does not hold within the polling budget.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// Install a compact tracing subscriber for test debugging (no-op if one
/// is already set).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
