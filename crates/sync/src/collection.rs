//! The synchronized collection state machine.
//!
//! Lifecycle: `start` spawns the initial load and a driver task observing
//! identity transitions. Every transition clears the in-memory items,
//! bumps the load epoch, cancels any pending remote write and reloads for
//! the new identity; a load that resolves after the epoch has moved on is
//! discarded. Mutations are synchronous over the in-memory items and hand
//! the new state to the persistence coordinator.
//!
//! Merge policy on load: a non-empty remote document is authoritative and
//! is mirrored locally; an empty or missing one is seeded (best-effort)
//! from whatever the per-user local key holds. Anonymous and provisional
//! identities never touch the remote.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, warn};

use eshop_core::{Identity, UserId};

use crate::identity::IdentityResolver;
use crate::item::{CollectionItem, CollectionKind};
use crate::persist::PersistenceCoordinator;
use crate::remote::RemoteStore;
use crate::retry::{RetryPolicy, with_retry};
use crate::store::{self, LocalStore};

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    /// Trailing-edge debounce window for remote upserts.
    pub debounce: std::time::Duration,
    /// Retry policy for the load-time remote fetch.
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: std::time::Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of an in-place payload update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    /// Keep the item with its updated payload.
    Keep,
    /// Drop the item (e.g. quantity updated to zero).
    Discard,
}

struct State<T> {
    identity: Identity,
    items: Vec<CollectionItem<T>>,
    is_loading: bool,
    /// Guards the persistence effect: mutations applied before the initial
    /// load commits must not clobber remote data with a partial default.
    initialized: bool,
    /// Bumped on every identity transition; stale loads check it on commit.
    epoch: u64,
}

struct Shared<K: CollectionKind> {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore<K::Payload>>,
    settings: SyncSettings,
    coordinator: PersistenceCoordinator<K>,
    state: Mutex<State<K::Payload>>,
    ready_tx: watch::Sender<bool>,
}

/// A local-first collection of items synchronized to a per-user remote
/// document.
///
/// Dropping the collection aborts the identity driver and cancels any
/// pending debounced write, so no write can land under a stale identity
/// after teardown.
pub struct SyncedCollection<K: CollectionKind> {
    shared: Arc<Shared<K>>,
    driver: tokio::task::JoinHandle<()>,
}

impl<K: CollectionKind> SyncedCollection<K> {
    /// Start the collection: snapshot the current identity, kick off the
    /// initial load and spawn the identity driver.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore<K::Payload>>,
        resolver: &dyn IdentityResolver,
        settings: SyncSettings,
    ) -> Self {
        let identity = resolver.current();
        let (ready_tx, _ready_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            coordinator: PersistenceCoordinator::new(
                Arc::clone(&local),
                Arc::clone(&remote),
                settings.debounce,
            ),
            local,
            remote,
            settings,
            state: Mutex::new(State {
                identity: identity.clone(),
                items: Vec::new(),
                is_loading: true,
                initialized: false,
                epoch: 0,
            }),
            ready_tx,
        });

        tokio::spawn(Shared::load(Arc::downgrade(&shared), identity, 0));

        let mut rx = resolver.subscribe();
        let weak = Arc::downgrade(&shared);
        let driver = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                let Some(shared) = weak.upgrade() else { break };
                let epoch = shared.begin_transition(identity.clone());
                tokio::spawn(Shared::load(Arc::downgrade(&shared), identity, epoch));
            }
        });

        Self { shared, driver }
    }

    /// Whether the initial (or post-transition) load is still in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.lock_state().is_loading
    }

    /// Wait until the current load settles.
    pub async fn wait_ready(&self) {
        let mut rx = self.shared.ready_tx.subscribe();
        // The sender lives in `shared`, which `self` keeps alive.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Snapshot of the items in display order.
    #[must_use]
    pub fn items(&self) -> Vec<CollectionItem<K::Payload>> {
        self.shared.lock_state().items.clone()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock_state().items.len()
    }

    /// Whether the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a payload, coalescing into an existing item when the merge key
    /// matches.
    pub fn add(&self, payload: K::Payload) {
        self.mutate(|items| ops::add::<K>(items, payload));
    }

    /// Remove the item with the given id. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) {
        self.mutate(|items| ops::remove(items, id));
    }

    /// Update the payload of the item with the given id in place; the
    /// closure decides whether the item survives.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut K::Payload) -> Retain) {
        self.mutate(|items| ops::update(items, id, f));
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.mutate(|_| Vec::new());
    }

    fn mutate(
        &self,
        f: impl FnOnce(&[CollectionItem<K::Payload>]) -> Vec<CollectionItem<K::Payload>>,
    ) {
        let mut state = self.shared.lock_state();
        let next = f(&state.items);
        state.items = next;
        if !state.initialized {
            return;
        }
        // Persist while still holding the state lock: concurrent mutators
        // must not interleave between committing items and mirroring them,
        // or a stale snapshot could overwrite a newer mirror and reschedule
        // the debounce timer with outdated state. Everything in
        // `state_changed` up to the task spawn is synchronous.
        self.shared
            .coordinator
            .state_changed(&state.identity, &state.items);
    }
}

impl<K: CollectionKind> Drop for SyncedCollection<K> {
    fn drop(&mut self) {
        self.driver.abort();
        self.shared.coordinator.cancel_pending();
    }
}

impl<K: CollectionKind> Shared<K> {
    fn lock_state(&self) -> MutexGuard<'_, State<K::Payload>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset for a new identity and return the epoch its load must commit
    /// under.
    fn begin_transition(&self, identity: Identity) -> u64 {
        let mut state = self.lock_state();
        state.epoch += 1;
        state.identity = identity;
        state.items.clear();
        state.initialized = false;
        state.is_loading = true;
        let epoch = state.epoch;
        drop(state);
        // A timer started under the old identity must not fire under the
        // new one.
        self.coordinator.cancel_pending();
        self.ready_tx.send_replace(false);
        epoch
    }

    async fn load(weak: Weak<Self>, identity: Identity, epoch: u64) {
        let Some(shared) = weak.upgrade() else { return };
        let key = identity.storage_key(K::NAMESPACE);

        let adopted = match identity.confirmed() {
            Some(user) => shared.load_authenticated(user, &key).await,
            // Anonymous and provisional identities are local-only.
            None => store::read_items(shared.local.as_ref(), &key),
        };

        shared.commit_load(epoch, adopted);
    }

    async fn load_authenticated(
        &self,
        user: &UserId,
        key: &str,
    ) -> Vec<CollectionItem<K::Payload>> {
        let fetched = with_retry(self.settings.retry, || self.remote.fetch(user)).await;
        match fetched {
            Ok(Some(doc)) if !doc.items.is_empty() => {
                // Remote is authoritative when non-empty; mirror it so the
                // local key reflects the adopted state.
                store::write_items(self.local.as_ref(), key, &doc.items);
                doc.items
            }
            Ok(_) => {
                // No remote document (or an empty one): local items were
                // created before the first successful sync, push them up.
                let local_items: Vec<CollectionItem<K::Payload>> =
                    store::read_items(self.local.as_ref(), key);
                if !local_items.is_empty() {
                    if let Err(e) = self.remote.upsert(user, &local_items).await {
                        warn!(
                            user = %user,
                            collection = K::NAMESPACE,
                            error = %e,
                            "failed to seed remote collection from local items"
                        );
                    }
                }
                local_items
            }
            Err(e) => {
                warn!(
                    user = %user,
                    collection = K::NAMESPACE,
                    error = %e,
                    "remote fetch failed, proceeding with local items only"
                );
                store::read_items(self.local.as_ref(), key)
            }
        }
    }

    fn commit_load(&self, epoch: u64, items: Vec<CollectionItem<K::Payload>>) {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            // Identity moved on while this load was in flight. Expected
            // under rapid login/logout, so not an error.
            debug!(
                collection = K::NAMESPACE,
                stale_epoch = epoch,
                current_epoch = state.epoch,
                "discarding stale load result"
            );
            return;
        }
        state.items = items;
        state.is_loading = false;
        state.initialized = true;
        drop(state);
        self.ready_tx.send_replace(true);
    }
}

/// Pure mutation functions over the item sequence.
///
/// Each returns a fresh sequence so the persistence effect can mirror
/// current state without diffing.
mod ops {
    use super::{CollectionItem, CollectionKind, Retain};

    pub(super) fn add<K: CollectionKind>(
        items: &[CollectionItem<K::Payload>],
        payload: K::Payload,
    ) -> Vec<CollectionItem<K::Payload>> {
        let key = K::merge_key(&payload);
        let mut next = items.to_vec();
        if let Some(existing) = next
            .iter_mut()
            .find(|item| K::merge_key(&item.payload) == key)
        {
            K::merge(&mut existing.payload, payload);
        } else {
            next.push(CollectionItem {
                id: K::new_item_id(&payload),
                payload,
            });
        }
        next
    }

    pub(super) fn remove<T: Clone>(
        items: &[CollectionItem<T>],
        id: &str,
    ) -> Vec<CollectionItem<T>> {
        items.iter().filter(|item| item.id != id).cloned().collect()
    }

    pub(super) fn update<T: Clone>(
        items: &[CollectionItem<T>],
        id: &str,
        f: impl FnOnce(&mut T) -> Retain,
    ) -> Vec<CollectionItem<T>> {
        let mut next = items.to_vec();
        let Some(position) = next.iter().position(|item| item.id == id) else {
            return next;
        };
        let retain = next
            .get_mut(position)
            .map_or(Retain::Keep, |item| f(&mut item.payload));
        if retain == Retain::Discard {
            next.remove(position);
        }
        next
    }
}
