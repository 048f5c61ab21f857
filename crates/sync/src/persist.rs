//! Persistence coordinator.
//!
//! Mutations never talk to storage themselves; they emit a state-changed
//! notification and this coordinator does the rest: a synchronous mirror
//! into the local store (never debounced - a tab close must not lose local
//! data to a timer window) followed by a debounced, best-effort remote
//! upsert for confirmed users. Rapid successive mutations therefore
//! coalesce into a single remote write carrying the final state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

use eshop_core::Identity;

use crate::debounce::Debouncer;
use crate::item::{CollectionItem, CollectionKind};
use crate::remote::RemoteStore;
use crate::store::{self, LocalStore};

pub(crate) struct PersistenceCoordinator<K: CollectionKind> {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore<K::Payload>>,
    debounce: Duration,
    timer: Mutex<Debouncer>,
}

impl<K: CollectionKind> PersistenceCoordinator<K> {
    pub(crate) fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore<K::Payload>>,
        debounce: Duration,
    ) -> Self {
        Self {
            local,
            remote,
            debounce,
            timer: Mutex::new(Debouncer::new()),
        }
    }

    /// Handle a state-changed notification for the given identity.
    pub(crate) fn state_changed(&self, identity: &Identity, items: &[CollectionItem<K::Payload>]) {
        store::write_items(
            self.local.as_ref(),
            &identity.storage_key(K::NAMESPACE),
            items,
        );

        // Remote sync is an authenticated-only feature; provisional
        // identities must not write under a not-yet-confirmed user id.
        if let Some(user) = identity.confirmed() {
            let remote = Arc::clone(&self.remote);
            let user = user.clone();
            let snapshot = items.to_vec();
            self.timer().schedule(self.debounce, async move {
                if let Err(e) = remote.upsert(&user, &snapshot).await {
                    warn!(
                        user = %user,
                        collection = K::NAMESPACE,
                        error = %e,
                        "debounced remote upsert failed, state remains local-only"
                    );
                }
            });
        }
    }

    /// Tear down any pending remote write without firing it.
    pub(crate) fn cancel_pending(&self) {
        self.timer().cancel();
    }

    fn timer(&self) -> std::sync::MutexGuard<'_, Debouncer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
