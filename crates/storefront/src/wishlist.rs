//! The synchronized wishlist.
//!
//! A boolean set keyed by product id: add is idempotent, `toggle` flips
//! membership. Re-adding a product refreshes its stored snapshot so the
//! wishlist shows current titles and images.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eshop_core::{ProductId, ProductSnapshot};
use eshop_sync::{
    CollectionItem, CollectionKind, IdentityResolver, LocalStore, RemoteStore, SyncSettings,
    SyncedCollection,
};

/// A wishlist entry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// Product at the time it was (last) added.
    pub product: ProductSnapshot,
    /// When the entry was first added.
    pub added_at: DateTime<Utc>,
}

/// Merge behavior for the wishlist.
pub struct WishlistKind;

impl CollectionKind for WishlistKind {
    type Payload = WishlistEntry;

    const NAMESPACE: &'static str = "eshop_wishlist";

    fn merge_key(payload: &WishlistEntry) -> String {
        payload.product.id.to_string()
    }

    fn new_item_id(payload: &WishlistEntry) -> String {
        payload.product.id.to_string()
    }

    fn merge(existing: &mut WishlistEntry, incoming: WishlistEntry) {
        // Idempotent add: keep the original added_at, refresh the snapshot.
        existing.product = incoming.product;
    }
}

/// The storefront wishlist, synchronized local-first.
pub struct Wishlist {
    inner: SyncedCollection<WishlistKind>,
}

impl Wishlist {
    /// Start the wishlist against the given stores and identity source.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore<WishlistEntry>>,
        resolver: &dyn IdentityResolver,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: SyncedCollection::start(local, remote, resolver, settings),
        }
    }

    /// Add a product. Idempotent: a second add refreshes the snapshot.
    pub fn add(&self, product: ProductSnapshot) {
        self.inner.add(WishlistEntry {
            product,
            added_at: Utc::now(),
        });
    }

    /// Remove a product. Unknown ids are a no-op.
    pub fn remove(&self, product_id: &ProductId) {
        self.inner.remove(product_id.as_str());
    }

    /// Flip membership; returns whether the product is present afterwards.
    pub fn toggle(&self, product: ProductSnapshot) -> bool {
        if self.contains(&product.id) {
            self.remove(&product.id);
            false
        } else {
            self.add(product);
            true
        }
    }

    /// Whether the product is on the wishlist.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.inner
            .items()
            .iter()
            .any(|entry| entry.payload.product.id == *product_id)
    }

    /// Entries in the order they were added.
    #[must_use]
    pub fn entries(&self) -> Vec<CollectionItem<WishlistEntry>> {
        self.inner.items()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Whether the initial (or post-transition) load is still in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }

    /// Wait until the current load settles.
    pub async fn wait_ready(&self) {
        self.inner.wait_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use eshop_core::{CurrencyCode, Price};
    use eshop_sync::{CollectionDoc, IdentityHandle, MemoryStore, RemoteError};

    use super::*;

    fn product(id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            handle: id.to_owned(),
            image_url: Some(format!("https://cdn.example.com/{id}.jpg")),
            price: Price::from_minor_units(999, CurrencyCode::USD),
        }
    }

    struct NullRemote;

    #[async_trait::async_trait]
    impl RemoteStore<WishlistEntry> for NullRemote {
        async fn fetch(
            &self,
            _user: &eshop_core::UserId,
        ) -> Result<Option<CollectionDoc<WishlistEntry>>, RemoteError> {
            Ok(None)
        }

        async fn upsert(
            &self,
            _user: &eshop_core::UserId,
            _items: &[CollectionItem<WishlistEntry>],
        ) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    async fn anonymous_wishlist() -> Wishlist {
        let wishlist = Wishlist::start(
            Arc::new(MemoryStore::new()),
            Arc::new(NullRemote),
            &IdentityHandle::new(),
            SyncSettings::default(),
        );
        wishlist.wait_ready().await;
        wishlist
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let wishlist = anonymous_wishlist().await;

        wishlist.add(product("p1"));
        wishlist.add(product("p1"));

        assert_eq!(wishlist.entries().len(), 1);
        assert!(wishlist.contains(&ProductId::new("p1")));
    }

    #[tokio::test]
    async fn test_readd_refreshes_snapshot_keeps_added_at() {
        let wishlist = anonymous_wishlist().await;

        wishlist.add(product("p1"));
        let original_added_at = wishlist.entries()[0].payload.added_at;

        let mut updated = product("p1");
        updated.title = "Renamed".to_owned();
        wishlist.add(updated);

        let entries = wishlist.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload.product.title, "Renamed");
        assert_eq!(entries[0].payload.added_at, original_added_at);
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let wishlist = anonymous_wishlist().await;

        assert!(wishlist.toggle(product("p1")));
        assert!(wishlist.contains(&ProductId::new("p1")));

        assert!(!wishlist.toggle(product("p1")));
        assert!(!wishlist.contains(&ProductId::new("p1")));
        assert!(wishlist.entries().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let wishlist = anonymous_wishlist().await;
        wishlist.add(product("p1"));
        wishlist.remove(&ProductId::new("p2"));
        assert_eq!(wishlist.entries().len(), 1);
    }
}
