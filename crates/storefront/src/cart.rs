//! The synchronized shopping cart.
//!
//! One line per distinct (product, size, color); adding the same variant
//! again increments its quantity instead of duplicating the line. Line ids
//! carry a uuid tie-breaker so a removed-and-re-added variant gets a fresh
//! id. Each line pins the unit price it was added at - the catalog price
//! may move later, the cart price does not.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eshop_core::{Price, ProductSnapshot};
use eshop_sync::{
    CollectionItem, CollectionKind, IdentityResolver, LocalStore, RemoteStore, Retain,
    SyncSettings, SyncedCollection,
};

/// A cart line payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product at the time the line was added.
    pub product: ProductSnapshot,
    /// Selected size.
    pub size: String,
    /// Selected color.
    pub color: String,
    /// Number of units.
    pub quantity: u32,
    /// Unit price at add time.
    pub unit_price: Price,
    /// When the line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Total price of this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// Merge behavior for the cart.
pub struct CartKind;

impl CartKind {
    fn variant_key(line: &CartLine) -> String {
        format!("{}:{}:{}", line.product.id, line.size, line.color)
    }
}

impl CollectionKind for CartKind {
    type Payload = CartLine;

    const NAMESPACE: &'static str = "eshop_cart";

    fn merge_key(payload: &CartLine) -> String {
        Self::variant_key(payload)
    }

    fn new_item_id(payload: &CartLine) -> String {
        format!("{}:{}", Self::variant_key(payload), Uuid::new_v4().simple())
    }

    fn merge(existing: &mut CartLine, incoming: CartLine) {
        existing.quantity = existing.quantity.saturating_add(incoming.quantity);
    }
}

/// The storefront cart, synchronized local-first.
pub struct Cart {
    inner: SyncedCollection<CartKind>,
}

impl Cart {
    /// Start the cart against the given stores and identity source.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore<CartLine>>,
        resolver: &dyn IdentityResolver,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: SyncedCollection::start(local, remote, resolver, settings),
        }
    }

    /// Add `quantity` units of a product variant. A quantity of zero is a
    /// no-op.
    pub fn add(
        &self,
        product: ProductSnapshot,
        size: impl Into<String>,
        color: impl Into<String>,
        quantity: u32,
    ) {
        if quantity == 0 {
            return;
        }
        let unit_price = product.price;
        self.inner.add(CartLine {
            product,
            size: size.into(),
            color: color.into(),
            quantity,
            unit_price,
            added_at: Utc::now(),
        });
    }

    /// Set a line's quantity. Zero or negative removes the line - the cart
    /// never persists empty lines.
    pub fn update_quantity(&self, line_id: &str, quantity: i64) {
        match u32::try_from(quantity) {
            Ok(0) | Err(_) => self.inner.remove(line_id),
            Ok(quantity) => self.inner.update(line_id, |line| {
                line.quantity = quantity;
                Retain::Keep
            }),
        }
    }

    /// Remove a line.
    pub fn remove(&self, line_id: &str) {
        self.inner.remove(line_id);
    }

    /// Remove every line.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Lines in the order they were added.
    #[must_use]
    pub fn lines(&self) -> Vec<CollectionItem<CartLine>> {
        self.inner.items()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines()
            .iter()
            .fold(0, |sum, line| sum.saturating_add(line.payload.quantity))
    }

    /// Sum of line totals, or `None` for an empty cart.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.lines()
            .iter()
            .map(|line| line.payload.line_total())
            .reduce(|a, b| a + b)
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
    use rust_decimal::Decimal;

    use eshop_core::{CurrencyCode, ProductId};
    use eshop_sync::{IdentityHandle, MemoryStore};

    use super::*;

    fn product(id: &str, cents: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            handle: id.to_owned(),
            image_url: None,
            price: Price::from_minor_units(cents, CurrencyCode::USD),
        }
    }

    struct NullRemote;

    #[async_trait::async_trait]
    impl RemoteStore<CartLine> for NullRemote {
        async fn fetch(
            &self,
            _user: &eshop_core::UserId,
        ) -> Result<Option<eshop_sync::CollectionDoc<CartLine>>, eshop_sync::RemoteError> {
            Ok(None)
        }

        async fn upsert(
            &self,
            _user: &eshop_core::UserId,
            _items: &[CollectionItem<CartLine>],
        ) -> Result<(), eshop_sync::RemoteError> {
            Ok(())
        }
    }

    async fn anonymous_cart() -> Cart {
        let cart = Cart::start(
            Arc::new(MemoryStore::new()),
            Arc::new(NullRemote),
            &IdentityHandle::new(),
            SyncSettings::default(),
        );
        cart.wait_ready().await;
        cart
    }

    #[tokio::test]
    async fn test_same_variant_merges_quantity() {
        let cart = anonymous_cart().await;

        cart.add(product("p1", 1000), "M", "Red", 1);
        cart.add(product("p1", 1000), "M", "Red", 2);

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].payload.quantity, 3);
    }

    #[tokio::test]
    async fn test_distinct_variants_stay_distinct() {
        let cart = anonymous_cart().await;

        cart.add(product("p1", 1000), "M", "Red", 1);
        cart.add(product("p1", 1000), "L", "Red", 1);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_zero_and_negative_quantity_remove_line() {
        let cart = anonymous_cart().await;

        cart.add(product("p1", 1000), "M", "Red", 2);
        let line_id = cart.lines()[0].id.clone();

        cart.update_quantity(&line_id, 0);
        assert!(cart.lines().is_empty());

        cart.add(product("p1", 1000), "M", "Red", 2);
        let line_id = cart.lines()[0].id.clone();
        cart.update_quantity(&line_id, -1);
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_add_is_noop() {
        let cart = anonymous_cart().await;
        cart.add(product("p1", 1000), "M", "Red", 0);
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_subtotal_uses_pinned_unit_price() {
        let cart = anonymous_cart().await;

        cart.add(product("p1", 1250), "M", "Red", 2);
        cart.add(product("p2", 500), "S", "Blue", 1);

        let subtotal = cart.subtotal().expect("cart is not empty");
        assert_eq!(subtotal.amount, Decimal::new(3000, 2));
        assert_eq!(cart.subtotal().map(|p| p.to_string()).as_deref(), Some("$30.00"));
        assert!(anonymous_cart().await.subtotal().is_none());
    }

    #[tokio::test]
    async fn test_removed_then_readded_variant_gets_fresh_id() {
        let cart = anonymous_cart().await;

        cart.add(product("p1", 1000), "M", "Red", 1);
        let first_id = cart.lines()[0].id.clone();
        cart.remove(&first_id);

        cart.add(product("p1", 1000), "M", "Red", 1);
        let second_id = cart.lines()[0].id.clone();
        assert_ne!(first_id, second_id);
    }
}
