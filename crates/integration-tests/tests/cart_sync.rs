//! Cart synchronization scenarios.
//!
//! Exercises the debounce coalescing and remote-failure resilience of the
//! cart end to end: real engine, real local store, scripted remote.

use std::sync::Arc;
use std::time::Duration;

use eshop_core::{CurrencyCode, Price, ProductId, ProductSnapshot, UserId};
use eshop_integration_tests::{MockRemote, wait_until};
use eshop_storefront::{Cart, CartLine};
use eshop_sync::{IdentityHandle, MemoryStore, SyncSettings, store};

fn product(id: &str, cents: i64) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        handle: id.to_owned(),
        image_url: None,
        price: Price::from_minor_units(cents, CurrencyCode::USD),
    }
}

struct Fixture {
    local: Arc<MemoryStore>,
    remote: Arc<MockRemote<CartLine>>,
    identity: IdentityHandle,
}

impl Fixture {
    fn new() -> Self {
        Self {
            local: Arc::new(MemoryStore::new()),
            remote: Arc::new(MockRemote::new()),
            identity: IdentityHandle::new(),
        }
    }

    fn start_cart(&self) -> Cart {
        Cart::start(
            self.local.clone(),
            self.remote.clone(),
            &self.identity,
            SyncSettings::default(),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_mutations_coalesce_into_one_upsert() {
    let fx = Fixture::new();
    let user = UserId::new("user-1");
    fx.identity.confirm_login(user.clone());

    let cart = fx.start_cart();
    cart.wait_ready().await;

    // Three mutations inside one debounce window.
    cart.add(product("p1", 1000), "M", "Red", 1);
    cart.add(product("p1", 1000), "M", "Red", 2);
    cart.add(product("p2", 500), "S", "Blue", 1);

    wait_until("debounced upsert", || fx.remote.upsert_count() >= 1).await;
    assert_eq!(fx.remote.upsert_count(), 1);

    // The single write carries the final state, not an intermediate one.
    let doc = fx.remote.doc(&user).expect("document stored");
    assert_eq!(doc.len(), 2);
    assert_eq!(doc[0].payload.quantity, 3);
    assert_eq!(doc[1].payload.product.id, ProductId::new("p2"));

    // A quiet period produces no further writes.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fx.remote.upsert_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_local_mirror_survives_remote_upsert_failure() {
    let fx = Fixture::new();
    let user = UserId::new("user-1");
    fx.identity.confirm_login(user.clone());

    let cart = fx.start_cart();
    cart.wait_ready().await;

    fx.remote.fail_upserts(true);
    cart.add(product("p1", 1000), "M", "Red", 2);

    wait_until("failed upsert attempted", || fx.remote.upsert_count() >= 1).await;

    // In-memory and local state keep the line; the remote never stored it.
    assert_eq!(cart.lines().len(), 1);
    let stored: Vec<_> = store::read_items::<CartLine>(fx.local.as_ref(), "eshop_cart_user-1");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload.quantity, 2);
    assert!(fx.remote.doc(&user).is_none());

    // The next mutation after recovery syncs the full current state.
    fx.remote.fail_upserts(false);
    cart.add(product("p2", 500), "S", "Blue", 1);
    wait_until("recovered upsert", || fx.remote.doc(&user).is_some()).await;
    let doc = fx.remote.doc(&user).expect("document stored after recovery");
    assert_eq!(doc.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_cart_never_calls_remote() {
    let fx = Fixture::new();

    let cart = fx.start_cart();
    cart.wait_ready().await;

    cart.add(product("p1", 1000), "M", "Red", 1);
    cart.add(product("p2", 500), "S", "Blue", 1);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(fx.remote.fetch_count(), 0);
    assert_eq!(fx.remote.upsert_count(), 0);

    // Local persistence still happened, under the anonymous key.
    let stored: Vec<_> = store::read_items::<CartLine>(fx.local.as_ref(), "eshop_cart");
    assert_eq!(stored.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_remote_write() {
    let fx = Fixture::new();
    fx.identity.confirm_login(UserId::new("user-1"));

    let cart = fx.start_cart();
    cart.wait_ready().await;

    cart.add(product("p1", 1000), "M", "Red", 1);
    drop(cart);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fx.remote.upsert_count(), 0);
}
