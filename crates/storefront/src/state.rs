//! Storefront composition root.
//!
//! Wires configuration into the backend client, the account service and
//! the two synchronized collections, all observing one identity handle.

use std::sync::Arc;

use eshop_sync::{FileStore, IdentityHandle, LocalStore, MemoryStore};

use crate::account::AccountService;
use crate::backend::{AuthClient, BackendClient, RestCollectionStore};
use crate::cart::Cart;
use crate::config::StorefrontConfig;
use crate::wishlist::Wishlist;

/// Error building the storefront.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontInitError {
    /// The local store directory could not be created.
    #[error("local store error: {0}")]
    LocalStore(#[from] std::io::Error),
}

/// The assembled storefront: account service, cart and wishlist sharing
/// one identity.
pub struct Storefront {
    account: AccountService,
    cart: Cart,
    wishlist: Wishlist,
}

impl Storefront {
    /// Build the storefront from configuration.
    ///
    /// Uses the file-backed local store when `data_dir` is configured, the
    /// in-memory store otherwise. Must be called from within a tokio
    /// runtime (the collections spawn their load and driver tasks).
    ///
    /// # Errors
    ///
    /// Returns an error if the local store directory cannot be created.
    pub fn new(config: &StorefrontConfig) -> Result<Self, StorefrontInitError> {
        let backend = BackendClient::new(&config.backend);
        let identity = IdentityHandle::new();

        let local: Arc<dyn LocalStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::new(dir)?),
            None => Arc::new(MemoryStore::new()),
        };

        let cart = Cart::start(
            Arc::clone(&local),
            Arc::new(RestCollectionStore::new(backend.clone(), "cart")),
            &identity,
            config.sync,
        );
        let wishlist = Wishlist::start(
            local,
            Arc::new(RestCollectionStore::new(backend.clone(), "wishlist")),
            &identity,
            config.sync,
        );
        let account = AccountService::new(Arc::new(AuthClient::new(backend)), identity);

        Ok(Self {
            account,
            cart,
            wishlist,
        })
    }

    /// The account service.
    #[must_use]
    pub const fn account(&self) -> &AccountService {
        &self.account
    }

    /// The cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The wishlist.
    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }
}
