//! Eshop Storefront - cart and wishlist synchronization.
//!
//! Instantiates the `eshop-sync` engine twice (cart, wishlist) against the
//! backend-as-a-service that owns authentication and the per-user
//! collection tables. This crate is the composition layer: backend REST
//! adapter, auth/account service with two-phase identity commit, and the
//! domain semantics of cart lines and wishlist entries.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod backend;
pub mod cart;
pub mod config;
pub mod state;
pub mod wishlist;

pub use account::AccountService;
pub use cart::{Cart, CartKind, CartLine};
pub use config::{BackendConfig, ConfigError, StorefrontConfig};
pub use state::{Storefront, StorefrontInitError};
pub use wishlist::{Wishlist, WishlistEntry, WishlistKind};
