//! Eshop Core - Shared types library.
//!
//! This crate provides common types used across all eshop components:
//! - `sync` - Local-first collection synchronization engine
//! - `storefront` - Cart/wishlist instantiations and backend adapters
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, identity, prices, and
//!   product snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
