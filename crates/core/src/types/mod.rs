//! Core types for eshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod price;
pub mod product;

pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Price};
pub use product::ProductSnapshot;
