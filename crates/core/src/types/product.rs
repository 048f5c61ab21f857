//! Product snapshot embedded in cart lines and wishlist entries.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A point-in-time snapshot of a product.
///
/// Cart lines and wishlist entries store a snapshot rather than a reference
/// so they render meaningfully even when the catalog entry has since changed
/// or been retired. The price here is the catalog price at snapshot time;
/// cart lines additionally pin the unit price they were added at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Catalog product id.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub handle: String,
    /// Primary image URL, if the product has one.
    pub image_url: Option<String>,
    /// Catalog price at snapshot time.
    pub price: Price,
}
