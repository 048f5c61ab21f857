//! Collection items and per-collection merge behavior.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An entry in a synchronized collection.
///
/// The id is unique within the collection and stable across syncs; the
/// payload is the domain data (a cart line, a wishlist entry). Payload
/// fields are flattened so the stored JSON reads as one flat object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem<T> {
    /// Unique id within the collection.
    pub id: String,
    /// Domain payload.
    #[serde(flatten)]
    pub payload: T,
}

/// Merge behavior of one collection flavor (cart, wishlist).
///
/// The engine is generic over this trait: it decides which incoming
/// payloads coalesce into an existing item and which append a new one.
pub trait CollectionKind: Send + Sync + 'static {
    /// Domain payload carried by each item.
    type Payload: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Storage namespace, e.g. `eshop_cart`. Also the remote table name.
    const NAMESPACE: &'static str;

    /// Key identifying payloads that coalesce into one item.
    ///
    /// For a cart this is (product, size, color); for a wishlist the
    /// product id alone.
    fn merge_key(payload: &Self::Payload) -> String;

    /// Id for a freshly appended item.
    fn new_item_id(payload: &Self::Payload) -> String;

    /// Fold an incoming payload into an existing item with the same merge
    /// key (e.g. increment quantity). Wishlist-style boolean sets may
    /// simply refresh the stored snapshot.
    fn merge(existing: &mut Self::Payload, incoming: Self::Payload);
}
