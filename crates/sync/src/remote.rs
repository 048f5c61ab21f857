//! Remote per-user collection document interface.
//!
//! The backend stores at most one document per (user, collection) with
//! full-replace upsert semantics; all merge logic lives in the engine. A
//! missing document is an expected outcome (new user, never synced) and is
//! modeled as `Ok(None)`, never as an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eshop_core::UserId;

use crate::item::CollectionItem;

/// The remote document for one user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDoc<T> {
    /// Items in display order.
    pub items: Vec<CollectionItem<T>>,
}

/// Errors from the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never reached the backend (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {detail}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body snippet or status reason.
        detail: String,
    },

    /// The backend asked us to slow down.
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    /// A response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Async access to the per-user collection document.
#[async_trait]
pub trait RemoteStore<T>: Send + Sync {
    /// Fetch the user's document. `Ok(None)` means no document exists yet.
    async fn fetch(&self, user: &UserId) -> Result<Option<CollectionDoc<T>>, RemoteError>;

    /// Replace the user's document wholesale. Idempotent; a second upsert
    /// for the same user overwrites, never appends.
    async fn upsert(&self, user: &UserId, items: &[CollectionItem<T>]) -> Result<(), RemoteError>;
}
