//! Eshop Sync - Local-first collection synchronization engine.
//!
//! Implements the synchronized-collection pattern behind the storefront's
//! cart and wishlist: an in-memory ordered collection that mirrors every
//! mutation synchronously into a durable local store and schedules a
//! debounced, best-effort write to a remote per-user document. On identity
//! change the collection is cleared and reloaded through a merge of local
//! and remote sources.
//!
//! # Components
//!
//! - [`identity`] - Identity resolver contract and a watch-channel handle
//!   with two-phase (provisional/confirmed) sign-in commit
//! - [`store`] - Durable local key-value store (in-memory and file-backed)
//! - [`remote`] - Remote per-user collection document interface
//! - [`item`] - Collection items and per-collection merge behavior
//! - [`collection`] - The `SyncedCollection` state machine and its
//!   persistence coordinator (local mirror + debounced upsert)
//! - [`debounce`] - Trailing-edge debounce timer
//! - [`retry`] - Retry policy value object and `with_retry` combinator
//! - [`cache`] - Constructor-injected TTL cache built on `moka`
//!
//! # Guarantees
//!
//! Local writes are strictly ordered with mutations; remote writes reflect
//! only the state current when the debounce timer fires. Background sync
//! failures are logged and swallowed - nothing here surfaces errors to the
//! UI beyond the loading flag.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod collection;
pub mod debounce;
pub mod identity;
pub mod item;
pub(crate) mod persist;
pub mod remote;
pub mod retry;
pub mod store;

pub use cache::TtlCache;
pub use collection::{Retain, SyncSettings, SyncedCollection};
pub use debounce::Debouncer;
pub use identity::{IdentityHandle, IdentityResolver};
pub use item::{CollectionItem, CollectionKind};
pub use remote::{CollectionDoc, RemoteError, RemoteStore};
pub use retry::{RetryPolicy, with_retry};
pub use store::{FileStore, LocalStore, MemoryStore};
