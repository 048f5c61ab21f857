//! REST adapter for per-user collection documents.
//!
//! Collection tables have one row per user (`user_id` is the primary key)
//! holding the items as a JSON column. Fetch filters by user id; upsert
//! POSTs with `Prefer: resolution=merge-duplicates` so the row is replaced
//! wholesale, never appended to.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use eshop_core::UserId;
use eshop_sync::{CollectionDoc, CollectionItem, RemoteError, RemoteStore};

use super::BackendClient;

/// One row of a collection table.
#[derive(Debug, Serialize, Deserialize)]
struct CollectionRow<T> {
    user_id: UserId,
    items: Vec<CollectionItem<T>>,
}

/// `RemoteStore` implementation over the backend REST table API.
pub struct RestCollectionStore<T> {
    client: BackendClient,
    table: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> RestCollectionStore<T> {
    /// Create a store for the given table (e.g. `cart`, `wishlist`).
    #[must_use]
    pub fn new(client: BackendClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T> RemoteStore<T> for RestCollectionStore<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[instrument(skip(self), fields(table = %self.table))]
    async fn fetch(&self, user: &UserId) -> Result<Option<CollectionDoc<T>>, RemoteError> {
        let url = format!(
            "{}?user_id=eq.{}&select=user_id,items",
            self.client.rest_url(&self.table),
            eq_filter(user.as_str())
        );

        let response = self
            .client
            .authed(self.client.http().get(url))
            .send()
            .await
            .map_err(transport)?;
        let body = check_status(response).await?;

        let rows: Vec<CollectionRow<T>> = serde_json::from_str(&body)?;
        // An empty row set is the expected "never synced" outcome.
        let doc = rows
            .into_iter()
            .next()
            .map(|row| CollectionDoc { items: row.items });
        debug!(found = doc.is_some(), "fetched collection document");
        Ok(doc)
    }

    #[instrument(skip(self, items), fields(table = %self.table, items = items.len()))]
    async fn upsert(&self, user: &UserId, items: &[CollectionItem<T>]) -> Result<(), RemoteError> {
        let row = CollectionRow {
            user_id: user.clone(),
            items: items.to_vec(),
        };

        let response = self
            .client
            .authed(self.client.http().post(self.client.rest_url(&self.table)))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

/// Encode a filter value for interpolation into a query string.
///
/// User ids are opaque backend strings; one containing `&` or `,` must not
/// rewrite the filter expression.
fn eq_filter(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Map a non-success response to an error, returning the body otherwise.
///
/// The body is read as text first so failures can be logged with a snippet
/// instead of an opaque decode error.
async fn check_status(response: reqwest::Response) -> Result<String, RemoteError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(RemoteError::RateLimited(retry_after));
    }

    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        let detail: String = body.chars().take(200).collect();
        tracing::error!(
            status = %status,
            body = %detail,
            "backend returned non-success status"
        );
        return Err(RemoteError::Backend {
            status: status.as_u16(),
            detail,
        });
    }

    Ok(body)
}
