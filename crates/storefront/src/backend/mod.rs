//! Backend-as-a-service client.
//!
//! The backend owns authentication and the per-user collection tables;
//! this module is the narrow HTTP surface the storefront talks to it
//! through: a REST table API for collection documents and a token endpoint
//! for sign-in. Nothing here owns merge or persistence logic - that lives
//! in `eshop-sync`.

pub mod auth;
pub mod rest;

pub use auth::{AuthApi, AuthClient, AuthError, AuthSession, CustomerProfile};
pub use rest::RestCollectionStore;

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::BackendConfig;

/// Shared HTTP client for the backend API.
///
/// Cheaply cloneable via `Arc`; endpoints are precomputed at construction.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    rest_base: String,
    auth_base: String,
    publishable_key: String,
    service_key: String,
}

impl BackendClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let base = config.base_url.as_str().trim_end_matches('/').to_owned();
        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                rest_base: format!("{base}/rest/v1"),
                auth_base: format!("{base}/auth/v1"),
                publishable_key: config.publishable_key.clone(),
                service_key: config.service_key.expose_secret().to_owned(),
            }),
        }
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/{table}", self.inner.rest_base)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.auth_base)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Attach the API key headers every backend request carries.
    pub(crate) fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.inner.publishable_key)
            .bearer_auth(&self.inner.service_key)
    }
}
