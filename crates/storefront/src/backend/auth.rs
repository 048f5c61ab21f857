//! Password sign-in and session restore against the backend auth API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use eshop_core::UserId;

use super::BackendClient;

/// Authentication operation failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password rejected, or the refresh token is no longer valid.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request never reached the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with an unexpected status.
    #[error("backend returned status {status}: {detail}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body snippet.
        detail: String,
    },

    /// The auth response body could not be decoded.
    #[error("malformed auth response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The signed-in customer as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Backend user id.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
}

/// A confirmed auth session.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// The confirmed customer.
    pub user: CustomerProfile,
    /// Bearer token for user-scoped requests.
    pub access_token: String,
    /// Token for restoring the session later.
    pub refresh_token: String,
}

/// The token operations the account service depends on.
///
/// `AuthClient` is the production implementation; tests script outcomes
/// through this seam.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Restore a session from a stored refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Client for the backend auth endpoints.
#[derive(Clone)]
pub struct AuthClient {
    client: BackendClient,
}

impl AuthClient {
    /// Create an auth client.
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn token_request<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .authed(self.client.http().post(self.client.auth_url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                detail: text.chars().take(200).collect(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    /// `InvalidCredentials` when the backend rejects the pair; `Transport`,
    /// `Backend` or `Malformed` for infrastructure failures.
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.token_request("token?grant_type=password", &PasswordGrant { email, password })
            .await
    }

    /// `InvalidCredentials` when the token has been revoked or expired;
    /// otherwise as [`AuthApi::sign_in_with_password`].
    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.token_request(
            "token?grant_type=refresh_token",
            &RefreshGrant { refresh_token },
        )
        .await
    }
}
