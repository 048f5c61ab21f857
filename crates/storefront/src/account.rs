//! Account service: drives identity through its two-phase commit.
//!
//! Sign-in claims an identity optimistically when a cached profile exists
//! for the email (the collections then reload under the per-user local key
//! without waiting on the network) and commits it once the backend
//! confirms. A failed sign-in rolls the claim back to anonymous. The
//! profile cache lives here, constructor-injected and flushed on sign-out,
//! so it shares the identity lifecycle instead of lingering in a global.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use eshop_sync::{IdentityHandle, RetryPolicy, TtlCache, with_retry};

use crate::backend::{AuthApi, AuthError, CustomerProfile};

const PROFILE_CACHE_CAPACITY: u64 = 64;
const PROFILE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Orchestrates sign-in, session restore and sign-out.
pub struct AccountService {
    auth: Arc<dyn AuthApi>,
    identity: IdentityHandle,
    profiles: TtlCache<String, CustomerProfile>,
    restore_retry: RetryPolicy,
}

impl AccountService {
    /// Create the service around an auth client and the identity handle
    /// the synchronized collections observe.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, identity: IdentityHandle) -> Self {
        Self {
            auth,
            identity,
            profiles: TtlCache::new(PROFILE_CACHE_CAPACITY),
            restore_retry: RetryPolicy::default(),
        }
    }

    /// The identity handle collections subscribe to.
    #[must_use]
    pub const fn identity(&self) -> &IdentityHandle {
        &self.identity
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the auth failure; the identity is rolled back to anonymous.
    /// No retry here - retrying rejected credentials only delays the error.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CustomerProfile, AuthError> {
        // Phase one: provisional claim from the cached profile, if any.
        if let Some(profile) = self.profiles.get(&email.to_owned()) {
            debug!(user = %profile.id, "claiming cached identity while sign-in is in flight");
            self.identity.begin_login(profile.id);
        }

        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.profiles
                    .set(email.to_owned(), session.user.clone(), PROFILE_CACHE_TTL);
                // Phase two: commit the confirmed identity.
                self.identity.confirm_login(session.user.id.clone());
                Ok(session.user)
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed, rolling back provisional identity");
                self.identity.logout();
                Err(e)
            }
        }
    }

    /// Restore a session from a stored refresh token (app start).
    ///
    /// # Errors
    ///
    /// Returns the auth failure after the retry policy is exhausted; the
    /// identity stays anonymous.
    #[instrument(skip(self, refresh_token))]
    pub async fn restore(&self, refresh_token: &str) -> Result<CustomerProfile, AuthError> {
        let session =
            with_retry(self.restore_retry, || self.auth.refresh(refresh_token)).await?;
        self.profiles.set(
            session.user.email.clone(),
            session.user.clone(),
            PROFILE_CACHE_TTL,
        );
        self.identity.confirm_login(session.user.id.clone());
        Ok(session.user)
    }

    /// Sign out: flush the profile cache and return to anonymous.
    pub fn sign_out(&self) {
        self.profiles.invalidate_all();
        self.identity.logout();
    }
}
