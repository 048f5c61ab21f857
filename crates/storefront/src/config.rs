//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ESHOP_BACKEND_URL` - Base URL of the backend-as-a-service project
//! - `ESHOP_BACKEND_PUBLISHABLE_KEY` - Publishable API key (safe for clients)
//! - `ESHOP_BACKEND_SERVICE_KEY` - Service API key (server-side only)
//!
//! ## Optional
//! - `ESHOP_DATA_DIR` - Directory for the file-backed local store
//!   (in-memory store is used when unset)
//! - `ESHOP_SYNC_DEBOUNCE_MS` - Remote write debounce window (default: 500)
//! - `ESHOP_SYNC_RETRY_ATTEMPTS` - Fetch retry attempts (default: 3)
//! - `ESHOP_SYNC_RETRY_DELAY_MS` - Delay between retries (default: 250)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use eshop_sync::{RetryPolicy, SyncSettings};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration.
    pub backend: BackendConfig,
    /// Synchronization engine settings.
    pub sync: SyncSettings,
    /// Directory for the file-backed local store, if any.
    pub data_dir: Option<PathBuf>,
}

/// Backend-as-a-service API configuration.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc123.supabase.co`.
    pub base_url: Url,
    /// Publishable API key (safe to expose in browsers).
    pub publishable_key: String,
    /// Service API key (server-side only).
    pub service_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("publishable_key", &self.publishable_key)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration, reading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = BackendConfig::from_env()?;

        let debounce = get_env_ms("ESHOP_SYNC_DEBOUNCE_MS", 500)?;
        let retry_attempts = get_env_u32("ESHOP_SYNC_RETRY_ATTEMPTS", 3)?;
        let retry_delay = get_env_ms("ESHOP_SYNC_RETRY_DELAY_MS", 250)?;

        let data_dir = get_optional_env("ESHOP_DATA_DIR").map(PathBuf::from);

        Ok(Self {
            backend,
            sync: SyncSettings {
                debounce,
                retry: RetryPolicy::new(retry_attempts, retry_delay),
            },
            data_dir,
        })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("ESHOP_BACKEND_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ESHOP_BACKEND_URL".to_owned(), e.to_string()))?;

        Ok(Self {
            base_url,
            publishable_key: get_required_env("ESHOP_BACKEND_PUBLISHABLE_KEY")?,
            service_key: get_required_secret("ESHOP_BACKEND_SERVICE_KEY")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get a millisecond duration with a default.
fn get_env_ms(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let ms = match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))?,
        Err(_) => default,
    };
    Ok(Duration::from_millis(ms))
}

/// Get a u32 with a default.
fn get_env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set(key: &str, value: &str) {
        // SAFETY: guarded by ENV_LOCK; no other thread reads the
        // environment concurrently in this test binary.
        unsafe { std::env::set_var(key, value) };
    }

    fn unset(key: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn test_from_env_with_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        set("ESHOP_BACKEND_URL", "https://proj.example.com");
        set("ESHOP_BACKEND_PUBLISHABLE_KEY", "pk_test_123");
        set("ESHOP_BACKEND_SERVICE_KEY", "sk_test_456");
        unset("ESHOP_SYNC_DEBOUNCE_MS");
        unset("ESHOP_SYNC_RETRY_ATTEMPTS");
        unset("ESHOP_SYNC_RETRY_DELAY_MS");
        unset("ESHOP_DATA_DIR");

        let config = StorefrontConfig::from_env().unwrap();
        assert_eq!(config.backend.base_url.as_str(), "https://proj.example.com/");
        assert_eq!(config.sync.debounce, Duration::from_millis(500));
        assert_eq!(config.sync.retry.max_attempts, 3);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_missing_and_invalid_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        set("ESHOP_BACKEND_PUBLISHABLE_KEY", "pk_test_123");
        set("ESHOP_BACKEND_SERVICE_KEY", "sk_test_456");

        unset("ESHOP_BACKEND_URL");
        assert!(matches!(
            StorefrontConfig::from_env(),
            Err(ConfigError::MissingEnvVar(var)) if var == "ESHOP_BACKEND_URL"
        ));

        set("ESHOP_BACKEND_URL", "not a url");
        assert!(matches!(
            StorefrontConfig::from_env(),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "ESHOP_BACKEND_URL"
        ));

        set("ESHOP_BACKEND_URL", "https://proj.example.com");
        set("ESHOP_SYNC_DEBOUNCE_MS", "soon");
        assert!(matches!(
            StorefrontConfig::from_env(),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "ESHOP_SYNC_DEBOUNCE_MS"
        ));
        unset("ESHOP_SYNC_DEBOUNCE_MS");
    }

    #[test]
    fn test_debug_redacts_service_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        set("ESHOP_BACKEND_URL", "https://proj.example.com");
        set("ESHOP_BACKEND_PUBLISHABLE_KEY", "pk_test_123");
        set("ESHOP_BACKEND_SERVICE_KEY", "sk_live_secret");

        let config = StorefrontConfig::from_env().unwrap();
        let debug = format!("{:?}", config.backend);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk_live_secret"));
    }
}
