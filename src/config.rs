//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and shared through `AppState`.

use std::env;

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Firestore (or the emulator when FIRESTORE_EMULATOR_HOST is set).
    Firestore,
    /// In-process store, used by tests and local development.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Persistence backend selection
    pub store_backend: StoreBackend,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Default page size for listings
    pub default_page_size: u32,
    /// Hard cap on caller-supplied page sizes
    pub max_page_size: u32,
    /// Bounded attempts for guarded-update retry loops
    pub update_retry_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(other) => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            default_page_size: parse_env_or("DEFAULT_PAGE_SIZE", 20),
            max_page_size: parse_env_or("MAX_PAGE_SIZE", 100),
            update_retry_attempts: parse_env_or("UPDATE_RETRY_ATTEMPTS", 3),
        })
    }

    /// Default config for tests: memory backend, small pages.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            frontend_url: "http://localhost:5173".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            update_retry_attempts: 3,
        }
    }
}

fn parse_env_or(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
