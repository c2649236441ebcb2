//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path to the SQLite journal database
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Optional JSON catalog; the builtin catalog is used when unset
    pub catalog_path: Option<String>,
    /// Account opened at startup
    pub default_account_id: String,
    /// Balance a newly opened account starts with
    pub opening_balance: u64,
    /// Maximum number of journal entries written per transaction
    pub journal_batch_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let journal_batch_size: usize = var("JOURNAL_BATCH_SIZE", "64")
            .parse()
            .map_err(|_| ApiError::Config("Invalid JOURNAL_BATCH_SIZE".to_string()))?;
        if journal_batch_size == 0 {
            return Err(ApiError::Config(
                "JOURNAL_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        let default_account_id = var("DEFAULT_ACCOUNT_ID", "user123");
        if default_account_id.trim().is_empty() {
            return Err(ApiError::Config(
                "DEFAULT_ACCOUNT_ID must not be empty".to_string(),
            ));
        }

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite:./rewards.db"),
            api_port: var("API_PORT", "3001")
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            catalog_path: lookup("CATALOG_PATH").filter(|p| !p.trim().is_empty()),
            default_account_id,
            opening_balance: var("OPENING_BALANCE", "1250")
                .parse()
                .map_err(|_| ApiError::Config("Invalid OPENING_BALANCE".to_string()))?,
            journal_batch_size,
        })
    }
}
