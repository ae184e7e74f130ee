// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! file (local path or object store key), then environment variables.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::ObjectStore;

/// Variable naming the config object in the bucket.
pub const CONFIG_KEY_VAR: &str = "CONFIG_S3_KEY";

/// Config loader for the Lambda environment.
pub struct ConfigLoader {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl ConfigLoader {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Loader for the key in `CONFIG_S3_KEY`, if set.
    pub fn from_env(store: Arc<dyn ObjectStore>) -> Option<Self> {
        std::env::var(CONFIG_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|key| Self::new(store, key.trim()))
    }

    pub async fn load_config(&self) -> Result<Config> {
        log::info!("Loading config from {}", self.store.location(&self.key));
        let bytes = self.store.get_bytes(&self.key).await?.ok_or_else(|| {
            AppError::config(format!(
                "Config file not found: {}",
                self.store.location(&self.key)
            ))
        })?;

        let text = String::from_utf8(bytes).map_err(|e| {
            AppError::config(format!("Config file {} is not valid UTF-8: {e}", self.key))
        })?;
        Config::from_toml(&text)
    }
}
