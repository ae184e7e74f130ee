//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HeaderConvention;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query execution settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Object storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Knowledge base search settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Log filter settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Override settings from any variable source.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|v| v.trim().parse().ok())
        }

        if let Some(bucket) = var("NFL_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(db) = var("ATHENA_DATABASE") {
            self.query.database = db;
        }
        if let Some(location) = var("ATHENA_OUTPUT_LOCATION") {
            self.query.output_location = location;
        }
        if let Some(work_group) = var("ATHENA_WORK_GROUP") {
            self.query.work_group = work_group;
        }
        if let Some(secs) = parsed(var("QUERY_MAX_WAIT_SECS")) {
            self.query.max_wait_secs = secs;
        }
        if let Some(secs) = parsed(var("QUERY_POLL_INTERVAL_SECS")) {
            self.query.poll_interval_secs = secs;
        }
        if let Some(rows) = parsed(var("QUERY_MAX_ROWS")) {
            self.query.max_rows = rows;
        }
        if let Some(n) = parsed(var("MAX_CONCURRENT")) {
            self.storage.max_concurrent = n;
        }
        if let Some(id) = var("KNOWLEDGE_BASE_ID").filter(|id| !id.trim().is_empty()) {
            self.knowledge.knowledge_base_id = Some(id);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.query.database.trim().is_empty() {
            return Err(AppError::config("query.database is empty"));
        }
        if self.query.poll_interval_secs == 0 {
            return Err(AppError::config("query.poll_interval_secs must be > 0"));
        }
        if self.query.max_wait_secs == 0 {
            return Err(AppError::config("query.max_wait_secs must be > 0"));
        }
        if self.query.max_rows == 0 {
            return Err(AppError::config("query.max_rows must be > 0"));
        }
        if self.query.page_size == 0 || self.query.page_size > 1000 {
            return Err(AppError::config("query.page_size must be in 1..=1000"));
        }
        if self.query.max_result_pages == 0 {
            return Err(AppError::config("query.max_result_pages must be > 0"));
        }
        let sink = Url::parse(&self.query.output_location).map_err(|e| {
            AppError::config(format!(
                "query.output_location '{}' is not a URL: {e}",
                self.query.output_location
            ))
        })?;
        if sink.scheme() != "s3" || sink.host_str().is_none_or(str::is_empty) {
            return Err(AppError::config(format!(
                "query.output_location '{}' must be an s3://bucket/prefix location",
                self.query.output_location
            )));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(AppError::config("storage.bucket is empty"));
        }
        if self.storage.max_concurrent == 0 {
            return Err(AppError::config("storage.max_concurrent must be > 0"));
        }
        if !(1..=20).contains(&self.knowledge.default_max_results) {
            return Err(AppError::config(
                "knowledge.default_max_results must be in 1..=20",
            ));
        }
        Ok(())
    }
}

/// Query execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Database used when a request names none
    #[serde(default = "defaults::database")]
    pub database: String,

    /// Result sink for staged output
    #[serde(default = "defaults::output_location")]
    pub output_location: String,

    #[serde(default = "defaults::work_group")]
    pub work_group: String,

    /// Local polling deadline in seconds
    #[serde(default = "defaults::max_wait")]
    pub max_wait_secs: u64,

    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Row cap applied to returned results
    #[serde(default = "defaults::max_rows")]
    pub max_rows: usize,

    /// Rows requested per result page
    #[serde(default = "defaults::page_size")]
    pub page_size: i32,

    /// Result pages fetched before the result is reported as truncated
    #[serde(default = "defaults::max_result_pages")]
    pub max_result_pages: usize,

    #[serde(default)]
    pub header: HeaderConvention,

    /// Ask the service to stop an execution the caller gave up on
    #[serde(default = "defaults::cancel_on_timeout")]
    pub cancel_on_timeout: bool,
}

impl QueryConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
            output_location: defaults::output_location(),
            work_group: defaults::work_group(),
            max_wait_secs: defaults::max_wait(),
            poll_interval_secs: defaults::poll_interval(),
            max_rows: defaults::max_rows(),
            page_size: defaults::page_size(),
            max_result_pages: defaults::max_result_pages(),
            header: HeaderConvention::default(),
            cancel_on_timeout: defaults::cancel_on_timeout(),
        }
    }
}

/// Object storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::bucket")]
    pub bucket: String,

    /// Root of the per-game input/output folders
    #[serde(default = "defaults::game_data_prefix")]
    pub game_data_prefix: String,

    /// Root of written query learnings
    #[serde(default = "defaults::learning_prefix")]
    pub learning_prefix: String,

    #[serde(default = "defaults::team_map_key")]
    pub team_map_key: String,

    #[serde(default = "defaults::game_list_key")]
    pub game_list_key: String,

    /// Maximum concurrent object reads
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: defaults::bucket(),
            game_data_prefix: defaults::game_data_prefix(),
            learning_prefix: defaults::learning_prefix(),
            team_map_key: defaults::team_map_key(),
            game_list_key: defaults::game_list_key(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Knowledge base search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub knowledge_base_id: Option<String>,

    #[serde(default = "defaults::max_results")]
    pub default_max_results: u32,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            knowledge_base_id: None,
            default_max_results: defaults::max_results(),
        }
    }
}

/// Log filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Query defaults
    pub fn database() -> String {
        "nfl_stats_database".into()
    }
    pub fn output_location() -> String {
        "s3://alt-nfl-bucket/athena_queries/".into()
    }
    pub fn work_group() -> String {
        "primary".into()
    }
    pub fn max_wait() -> u64 {
        60
    }
    pub fn poll_interval() -> u64 {
        2
    }
    pub fn max_rows() -> usize {
        100
    }
    pub fn page_size() -> i32 {
        1000
    }
    pub fn max_result_pages() -> usize {
        10
    }
    pub fn cancel_on_timeout() -> bool {
        true
    }

    // Storage defaults
    pub fn bucket() -> String {
        "alt-nfl-bucket".into()
    }
    pub fn game_data_prefix() -> String {
        "nfl_espn_data".into()
    }
    pub fn learning_prefix() -> String {
        "knowledge_base_query_learnings".into()
    }
    pub fn team_map_key() -> String {
        "nfl_data/team_map.csv".into()
    }
    pub fn game_list_key() -> String {
        "nfl_data/game_list_clean.csv".into()
    }
    pub fn max_concurrent() -> usize {
        5
    }

    // Knowledge defaults
    pub fn max_results() -> u32 {
        10
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
