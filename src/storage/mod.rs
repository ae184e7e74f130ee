//! Object storage abstractions.
//!
//! Game files, CSV datasets, configuration and written learnings all live in
//! one bucket. The gateway only needs four primitives from it, so both the S3
//! backend and the local directory backend sit behind [`ObjectStore`].
//!
//! ## Bucket Layout
//!
//! ```text
//! {bucket}/
//! ├── nfl_espn_data/season_YYYY/{season-type}/week_WW/{game_id}/
//! │   ├── inputs/*.json
//! │   └── outputs/*.json
//! ├── nfl_data/
//! │   ├── team_map.csv
//! │   └── game_list_clean.csv
//! ├── knowledge_base_query_learnings/query_patterns/{folder}/
//! │   └── YYYYMMDD_HHMMSS_{filename}
//! └── athena_queries/          # Query result sink
//! ```

pub mod local;
#[cfg(feature = "aws")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;

pub use local::LocalStore;
#[cfg(feature = "aws")]
pub use s3::S3Store;

/// Trait for object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object key under `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read an object, returning `None` if it does not exist.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Create or replace an object.
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Display location of a key (e.g. `s3://bucket/key`).
    fn location(&self, key: &str) -> String;
}

/// Last path segment of an object key; empty for "directory" keys.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or_default()
}

/// Join key segments with exactly one `/` between them.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
