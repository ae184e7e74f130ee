// src/services/learning.rs

//! Query learning writer.
//!
//! Files markdown notes about queries that worked (or failed) under a
//! category folder so the knowledge base can pick them up on its next sync.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{LearningCategory, StorageConfig};
use crate::storage::{ObjectStore, join_key};

const CONTENT_TYPE: &str = "text/markdown";

/// Arguments of the `write_learning` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteLearningArgs {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningPayload {
    pub success: bool,
    pub message: String,
    pub location: String,
    pub category: LearningCategory,
    pub filename: String,
}

/// Object key of a learning written at `at`.
pub fn learning_key(
    prefix: &str,
    category: LearningCategory,
    filename: &str,
    at: DateTime<Utc>,
) -> String {
    let stamped = format!("{}_{}", at.format("%Y%m%d_%H%M%S"), filename);
    join_key(&join_key(prefix, category.folder()), &stamped)
}

/// Service behind the `write_learning` operation.
#[derive(Clone)]
pub struct LearningService {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl LearningService {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    pub async fn write_learning(&self, args: WriteLearningArgs) -> Result<LearningPayload> {
        self.write_learning_at(args, Utc::now()).await
    }

    /// Write a learning stamped with the given time.
    pub async fn write_learning_at(
        &self,
        args: WriteLearningArgs,
        at: DateTime<Utc>,
    ) -> Result<LearningPayload> {
        let filename = args.filename.trim();
        if filename.is_empty() || args.content.trim().is_empty() {
            return Err(AppError::validation("filename and content are required"));
        }
        if filename.contains(['/', '\\']) || filename == ".." {
            return Err(AppError::validation(format!(
                "filename '{filename}' must not contain path separators"
            )));
        }

        let category = LearningCategory::parse(args.category.as_deref());
        let key = learning_key(&self.config.learning_prefix, category, filename, at);

        self.store
            .put_bytes(&key, args.content.into_bytes(), CONTENT_TYPE)
            .await?;
        log::info!("Wrote {} learning to {}", category.as_str(), key);

        Ok(LearningPayload {
            success: true,
            message: "Learning written successfully".to_string(),
            location: self.store.location(&key),
            category,
            filename: filename.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use regex::Regex;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::LocalStore;

    fn service(tmp: &TempDir) -> (LocalStore, LearningService) {
        let store = LocalStore::new(tmp.path());
        let service = LearningService::new(Arc::new(store.clone()), StorageConfig::default());
        (store, service)
    }

    fn args(category: Option<&str>, filename: &str, content: &str) -> WriteLearningArgs {
        WriteLearningArgs {
            category: category.map(String::from),
            filename: filename.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_learning_key_layout() {
        let at = Utc.with_ymd_and_hms(2025, 1, 9, 7, 5, 3).unwrap();
        assert_eq!(
            learning_key(
                "knowledge_base_query_learnings",
                LearningCategory::TeamStats,
                "x.md",
                at
            ),
            "knowledge_base_query_learnings/query_patterns/team_stats_patterns/20250109_070503_x.md"
        );
    }

    #[tokio::test]
    async fn test_team_stats_learning_is_timestamped() {
        let tmp = TempDir::new().unwrap();
        let (store, service) = service(&tmp);

        let payload = service
            .write_learning(args(Some("team_stats"), "x.md", "# Use CAST for yards"))
            .await
            .unwrap();

        let pattern =
            Regex::new(r"query_patterns/team_stats_patterns/\d{8}_\d{6}_x\.md$").unwrap();
        assert!(pattern.is_match(&payload.location), "{}", payload.location);
        assert_eq!(payload.category, LearningCategory::TeamStats);

        let keys = store.list_keys("knowledge_base_query_learnings/").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(pattern.is_match(&keys[0]));
        assert_eq!(
            store.get_bytes(&keys[0]).await.unwrap().unwrap(),
            b"# Use CAST for yards".to_vec()
        );
    }

    #[tokio::test]
    async fn test_unknown_category_goes_to_general() {
        let tmp = TempDir::new().unwrap();
        let (_, service) = service(&tmp);

        let payload = service
            .write_learning(args(Some("trivia"), "y.md", "content"))
            .await
            .unwrap();
        assert_eq!(payload.category, LearningCategory::General);
        assert!(payload.location.contains("query_patterns/general_patterns/"));
    }

    #[tokio::test]
    async fn test_rejects_missing_or_unsafe_filenames() {
        let tmp = TempDir::new().unwrap();
        let (_, service) = service(&tmp);

        for bad in [args(None, "", "c"), args(None, "a.md", "  "), args(None, "../a.md", "c")] {
            let err = service.write_learning(bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
