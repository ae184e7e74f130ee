//! Knowledge base search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder source for hits without an S3 location.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// One ranked passage returned by semantic retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub content: String,
    pub score: f64,
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}
