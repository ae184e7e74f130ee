//! Semantic retrieval over the NFL knowledge base.

#[cfg(feature = "aws")]
mod bedrock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::KnowledgeHit;

#[cfg(feature = "aws")]
pub use bedrock::BedrockRetriever;

/// Largest result count a single retrieval may ask for.
pub const MAX_RESULTS_LIMIT: u32 = 20;

/// Ranked passage retrieval.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Return up to `max_results` passages ranked by relevance.
    async fn retrieve(&self, query: &str, max_results: u32) -> Result<Vec<KnowledgeHit>>;
}
