// src/services/knowledge.rs

//! Knowledge base search service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::knowledge::{KnowledgeRetriever, MAX_RESULTS_LIMIT};
use crate::models::KnowledgeHit;

/// Arguments of the `search_knowledge` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchKnowledgeArgs {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgePayload {
    pub success: bool,
    pub query: String,
    pub results_count: usize,
    pub max_results: u32,
    pub results: Vec<KnowledgeHit>,
}

/// Service behind the `search_knowledge` operation.
#[derive(Clone)]
pub struct KnowledgeService {
    retriever: Option<Arc<dyn KnowledgeRetriever>>,
    default_max_results: u32,
}

impl KnowledgeService {
    /// `retriever` is `None` when no knowledge base is configured.
    pub fn new(retriever: Option<Arc<dyn KnowledgeRetriever>>, default_max_results: u32) -> Self {
        Self {
            retriever,
            default_max_results,
        }
    }

    pub async fn search_knowledge(&self, args: SearchKnowledgeArgs) -> Result<KnowledgePayload> {
        let query = args.query.trim();
        if query.is_empty() {
            return Err(AppError::validation(
                "Query is required for knowledge base search",
            ));
        }

        let retriever = self
            .retriever
            .as_ref()
            .ok_or_else(|| AppError::config("Knowledge base ID not configured"))?;

        let max_results = args
            .max_results
            .unwrap_or(self.default_max_results)
            .clamp(1, MAX_RESULTS_LIMIT);

        let mut results = retriever.retrieve(query, max_results).await?;
        results.truncate(max_results as usize);

        Ok(KnowledgePayload {
            success: true,
            query: query.to_string(),
            results_count: results.len(),
            max_results,
            results,
        })
    }
}
