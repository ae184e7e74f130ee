//! Bedrock knowledge base retrieval.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::Client;
use aws_sdk_bedrockagentruntime::error::DisplayErrorContext;
use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseQuery, KnowledgeBaseRetrievalConfiguration, KnowledgeBaseRetrievalResult,
    KnowledgeBaseVectorSearchConfiguration, SearchType,
};
use aws_smithy_types::{Document, Number};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::knowledge::{KnowledgeRetriever, MAX_RESULTS_LIMIT};
use crate::models::{KnowledgeHit, UNKNOWN_SOURCE};

const SERVICE: &str = "Bedrock knowledge base";

/// Retriever bound to one knowledge base.
#[derive(Clone)]
pub struct BedrockRetriever {
    client: Client,
    knowledge_base_id: String,
}

impl BedrockRetriever {
    pub fn new(client: Client, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            client,
            knowledge_base_id: knowledge_base_id.into(),
        }
    }
}

fn document_to_json(doc: &Document) -> Value {
    match doc {
        Document::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), document_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Document::Array(items) => Value::Array(items.iter().map(document_to_json).collect()),
        Document::Number(Number::PosInt(n)) => Value::from(*n),
        Document::Number(Number::NegInt(n)) => Value::from(*n),
        Document::Number(Number::Float(f)) => Value::from(*f),
        #[allow(unreachable_patterns)]
        Document::Number(n) => Value::from(n.to_f64_lossy()),
        Document::String(s) => Value::String(s.clone()),
        Document::Bool(b) => Value::Bool(*b),
        Document::Null => Value::Null,
    }
}

fn metadata_to_json(metadata: &HashMap<String, Document>) -> Value {
    // Sorted so repeated searches render identically.
    let mut entries: Vec<_> = metadata.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (k.clone(), document_to_json(v)))
            .collect(),
    )
}

fn to_hit(result: &KnowledgeBaseRetrievalResult) -> KnowledgeHit {
    KnowledgeHit {
        content: result
            .content()
            .map(|c| c.text().to_string())
            .unwrap_or_default(),
        score: result.score().unwrap_or(0.0),
        source: result
            .location()
            .and_then(|l| l.s3_location())
            .and_then(|s3| s3.uri())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string(),
        metadata: result.metadata().map(metadata_to_json),
    }
}

#[async_trait]
impl KnowledgeRetriever for BedrockRetriever {
    async fn retrieve(&self, query: &str, max_results: u32) -> Result<Vec<KnowledgeHit>> {
        let number_of_results = max_results.clamp(1, MAX_RESULTS_LIMIT) as i32;

        let retrieval_query = KnowledgeBaseQuery::builder()
            .text(query)
            .build();
        let retrieval_config = KnowledgeBaseRetrievalConfiguration::builder()
            .vector_search_configuration(
                KnowledgeBaseVectorSearchConfiguration::builder()
                    .number_of_results(number_of_results)
                    .override_search_type(SearchType::Semantic)
                    .build(),
            )
            .build();

        let output = self
            .client
            .retrieve()
            .knowledge_base_id(&self.knowledge_base_id)
            .retrieval_query(retrieval_query)
            .retrieval_configuration(retrieval_config)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, DisplayErrorContext(&e)))?;

        let hits: Vec<KnowledgeHit> = output.retrieval_results().iter().map(to_hit).collect();
        log::info!(
            "Knowledge base {} returned {} passages",
            self.knowledge_base_id,
            hits.len()
        );
        Ok(hits)
    }
}
