// src/gateway/mod.rs

//! Request dispatch for the agent tool gateway.
//!
//! Three inbound shapes are accepted:
//!
//! 1. Direct: `{"operation": "query_database", "sql": "..."}`
//! 2. Enveloped: `{"method": "tools/call", "params": {"name": ..., "arguments": {...}}}`
//!    or `{"method": "tools/list"}`
//! 3. Either of the above JSON-encoded in a `body` string (API Gateway proxy events)
//!
//! Every request produces a [`GatewayResponse`]; failures never escape as
//! faults and are classified into a status code instead.

mod tools;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::knowledge::KnowledgeRetriever;
use crate::models::Config;
use crate::query::{QueryExecutor, QueryService};
use crate::services::{
    CatalogService, DataService, GameService, KnowledgeService, LearningService,
};
use crate::storage::ObjectStore;

pub use tools::{Operation, Tool, tool_list};

/// Parsed inbound request.
#[derive(Debug, Clone)]
pub enum Request {
    /// Operation invoked directly.
    Direct(Operation),

    /// `tools/list`
    ListTools,

    /// `tools/call` on a named tool.
    CallTool { tool: Tool, operation: Operation },
}

impl Request {
    pub fn from_event(event: Value) -> Result<Self> {
        if event.get("operation").is_some() {
            return Operation::from_value(event).map(Self::Direct);
        }
        if event.get("method").is_some() {
            return Self::from_envelope(event);
        }

        match event.get("body") {
            Some(Value::String(body)) => {
                let inner: Value = serde_json::from_str(body)
                    .map_err(|e| AppError::validation(format!("Request body is not valid JSON: {e}")))?;
                Self::from_unwrapped(inner)
            }
            Some(inner @ Value::Object(_)) => Self::from_unwrapped(inner.clone()),
            _ => Err(AppError::UnsupportedMethod("<missing>".to_string())),
        }
    }

    /// Body contents may not carry another `body`.
    fn from_unwrapped(inner: Value) -> Result<Self> {
        if inner.get("operation").is_some() {
            Operation::from_value(inner).map(Self::Direct)
        } else {
            Self::from_envelope(inner)
        }
    }

    fn from_envelope(mut envelope: Value) -> Result<Self> {
        let method = envelope
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();

        match method.as_str() {
            "tools/list" => Ok(Self::ListTools),
            "tools/call" => {
                let mut params = envelope
                    .get_mut("params")
                    .map(Value::take)
                    .unwrap_or_else(|| json!({}));
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let tool = Tool::from_name(name)?;

                let arguments = params
                    .get_mut("arguments")
                    .map(Value::take)
                    .unwrap_or_else(|| json!({}));
                let operation = Operation::from_value(arguments)?;
                if operation.tool() != tool {
                    return Err(AppError::UnknownOperation(format!(
                        "{} is not an operation of {}",
                        operation.name(),
                        tool.name()
                    )));
                }
                Ok(Self::CallTool { tool, operation })
            }
            _ => Err(AppError::UnsupportedMethod(method)),
        }
    }
}

/// Transport envelope returned for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    /// JSON-encoded body
    pub body: String,
}

impl GatewayResponse {
    /// Wrap an operation payload as `{content: [{type: "text", text}]}`.
    pub fn content(payload: &Value) -> Self {
        let text = match serde_json::to_string_pretty(payload) {
            Ok(text) => text,
            Err(e) => return Self::error(&AppError::from(e)),
        };
        Self::json(200, &json!({ "content": [{ "type": "text", "text": text }] }))
    }

    pub fn error(error: &AppError) -> Self {
        Self::json(error.status_code(), &json!({ "error": error.to_string() }))
    }

    fn json(status_code: u16, body: &Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Decoded body.
    pub fn body_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Text of the first content item, or the error message.
    pub fn text(&self) -> Option<String> {
        let body = self.body_json().ok()?;
        body["content"][0]["text"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .map(str::to_string)
    }
}

/// The gateway: one service per tool behind a single entry point.
#[derive(Clone)]
pub struct Gateway {
    data: DataService,
    games: GameService,
    knowledge: KnowledgeService,
    learning: LearningService,
    catalog: CatalogService,
}

impl Gateway {
    /// Assemble the services over injected backends.
    pub fn new(
        config: &Config,
        query_service: Arc<dyn QueryService>,
        store: Arc<dyn ObjectStore>,
        retriever: Option<Arc<dyn KnowledgeRetriever>>,
    ) -> Self {
        let executor = QueryExecutor::from_config(query_service, &config.query);
        Self {
            data: DataService::new(executor, config.query.clone()),
            games: GameService::new(Arc::clone(&store), config.storage.clone()),
            knowledge: KnowledgeService::new(retriever, config.knowledge.default_max_results),
            learning: LearningService::new(Arc::clone(&store), config.storage.clone()),
            catalog: CatalogService::new(store, config.storage.clone()),
        }
    }

    pub fn data(&self) -> &DataService {
        &self.data
    }

    /// Run one operation and return its payload as JSON.
    pub async fn dispatch(&self, operation: Operation) -> Result<Value> {
        log::info!("Dispatching {}", operation.name());
        let payload = match operation {
            Operation::QueryDatabase(args) => {
                serde_json::to_value(self.data.query_database(args).await?)?
            }
            Operation::GetGameDetails(args) => {
                serde_json::to_value(self.games.get_game_details(args).await?)?
            }
            Operation::SearchKnowledge(args) => {
                serde_json::to_value(self.knowledge.search_knowledge(args).await?)?
            }
            Operation::WriteLearning(args) => {
                serde_json::to_value(self.learning.write_learning(args).await?)?
            }
            Operation::ResolveTeamName(args) => {
                serde_json::to_value(self.catalog.resolve_team_name(args).await?)?
            }
            Operation::GetGameList(args) => {
                serde_json::to_value(self.catalog.get_game_list(args).await?)?
            }
            Operation::GetHeadToHead(args) => {
                serde_json::to_value(self.catalog.get_head_to_head(args).await?)?
            }
            Operation::GetRecentGames(args) => {
                serde_json::to_value(self.catalog.get_recent_games(args).await?)?
            }
        };
        Ok(payload)
    }

    /// Handle a parsed request.
    pub async fn handle_request(&self, request: Request) -> GatewayResponse {
        let operation = match request {
            Request::ListTools => return GatewayResponse::json(200, &tool_list()),
            Request::Direct(operation) => operation,
            Request::CallTool { tool, operation } => {
                log::debug!("tools/call {}", tool.name());
                operation
            }
        };

        let name = operation.name();
        match self.dispatch(operation).await {
            Ok(payload) => GatewayResponse::content(&payload),
            Err(e) => {
                if e.status_code() >= 500 {
                    log::error!("{} failed: {}", name, e);
                } else {
                    log::warn!("{} rejected: {}", name, e);
                }
                GatewayResponse::error(&e)
            }
        }
    }

    /// Handle a raw inbound event.
    pub async fn handle(&self, event: Value) -> GatewayResponse {
        match Request::from_event(event) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                log::warn!("Rejected request: {}", e);
                GatewayResponse::error(&e)
            }
        }
    }
}

#[cfg(feature = "aws")]
mod connect {
    use std::sync::Arc;

    use aws_config::BehaviorVersion;

    use super::Gateway;
    use crate::config::ConfigLoader;
    use crate::error::Result;
    use crate::knowledge::{BedrockRetriever, KnowledgeRetriever};
    use crate::models::Config;
    use crate::query::AthenaQueryService;
    use crate::storage::{ObjectStore, S3Store};

    /// Load the shared AWS SDK configuration, optionally from a named profile.
    pub async fn sdk_config(profile: Option<&str>) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }

    impl Gateway {
        /// Build the production gateway from the environment: defaults, then
        /// the config object named by `CONFIG_S3_KEY` if set, then variable
        /// overrides.
        pub async fn from_env() -> Result<(Self, Config)> {
            let sdk = sdk_config(None).await;

            let mut bootstrap = Config::default();
            bootstrap.apply_env();
            let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(
                aws_sdk_s3::Client::new(&sdk),
                bootstrap.storage.bucket.clone(),
            ));

            let config = match ConfigLoader::from_env(Arc::clone(&store)) {
                Some(loader) => loader.load_config().await?,
                None => bootstrap,
            };
            Self::connect(&sdk, config, None)
        }

        /// Build the gateway over AWS backends. `store` replaces the S3 store
        /// when given.
        pub fn connect(
            sdk: &aws_config::SdkConfig,
            mut config: Config,
            store: Option<Arc<dyn ObjectStore>>,
        ) -> Result<(Self, Config)> {
            config.apply_env();
            config.validate()?;

            let query = Arc::new(AthenaQueryService::new(
                aws_sdk_athena::Client::new(sdk),
                config.query.work_group.clone(),
            ));
            let store = store.unwrap_or_else(|| {
                Arc::new(S3Store::new(
                    aws_sdk_s3::Client::new(sdk),
                    config.storage.bucket.clone(),
                ))
            });
            let retriever = config.knowledge.knowledge_base_id.as_ref().map(|id| {
                Arc::new(BedrockRetriever::new(
                    aws_sdk_bedrockagentruntime::Client::new(sdk),
                    id.clone(),
                )) as Arc<dyn KnowledgeRetriever>
            });
            if retriever.is_none() {
                log::warn!("No knowledge base configured; search_knowledge will fail");
            }

            log::info!(
                "Gateway ready: database={}, bucket={}",
                config.query.database,
                config.storage.bucket
            );
            Ok((Self::new(&config, query, store, retriever), config))
        }
    }
}

#[cfg(feature = "aws")]
pub use connect::sdk_config;
