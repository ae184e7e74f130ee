// src/models/mod.rs

//! Domain models for the gateway.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod game;
mod knowledge;
mod learning;
mod query;

// Re-export all public types
pub use config::{Config, KnowledgeConfig, LoggingConfig, QueryConfig, StorageConfig};
pub use game::{GameId, SeasonType};
pub use knowledge::{KnowledgeHit, UNKNOWN_SOURCE};
pub use learning::LearningCategory;
pub use query::{
    ExecutionState, HeaderConvention, QueryExecution, QueryRequest, ResultMetadata, ResultPage,
    ResultSet,
};
