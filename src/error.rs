// src/error.rs

//! Unified error handling for the gateway.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::ExecutionState;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the bounded query executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("SQL query is required")]
    EmptyStatement,

    #[error("Only SELECT queries are allowed for security reasons")]
    NotReadOnly,

    #[error("Query contains prohibited keyword: {0}")]
    ForbiddenKeyword(String),

    #[error("Failed to submit query: {0}")]
    SubmissionFailed(String),

    #[error("Query {state}: {reason}")]
    ExecutionFailed {
        state: ExecutionState,
        reason: String,
    },

    #[error("Query timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// Polling or result retrieval failed after a successful submission.
    #[error("Query service error: {0}")]
    Upstream(String),
}

impl QueryError {
    /// Whether the caller sent something the executor refuses to run.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyStatement | Self::NotReadOnly | Self::ForbiddenKeyword(_)
        )
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Query execution failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Game, team or file lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed composite identifier (e.g. a game ID)
    #[error("Invalid identifier format: {0}")]
    InvalidIdentifierFormat(String),

    /// A dependency call failed
    #[error("{service} error: {message}")]
    Upstream { service: String, message: String },

    /// Request field missing or unusable
    #[error("Validation error: {0}")]
    Validation(String),

    /// Direct request named an operation nobody serves
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Enveloped request used a method other than tools/list or tools/call
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// tools/call named a tool nobody serves
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV dataset could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    /// Create an error for a failed dependency call.
    pub fn upstream(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a lookup-miss error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP-style status for the response envelope: 400 for caller mistakes,
    /// 500 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Query(e) if e.is_rejected_input() => 400,
            Self::NotFound(_)
            | Self::InvalidIdentifierFormat(_)
            | Self::Validation(_)
            | Self::UnknownOperation(_)
            | Self::UnsupportedMethod(_)
            | Self::UnknownTool(_) => 400,
            _ => 500,
        }
    }
}
