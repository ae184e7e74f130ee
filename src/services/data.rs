// src/services/data.rs

//! SQL data service.
//!
//! Runs agent-supplied SELECT statements through the bounded executor and
//! shapes the result into the `query_database` wire payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{QueryConfig, QueryRequest, ResultMetadata, ResultSet};
use crate::query::QueryExecutor;

/// Arguments of the `query_database` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDatabaseArgs {
    #[serde(default)]
    pub sql: String,

    /// Database to run in; the configured default when absent
    #[serde(default)]
    pub database: Option<String>,
}

/// Wire form of a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub success: bool,
    pub message: String,
    pub columns: Vec<String>,

    /// One object per returned row, keys in column order
    pub data: Vec<Map<String, Value>>,

    /// Rows the query produced, before truncation
    pub row_count: usize,

    pub query_id: String,

    /// Seconds spent waiting for completion
    pub execution_time: u64,

    #[serde(default)]
    pub truncated: bool,

    #[serde(default)]
    pub total_rows: usize,
}

impl QueryPayload {
    /// Encode a result. NULL cells become JSON `null`.
    pub fn from_result_set(result: &ResultSet) -> Self {
        let data = result
            .rows
            .iter()
            .map(|row| {
                result
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let value = match row.get(i) {
                            Some(Some(cell)) => Value::String(cell.clone()),
                            _ => Value::Null,
                        };
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect();

        Self {
            success: true,
            message: result.summary(),
            columns: result.columns.clone(),
            data,
            row_count: result.metadata.total_rows,
            query_id: result.metadata.execution_id.clone(),
            execution_time: result.metadata.elapsed.as_secs(),
            truncated: result.metadata.truncated,
            total_rows: result.metadata.total_rows,
        }
    }

    /// Decode the payload back into a result, using `columns` for cell order.
    pub fn into_result_set(self) -> ResultSet {
        let rows = self
            .data
            .iter()
            .map(|object| {
                self.columns
                    .iter()
                    .map(|column| match object.get(column) {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(other) => Some(other.to_string()),
                    })
                    .collect()
            })
            .collect();

        ResultSet {
            columns: self.columns,
            rows,
            metadata: ResultMetadata {
                execution_id: self.query_id,
                elapsed: Duration::from_secs(self.execution_time),
                truncated: self.truncated,
                total_rows: self.total_rows,
            },
        }
    }
}

/// Service behind the `query_database` operation.
#[derive(Clone)]
pub struct DataService {
    executor: QueryExecutor,
    config: QueryConfig,
}

impl DataService {
    pub fn new(executor: QueryExecutor, config: QueryConfig) -> Self {
        Self { executor, config }
    }

    /// Run a statement with the configured deadline, interval and row cap.
    pub async fn run(&self, sql: &str, database: Option<&str>) -> Result<ResultSet> {
        let database = database
            .map(str::trim)
            .filter(|db| !db.is_empty())
            .unwrap_or(&self.config.database);
        let request = QueryRequest::new(sql, database, &self.config.output_location);

        let result = self
            .executor
            .execute(
                &request,
                self.config.max_wait(),
                self.config.poll_interval(),
                self.config.max_rows,
            )
            .await?;
        Ok(result)
    }

    pub async fn query_database(&self, args: QueryDatabaseArgs) -> Result<QueryPayload> {
        let result = self.run(&args.sql, args.database.as_deref()).await?;
        Ok(QueryPayload::from_result_set(&result))
    }
}

/// Plain-text report of a result, as shown to an operator or an LLM.
pub fn render_report(result: &ResultSet) -> String {
    if result.rows.is_empty() {
        return "Query executed successfully but returned no data rows.".to_string();
    }

    let summary = result.summary();
    format!(
        "{}:\n\n{}\n\nQuery executed successfully in {} seconds.\nQuery ID: {}",
        summary.trim_end_matches('.'),
        result.to_text_table(),
        result.metadata.elapsed.as_secs(),
        result.metadata.execution_id
    )
}
