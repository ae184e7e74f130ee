//! Query execution data model.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A statement to run against the execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// SQL text; must be a read-only retrieval statement
    pub statement: String,

    /// Logical database/catalog the statement runs in
    pub target_namespace: String,

    /// Writable location where the service stages output (e.g. `s3://bucket/prefix/`)
    pub result_sink: String,
}

impl QueryRequest {
    pub fn new(
        statement: impl Into<String>,
        target_namespace: impl Into<String>,
        result_sink: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            target_namespace: target_namespace.into(),
            result_sink: result_sink.into(),
        }
    }
}

/// Observed state of a remote execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// No further transition happens from a terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote execution, as returned by one status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecution {
    pub execution_id: String,
    pub state: ExecutionState,
    pub state_reason: Option<String>,
}

/// Where the column names of a result come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeaderConvention {
    /// The first row of the first page holds the column names.
    #[default]
    FirstRow,
    /// Column names come from the page's result metadata; every row is data.
    Metadata,
}

/// One page of raw results from the execution service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    /// Column names from result metadata, when the service reports them
    pub columns: Option<Vec<String>>,

    /// Cells in row order; `None` is SQL NULL
    pub rows: Vec<Vec<Option<String>>>,

    /// Token for the next page, if any
    pub next_token: Option<String>,
}

/// Bookkeeping attached to a materialized result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMetadata {
    pub execution_id: String,

    /// Accumulated poll time (a multiple of the poll interval)
    pub elapsed: Duration,

    /// Whether rows beyond the cap were dropped
    pub truncated: bool,

    /// Row count before truncation
    pub total_rows: usize,
}

/// A materialized, size-bounded query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub metadata: ResultMetadata,
}

impl ResultSet {
    /// Human-readable summary of the row count and any truncation.
    pub fn summary(&self) -> String {
        if self.metadata.total_rows == 0 {
            "Query executed successfully but returned no results".to_string()
        } else if self.metadata.truncated {
            format!(
                "Query returned {} rows. Showing first {} rows.",
                self.metadata.total_rows,
                self.rows.len()
            )
        } else {
            format!("Query returned {} rows.", self.metadata.total_rows)
        }
    }

    /// Render the rows as an aligned plain-text table. NULL cells print as `NULL`.
    pub fn to_text_table(&self) -> String {
        const NULL: &str = "NULL";

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.as_deref().unwrap_or(NULL).chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }

        let render = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render(self.columns.iter().map(String::as_str).collect()));
        for row in &self.rows {
            lines.push(render(
                row.iter().map(|c| c.as_deref().unwrap_or(NULL)).collect(),
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rows: Vec<Vec<Option<&str>>>, total_rows: usize) -> ResultSet {
        let rows: Vec<Vec<Option<String>>> = rows
            .into_iter()
            .map(|r| r.into_iter().map(|c| c.map(String::from)).collect())
            .collect();
        ResultSet {
            columns: vec!["team".into(), "wins".into()],
            metadata: ResultMetadata {
                execution_id: "q-1".into(),
                elapsed: Duration::from_secs(2),
                truncated: rows.len() < total_rows,
                total_rows,
            },
            rows,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Succeeded.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Cancelled.is_terminal());
    }

    #[test]
    fn test_text_table_alignment_and_nulls() {
        let rs = sample(vec![vec![Some("KC"), Some("11")], vec![Some("WSH"), None]], 2);
        assert_eq!(rs.to_text_table(), "team  wins\nKC    11\nWSH   NULL");
    }

    #[test]
    fn test_summary_mentions_truncation() {
        let rs = sample(vec![vec![Some("KC"), Some("11")]], 5);
        assert_eq!(rs.summary(), "Query returned 5 rows. Showing first 1 rows.");

        let rs = sample(vec![vec![Some("KC"), Some("11")]], 1);
        assert_eq!(rs.summary(), "Query returned 1 rows.");
    }

    #[test]
    fn test_header_convention_from_config_string() {
        let h: HeaderConvention = serde_json::from_str("\"metadata\"").unwrap();
        assert_eq!(h, HeaderConvention::Metadata);
        assert_eq!(HeaderConvention::default(), HeaderConvention::FirstRow);
    }
}
