//! Read-only statement check.
//!
//! This is a textual heuristic, not a SQL parser. Keywords match as plain
//! substrings of the upper-cased statement, so `updated_at` trips `UPDATE`
//! and a keyword inside a string literal or comment still blocks the
//! statement. The execution credentials must be read-only regardless.

use crate::error::QueryError;

/// Keywords that mutate data or schema, checked in this order.
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "TRUNCATE",
];

const RETRIEVAL_KEYWORD: &str = "SELECT";

/// Validates statements before they reach the execution service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGuard;

impl StatementGuard {
    /// Check a statement, returning it trimmed when it may run.
    pub fn check(statement: &str) -> Result<&str, QueryError> {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyStatement);
        }

        let upper = trimmed.to_uppercase();
        if !upper.starts_with(RETRIEVAL_KEYWORD) {
            return Err(QueryError::NotReadOnly);
        }

        if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|kw| upper.contains(*kw)) {
            return Err(QueryError::ForbiddenKeyword((*keyword).to_string()));
        }

        Ok(trimmed)
    }
}
