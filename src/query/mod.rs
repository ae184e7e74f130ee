//! Asynchronous query execution.
//!
//! - `QueryService`: the remote execution service (Athena in production)
//! - `StatementGuard`: read-only statement check run before submission
//! - `QueryExecutor`: submit, poll under a deadline, collect a bounded result

#[cfg(feature = "aws")]
mod athena;
mod executor;
mod guard;

use async_trait::async_trait;

use crate::models::{QueryExecution, QueryRequest, ResultPage};

#[cfg(feature = "aws")]
pub use athena::AthenaQueryService;
pub use executor::QueryExecutor;
pub use guard::{FORBIDDEN_KEYWORDS, StatementGuard};

/// Error text from a query service call.
pub type ServiceResult<T> = std::result::Result<T, String>;

/// Remote service that runs statements asynchronously and is polled for state.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submit a statement and return its execution ID.
    async fn start(&self, request: &QueryRequest) -> ServiceResult<String>;

    /// Fetch the current state of an execution.
    async fn status(&self, execution_id: &str) -> ServiceResult<QueryExecution>;

    /// Fetch one page of results of a succeeded execution.
    async fn results(
        &self,
        execution_id: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> ServiceResult<ResultPage>;

    /// Ask the service to stop an execution.
    async fn cancel(&self, execution_id: &str) -> ServiceResult<()>;
}
