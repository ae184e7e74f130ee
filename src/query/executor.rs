//! Bounded asynchronous query executor.
//!
//! Submits one statement, polls its state at a fixed interval until it reaches
//! a terminal state or the local deadline passes, then reads result pages
//! while keeping at most `max_rows` rows. Paging stops at the page cap or when
//! the unused part of the deadline runs out; the rows seen so far are then
//! counted and the result is marked truncated.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::QueryError;
use crate::models::{
    ExecutionState, HeaderConvention, QueryConfig, QueryRequest, ResultMetadata, ResultPage,
    ResultSet,
};
use crate::query::{QueryService, StatementGuard};

/// Floor for the poll interval so a zero interval cannot spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_PAGE_SIZE: i32 = 1000;

const DEFAULT_MAX_PAGES: usize = 10;

/// Runs read-only statements against an injected [`QueryService`].
#[derive(Clone)]
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    header: HeaderConvention,
    cancel_on_timeout: bool,
    page_size: i32,
    max_pages: usize,
}

/// Rows read from the result pages.
struct CollectedRows {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    total_rows: usize,
    complete: bool,
}

impl QueryExecutor {
    /// Create an executor with first-row headers and cancel-on-timeout.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self {
            service,
            header: HeaderConvention::FirstRow,
            cancel_on_timeout: true,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Create an executor using the header and paging settings of a config.
    pub fn from_config(service: Arc<dyn QueryService>, config: &QueryConfig) -> Self {
        Self::new(service)
            .with_header(config.header)
            .with_cancel_on_timeout(config.cancel_on_timeout)
            .with_page_size(config.page_size)
            .with_max_pages(config.max_result_pages)
    }

    pub fn with_header(mut self, header: HeaderConvention) -> Self {
        self.header = header;
        self
    }

    pub fn with_cancel_on_timeout(mut self, cancel: bool) -> Self {
        self.cancel_on_timeout = cancel;
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Execute a statement and return a result of at most `max_rows` rows.
    ///
    /// Input is validated before anything is submitted. A `FAILED` or
    /// `CANCELLED` execution ends the wait immediately. When the deadline
    /// passes the execution is reported as [`QueryError::Timeout`] and, if
    /// enabled, a best-effort stop request is sent. Result paging shares the
    /// same deadline: whatever polling left unused bounds the page fetches.
    pub async fn execute(
        &self,
        request: &QueryRequest,
        max_wait: Duration,
        poll_interval: Duration,
        max_rows: usize,
    ) -> Result<ResultSet, QueryError> {
        let statement = StatementGuard::check(&request.statement)?;
        let request = QueryRequest {
            statement: statement.to_string(),
            ..request.clone()
        };

        let execution_id = self
            .service
            .start(&request)
            .await
            .map_err(QueryError::SubmissionFailed)?;
        log::info!(
            "Submitted query {} against {}",
            execution_id,
            request.target_namespace
        );

        let elapsed = self
            .wait_for_completion(&execution_id, max_wait, poll_interval)
            .await?;

        let deadline = Instant::now() + max_wait.saturating_sub(elapsed);
        let CollectedRows {
            columns,
            rows,
            total_rows,
            complete,
        } = self.collect_rows(&execution_id, max_rows, deadline).await?;
        let truncated = !complete || total_rows > rows.len();
        log::info!(
            "Query {} succeeded after {}s: {} rows{}",
            execution_id,
            elapsed.as_secs(),
            total_rows,
            if truncated { " (truncated)" } else { "" }
        );

        Ok(ResultSet {
            columns,
            rows,
            metadata: ResultMetadata {
                execution_id,
                elapsed,
                truncated,
                total_rows,
            },
        })
    }

    /// Poll until a terminal state, returning the accumulated poll time.
    async fn wait_for_completion(
        &self,
        execution_id: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Result<Duration, QueryError> {
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        let mut elapsed = Duration::ZERO;

        while elapsed < max_wait {
            let execution = self
                .service
                .status(execution_id)
                .await
                .map_err(QueryError::Upstream)?;

            let state = execution.state;
            if !state.is_terminal() {
                log::debug!(
                    "Query {} still running after {}s",
                    execution_id,
                    elapsed.as_secs()
                );
                tokio::time::sleep(poll_interval).await;
                elapsed += poll_interval;
                continue;
            }
            if state == ExecutionState::Succeeded {
                return Ok(elapsed);
            }

            let reason = execution
                .state_reason
                .unwrap_or_else(|| "Unknown error".to_string());
            log::warn!("Query {} ended {}: {}", execution_id, state, reason);
            return Err(QueryError::ExecutionFailed { state, reason });
        }

        log::warn!(
            "Query {} still running after {}s; giving up",
            execution_id,
            max_wait.as_secs()
        );
        if self.cancel_on_timeout {
            match self.service.cancel(execution_id).await {
                Ok(()) => log::info!("Requested stop of query {}", execution_id),
                Err(e) => log::warn!("Failed to stop query {}: {}", execution_id, e),
            }
        }

        Err(QueryError::Timeout(max_wait))
    }

    /// Read result pages, keeping the first `max_rows` rows and counting the
    /// rest. The first page is always read; later pages only while under the
    /// page cap and before `deadline`.
    async fn collect_rows(
        &self,
        execution_id: &str,
        max_rows: usize,
        deadline: Instant,
    ) -> Result<CollectedRows, QueryError> {
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut total_rows = 0;
        let mut next_token = None;
        let mut pages = 0;

        let complete = loop {
            let ResultPage {
                columns: page_columns,
                rows: page_rows,
                next_token: page_token,
            } = self
                .service
                .results(execution_id, next_token.take(), self.page_size)
                .await
                .map_err(QueryError::Upstream)?;
            pages += 1;

            let mut page_rows = page_rows.into_iter();
            if columns.is_none() {
                columns = Some(match self.header {
                    HeaderConvention::FirstRow => page_rows
                        .next()
                        .map(|header| header.into_iter().map(Option::unwrap_or_default).collect())
                        .unwrap_or_default(),
                    HeaderConvention::Metadata => page_columns.unwrap_or_default(),
                });
            }

            for row in page_rows {
                total_rows += 1;
                if rows.len() < max_rows {
                    rows.push(row);
                }
            }

            let Some(token) = page_token else {
                break true;
            };
            if pages >= self.max_pages || Instant::now() >= deadline {
                log::warn!(
                    "Query {} has more results after {} pages; counted {} rows",
                    execution_id,
                    pages,
                    total_rows
                );
                break false;
            }
            next_token = Some(token);
        };

        Ok(CollectedRows {
            columns: columns.unwrap_or_default(),
            rows,
            total_rows,
            complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::QueryExecution;
    use crate::query::ServiceResult;

    /// Query service that replays a fixed script of states and pages.
    #[derive(Default)]
    struct ScriptedService {
        states: Mutex<VecDeque<(ExecutionState, Option<String>)>>,
        pages: Mutex<VecDeque<ResultPage>>,
        calls: Mutex<Vec<&'static str>>,
        submitted: Mutex<Option<QueryRequest>>,
        fail_start: bool,
        fail_status: bool,
        /// Serve full pages with a next token forever, each after this delay.
        endless_pages: Option<Duration>,
    }

    impl ScriptedService {
        fn with_states(states: &[ExecutionState]) -> Self {
            Self {
                states: Mutex::new(states.iter().map(|s| (*s, None)).collect()),
                ..Default::default()
            }
        }

        fn pages(self, pages: Vec<ResultPage>) -> Self {
            *self.pages.lock().unwrap() = pages.into();
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }
    }

    #[async_trait]
    impl QueryService for ScriptedService {
        async fn start(&self, request: &QueryRequest) -> ServiceResult<String> {
            self.calls.lock().unwrap().push("start");
            if self.fail_start {
                return Err("AccessDeniedException".into());
            }
            *self.submitted.lock().unwrap() = Some(request.clone());
            Ok("exec-1".into())
        }

        async fn status(&self, execution_id: &str) -> ServiceResult<QueryExecution> {
            self.calls.lock().unwrap().push("status");
            if self.fail_status {
                return Err("ThrottlingException".into());
            }
            let mut states = self.states.lock().unwrap();
            // The last scripted state repeats forever.
            let (state, reason) = if states.len() > 1 {
                states.pop_front().unwrap()
            } else {
                states.front().cloned().unwrap()
            };
            Ok(QueryExecution {
                execution_id: execution_id.to_string(),
                state,
                state_reason: reason,
            })
        }

        async fn results(
            &self,
            _execution_id: &str,
            _next_token: Option<String>,
            _page_size: i32,
        ) -> ServiceResult<ResultPage> {
            self.calls.lock().unwrap().push("results");
            if let Some(delay) = self.endless_pages {
                tokio::time::sleep(delay).await;
                return Ok(ResultPage {
                    rows: data_rows(0..50),
                    next_token: Some("more".into()),
                    ..Default::default()
                });
            }
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn cancel(&self, _execution_id: &str) -> ServiceResult<()> {
            self.calls.lock().unwrap().push("cancel");
            Ok(())
        }
    }

    fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    fn data_rows(range: std::ops::Range<usize>) -> Vec<Vec<Option<String>>> {
        range
            .map(|i| vec![Some(format!("team{i}")), Some(i.to_string())])
            .collect()
    }

    fn request(sql: &str) -> QueryRequest {
        QueryRequest::new(sql, "nfl_stats_database", "s3://alt-nfl-bucket/athena_queries/")
    }

    fn executor(service: &Arc<ScriptedService>) -> QueryExecutor {
        QueryExecutor::new(Arc::clone(service) as Arc<dyn QueryService>)
    }

    const WAIT: Duration = Duration::from_secs(60);
    const POLL: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_rejected_statements_are_never_submitted() {
        let service = Arc::new(ScriptedService::with_states(&[ExecutionState::Succeeded]));
        let exec = executor(&service);

        let err = exec.execute(&request("   "), WAIT, POLL, 100).await.unwrap_err();
        assert_eq!(err, QueryError::EmptyStatement);

        let err = exec
            .execute(&request("show tables"), WAIT, POLL, 100)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::NotReadOnly);

        let err = exec
            .execute(&request("SELECT * FROM t WHERE x = 'truncate'"), WAIT, POLL, 100)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::ForbiddenKeyword("TRUNCATE".into()));

        assert!(service.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_accumulated_poll_time() {
        let service = Arc::new(
            ScriptedService::with_states(&[
                ExecutionState::Running,
                ExecutionState::Running,
                ExecutionState::Succeeded,
            ])
            .pages(vec![ResultPage {
                rows: vec![cells(&[Some("season"), Some("game_count")]), cells(&[Some("2024"), Some("272")])],
                ..Default::default()
            }]),
        );

        let result = executor(&service)
            .execute(&request("  SELECT season, COUNT(*) AS game_count FROM clean_schedule  "), WAIT, POLL, 100)
            .await
            .unwrap();

        assert_eq!(result.metadata.elapsed, Duration::from_secs(4));
        assert_eq!(result.metadata.execution_id, "exec-1");
        assert_eq!(result.columns, vec!["season", "game_count"]);
        assert_eq!(result.rows, vec![cells(&[Some("2024"), Some("272")])]);
        assert!(!result.metadata.truncated);
        assert_eq!(service.calls(), vec!["start", "status", "status", "status", "results"]);

        let submitted = service.submitted.lock().unwrap().clone().unwrap();
        assert_eq!(
            submitted.statement,
            "SELECT season, COUNT(*) AS game_count FROM clean_schedule"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_never_returns_partial_results() {
        let service = Arc::new(ScriptedService::with_states(&[ExecutionState::Running]));

        let err = executor(&service)
            .execute(&request("SELECT 1"), Duration::from_secs(10), POLL, 100)
            .await
            .unwrap_err();

        assert_eq!(err, QueryError::Timeout(Duration::from_secs(10)));
        assert_eq!(service.count("status"), 5);
        assert_eq!(service.count("results"), 0);
        assert_eq!(service.count("cancel"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_cancel_leaves_execution_running() {
        let service = Arc::new(ScriptedService::with_states(&[ExecutionState::Running]));

        let err = executor(&service)
            .with_cancel_on_timeout(false)
            .execute(&request("SELECT 1"), Duration::from_secs(5), POLL, 100)
            .await
            .unwrap_err();

        assert_eq!(err, QueryError::Timeout(Duration::from_secs(5)));
        // Polls at 0s, 2s and 4s; the 6s mark is past the deadline.
        assert_eq!(service.count("status"), 3);
        assert_eq!(service.count("cancel"), 0);
    }

    #[tokio::test]
    async fn test_failed_execution_stops_waiting() {
        let service = Arc::new(ScriptedService {
            states: Mutex::new(
                [(ExecutionState::Failed, Some("SYNTAX_ERROR: line 1:8".to_string()))].into(),
            ),
            ..Default::default()
        });

        let err = executor(&service)
            .execute(&request("SELECT nope FROM"), WAIT, POLL, 100)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            QueryError::ExecutionFailed {
                state: ExecutionState::Failed,
                reason: "SYNTAX_ERROR: line 1:8".into()
            }
        );
        assert_eq!(service.calls(), vec!["start", "status"]);
    }

    #[tokio::test]
    async fn test_cancelled_without_reason() {
        let service = Arc::new(ScriptedService::with_states(&[ExecutionState::Cancelled]));

        let err = executor(&service)
            .execute(&request("SELECT 1"), WAIT, POLL, 100)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            QueryError::ExecutionFailed {
                state: ExecutionState::Cancelled,
                reason: "Unknown error".into()
            }
        );
    }

    #[tokio::test]
    async fn test_truncates_across_pages_and_counts_everything() {
        let mut first = vec![cells(&[Some("team"), Some("n")])];
        first.extend(data_rows(0..150));
        let service = Arc::new(
            ScriptedService::with_states(&[ExecutionState::Succeeded]).pages(vec![
                ResultPage {
                    rows: first,
                    next_token: Some("page-2".into()),
                    ..Default::default()
                },
                ResultPage {
                    rows: data_rows(150..250),
                    ..Default::default()
                },
            ]),
        );

        let result = executor(&service)
            .execute(&request("SELECT team, n FROM t"), WAIT, POLL, 100)
            .await
            .unwrap();

        assert_eq!(result.rows.len(), 100);
        assert!(result.metadata.truncated);
        assert_eq!(result.metadata.total_rows, 250);
        assert_eq!(result.rows[99], vec![Some("team99".to_string()), Some("99".to_string())]);
        assert_eq!(service.count("results"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_results_stop_at_page_cap() {
        let service = Arc::new(ScriptedService {
            endless_pages: Some(Duration::ZERO),
            ..ScriptedService::with_states(&[ExecutionState::Succeeded])
        });

        let result = executor(&service)
            .with_max_pages(4)
            .execute(&request("SELECT * FROM plays"), WAIT, POLL, 100)
            .await
            .unwrap();

        assert_eq!(service.count("results"), 4);
        assert!(result.metadata.truncated);
        // 4 pages of 50, the first row being the header.
        assert_eq!(result.metadata.total_rows, 199);
        assert_eq!(result.rows.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_results_stop_at_deadline() {
        let service = Arc::new(ScriptedService {
            endless_pages: Some(Duration::from_millis(200)),
            ..ScriptedService::with_states(&[
                ExecutionState::Running,
                ExecutionState::Running,
                ExecutionState::Succeeded,
            ])
        });

        let started = Instant::now();
        let result = executor(&service)
            .with_max_pages(usize::MAX)
            .execute(&request("SELECT * FROM plays"), Duration::from_secs(5), POLL, 100)
            .await
            .unwrap();

        // Polling used 4s of 5s; the last second fits 5 pages of 200ms.
        assert_eq!(result.metadata.elapsed, Duration::from_secs(4));
        assert_eq!(service.count("results"), 5);
        assert!(started.elapsed() <= Duration::from_secs(5));
        assert!(result.metadata.truncated);
        assert_eq!(result.metadata.total_rows, 5 * 50 - 1);
    }

    #[tokio::test]
    async fn test_metadata_header_convention() {
        let service = Arc::new(
            ScriptedService::with_states(&[ExecutionState::Succeeded]).pages(vec![ResultPage {
                columns: Some(vec!["team".into(), "n".into()]),
                rows: data_rows(0..3),
                next_token: None,
            }]),
        );

        let result = executor(&service)
            .with_header(HeaderConvention::Metadata)
            .execute(&request("SELECT team, n FROM t"), WAIT, POLL, 100)
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["team", "n"]);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.metadata.total_rows, 3);
    }

    #[tokio::test]
    async fn test_null_and_empty_cells_stay_distinct() {
        let service = Arc::new(
            ScriptedService::with_states(&[ExecutionState::Succeeded]).pages(vec![ResultPage {
                rows: vec![cells(&[Some("a"), Some("b")]), cells(&[None, Some("")])],
                ..Default::default()
            }]),
        );

        let result = executor(&service)
            .execute(&request("SELECT a, b FROM t"), WAIT, POLL, 100)
            .await
            .unwrap();

        assert_eq!(result.rows, vec![vec![None, Some(String::new())]]);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let service = Arc::new(
            ScriptedService::with_states(&[ExecutionState::Succeeded])
                .pages(vec![ResultPage::default()]),
        );

        let result = executor(&service)
            .execute(&request("SELECT a FROM t WHERE false"), WAIT, POLL, 100)
            .await
            .unwrap();

        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(result.metadata.total_rows, 0);
        assert!(!result.metadata.truncated);
    }

    #[tokio::test]
    async fn test_service_failures_are_typed() {
        let service = Arc::new(ScriptedService {
            fail_start: true,
            ..ScriptedService::with_states(&[ExecutionState::Succeeded])
        });
        let err = executor(&service)
            .execute(&request("SELECT 1"), WAIT, POLL, 100)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::SubmissionFailed("AccessDeniedException".into()));

        let service = Arc::new(ScriptedService {
            fail_status: true,
            ..ScriptedService::with_states(&[ExecutionState::Succeeded])
        });
        let err = executor(&service)
            .execute(&request("SELECT 1"), WAIT, POLL, 100)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::Upstream("ThrottlingException".into()));
    }
}
