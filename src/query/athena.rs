//! Athena implementation of the query service.

use async_trait::async_trait;
use aws_sdk_athena::Client;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    QueryExecutionContext, QueryExecutionState, ResultConfiguration, Row,
};

use crate::models::{ExecutionState, QueryExecution, QueryRequest, ResultPage};
use crate::query::{QueryService, ServiceResult};

/// Athena client bound to one work group.
#[derive(Clone)]
pub struct AthenaQueryService {
    client: Client,
    work_group: String,
}

impl AthenaQueryService {
    pub fn new(client: Client, work_group: impl Into<String>) -> Self {
        Self {
            client,
            work_group: work_group.into(),
        }
    }
}

/// Map Athena's state to the executor's. Queued counts as running.
fn map_state(state: Option<&QueryExecutionState>) -> ExecutionState {
    match state {
        Some(QueryExecutionState::Succeeded) => ExecutionState::Succeeded,
        Some(QueryExecutionState::Failed) => ExecutionState::Failed,
        Some(QueryExecutionState::Cancelled) => ExecutionState::Cancelled,
        _ => ExecutionState::Running,
    }
}

/// Decode a row; an absent `VarCharValue` is NULL.
fn decode_row(row: &Row) -> Vec<Option<String>> {
    row.data()
        .iter()
        .map(|datum| datum.var_char_value().map(str::to_string))
        .collect()
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start(&self, request: &QueryRequest) -> ServiceResult<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.statement)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.target_namespace)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.result_sink)
                    .build(),
            )
            .work_group(&self.work_group)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| "StartQueryExecution returned no execution ID".to_string())
    }

    async fn status(&self, execution_id: &str) -> ServiceResult<QueryExecution> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;

        let status = output.query_execution().and_then(|q| q.status());

        Ok(QueryExecution {
            execution_id: execution_id.to_string(),
            state: map_state(status.and_then(|s| s.state())),
            state_reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        })
    }

    async fn results(
        &self,
        execution_id: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> ServiceResult<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(execution_id)
            .set_next_token(next_token)
            .max_results(page_size)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;

        let Some(result_set) = output.result_set() else {
            return Ok(ResultPage::default());
        };

        let columns = result_set.result_set_metadata().map(|meta| {
            meta.column_info()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        });

        Ok(ResultPage {
            columns,
            rows: result_set.rows().iter().map(decode_row).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn cancel(&self, execution_id: &str) -> ServiceResult<()> {
        self.client
            .stop_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;
        Ok(())
    }
}
