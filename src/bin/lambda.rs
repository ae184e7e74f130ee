//! AWS Lambda entry point for the NFL tool gateway.
//!
//! Deploy with `cargo lambda build --release --features lambda`.

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use nfl_gateway::gateway::Gateway;
use nfl_gateway::lambda::handler;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Built once per cold start and shared by every invocation.
    let (gateway, config) = Gateway::from_env().await?;
    info!(
        database = %config.query.database,
        bucket = %config.storage.bucket,
        "NFL gateway starting"
    );

    let gateway = &gateway;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(event, gateway).await
    }))
    .await
}
