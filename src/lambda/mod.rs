// src/lambda/mod.rs

//! AWS Lambda handler for the gateway.
//!
//! Every invocation is answered with a `{statusCode, body}` envelope. Errors
//! are classified into the status code and never fail the invocation itself.

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::gateway::{Gateway, GatewayResponse};

/// Main Lambda handler function.
#[instrument(skip(event, gateway), fields(request_id = %event.context.request_id))]
pub async fn handler(
    event: LambdaEvent<Value>,
    gateway: &Gateway,
) -> std::result::Result<GatewayResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (payload, _context) = event.into_parts();

    let response = gateway.handle(payload).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if response.status_code >= 500 {
        error!(status = response.status_code, elapsed_ms, "Request failed");
    } else {
        info!(status = response.status_code, elapsed_ms, "Request completed");
    }
    Ok(response)
}
