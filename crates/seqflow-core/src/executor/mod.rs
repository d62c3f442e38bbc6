//! Execution engine — synchronous and streaming strategies plus the
//! fallback coordinator that chains them.
//!
//! One workflow execution owns exactly one outstanding connection at a
//! time: either the blocking execute POST or the SSE response body. The
//! coordinator's ladder is ordered, single-pass, and never cyclic:
//!
//! 1. streaming attempt; if it yields a terminal result, done
//! 2. one status/result poll for the same workflow id
//! 3. one synchronous execute as the final fallback
//!
//! Across the whole ladder the remote "execute" semantic is invoked at most
//! twice (once streaming, once sync); a server that is not idempotent
//! per-call sees at most one duplicated side effect.

pub mod stream;

pub use stream::{StreamEvent, StreamParser};

use std::time::Instant;

use futures::StreamExt;
use reqwest::StatusCode;

use crate::error::ClientError;
use crate::normalize::{normalize, CanonicalResult};
use crate::transport::WorkflowService;

fn execute_body(input_context: Option<&serde_json::Value>) -> serde_json::Value {
    match input_context {
        Some(context) => serde_json::json!({ "input_context": context }),
        None => serde_json::json!({}),
    }
}

/// Run a registered workflow with a single blocking POST.
///
/// Any non-200 status is terminal for this call; retry policy belongs to
/// the caller or to step-level `max_retries` enforced server-side.
pub async fn execute_sync(
    service: &dyn WorkflowService,
    workflow_id: &str,
    input_context: Option<&serde_json::Value>,
) -> Result<CanonicalResult, ClientError> {
    let started = Instant::now();
    let body = execute_body(input_context);

    let (status, value) = service.execute_sync(workflow_id, &body).await?;
    if status != StatusCode::OK {
        return Err(ClientError::ExecutionFailed {
            workflow_id: workflow_id.to_string(),
            reason: format!("execute returned HTTP {}", status),
        });
    }

    Ok(normalize(value, workflow_id, elapsed_ms(started)))
}

/// Run a registered workflow over the streaming transport, falling back per
/// the coordinator ladder when the stream yields no terminal result.
///
/// `observer` receives each incremental [`StreamEvent`] as it is decoded.
pub async fn execute_streaming(
    service: &dyn WorkflowService,
    workflow_id: &str,
    input_context: Option<&serde_json::Value>,
    observer: &mut dyn FnMut(StreamEvent),
) -> Result<CanonicalResult, ClientError> {
    let started = Instant::now();
    let body = execute_body(input_context);

    match stream_attempt(service, workflow_id, &body, observer).await {
        Ok(Some(raw)) => return Ok(normalize(raw, workflow_id, elapsed_ms(started))),
        Ok(None) => {
            tracing::debug!(
                "stream for '{}' closed without a terminal result, falling back",
                workflow_id
            );
        }
        Err(e) => {
            tracing::warn!("streaming attempt for '{}' failed: {}", workflow_id, e);
        }
    }

    if let Some(raw) = poll_completed_result(service, workflow_id).await {
        tracing::debug!("recovered result of '{}' from the result endpoint", workflow_id);
        return Ok(normalize(raw, workflow_id, elapsed_ms(started)));
    }

    execute_sync(service, workflow_id, input_context)
        .await
        .map_err(|e| match e {
            ClientError::ExecutionFailed {
                workflow_id,
                reason,
            } => ClientError::ExecutionFailed {
                workflow_id,
                reason: format!("all execution strategies exhausted; last: {}", reason),
            },
            other => other,
        })
}

/// One streaming execute attempt.
///
/// `Ok(Some(..))` carries the terminal result payload; `Ok(None)` means the
/// attempt produced nothing usable and the coordinator should continue.
async fn stream_attempt(
    service: &dyn WorkflowService,
    workflow_id: &str,
    body: &serde_json::Value,
    observer: &mut dyn FnMut(StreamEvent),
) -> Result<Option<serde_json::Value>, ClientError> {
    let response = service.execute_stream(workflow_id, body).await?;
    if !response.status.is_success() {
        tracing::debug!(
            "streaming execute for '{}' returned HTTP {}",
            workflow_id,
            response.status
        );
        return Ok(None);
    }

    let mut lines = response.lines;

    if !response.content_type.contains("text/event-stream") {
        // The server silently did not stream; the whole body is one JSON
        // document. Not an error condition.
        tracing::debug!(
            "execute for '{}' answered with '{}' instead of an event stream",
            workflow_id,
            response.content_type
        );
        let mut document = String::new();
        while let Some(line) = lines.next().await {
            document.push_str(&line?);
            document.push('\n');
        }
        return Ok(serde_json::from_str(document.trim()).ok());
    }

    let mut parser = StreamParser::new();
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                for event in parser.feed_line(&line) {
                    observer(event);
                }
                if parser.is_done() {
                    break;
                }
            }
            Err(e) => {
                // Mid-stream failure: partially decoded step buffers are
                // discarded and the coordinator takes over, exactly as on a
                // clean-but-empty closure.
                tracing::warn!("stream for '{}' broke mid-flight: {}", workflow_id, e);
                return Ok(None);
            }
        }
    }
    Ok(parser.into_terminal())
}

/// One poll of the status endpoint; on reported completion, the result
/// endpoint's payload.
async fn poll_completed_result(
    service: &dyn WorkflowService,
    workflow_id: &str,
) -> Option<serde_json::Value> {
    let status = match service.workflow_status(workflow_id).await {
        Ok(Some(status)) => status,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!("status poll for '{}' failed: {}", workflow_id, e);
            return None;
        }
    };

    let state = status.get("status").and_then(|v| v.as_str()).unwrap_or("");
    if state != "completed" {
        return None;
    }

    match service.workflow_result(workflow_id).await {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!("result fetch for '{}' failed: {}", workflow_id, e);
            None
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
