use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ToolCall, ToolRegistry, ToolResult};

/// Runs tool calls with a timeout and an output cap.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            registry,
            timeout,
            max_output_bytes,
        }
    }

    pub async fn execute(&self, cancel: &CancellationToken, call: ToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            return ToolResult::unknown(call);
        };

        let started_at = Utc::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err("cancelled".to_string()),
            res = tokio::time::timeout(self.timeout, tool.execute(&call.args)) => match res {
                Ok(result) => result,
                Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs())),
            },
        };
        let finished_at = Utc::now();

        debug!(
            tool = %call.name,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            ok = outcome.is_ok(),
            "Tool finished"
        );

        match outcome {
            Ok(output) => {
                let (output, truncated) = truncate_output(output, self.max_output_bytes);
                ToolResult {
                    call,
                    output,
                    truncated,
                    error: None,
                    started_at,
                    finished_at,
                }
            }
            Err(error) => ToolResult {
                call,
                output: String::new(),
                truncated: false,
                error: Some(error),
                started_at,
                finished_at,
            },
        }
    }
}

/// Cut `output` to at most `limit` bytes on a char boundary.
fn truncate_output(mut output: String, limit: usize) -> (String, bool) {
    if output.len() <= limit {
        return (output, false);
    }
    let mut end = limit;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    output.truncate(end);
    (output, true)
}
