//! Tool execution node.
//!
//! Resolves a batch of tool calls into tool-role messages. Calls in a batch
//! run concurrently; results come back in call order. A failing call becomes
//! an error-flagged result for that call only.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use shopassist_core::error::ToolError;
use shopassist_core::event::{DomainEvent, EventBus};
use shopassist_core::message::{Message, MessageToolCall};
use shopassist_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, warn};

/// Parse the model's argument string. An empty string means no arguments.
fn parse_arguments(tc: &MessageToolCall) -> Result<serde_json::Value, ToolError> {
    if tc.arguments.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(&tc.arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{}: {e}", tc.name)))
}

async fn execute_one(tools: &ToolRegistry, events: &EventBus, tc: &MessageToolCall) -> Message {
    let start = Instant::now();
    let result = match parse_arguments(tc) {
        Ok(arguments) => {
            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments,
            };
            tools.execute(&call).await
        }
        Err(e) => Err(e),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let (message, success) = match result {
        Ok(output) if output.success => (Message::tool_result(&tc.id, output.output), true),
        Ok(output) => (Message::tool_error(&tc.id, output.output), false),
        Err(e) => {
            warn!(tool = %tc.name, call_id = %tc.id, error = %e, "Tool execution failed");
            (Message::tool_error(&tc.id, e), false)
        }
    };

    debug!(tool = %tc.name, call_id = %tc.id, success, duration_ms, "Tool call resolved");
    events.publish(DomainEvent::ToolExecuted {
        tool_name: tc.name.clone(),
        success,
        duration_ms,
        timestamp: Utc::now(),
    });

    message
}

/// Resolve `calls`, returning one tool message per call in the same order.
pub async fn execute_tools(
    tools: &ToolRegistry,
    events: &EventBus,
    calls: &[MessageToolCall],
) -> Vec<Message> {
    join_all(calls.iter().map(|tc| execute_one(tools, events, tc))).await
}
