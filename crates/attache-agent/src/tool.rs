//! Tool trait, outcome type, parameter validation, and the registry.
//!
//! The registry is the never-throwing boundary of tool dispatch: whatever
//! goes wrong inside a tool (bad parameters, provider failure, unknown
//! name) is captured into a failed [`ToolOutcome`] tagged with the
//! originating call id, so the conversation loop can always continue.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use attache_llm::{ToolCall, ToolDefinition};

use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// The result payload of a tool execution.
///
/// Always produced, never thrown: failures are data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the tool succeeded.
    pub success: bool,
    /// Payload on success (tool-specific shape).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// A successful outcome with the given payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// A failed outcome with the given error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// A tool outcome tagged with its originating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    /// Id of the call this result answers.
    pub tool_call_id: String,
    /// Name of the tool that ran (or was requested).
    pub tool_name: String,
    /// The outcome.
    pub result: ToolOutcome,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Typed accessors over a JSON arguments object.
pub trait ParamExt {
    /// A required string field.
    fn required_str(&self, key: &str) -> Result<&str>;
    /// An optional string field.
    fn optional_str(&self, key: &str) -> Option<&str>;
    /// A required integer field (accepts JSON numbers).
    fn required_i64(&self, key: &str) -> Result<i64>;
    /// An optional unsigned integer field.
    fn optional_u32(&self, key: &str) -> Option<u32>;
    /// An optional array-of-strings field; missing yields empty.
    fn optional_str_array(&self, key: &str) -> Vec<String>;
    /// An optional arbitrary JSON field.
    fn optional_value(&self, key: &str) -> Option<&Value>;
}

impl ParamExt for Value {
    fn required_str(&self, key: &str) -> Result<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AgentError::invalid_params(format!("missing required parameter '{key}'"))
            })
    }

    fn optional_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn required_i64(&self, key: &str) -> Result<i64> {
        self.get(key).and_then(Value::as_i64).ok_or_else(|| {
            AgentError::invalid_params(format!("missing required parameter '{key}'"))
        })
    }

    fn optional_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(Value::as_u64).map(|n| n as u32)
    }

    fn optional_str_array(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn optional_value(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A callable capability exposed to the language model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (the wire contract).
    fn name(&self) -> &str;

    /// Free-text description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters(&self) -> Value;

    /// Run the tool. Errors are captured by the registry; tools should
    /// return the success payload only.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Wire-format definition for the completion provider.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Name-to-handler map over the fixed tool surface.
///
/// Definitions are validated once at registration, not per call.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, validating its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let definition = tool.definition();
        if !definition.is_valid() {
            return Err(AgentError::ToolRegistration(format!(
                "tool '{}' has an invalid definition",
                definition.name
            )));
        }
        if self.tools.contains_key(&definition.name) {
            return Err(AgentError::ToolRegistration(format!(
                "tool '{}' is already registered",
                definition.name
            )));
        }
        self.order.push(definition.name.clone());
        self.tools.insert(definition.name, tool);
        Ok(())
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Wire-format definitions for all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Execute one tool call.
    ///
    /// Never fails: unknown names and tool errors become failed outcomes
    /// tagged with the call id.
    pub async fn execute(&self, call: &ToolCall) -> ToolResultRecord {
        let result = match self.tools.get(&call.name) {
            None => {
                warn!(tool = %call.name, "Unknown tool requested");
                ToolOutcome::failure(format!("Unknown tool: {}", call.name))
            }
            Some(tool) => {
                debug!(tool = %call.name, call_id = %call.id, "Executing tool");
                match tool.execute(call.arguments.clone()).await {
                    Ok(data) => ToolOutcome::ok(data),
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "Tool execution failed");
                        ToolOutcome::failure(err.to_string())
                    }
                }
            }
        };

        ToolResultRecord {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result,
        }
    }

    /// Execute multiple tool calls concurrently.
    ///
    /// Calls are mutually independent; one failure never cancels a
    /// sibling. Results come back in call order, each tagged with its
    /// call id.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResultRecord> {
        futures::future::join_all(calls.iter().map(|call| self.execute(call))).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Tool
// ─────────────────────────────────────────────────────────────────────────────

/// A configurable tool for tests: records calls, returns a fixed reply.
pub struct MockTool {
    name: String,
    reply: std::result::Result<Value, String>,
    calls: parking_lot::Mutex<Vec<Value>>,
}

impl MockTool {
    /// A mock that succeeds with the given payload.
    pub fn succeeding(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            reply: Ok(data),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// A mock that fails with the given message.
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: Err(error.into()),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Arguments of every call received so far.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool for testing"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        self.calls.lock().push(args);
        match &self.reply {
            Ok(data) => Ok(data.clone()),
            Err(msg) => Err(AgentError::provider(msg.clone())),
        }
    }
}
