//! OpenAI-compatible chat completion backend.
//!
//! Speaks the `/chat/completions` wire format, which is also served by
//! many compatible providers. Rate limits (429) and missing models (404)
//! are mapped to distinguishable error kinds so the conversation agent
//! can degrade instead of failing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{LlmBackend, with_retry};
use crate::error::{LlmError, Result};
use crate::types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolChoice, Usage,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL (no trailing slash).
    pub base_url: String,
    /// Model to use for completions.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries for transient network errors.
    pub max_retries: u32,
    /// Initial retry backoff.
    pub retry_backoff: Duration,
}

impl OpenAiConfig {
    /// Create a config with the given API key and defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Load configuration from `OPENAI_API_KEY` (and optionally
    /// `OPENAI_BASE_URL`, `OPENAI_MODEL`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY not set".into()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// OpenAI-compatible completion backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a backend from a config.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    async fn send_once(&self, wire: &WireRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(wire)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(status.as_u16(), &body));
        }

        let body: WireResponse = response.json().await?;
        parse_response(body)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let wire = to_wire_request(&request, &self.config);
        debug!(
            model = %wire.model,
            messages = wire.messages.len(),
            tools = wire.tools.as_ref().map_or(0, Vec::len),
            "OpenAI completion request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "openai",
            || self.send_once(&wire),
        )
        .await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON arguments, string-encoded per the wire format.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: Option<WireErrorBody>,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    message: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_wire_request(request: &CompletionRequest, config: &OpenAiConfig) -> WireRequest {
    let messages = request
        .messages
        .iter()
        .map(|msg| to_wire_message(msg))
        .collect();

    let tools: Option<Vec<WireTool>> = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| WireTool {
                    kind: "function".to_string(),
                    function: WireFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };

    // tool_choice is only meaningful when tools are attached
    let tool_choice = tools.as_ref().map(|_| match request.tool_choice {
        ToolChoice::Auto => "auto".to_string(),
        ToolChoice::None => "none".to_string(),
    });

    WireRequest {
        model: config.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature.unwrap_or(config.temperature),
        tools,
        tool_choice,
    }
}

fn to_wire_message(msg: &Message) -> WireMessage {
    let tool_calls = if msg.tool_calls.is_empty() {
        None
    } else {
        Some(
            msg.tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    // Assistant messages that only carry tool calls send null content
    let content = if msg.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(msg.content.clone())
    };

    WireMessage {
        role: role_str(msg.role).to_string(),
        content,
        tool_calls,
        tool_call_id: msg.tool_call_id.clone(),
    }
}

fn parse_response(body: WireResponse) -> Result<CompletionResponse> {
    let model = body.model.unwrap_or_default();
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Backend("response contained no choices".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                warn!(
                    tool = %call.function.name,
                    error = %e,
                    "Unparseable tool call arguments, substituting empty object"
                );
                Value::Object(Default::default())
            });
            ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            }
        })
        .collect::<Vec<_>>();

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    let usage = body
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content,
        tool_calls,
        model,
        stop_reason,
        usage,
    })
}

fn map_error_response(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<WireError>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| e.message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        429 => LlmError::QuotaExceeded(message),
        404 => LlmError::ModelUnavailable(message),
        401 | 403 => LlmError::Auth(message),
        500..=599 => LlmError::Backend(message),
        _ => LlmError::InvalidRequest(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolDefinition;
    use serde_json::json;

    fn config() -> OpenAiConfig {
        OpenAiConfig::new("test-key")
    }

    #[test]
    fn test_config_defaults() {
        let cfg = config();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.model, "gpt-4.1-mini");
        assert_eq!(cfg.max_tokens, 2000);
        assert_eq!(cfg.temperature, 0.7);
    }

    #[test]
    fn test_request_conversion_basic() {
        let request = CompletionRequest::new(
            "ignored",
            vec![Message::system("be helpful"), Message::user("hi")],
        );
        let wire = to_wire_request(&request, &config());

        assert_eq!(wire.model, "gpt-4.1-mini");
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[1].role, "user");
        assert!(wire.tools.is_none());
        assert!(wire.tool_choice.is_none());
    }

    #[test]
    fn test_request_conversion_with_tools() {
        let request = CompletionRequest::new("m", vec![Message::user("hi")]).with_tools(vec![
            ToolDefinition::new("search_emails", "Search emails", json!({"type": "object"})),
        ]);
        let wire = to_wire_request(&request, &config());

        let tools = wire.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].kind, "function");
        assert_eq!(tools[0].function.name, "search_emails");
        assert_eq!(wire.tool_choice.as_deref(), Some("auto"));
    }

    #[test]
    fn test_tool_call_message_conversion() {
        let call = ToolCall::new("call_1", "create_task", json!({"description": "x"}));
        let msg = Message::assistant_with_tool_calls("", vec![call]);
        let wire = to_wire_message(&msg);

        assert_eq!(wire.role, "assistant");
        assert!(wire.content.is_none());
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "create_task");
        // arguments are string-encoded on the wire
        let parsed: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(parsed, json!({"description": "x"}));
    }

    #[test]
    fn test_tool_result_message_conversion() {
        let msg = Message::tool_result("call_1", "done");
        let wire = to_wire_message(&msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.content.as_deref(), Some("done"));
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_parse_text_response() {
        let body: WireResponse = serde_json::from_value(json!({
            "model": "gpt-4.1-mini",
            "choices": [{
                "message": {"content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }))
        .unwrap();

        let resp = parse_response(body).unwrap();
        assert_eq!(resp.text_or_empty(), "hello");
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert_eq!(resp.usage.prompt_tokens, 10);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body: WireResponse = serde_json::from_value(json!({
            "model": "gpt-4.1-mini",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "search_emails",
                            "arguments": "{\"query\": \"baseball\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let resp = parse_response(body).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "search_emails");
        assert_eq!(resp.tool_calls[0].arguments, json!({"query": "baseball"}));
    }

    #[test]
    fn test_parse_empty_choices_errors() {
        let body: WireResponse =
            serde_json::from_value(json!({"model": "m", "choices": []})).unwrap();
        assert!(matches!(
            parse_response(body),
            Err(LlmError::Backend(_))
        ));
    }

    #[test]
    fn test_error_status_mapping() {
        let body = r#"{"error": {"message": "rate limit"}}"#;
        assert!(matches!(
            map_error_response(429, body),
            LlmError::QuotaExceeded(m) if m == "rate limit"
        ));
        assert!(matches!(
            map_error_response(404, body),
            LlmError::ModelUnavailable(_)
        ));
        assert!(matches!(map_error_response(401, body), LlmError::Auth(_)));
        assert!(matches!(
            map_error_response(500, body),
            LlmError::Backend(_)
        ));
        assert!(matches!(
            map_error_response(400, body),
            LlmError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_error_mapping_unparseable_body() {
        let err = map_error_response(429, "not json");
        assert!(matches!(err, LlmError::QuotaExceeded(m) if m == "HTTP 429"));
    }
}
