//! Conversation-side types for the agent.

use serde::{Deserialize, Serialize};

use crate::tool::ToolResultRecord;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for a conversation agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier passed to the completion backend.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// How many context records to retrieve per turn.
    pub context_limit: usize,
    /// How many trailing history messages to replay per turn.
    pub history_window: usize,
    /// User on whose behalf tasks are created.
    pub user_id: String,
    /// System prompt prepended to every turn.
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            context_limit: 5,
            history_window: 10,
            user_id: "default".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Default system prompt describing the assistant and its tool surface.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an assistant that helps manage client relationships, emails, and scheduling. You have access to these tools:

**Email Tools:**
- search_emails: Search for emails using queries
- send_email: Send emails to recipients

**CRM Tools:**
- search_hubspot_contacts: Search for contacts in the CRM
- create_hubspot_contact: Create new CRM contacts
- add_hubspot_note: Add notes to CRM contacts

**Calendar Tools:**
- search_calendar_events: Search for calendar events
- create_calendar_event: Create new calendar events

**Task Management:**
- create_task: Create new tasks
- update_task: Update task status

**Important:** When users ask about emails, contacts, or calendar events, ALWAYS use the appropriate tools to search for and retrieve the information.

When a user asks a question, search the knowledge base for relevant context and provide a helpful answer. When asked to perform actions, use the available tools to accomplish the task.

Always be professional, helpful, and proactive in managing client relationships.";

// ─────────────────────────────────────────────────────────────────────────────
// Turn Results
// ─────────────────────────────────────────────────────────────────────────────

/// How a turn completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The turn ran the full pipeline.
    Success,
    /// The turn fell back to a degraded path (offline response or a
    /// failed final completion); `error` carries the cause when known.
    Degraded,
}

/// The result of one conversation turn.
///
/// A turn always produces a response, even under total provider outage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Assistant text shown to the user.
    pub response: String,
    /// Results of every tool call executed this turn.
    pub tool_results: Vec<ToolResultRecord>,
    /// Description of the context used (tool-result summary, retrieval
    /// note, or offline-mode note).
    pub context: String,
    /// How the turn completed.
    pub status: TurnStatus,
    /// Error annotation when the turn degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnResponse {
    /// Whether the turn degraded.
    pub fn is_degraded(&self) -> bool {
        self.status == TurnStatus::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.context_limit, 5);
        assert_eq!(config.history_window, 10);
        assert!(config.system_prompt.contains("search_emails"));
    }
}
