//! Conversational agent orchestration: retrieval-augmented turns,
//! tool calling over email/CRM/calendar/task capabilities, and
//! proactive turns driven by external events.
//!
//! The central type is [`ConversationAgent`]. Build one over a
//! [`attache_memory::MemoryStore`], optionally attach a completion
//! backend, an embedder, and a tool registry, then feed it user
//! messages with [`ConversationAgent::process_message`]. Turns never
//! fail outward; degraded paths produce a readable answer with the
//! cause annotated.

pub mod agent;
pub mod error;
pub mod proactive;
pub mod providers;
pub mod summary;
pub mod tool;
pub mod tools;
pub mod types;

pub use agent::{AgentBuilder, ConversationAgent};
pub use error::{AgentError, Result};
pub use proactive::ProactiveTrigger;
pub use summary::summarize_tool_results;
pub use tool::{MockTool, ParamExt, Tool, ToolOutcome, ToolRegistry, ToolResultRecord};
pub use tools::standard_registry;
pub use types::{
    AgentConfig, DEFAULT_SYSTEM_PROMPT, TurnResponse, TurnStatus,
};
