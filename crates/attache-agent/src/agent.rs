//! The conversation agent: retrieval-augmented turns with tool calling.
//!
//! A turn never fails outward. Provider outages, quota exhaustion, and
//! storage faults all degrade to an answer the user can still read,
//! with the cause recorded on the [`TurnResponse`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use attache_llm::{
    CompletionRequest, Message, SharedBackend, SharedEmbedder, ToolChoice,
};
use attache_memory::{EmbeddingFilter, Instruction, MemoryStore};
use attache_rag::{ContextRetriever, DEFAULT_MAX_CONTEXT_TOKENS, build_context};

use crate::error::{AgentError, Result};
use crate::summary::summarize_tool_results;
use crate::tool::ToolRegistry;
use crate::types::{AgentConfig, TurnResponse, TurnStatus};

/// Context note when a turn answered from the canned offline table.
const OFFLINE_CONTEXT: &str = "Running in offline mode without external services";
/// Fallback answer when tool results were obtained but the final
/// completion failed.
const TOOL_SUMMARY_FALLBACK: &str =
    "I found some information, but I encountered an error processing it. Please try again.";

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

/// A stateful conversational agent over a completion backend, a
/// retrieval index, and a tool registry.
///
/// Without a backend the agent runs offline, answering from a small
/// canned table. All methods take `&self`; history and the instruction
/// cache sit behind short-lived locks that are never held across awaits.
pub struct ConversationAgent {
    backend: Option<SharedBackend>,
    retriever: Option<Arc<ContextRetriever>>,
    registry: Arc<ToolRegistry>,
    store: Arc<MemoryStore>,
    config: AgentConfig,
    history: Mutex<Vec<Message>>,
    instructions: Mutex<Vec<Instruction>>,
}

impl ConversationAgent {
    /// Start building an agent over the given store.
    pub fn builder(store: Arc<MemoryStore>) -> AgentBuilder {
        AgentBuilder::new(store)
    }

    /// The agent's configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Snapshot of the conversation history.
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    /// Forget the conversation so far. Instructions and stored memory
    /// are unaffected.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Persist a standing instruction and refresh the in-memory cache.
    pub fn add_instruction(&self, text: &str) -> Result<Instruction> {
        let instruction = self.store.add_instruction(text)?;
        self.refresh_instructions()?;
        Ok(instruction)
    }

    /// Reload active instructions from the store.
    pub fn refresh_instructions(&self) -> Result<()> {
        let active = self.store.active_instructions()?;
        *self.instructions.lock() = active;
        Ok(())
    }

    /// Currently cached standing instructions.
    pub fn instructions(&self) -> Vec<Instruction> {
        self.instructions.lock().clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Turn Protocol
    // ─────────────────────────────────────────────────────────────────────

    /// Process one user message and produce a response.
    ///
    /// Never returns an error: a failed turn degrades to the offline
    /// table with the cause annotated on the response.
    pub async fn process_message(&self, text: &str) -> TurnResponse {
        match self.run_turn(text).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Turn failed, degrading to offline response");
                let response = format!("{}\n\nError: {err}", offline_response(text));
                self.push_history(vec![
                    Message::user(text),
                    Message::assistant(&response),
                ]);
                TurnResponse {
                    response,
                    tool_results: Vec::new(),
                    context: OFFLINE_CONTEXT.to_string(),
                    status: TurnStatus::Degraded,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn run_turn(&self, text: &str) -> Result<TurnResponse> {
        let Some(backend) = self.backend.clone() else {
            debug!("No completion backend configured, answering offline");
            let response = offline_response(text);
            self.push_history(vec![Message::user(text), Message::assistant(&response)]);
            return Ok(TurnResponse {
                response,
                tool_results: Vec::new(),
                context: OFFLINE_CONTEXT.to_string(),
                status: TurnStatus::Success,
                error: None,
            });
        };

        // Retrieval failures cost the turn its context, nothing more.
        let retrieved = match &self.retriever {
            None => Vec::new(),
            Some(retriever) => {
                match retriever
                    .search_context(text, self.config.context_limit, &EmbeddingFilter::none())
                    .await
                {
                    Ok(outcome) => outcome.into_records(),
                    Err(err) => {
                        warn!(error = %err, "Context retrieval failed, continuing without");
                        Vec::new()
                    }
                }
            }
        };

        // The base prompt, standing instructions, and retrieved context
        // each go in as their own system message.
        let mut messages = vec![Message::system(&self.config.system_prompt)];
        let instructions = self.instructions.lock().clone();
        if !instructions.is_empty() {
            let joined: Vec<String> = instructions
                .iter()
                .map(|i| i.instruction.clone())
                .collect();
            messages.push(Message::system(format!(
                "Ongoing instructions to follow:\n{}",
                joined.join("\n")
            )));
        }
        if !retrieved.is_empty() {
            let context = build_context(&retrieved, DEFAULT_MAX_CONTEXT_TOKENS);
            if !context.is_empty() {
                messages.push(Message::system(format!(
                    "Relevant information from your knowledge base:\n{context}"
                )));
            }
        }
        {
            let history = self.history.lock();
            let start = history.len().saturating_sub(self.config.history_window);
            messages.extend_from_slice(&history[start..]);
        }
        messages.push(Message::user(text));

        let mut request = CompletionRequest::new(&self.config.model, messages)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let definitions: Vec<_> = self
            .registry
            .definitions()
            .into_iter()
            .filter(|d| d.is_valid())
            .collect();
        if !definitions.is_empty() {
            request = request.with_tools(definitions).with_tool_choice(ToolChoice::Auto);
        }

        let first = backend.complete(request).await?;

        if !first.has_tool_calls() {
            let response = first.text_or_empty().to_string();
            let context = if retrieved.is_empty() {
                "No relevant context found"
            } else {
                "Found relevant context from knowledge base"
            };
            self.push_history(vec![Message::user(text), Message::assistant(&response)]);
            return Ok(TurnResponse {
                response,
                tool_results: Vec::new(),
                context: context.to_string(),
                status: TurnStatus::Success,
                error: None,
            });
        }

        // Tool round: execute every requested call, then ask the model
        // to answer from the rendered results.
        let calls = first.tool_calls.clone();
        info!(count = calls.len(), "Executing tool calls");
        let records = self.registry.execute_all(&calls).await;
        let summary = summarize_tool_results(&records);

        let mut turn_history = vec![
            Message::user(text),
            Message::assistant_with_tool_calls(first.text_or_empty(), calls),
        ];
        for record in &records {
            let content = serde_json::to_string(&record.result)?;
            turn_history.push(Message::tool_result(&record.tool_call_id, content));
        }

        let followup = vec![
            Message::system(&self.config.system_prompt),
            Message::system(format!(
                "Tool results have been obtained. Please analyze and respond to the user's request based on these results:\n\n{summary}"
            )),
            Message::user(text),
        ];
        let request = CompletionRequest::new(&self.config.model, followup)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let (response, status, error) = match backend.complete(request).await {
            Ok(second) => (second.text_or_empty().to_string(), TurnStatus::Success, None),
            Err(err) => {
                warn!(error = %err, "Final completion failed after tool execution");
                (
                    TOOL_SUMMARY_FALLBACK.to_string(),
                    TurnStatus::Degraded,
                    Some(err.to_string()),
                )
            }
        };

        turn_history.push(Message::assistant(&response));
        self.push_history(turn_history);

        Ok(TurnResponse {
            response,
            tool_results: records,
            context: summary,
            status,
            error,
        })
    }

    fn push_history(&self, messages: Vec<Message>) {
        self.history.lock().extend(messages);
    }
}

/// Canned answers for when no completion backend is reachable.
///
/// Keyword-matched: the first table key contained anywhere in the
/// lowercased message wins.
fn offline_response(text: &str) -> String {
    let lowered = text.to_lowercase();
    let table = [
        (
            "hello",
            "Hello! I'm currently running in offline mode, but I'm here to help \
             where I can.",
        ),
        (
            "help",
            "I'm in offline mode right now, so I can't reach your email, calendar, \
             or CRM. Once connectivity is restored I can search emails, manage \
             contacts, schedule events, and track tasks.",
        ),
        (
            "test",
            "Offline mode is working. External services are not connected.",
        ),
    ];
    for (key, answer) in table {
        if lowered.contains(key) {
            return answer.to_string();
        }
    }
    "I'm currently in offline mode and can't process that request. Please \
     try again once external services are available."
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`ConversationAgent`].
pub struct AgentBuilder {
    store: Arc<MemoryStore>,
    config: AgentConfig,
    backend: Option<SharedBackend>,
    embedder: Option<SharedEmbedder>,
    registry: Option<ToolRegistry>,
}

impl AgentBuilder {
    fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            config: AgentConfig::default(),
            backend: None,
            embedder: None,
            registry: None,
        }
    }

    /// Use the given configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a completion backend. Without one the agent runs offline.
    pub fn backend(mut self, backend: SharedBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach an embedder, enabling context retrieval over the store.
    pub fn embedder(mut self, embedder: SharedEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Use the given tool registry. Defaults to an empty registry.
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the agent, loading the standing-instruction cache.
    pub fn build(self) -> Result<ConversationAgent> {
        let retriever = self
            .embedder
            .map(|embedder| Arc::new(ContextRetriever::new(self.store.clone(), embedder)));
        let instructions = self.store.active_instructions().map_err(AgentError::from)?;

        Ok(ConversationAgent {
            backend: self.backend,
            retriever,
            registry: Arc::new(self.registry.unwrap_or_default()),
            store: self.store,
            config: self.config,
            history: Mutex::new(Vec::new()),
            instructions: Mutex::new(instructions),
        })
    }
}
