//! End-to-end conversation flow tests.
//!
//! These wire a real in-memory store, the mock embedder, and scripted
//! completions through the full turn pipeline: ingestion, retrieval,
//! tool dispatch, summarization, and the final answer.

use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use attache_agent::{
    AgentConfig, ConversationAgent, ProactiveTrigger, TurnStatus, standard_registry,
};
use attache_agent::providers::{MockCalendarProvider, MockCrmProvider, MockEmailProvider};
use attache_llm::{
    CompletionResponse, MockBackend, MockEmbedder, SharedEmbedder, ToolCall,
};
use attache_memory::MemoryStore;
use attache_rag::DocumentProcessor;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn gmail_message(from: &str, subject: &str, body: &str) -> serde_json::Value {
    json!({
        "snippet": body.chars().take(20).collect::<String>(),
        "payload": {
            "headers": [
                {"name": "From", "value": from},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Mon, 2 Jun 2025 09:00:00 +0000"}
            ],
            "body": {"data": STANDARD.encode(body)}
        }
    })
}

#[tokio::test]
async fn test_tool_turn_end_to_end() -> Result<()> {
    init_tracing();

    let store = Arc::new(MemoryStore::open_in_memory()?);
    let email = Arc::new(MockEmailProvider::with_messages(vec![gmail_message(
        "coach@example.com",
        "Practice moved",
        "Practice is at 5pm on the back field.",
    )]));
    let registry = standard_registry(
        email,
        Arc::new(MockCrmProvider::default()),
        Arc::new(MockCalendarProvider::default()),
        store.clone(),
        &AgentConfig::default(),
    )?;

    let backend = Arc::new(MockBackend::new(Vec::new()));
    backend.push_response(CompletionResponse::with_tool_calls(vec![ToolCall::new(
        "call_1",
        "search_emails",
        json!({"query": "practice"}),
    )]));
    backend.push_response(CompletionResponse::text(
        "Practice moved to 5pm on the back field.",
    ));

    let agent = ConversationAgent::builder(store)
        .backend(backend.clone())
        .registry(registry)
        .build()?;

    let turn = agent.process_message("did the coach email about practice?").await;

    assert_eq!(turn.status, TurnStatus::Success);
    assert_eq!(turn.response, "Practice moved to 5pm on the back field.");
    assert_eq!(turn.tool_results.len(), 1);
    assert!(turn.tool_results[0].result.success);
    assert_eq!(turn.tool_results[0].tool_call_id, "call_1");

    // The summary fed to the second completion is surfaced as context.
    assert!(turn.context.contains("Email Search Results (1 emails found):"));
    assert!(turn.context.contains("From: coach@example.com"));
    assert!(turn.context.contains("Content: Practice is at 5pm on the back field."));

    assert_eq!(backend.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_retrieval_feeds_the_prompt() -> Result<()> {
    init_tracing();

    let store = Arc::new(MemoryStore::open_in_memory()?);
    let embedder: SharedEmbedder = Arc::new(MockEmbedder::new(128));

    let processor = DocumentProcessor::new(store.clone(), embedder.clone());
    processor
        .process(
            "Acme renewal: the contract renews on October 1 at the same rate.",
            &json!({"topic": "contracts"}),
            "notes",
            Some("note-1"),
        )
        .await?;

    let backend = Arc::new(MockBackend::with_text("It renews October 1."));
    let agent = ConversationAgent::builder(store)
        .backend(backend.clone())
        .embedder(embedder)
        .build()?;

    let turn = agent.process_message("when does the Acme contract renew?").await;
    assert_eq!(turn.status, TurnStatus::Success);
    assert_eq!(turn.context, "Found relevant context from knowledge base");

    let requests = backend.requests();
    let system = &requests[0].messages[0].content;
    assert!(system.contains("Relevant information from your knowledge base:"));
    assert!(system.contains("Acme renewal"));
    Ok(())
}

#[tokio::test]
async fn test_proactive_email_trigger_end_to_end() -> Result<()> {
    init_tracing();

    let store = Arc::new(MemoryStore::open_in_memory()?);
    let backend = Arc::new(MockBackend::with_text(
        "An urgent email arrived; you asked to be notified.",
    ));
    let agent = ConversationAgent::builder(store)
        .backend(backend)
        .build()?;
    agent.add_instruction("when an urgent email arrives, notify me")?;

    let trigger = ProactiveTrigger::EmailReceived {
        from: "boss@example.com".to_string(),
        subject: "URGENT: server down".to_string(),
    };
    let turn = agent
        .handle_proactive(&trigger)
        .await
        .expect("instruction should match the trigger");
    assert!(!turn.response.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_total_outage_still_answers() -> Result<()> {
    init_tracing();

    let store = Arc::new(MemoryStore::open_in_memory()?);
    let agent = ConversationAgent::builder(store).build()?;

    let turn = agent.process_message("hello").await;
    assert!(turn.response.contains("offline mode"));
    assert!(turn.tool_results.is_empty());
    Ok(())
}
