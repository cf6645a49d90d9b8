//! External service provider traits and test doubles.
//!
//! Payloads flow as [`serde_json::Value`] in the upstream services'
//! native shapes (Gmail message objects, HubSpot contact objects,
//! Google Calendar events); the tools wrap them but do not reshape
//! them. Concrete HTTP implementations live with the integration that
//! owns the credentials.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Provider Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Email search and send.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Search messages matching a query. Results are provider-shaped
    /// message objects.
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Value>>;

    /// Send a message, optionally threading onto an existing
    /// conversation. Returns the provider's send receipt.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        thread_id: Option<&str>,
    ) -> Result<Value>;
}

/// CRM contact search, creation, and note attachment.
#[async_trait]
pub trait CrmProvider: Send + Sync {
    /// Search contacts matching a query.
    async fn search_contacts(&self, query: &str, limit: u32) -> Result<Vec<Value>>;

    /// Create a contact from its properties. Returns the created
    /// contact object.
    async fn create_contact(&self, properties: Value) -> Result<Value>;

    /// Attach a note to a contact. Returns the created note object.
    async fn add_note(&self, contact_id: &str, content: &str) -> Result<Value>;
}

/// Calendar event search and creation.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Search events matching a query within an optional time window.
    async fn search(
        &self,
        query: &str,
        time_min: Option<&str>,
        time_max: Option<&str>,
    ) -> Result<Vec<Value>>;

    /// Create an event. Returns the created event object.
    async fn create(&self, event: Value) -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Providers
// ─────────────────────────────────────────────────────────────────────────────

/// Recorded provider call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Which provider method ran.
    pub method: String,
    /// Its arguments, bundled as JSON.
    pub args: Value,
}

fn record(calls: &Mutex<Vec<RecordedCall>>, method: &str, args: Value) {
    calls.lock().push(RecordedCall {
        method: method.to_string(),
        args,
    });
}

/// In-memory email provider for tests.
#[derive(Default)]
pub struct MockEmailProvider {
    messages: Vec<Value>,
    fail: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockEmailProvider {
    /// A mock with canned search results.
    pub fn with_messages(messages: Vec<Value>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Make every call fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Value>> {
        record(
            &self.calls,
            "search",
            json!({"query": query, "maxResults": max_results}),
        );
        if self.fail {
            return Err(AgentError::provider("email service unavailable"));
        }
        Ok(self
            .messages
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        thread_id: Option<&str>,
    ) -> Result<Value> {
        record(
            &self.calls,
            "send",
            json!({"to": to, "subject": subject, "body": body, "threadId": thread_id}),
        );
        if self.fail {
            return Err(AgentError::provider("email service unavailable"));
        }
        Ok(json!({"id": "msg_1", "threadId": thread_id.unwrap_or("thread_1")}))
    }
}

/// In-memory CRM provider for tests.
#[derive(Default)]
pub struct MockCrmProvider {
    contacts: Vec<Value>,
    fail: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCrmProvider {
    /// A mock with canned contact search results.
    pub fn with_contacts(contacts: Vec<Value>) -> Self {
        Self {
            contacts,
            ..Self::default()
        }
    }

    /// Make every call fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CrmProvider for MockCrmProvider {
    async fn search_contacts(&self, query: &str, limit: u32) -> Result<Vec<Value>> {
        record(
            &self.calls,
            "search_contacts",
            json!({"query": query, "limit": limit}),
        );
        if self.fail {
            return Err(AgentError::provider("crm service unavailable"));
        }
        Ok(self.contacts.iter().take(limit as usize).cloned().collect())
    }

    async fn create_contact(&self, properties: Value) -> Result<Value> {
        record(&self.calls, "create_contact", properties.clone());
        if self.fail {
            return Err(AgentError::provider("crm service unavailable"));
        }
        Ok(json!({"id": "contact_1", "properties": properties}))
    }

    async fn add_note(&self, contact_id: &str, content: &str) -> Result<Value> {
        record(
            &self.calls,
            "add_note",
            json!({"contactId": contact_id, "content": content}),
        );
        if self.fail {
            return Err(AgentError::provider("crm service unavailable"));
        }
        Ok(json!({"id": "note_1", "contactId": contact_id}))
    }
}

/// In-memory calendar provider for tests.
#[derive(Default)]
pub struct MockCalendarProvider {
    events: Vec<Value>,
    fail: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCalendarProvider {
    /// A mock with canned event search results.
    pub fn with_events(events: Vec<Value>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Make every call fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn search(
        &self,
        query: &str,
        time_min: Option<&str>,
        time_max: Option<&str>,
    ) -> Result<Vec<Value>> {
        record(
            &self.calls,
            "search",
            json!({"query": query, "timeMin": time_min, "timeMax": time_max}),
        );
        if self.fail {
            return Err(AgentError::provider("calendar service unavailable"));
        }
        Ok(self.events.clone())
    }

    async fn create(&self, event: Value) -> Result<Value> {
        record(&self.calls, "create", event.clone());
        if self.fail {
            return Err(AgentError::provider("calendar service unavailable"));
        }
        let mut created = event;
        if let Some(obj) = created.as_object_mut() {
            obj.insert("id".to_string(), json!("event_1"));
        }
        Ok(created)
    }
}
