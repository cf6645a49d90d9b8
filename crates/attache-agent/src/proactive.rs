//! Proactive turns driven by external events rather than user messages.
//!
//! When something happens upstream (a new email, contact, or event),
//! the agent checks its standing instructions for any that plausibly
//! apply and, if so, runs a normal turn asking whether action is
//! warranted. No matching instructions means no turn and no cost.

use tracing::{debug, info};

use crate::agent::ConversationAgent;
use crate::types::TurnResponse;

/// An external event that may warrant unprompted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProactiveTrigger {
    /// A new email arrived.
    EmailReceived { from: String, subject: String },
    /// A contact was created in the CRM.
    ContactCreated { email: String },
    /// A calendar event was created.
    CalendarEventCreated { title: String },
}

impl ProactiveTrigger {
    /// Stable kind string, used for instruction matching.
    pub fn kind(&self) -> &'static str {
        match self {
            ProactiveTrigger::EmailReceived { .. } => "email_received",
            ProactiveTrigger::ContactCreated { .. } => "contact_created",
            ProactiveTrigger::CalendarEventCreated { .. } => "calendar_event_created",
        }
    }

    /// Human-readable description of the event.
    pub fn context_message(&self) -> String {
        match self {
            ProactiveTrigger::EmailReceived { from, subject } => {
                format!("New email received from {from} with subject: {subject}")
            }
            ProactiveTrigger::ContactCreated { email } => {
                format!("New contact created in HubSpot: {email}")
            }
            ProactiveTrigger::CalendarEventCreated { title } => {
                format!("New calendar event created: {title}")
            }
        }
    }

    /// Whether an instruction plausibly applies to this trigger.
    ///
    /// Coarse keyword matching: the model does the real judging once a
    /// turn runs. False positives cost a completion; false negatives
    /// cost a missed action, so any domain keyword matches regardless
    /// of the trigger kind.
    fn instruction_applies(&self, instruction: &str) -> bool {
        let lowered = instruction.to_lowercase();
        lowered.contains(self.kind())
            || ["when", "email", "contact", "calendar"]
                .iter()
                .any(|keyword| lowered.contains(keyword))
    }
}

impl ConversationAgent {
    /// Handle an external event against the standing instructions.
    ///
    /// Returns `None` when no instruction applies; otherwise runs a
    /// turn asking the model whether action should be taken.
    pub async fn handle_proactive(&self, trigger: &ProactiveTrigger) -> Option<TurnResponse> {
        // Another session may have added instructions since ours loaded.
        if let Err(err) = self.refresh_instructions() {
            debug!(error = %err, "Instruction refresh failed, using cached set");
        }

        let relevant: Vec<String> = self
            .instructions()
            .iter()
            .filter(|i| trigger.instruction_applies(&i.instruction))
            .map(|i| i.instruction.clone())
            .collect();

        if relevant.is_empty() {
            debug!(kind = trigger.kind(), "No instructions apply to trigger");
            return None;
        }

        info!(
            kind = trigger.kind(),
            matched = relevant.len(),
            "Running proactive turn"
        );
        let message = format!(
            "{}\n\nConsider these ongoing instructions:\n{}\n\nShould any action be taken?",
            trigger.context_message(),
            relevant.join("\n")
        );
        Some(self.process_message(&message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use attache_llm::MockBackend;
    use attache_memory::MemoryStore;

    fn agent_with_backend(backend: Arc<MockBackend>) -> ConversationAgent {
        ConversationAgent::builder(Arc::new(MemoryStore::open_in_memory().unwrap()))
            .backend(backend)
            .build()
            .unwrap()
    }

    #[test]
    fn test_trigger_context_messages() {
        let trigger = ProactiveTrigger::EmailReceived {
            from: "boss@example.com".to_string(),
            subject: "URGENT: outage".to_string(),
        };
        assert_eq!(
            trigger.context_message(),
            "New email received from boss@example.com with subject: URGENT: outage"
        );
        assert_eq!(trigger.kind(), "email_received");

        let trigger = ProactiveTrigger::ContactCreated {
            email: "new@example.com".to_string(),
        };
        assert_eq!(
            trigger.context_message(),
            "New contact created in HubSpot: new@example.com"
        );
    }

    #[tokio::test]
    async fn test_no_instructions_means_no_turn() {
        let backend = Arc::new(MockBackend::with_text("unused"));
        let agent = agent_with_backend(backend.clone());

        let trigger = ProactiveTrigger::EmailReceived {
            from: "a@x.com".to_string(),
            subject: "hi".to_string(),
        };
        assert!(agent.handle_proactive(&trigger).await.is_none());
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_instruction_does_not_fire() {
        let backend = Arc::new(MockBackend::with_text("unused"));
        let agent = agent_with_backend(backend.clone());
        agent.add_instruction("prefer metric units").unwrap();

        let trigger = ProactiveTrigger::ContactCreated {
            email: "a@x.com".to_string(),
        };
        assert!(agent.handle_proactive(&trigger).await.is_none());
    }

    #[tokio::test]
    async fn test_cross_domain_instruction_fires() {
        let backend = Arc::new(MockBackend::with_text("Checked the calendar."));
        let agent = agent_with_backend(backend.clone());
        agent
            .add_instruction("keep my calendar clear of conflicts")
            .unwrap();

        // An email trigger still surfaces calendar instructions.
        let trigger = ProactiveTrigger::EmailReceived {
            from: "boss@example.com".to_string(),
            subject: "reschedule?".to_string(),
        };
        let turn = agent.handle_proactive(&trigger).await.unwrap();
        assert!(!turn.response.is_empty());

        let requests = backend.requests();
        let prompt = &requests[0].messages.last().unwrap().content;
        assert!(prompt.contains("keep my calendar clear of conflicts"));
    }

    #[tokio::test]
    async fn test_urgent_email_instruction_fires() {
        let backend = Arc::new(MockBackend::with_text(
            "Yes, notify the user about the urgent email.",
        ));
        let agent = agent_with_backend(backend.clone());
        agent
            .add_instruction("when an urgent email arrives, notify me")
            .unwrap();

        let trigger = ProactiveTrigger::EmailReceived {
            from: "boss@example.com".to_string(),
            subject: "URGENT: outage".to_string(),
        };
        let turn = agent.handle_proactive(&trigger).await.unwrap();
        assert!(!turn.response.is_empty());
        assert_eq!(backend.request_count(), 1);

        let requests = backend.requests();
        let prompt = &requests[0].messages.last().unwrap().content;
        assert!(prompt.contains("New email received from boss@example.com"));
        assert!(prompt.contains("Consider these ongoing instructions:"));
        assert!(prompt.contains("when an urgent email arrives, notify me"));
        assert!(prompt.contains("Should any action be taken?"));
    }

    #[tokio::test]
    async fn test_instructions_refreshed_from_store() {
        let store = Arc::new(MemoryStore::open_in_memory().unwrap());
        let backend = Arc::new(MockBackend::with_text("ok"));
        let agent = ConversationAgent::builder(store.clone())
            .backend(backend)
            .build()
            .unwrap();

        // Instruction added behind the agent's back.
        store
            .add_instruction("when a calendar event is created, check for conflicts")
            .unwrap();

        let trigger = ProactiveTrigger::CalendarEventCreated {
            title: "Board meeting".to_string(),
        };
        assert!(agent.handle_proactive(&trigger).await.is_some());
    }
}
