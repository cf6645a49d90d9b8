//! Ingestion formatters for provider payloads.
//!
//! Each helper renders a provider object into plain text, attaches typed
//! metadata, and hands it to the [`DocumentProcessor`]. Sources are fixed
//! per provider: `gmail`, `hubspot`, `hubspot_notes`, `calendar`.

use attache_memory::EmbeddingRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::processor::DocumentProcessor;

// ─────────────────────────────────────────────────────────────────────────────
// Input Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// An email to ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailInput {
    pub id: String,
    pub thread_id: Option<String>,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

/// A CRM contact to ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// A CRM note to ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteInput {
    pub id: String,
    pub contact_id: String,
    pub content: String,
    pub created_at: String,
}

/// A calendar event to ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEventInput {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub attendees: Vec<String>,
    pub location: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingestion
// ─────────────────────────────────────────────────────────────────────────────

impl DocumentProcessor {
    /// Ingest an email under source `gmail`.
    pub async fn process_email(&self, email: &EmailInput) -> Result<Vec<EmbeddingRecord>> {
        let content = format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\nBody: {}",
            email.from, email.to, email.subject, email.date, email.body
        );
        let metadata = json!({
            "type": "email",
            "from": email.from,
            "to": email.to,
            "subject": email.subject,
            "date": email.date,
            "thread_id": email.thread_id,
        });
        self.process(&content, &metadata, "gmail", Some(&email.id))
            .await
    }

    /// Ingest a CRM contact under source `hubspot`.
    pub async fn process_contact(&self, contact: &ContactInput) -> Result<Vec<EmbeddingRecord>> {
        let content = format!(
            "Name: {} {}\nEmail: {}\nCompany: {}\nPhone: {}\nNotes: {}",
            contact.first_name,
            contact.last_name,
            contact.email,
            contact.company,
            contact.phone,
            contact.notes.as_deref().unwrap_or(""),
        );
        let metadata = json!({
            "type": "hubspot_contact",
            "contact_id": contact.id,
            "email": contact.email,
            "company": contact.company,
        });
        self.process(&content, &metadata, "hubspot", Some(&contact.id))
            .await
    }

    /// Ingest a CRM note under source `hubspot_notes`.
    pub async fn process_note(&self, note: &NoteInput) -> Result<Vec<EmbeddingRecord>> {
        let content = format!(
            "Contact: {}\nNote: {}\nCreated: {}",
            note.contact_id, note.content, note.created_at
        );
        let metadata = json!({
            "type": "hubspot_note",
            "contact_id": note.contact_id,
            "created_at": note.created_at,
        });
        self.process(&content, &metadata, "hubspot_notes", Some(&note.id))
            .await
    }

    /// Ingest a calendar event under source `calendar`.
    pub async fn process_calendar_event(
        &self,
        event: &CalendarEventInput,
    ) -> Result<Vec<EmbeddingRecord>> {
        let content = format!(
            "Title: {}\nDescription: {}\nStart: {}\nEnd: {}\nAttendees: {}\nLocation: {}",
            event.title,
            event.description.as_deref().unwrap_or(""),
            event.start,
            event.end,
            event.attendees.join(", "),
            event.location.as_deref().unwrap_or(""),
        );
        let metadata = json!({
            "type": "calendar_event",
            "event_id": event.id,
            "attendees": event.attendees,
            "location": event.location,
        });
        self.process(&content, &metadata, "calendar", Some(&event.id))
            .await
    }
}
