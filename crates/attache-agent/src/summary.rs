//! Human-readable rendering of tool results.
//!
//! The rendered text is fed back into the second completion so the
//! model can answer from it; the per-type formats keep provider payload
//! noise (header arrays, base64 bodies) out of the prompt.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use serde_json::Value;

use crate::tool::ToolResultRecord;

/// Render a batch of tool results into prompt text.
pub fn summarize_tool_results(records: &[ToolResultRecord]) -> String {
    let mut out = String::new();
    for record in records {
        if !record.result.success {
            let error = record.result.error.as_deref().unwrap_or("Unknown error");
            out.push_str(&format!(
                "\nTool {} failed: {}\n",
                record.tool_name, error
            ));
            continue;
        }
        match record.tool_name.as_str() {
            "search_emails" => render_emails(&mut out, &record.result.data),
            "search_hubspot_contacts" => render_contacts(&mut out, &record.result.data),
            "search_calendar_events" => render_events(&mut out, &record.result.data),
            name => render_generic(&mut out, name, &record.result.data),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Emails
// ─────────────────────────────────────────────────────────────────────────────

fn render_emails(out: &mut String, data: &Value) {
    let emails = data
        .get("emails")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if emails.is_empty() {
        out.push_str("\nNo emails found matching the search criteria.\n");
        return;
    }

    out.push_str(&format!(
        "\nEmail Search Results ({} emails found):\n",
        emails.len()
    ));
    for (i, email) in emails.iter().enumerate() {
        out.push_str(&format!("\nEmail {}:\n", i + 1));
        out.push_str(&format!(
            "From: {}\n",
            header(email, "From").unwrap_or("Unknown sender")
        ));
        out.push_str(&format!(
            "Subject: {}\n",
            header(email, "Subject").unwrap_or("No subject")
        ));
        out.push_str(&format!(
            "Date: {}\n",
            header(email, "Date").unwrap_or("Unknown date")
        ));
        if let Some(snippet) = email.get("snippet").and_then(Value::as_str) {
            out.push_str(&format!("Snippet: {snippet}\n"));
        }
        if let Some(body) = email_body(email) {
            out.push_str(&format!("Content: {body}\n"));
        }
    }
}

/// Look up a header value in a Gmail-shaped message payload.
fn header<'a>(email: &'a Value, name: &str) -> Option<&'a str> {
    email
        .get("payload")?
        .get("headers")?
        .as_array()?
        .iter()
        .find(|h| h.get("name").and_then(Value::as_str) == Some(name))?
        .get("value")?
        .as_str()
}

/// Extract the message body: the top-level body first, then the first
/// text/plain part. Bodies arrive base64-encoded.
fn email_body(email: &Value) -> Option<String> {
    let payload = email.get("payload")?;
    if let Some(data) = payload
        .get("body")
        .and_then(|b| b.get("data"))
        .and_then(Value::as_str)
    {
        return Some(decode_base64_text(data));
    }
    payload
        .get("parts")?
        .as_array()?
        .iter()
        .find(|part| part.get("mimeType").and_then(Value::as_str) == Some("text/plain"))?
        .get("body")?
        .get("data")?
        .as_str()
        .map(decode_base64_text)
}

/// Decode base64 text, tolerating both standard and URL-safe alphabets
/// and missing padding. Falls back to the raw input when nothing decodes.
fn decode_base64_text(data: &str) -> String {
    for engine in [&STANDARD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(bytes) = engine.decode(data) {
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    data.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Contacts
// ─────────────────────────────────────────────────────────────────────────────

fn render_contacts(out: &mut String, data: &Value) {
    let contacts = data
        .get("contacts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if contacts.is_empty() {
        out.push_str("\nNo contacts found matching the search criteria.\n");
        return;
    }

    out.push_str(&format!(
        "\nHubSpot Contact Search Results ({} contacts found):\n",
        contacts.len()
    ));
    for contact in contacts {
        let props = contact.get("properties").cloned().unwrap_or(Value::Null);
        let first = props.get("firstname").and_then(Value::as_str).unwrap_or("");
        let last = props.get("lastname").and_then(Value::as_str).unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        out.push_str(&format!("\nName: {name}\n"));
        out.push_str(&format!(
            "Email: {}\n",
            props.get("email").and_then(Value::as_str).unwrap_or("No email")
        ));
        out.push_str(&format!(
            "Company: {}\n",
            props
                .get("company")
                .and_then(Value::as_str)
                .unwrap_or("No company")
        ));
        out.push_str(&format!(
            "Phone: {}\n",
            props.get("phone").and_then(Value::as_str).unwrap_or("No phone")
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Calendar Events
// ─────────────────────────────────────────────────────────────────────────────

fn render_events(out: &mut String, data: &Value) {
    let events = data
        .get("events")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if events.is_empty() {
        out.push_str("\nNo calendar events found matching the search criteria.\n");
        return;
    }

    out.push_str(&format!(
        "\nCalendar Event Search Results ({} events found):\n",
        events.len()
    ));
    for event in events {
        out.push_str(&format!(
            "\nTitle: {}\n",
            event
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("No title")
        ));
        out.push_str(&format!(
            "Start: {}\n",
            event_time(event, "start").unwrap_or("No start time")
        ));
        out.push_str(&format!(
            "End: {}\n",
            event_time(event, "end").unwrap_or("No end time")
        ));
        out.push_str(&format!(
            "Description: {}\n",
            event
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("No description")
        ));
    }
}

/// Timed events carry `dateTime`; all-day events carry `date`.
fn event_time<'a>(event: &'a Value, field: &str) -> Option<&'a str> {
    let slot = event.get(field)?;
    slot.get("dateTime")
        .or_else(|| slot.get("date"))
        .and_then(Value::as_str)
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic
// ─────────────────────────────────────────────────────────────────────────────

fn render_generic(out: &mut String, name: &str, data: &Value) {
    out.push_str(&format!("\nTool {name} executed successfully.\n"));
    if !data.is_null() {
        if let Ok(pretty) = serde_json::to_string_pretty(data) {
            out.push_str(&format!("Result: {pretty}\n"));
        }
    }
}
