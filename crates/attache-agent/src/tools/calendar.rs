//! Calendar event tools: search and create.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::providers::CalendarProvider;
use crate::tool::{ParamExt, Tool};

/// Searches calendar events.
pub struct SearchEventsTool {
    provider: Arc<dyn CalendarProvider>,
}

impl SearchEventsTool {
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchEventsTool {
    fn name(&self) -> &str {
        "search_calendar_events"
    }

    fn description(&self) -> &str {
        "Search calendar events matching a query, optionally within a time window"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (event title or description keywords)"
                },
                "timeMin": {
                    "type": "string",
                    "description": "Earliest event time, RFC 3339"
                },
                "timeMax": {
                    "type": "string",
                    "description": "Latest event time, RFC 3339"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args.required_str("query")?;
        let time_min = args.optional_str("timeMin");
        let time_max = args.optional_str("timeMax");
        let events = self.provider.search(query, time_min, time_max).await?;
        Ok(json!({"events": events}))
    }
}

/// Creates a calendar event.
pub struct CreateEventTool {
    provider: Arc<dyn CalendarProvider>,
}

impl CreateEventTool {
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "create_calendar_event"
    }

    fn description(&self) -> &str {
        "Create a calendar event with a title, start, and end time"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Event title"
                },
                "start": {
                    "type": "string",
                    "description": "Start time, RFC 3339"
                },
                "end": {
                    "type": "string",
                    "description": "End time, RFC 3339"
                },
                "description": {
                    "type": "string",
                    "description": "Event description"
                },
                "attendees": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Attendee email addresses"
                },
                "location": {
                    "type": "string",
                    "description": "Event location"
                }
            },
            "required": ["title", "start", "end"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let title = args.required_str("title")?;
        let start = args.required_str("start")?;
        let end = args.required_str("end")?;

        let mut event = Map::new();
        event.insert("summary".to_string(), json!(title));
        event.insert("start".to_string(), json!({"dateTime": start}));
        event.insert("end".to_string(), json!({"dateTime": end}));
        if let Some(description) = args.optional_str("description") {
            event.insert("description".to_string(), json!(description));
        }
        let attendees = args.optional_str_array("attendees");
        if !attendees.is_empty() {
            let list: Vec<Value> = attendees
                .iter()
                .map(|email| json!({"email": email}))
                .collect();
            event.insert("attendees".to_string(), json!(list));
        }
        if let Some(location) = args.optional_str("location") {
            event.insert("location".to_string(), json!(location));
        }

        let created = self.provider.create(Value::Object(event)).await?;
        Ok(json!({"event": created}))
    }
}
