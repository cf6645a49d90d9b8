//! CRM contact tools: search, create, and note attachment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::providers::CrmProvider;
use crate::tool::{ParamExt, Tool};

const DEFAULT_LIMIT: u32 = 10;

/// Searches CRM contacts.
pub struct SearchContactsTool {
    provider: Arc<dyn CrmProvider>,
}

impl SearchContactsTool {
    pub fn new(provider: Arc<dyn CrmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchContactsTool {
    fn name(&self) -> &str {
        "search_hubspot_contacts"
    }

    fn description(&self) -> &str {
        "Search HubSpot contacts by name, email, or company"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (name, email, or company)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of contacts to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args.required_str("query")?;
        let limit = args.optional_u32("limit").unwrap_or(DEFAULT_LIMIT);
        let contacts = self.provider.search_contacts(query, limit).await?;
        Ok(json!({"contacts": contacts}))
    }
}

/// Creates a CRM contact.
pub struct CreateContactTool {
    provider: Arc<dyn CrmProvider>,
}

impl CreateContactTool {
    pub fn new(provider: Arc<dyn CrmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for CreateContactTool {
    fn name(&self) -> &str {
        "create_hubspot_contact"
    }

    fn description(&self) -> &str {
        "Create a new contact in HubSpot"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Contact email address"
                },
                "firstName": {
                    "type": "string",
                    "description": "Contact first name"
                },
                "lastName": {
                    "type": "string",
                    "description": "Contact last name"
                },
                "company": {
                    "type": "string",
                    "description": "Contact company"
                },
                "phone": {
                    "type": "string",
                    "description": "Contact phone number"
                }
            },
            "required": ["email"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let email = args.required_str("email")?;

        // HubSpot property names differ from the wire parameter names.
        let mut properties = Map::new();
        properties.insert("email".to_string(), json!(email));
        if let Some(first) = args.optional_str("firstName") {
            properties.insert("firstname".to_string(), json!(first));
        }
        if let Some(last) = args.optional_str("lastName") {
            properties.insert("lastname".to_string(), json!(last));
        }
        if let Some(company) = args.optional_str("company") {
            properties.insert("company".to_string(), json!(company));
        }
        if let Some(phone) = args.optional_str("phone") {
            properties.insert("phone".to_string(), json!(phone));
        }

        let contact = self.provider.create_contact(Value::Object(properties)).await?;
        Ok(json!({"contact": contact}))
    }
}

/// Attaches a note to a CRM contact.
pub struct AddNoteTool {
    provider: Arc<dyn CrmProvider>,
}

impl AddNoteTool {
    pub fn new(provider: Arc<dyn CrmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for AddNoteTool {
    fn name(&self) -> &str {
        "add_hubspot_note"
    }

    fn description(&self) -> &str {
        "Attach a note to an existing HubSpot contact"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contactId": {
                    "type": "string",
                    "description": "Id of the contact to attach the note to"
                },
                "content": {
                    "type": "string",
                    "description": "Note text"
                }
            },
            "required": ["contactId", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let contact_id = args.required_str("contactId")?;
        let content = args.required_str("content")?;
        let note = self.provider.add_note(contact_id, content).await?;
        Ok(json!({"note": note}))
    }
}
