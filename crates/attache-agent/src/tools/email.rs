//! Email search and send tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::providers::EmailProvider;
use crate::tool::{ParamExt, Tool};

const DEFAULT_MAX_RESULTS: u32 = 10;

/// Searches the user's mailbox.
pub struct SearchEmailsTool {
    provider: Arc<dyn EmailProvider>,
}

impl SearchEmailsTool {
    pub fn new(provider: Arc<dyn EmailProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchEmailsTool {
    fn name(&self) -> &str {
        "search_emails"
    }

    fn description(&self) -> &str {
        "Search the user's emails for messages matching a query"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (sender, subject, keywords)"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of emails to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args.required_str("query")?;
        let max_results = args.optional_u32("maxResults").unwrap_or(DEFAULT_MAX_RESULTS);
        let emails = self.provider.search(query, max_results).await?;
        Ok(json!({"emails": emails}))
    }
}

/// Sends an email on the user's behalf.
pub struct SendEmailTool {
    provider: Arc<dyn EmailProvider>,
}

impl SendEmailTool {
    pub fn new(provider: Arc<dyn EmailProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email, optionally as a reply within an existing thread"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Email subject line"
                },
                "body": {
                    "type": "string",
                    "description": "Email body text"
                },
                "threadId": {
                    "type": "string",
                    "description": "Existing thread to reply within"
                }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let to = args.required_str("to")?;
        let subject = args.required_str("subject")?;
        let body = args.required_str("body")?;
        let thread_id = args.optional_str("threadId");
        let receipt = self.provider.send(to, subject, body, thread_id).await?;
        Ok(json!({"sent": receipt}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmailProvider;

    #[tokio::test]
    async fn test_search_wraps_results_under_emails_key() {
        let provider = Arc::new(MockEmailProvider::with_messages(vec![
            json!({"id": "m1", "snippet": "hi"}),
        ]));
        let tool = SearchEmailsTool::new(provider);
        let data = tool.execute(json!({"query": "hi"})).await.unwrap();
        assert_eq!(data["emails"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let tool = SearchEmailsTool::new(Arc::new(MockEmailProvider::default()));
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_search_defaults_max_results() {
        let provider = Arc::new(MockEmailProvider::default());
        let tool = SearchEmailsTool::new(provider.clone());
        tool.execute(json!({"query": "q"})).await.unwrap();
        assert_eq!(provider.calls()[0].args["maxResults"], json!(10));
    }

    #[tokio::test]
    async fn test_send_passes_thread_id() {
        let provider = Arc::new(MockEmailProvider::default());
        let tool = SendEmailTool::new(provider.clone());
        tool.execute(json!({
            "to": "a@x.com",
            "subject": "Re: plans",
            "body": "sure",
            "threadId": "t9"
        }))
        .await
        .unwrap();
        assert_eq!(provider.calls()[0].args["threadId"], json!("t9"));
    }
}
