//! Task tracking tools over the local memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use attache_memory::{MemoryStore, NewTask, TaskStatus, TaskUpdate};

use crate::error::{AgentError, Result};
use crate::tool::{ParamExt, Tool};

/// Creates a tracked task for the user.
pub struct CreateTaskTool {
    store: Arc<MemoryStore>,
    user_id: String,
}

impl CreateTaskTool {
    pub fn new(store: Arc<MemoryStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "create_task"
    }

    fn description(&self) -> &str {
        "Create a task to track follow-up work for the user"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "What the task is"
                },
                "context": {
                    "type": "string",
                    "description": "Additional context for the task"
                }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let description = args.required_str("description")?;
        let context = args.optional_str("context");

        let task = self.store.create_task(NewTask {
            user_id: self.user_id.clone(),
            title: description.to_string(),
            description: context.map(String::from),
            due_date: None,
            priority: Default::default(),
        })?;

        Ok(json!({"task": task}))
    }
}

/// Updates the status or result of an existing task.
pub struct UpdateTaskTool {
    store: Arc<MemoryStore>,
}

impl UpdateTaskTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> &str {
        "update_task"
    }

    fn description(&self) -> &str {
        "Update the status or result of an existing task"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "integer",
                    "description": "Id of the task to update"
                },
                "status": {
                    "type": "string",
                    "enum": ["pending", "in_progress", "completed", "failed"],
                    "description": "New status"
                },
                "result": {
                    "type": "string",
                    "description": "Outcome text to record"
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let task_id = args.required_i64("taskId")?;

        let status = match args.optional_str("status") {
            None => None,
            Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
                AgentError::invalid_params(format!("unknown task status '{raw}'"))
            })?),
        };

        let task = self.store.update_task(
            task_id,
            TaskUpdate {
                status,
                result: args.optional_str("result").map(String::from),
                ..TaskUpdate::default()
            },
        )?;

        Ok(json!({"task": task}))
    }
}
