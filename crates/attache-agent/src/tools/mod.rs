//! The fixed tool surface exposed to the model.

mod calendar;
mod crm;
mod email;
mod task;

pub use calendar::{CreateEventTool, SearchEventsTool};
pub use crm::{AddNoteTool, CreateContactTool, SearchContactsTool};
pub use email::{SearchEmailsTool, SendEmailTool};
pub use task::{CreateTaskTool, UpdateTaskTool};

use std::sync::Arc;

use attache_memory::MemoryStore;

use crate::tool::ToolRegistry;
use crate::providers::{CalendarProvider, CrmProvider, EmailProvider};
use crate::types::AgentConfig;
use crate::Result;

/// Build the standard nine-tool registry over the given providers.
///
/// Tasks are created for `config.user_id`. Definitions are validated
/// up front; a malformed schema fails here rather than at call time.
pub fn standard_registry(
    email: Arc<dyn EmailProvider>,
    crm: Arc<dyn CrmProvider>,
    calendar: Arc<dyn CalendarProvider>,
    store: Arc<MemoryStore>,
    config: &AgentConfig,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchEmailsTool::new(email.clone())))?;
    registry.register(Arc::new(SendEmailTool::new(email)))?;
    registry.register(Arc::new(SearchContactsTool::new(crm.clone())))?;
    registry.register(Arc::new(CreateContactTool::new(crm.clone())))?;
    registry.register(Arc::new(AddNoteTool::new(crm)))?;
    registry.register(Arc::new(SearchEventsTool::new(calendar.clone())))?;
    registry.register(Arc::new(CreateEventTool::new(calendar)))?;
    registry.register(Arc::new(CreateTaskTool::new(
        store.clone(),
        &config.user_id,
    )))?;
    registry.register(Arc::new(UpdateTaskTool::new(store)))?;
    Ok(registry)
}
