//! Row types for the storage crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Embeddings
// ─────────────────────────────────────────────────────────────────────────────

/// A stored content chunk with its embedding vector.
///
/// Records are append-only: re-ingestion creates new chunk records rather
/// than mutating existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Row id.
    pub id: i64,
    /// Chunk text.
    pub content: String,
    /// Fixed-dimension embedding vector.
    pub embedding: Vec<f32>,
    /// Arbitrary JSON metadata (chunk index, sender, subject, ...).
    pub metadata: Value,
    /// Origin system (e.g. "gmail", "hubspot", "calendar").
    pub source: String,
    /// Identifier within the origin system.
    pub source_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A record paired with its similarity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    /// The matched record.
    pub record: EmbeddingRecord,
    /// Cosine similarity in [-1, 1]; 0 for dimension mismatches.
    pub similarity: f32,
}

/// Equality filters applied before the similarity scan.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingFilter {
    /// Restrict to records from this source.
    pub source: Option<String>,
    /// Restrict to records with this source id.
    pub source_id: Option<String>,
}

impl EmbeddingFilter {
    /// No filtering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Filter by source.
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            source_id: None,
        }
    }

    /// Additionally filter by source id.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

/// Outcome of an embedding search.
///
/// Search never propagates persistence failures; a failure yields
/// [`SearchOutcome::Degraded`] with no records, which callers may treat as
/// an empty result while still observing that degradation occurred.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// The scan completed.
    Ok(Vec<ScoredRecord>),
    /// The scan failed; no records are available.
    Degraded {
        /// Description of the underlying failure.
        error: String,
    },
}

impl SearchOutcome {
    /// The matched records, empty when degraded.
    pub fn records(&self) -> &[ScoredRecord] {
        match self {
            SearchOutcome::Ok(records) => records,
            SearchOutcome::Degraded { .. } => &[],
        }
    }

    /// Consume the outcome, yielding its records (empty when degraded).
    pub fn into_records(self) -> Vec<ScoredRecord> {
        match self {
            SearchOutcome::Ok(records) => records,
            SearchOutcome::Degraded { .. } => Vec::new(),
        }
    }

    /// Whether the search degraded to an empty result.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SearchOutcome::Degraded { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    /// Parse from the stored form, defaulting to medium.
    pub fn parse(s: &str) -> Self {
        match s {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Medium,
        }
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse from the stored form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Row id.
    pub id: i64,
    /// Owning user.
    pub user_id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Due date as provided by the caller (ISO 8601 by convention).
    pub due_date: Option<String>,
    /// Priority.
    pub priority: TaskPriority,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Free-text outcome recorded on completion or failure.
    pub result: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Owning user.
    pub user_id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Due date (ISO 8601 by convention).
    pub due_date: Option<String>,
    /// Priority; defaults to medium.
    pub priority: TaskPriority,
}

/// Partial update applied to a task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New status, if changing.
    pub status: Option<TaskStatus>,
    /// New result text, if recording one.
    pub result: Option<String>,
    /// New title, if changing.
    pub title: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// New due date, if changing.
    pub due_date: Option<String>,
    /// New priority, if changing.
    pub priority: Option<TaskPriority>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Standing Instructions
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted directive the agent consults on every turn and on every
/// proactive trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Row id.
    pub id: i64,
    /// Instruction text.
    pub instruction: String,
    /// Whether the instruction is in effect. Retired instructions are
    /// deactivated, not deleted.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
