//! Task store operations.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::store::MemoryStore;
use crate::types::{NewTask, Task, TaskPriority, TaskStatus, TaskUpdate};

impl MemoryStore {
    /// Create a task.
    pub fn create_task(&self, new: NewTask) -> Result<Task> {
        let now = Utc::now();
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO tasks (user_id, title, description, due_date, priority, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)
            "#,
            params![
                new.user_id,
                new.title,
                new.description,
                new.due_date,
                new.priority.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, title = %new.title, "Task created");

        Ok(Task {
            id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            priority: new.priority,
            status: TaskStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update to a task and return the updated row.
    pub fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Task> {
        let now = Utc::now();
        {
            let conn = self.conn.lock();

            let mut sets: Vec<String> = vec!["updated_at = ?1".to_string()];
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now.to_rfc3339())];

            if let Some(status) = update.status {
                values.push(Box::new(status.as_str()));
                sets.push(format!("status = ?{}", values.len()));
            }
            if let Some(result) = update.result {
                values.push(Box::new(result));
                sets.push(format!("result = ?{}", values.len()));
            }
            if let Some(title) = update.title {
                values.push(Box::new(title));
                sets.push(format!("title = ?{}", values.len()));
            }
            if let Some(description) = update.description {
                values.push(Box::new(description));
                sets.push(format!("description = ?{}", values.len()));
            }
            if let Some(due_date) = update.due_date {
                values.push(Box::new(due_date));
                sets.push(format!("due_date = ?{}", values.len()));
            }
            if let Some(priority) = update.priority {
                values.push(Box::new(priority.as_str()));
                sets.push(format!("priority = ?{}", values.len()));
            }

            values.push(Box::new(id));
            let sql = format!(
                "UPDATE tasks SET {} WHERE id = ?{}",
                sets.join(", "),
                values.len()
            );

            let changed = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            if changed == 0 {
                return Err(MemoryError::NotFound(format!("task {id}")));
            }
        }

        self.get_task(id)?
            .ok_or_else(|| MemoryError::NotFound(format!("task {id}")))
    }

    /// Fetch a single task.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, description, due_date, priority, status, result, created_at, updated_at \
             FROM tasks WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_task)?;
        match rows.next() {
            Some(row) => Ok(Some(row??)),
            None => Ok(None),
        }
    }

    /// List a user's tasks, newest first, optionally filtered by status.
    pub fn list_tasks(&self, user_id: &str, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let conn = self.conn.lock();

        let mut tasks = Vec::new();
        match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, title, description, due_date, priority, status, result, created_at, updated_at \
                     FROM tasks WHERE user_id = ?1 AND status = ?2 ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map(params![user_id, status.as_str()], row_to_task)?;
                for row in rows {
                    tasks.push(row??);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, title, description, due_date, priority, status, result, created_at, updated_at \
                     FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map(params![user_id], row_to_task)?;
                for row in rows {
                    tasks.push(row??);
                }
            }
        }
        Ok(tasks)
    }
}

type RowResult = std::result::Result<Result<Task>, rusqlite::Error>;

fn row_to_task(row: &Row<'_>) -> RowResult {
    let priority: String = row.get(5)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    let task = (|| {
        Ok(Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            due_date: row.get(4)?,
            priority: TaskPriority::parse(&priority),
            status: TaskStatus::parse(&status)
                .ok_or_else(|| MemoryError::InvalidData(format!("bad task status '{status}'")))?,
            result: row.get(7)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    })();
    Ok(task)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MemoryError::InvalidData(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::open_in_memory().unwrap()
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            user_id: "user-1".into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_task_defaults() {
        let store = store();
        let task = store.create_task(new_task("follow up")).unwrap();

        assert_eq!(task.title, "follow up");
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
    }

    #[test]
    fn test_update_task_status_and_result() {
        let store = store();
        let task = store.create_task(new_task("send report")).unwrap();

        let updated = store
            .update_task(
                task.id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    result: Some("sent on Friday".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.result.as_deref(), Some("sent on Friday"));
        assert!(updated.updated_at >= task.updated_at);
    }

    #[test]
    fn test_update_missing_task_errors() {
        let store = store();
        let err = store
            .update_task(
                999,
                TaskUpdate {
                    status: Some(TaskStatus::Failed),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[test]
    fn test_list_tasks_filters_by_status() {
        let store = store();
        let first = store.create_task(new_task("one")).unwrap();
        store.create_task(new_task("two")).unwrap();

        store
            .update_task(
                first.id,
                TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();

        let pending = store
            .list_tasks("user-1", Some(TaskStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "two");

        let all = store.list_tasks("user-1", None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_list_tasks_scoped_to_user() {
        let store = store();
        store.create_task(new_task("mine")).unwrap();
        store
            .create_task(NewTask {
                user_id: "user-2".into(),
                title: "theirs".into(),
                ..Default::default()
            })
            .unwrap();

        let tasks = store.list_tasks("user-1", None).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "mine");
    }
}
