//! Standing instruction operations.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::store::MemoryStore;
use crate::types::Instruction;

impl MemoryStore {
    /// Persist a new standing instruction, active by default.
    pub fn add_instruction(&self, text: &str) -> Result<Instruction> {
        let now = Utc::now();
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO instructions (instruction, active, created_at) VALUES (?1, 1, ?2)",
            params![text, now.to_rfc3339()],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, "Instruction added");

        Ok(Instruction {
            id,
            instruction: text.to_string(),
            active: true,
            created_at: now,
        })
    }

    /// All active instructions, newest first.
    pub fn active_instructions(&self) -> Result<Vec<Instruction>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, instruction, active, created_at \
             FROM instructions WHERE active = 1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], row_to_instruction)?;

        let mut instructions = Vec::new();
        for row in rows {
            instructions.push(row??);
        }
        Ok(instructions)
    }

    /// Retire an instruction. Returns false if no such instruction exists.
    pub fn deactivate_instruction(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE instructions SET active = 0 WHERE id = ?1",
            params![id],
        )?;
        if changed > 0 {
            debug!(id, "Instruction deactivated");
        }
        Ok(changed > 0)
    }
}

type RowResult = std::result::Result<Result<Instruction>, rusqlite::Error>;

fn row_to_instruction(row: &Row<'_>) -> RowResult {
    let created_at: String = row.get(3)?;
    let instruction = (|| {
        Ok(Instruction {
            id: row.get(0)?,
            instruction: row.get(1)?,
            active: row.get::<_, i64>(2)? != 0,
            created_at: parse_timestamp(&created_at)?,
        })
    })();
    Ok(instruction)
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

    #[test]
    fn test_add_and_list_instructions() {
        let store = store();
        store.add_instruction("always CC my assistant").unwrap();
        store.add_instruction("flag urgent emails").unwrap();

        let active = store.active_instructions().unwrap();
        assert_eq!(active.len(), 2);
        // Newest first
        assert_eq!(active[0].instruction, "flag urgent emails");
        assert_eq!(active[1].instruction, "always CC my assistant");
        assert!(active.iter().all(|i| i.active));
    }

    #[test]
    fn test_deactivate_hides_from_active_list() {
        let store = store();
        let kept = store.add_instruction("keep me").unwrap();
        let retired = store.add_instruction("retire me").unwrap();

        assert!(store.deactivate_instruction(retired.id).unwrap());

        let active = store.active_instructions().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);
    }

    #[test]
    fn test_deactivate_missing_returns_false() {
        let store = store();
        assert!(!store.deactivate_instruction(42).unwrap());
    }
}
