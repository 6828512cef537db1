use chrono::NaiveDateTime;
use rusqlite::OptionalExtension;

use super::{Store, StoreError};
use crate::due;
use crate::types::Reminder;

fn row_to_reminder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        text: row.get(1)?,
        due_at: row.get(2)?,
        repeat_rule: row.get(3)?,
    })
}

impl Store {
    /// Insert a reminder and return its store-assigned id.
    pub fn add_reminder(
        &self,
        text: &str,
        due: NaiveDateTime,
        repeat: Option<&str>,
    ) -> Result<i64, StoreError> {
        let due_at = due::format_stored(due::ensure_storable(due)?);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reminders (text, due_at, repeat_rule) VALUES (?1, ?2, ?3)",
                rusqlite::params![text, due_at, repeat],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All reminders, earliest due first.
    pub fn reminders(&self) -> Result<Vec<Reminder>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, due_at, repeat_rule FROM reminders ORDER BY due_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([], row_to_reminder)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn reminder(&self, id: i64) -> Result<Option<Reminder>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, text, due_at, repeat_rule FROM reminders WHERE id = ?1",
                    [id],
                    row_to_reminder,
                )
                .optional()?)
        })
    }

    pub fn delete_reminder(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM reminders WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("reminder {id}")));
            }
            Ok(())
        })
    }

    pub fn update_due(&self, id: i64, due: NaiveDateTime) -> Result<(), StoreError> {
        let due_at = due::format_stored(due::ensure_storable(due)?);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reminders SET due_at = ?1 WHERE id = ?2",
                rusqlite::params![due_at, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("reminder {id}")));
            }
            Ok(())
        })
    }
}
