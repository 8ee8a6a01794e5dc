//! Audit log storage

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{format_datetime, parse_datetime, parse_json_opt};
use crate::error::Result;
use crate::models::{AuditAction, AuditEntry, NewAuditEntry};

pub struct AuditStore<'a> {
    conn: &'a Connection,
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: AuditAction::from_str_lossy(&row.get::<_, String>(2)?),
        table_affected: row.get(3)?,
        record_id: row.get(4)?,
        issue_id: row.get(5)?,
        old_values: parse_json_opt(row.get(6)?)?,
        new_values: parse_json_opt(row.get(7)?)?,
        timestamp: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}

impl<'a> AuditStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an entry, returning its id
    #[instrument(skip(self, entry), fields(action = entry.action.as_str(), record_id = entry.record_id))]
    pub fn record(&self, entry: &NewAuditEntry) -> Result<i64> {
        let old_values = entry
            .old_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let new_values = entry
            .new_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO audit_log
                (user_id, action_type, table_affected, record_id, issue_id,
                 old_values, new_values, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.user_id,
                entry.action.as_str(),
                entry.table_affected,
                entry.record_id,
                entry.issue_id,
                old_values,
                new_values,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest first, optionally for one request
    pub fn list(&self, skip: u32, limit: u32, issue_id: Option<i64>) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, action_type, table_affected, record_id, issue_id,
                    old_values, new_values, timestamp
             FROM audit_log
             WHERE (?1 IS NULL OR issue_id = ?1)
             ORDER BY id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let entries = stmt
            .query_map(params![issue_id, limit, skip], entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;

    #[test]
    fn test_record_and_list() {
        let db = Database::open_in_memory().unwrap();
        let audit = db.audit();

        let entry = NewAuditEntry {
            user_id: None,
            action: AuditAction::Login,
            table_affected: "users",
            record_id: None,
            issue_id: None,
            old_values: None,
            new_values: Some(json!({"email": "a@example.edu"})),
        };
        let first = audit.record(&entry).unwrap();
        let second = audit.record(&entry).unwrap();
        assert!(second > first);

        let entries = audit.list(0, 10, None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[0].action, AuditAction::Login);
        assert_eq!(
            entries[0].new_values,
            Some(json!({"email": "a@example.edu"}))
        );
        assert!(audit.list(0, 10, Some(42)).unwrap().is_empty());
    }
}
