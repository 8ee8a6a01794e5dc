//! Officer assignment storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{conflict_on_constraint, format_datetime, parse_datetime, parse_datetime_opt};
use crate::error::{Error, Result};
use crate::models::{NewAssignment, OfficerAssignment};

pub struct AssignmentStore<'a> {
    conn: &'a Connection,
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<OfficerAssignment> {
    Ok(OfficerAssignment {
        id: row.get(0)?,
        request_id: row.get(1)?,
        officer_id: row.get(2)?,
        assigned_at: parse_datetime(&row.get::<_, String>(3)?)?,
        estimated_completion: parse_datetime_opt(row.get(4)?)?,
        notes: row.get(5)?,
    })
}

impl<'a> AssignmentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, assignment, now), fields(officer_id = assignment.officer_id))]
    pub fn create(
        &self,
        request_id: i64,
        assignment: &NewAssignment,
        now: DateTime<Utc>,
    ) -> Result<OfficerAssignment> {
        self.conn
            .execute(
                "INSERT INTO officer_assignments
                    (request_id, officer_id, assigned_at, estimated_completion, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    request_id,
                    assignment.officer_id,
                    format_datetime(&now),
                    assignment.estimated_completion.as_ref().map(format_datetime),
                    assignment.notes,
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "officer already assigned to this request"))?;

        let id = self.conn.last_insert_rowid();
        let created = self
            .conn
            .query_row(
                "SELECT id, request_id, officer_id, assigned_at, estimated_completion, notes
                 FROM officer_assignments WHERE id = ?1",
                params![id],
                assignment_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    Error::not_found(format!("assignment {id}"))
                }
                other => Error::Database(other),
            })?;
        Ok(created)
    }

    pub fn list_for_request(&self, request_id: i64) -> Result<Vec<OfficerAssignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, request_id, officer_id, assigned_at, estimated_completion, notes
             FROM officer_assignments WHERE request_id = ?1
             ORDER BY assigned_at, id",
        )?;
        let assignments = stmt
            .query_map(params![request_id], assignment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(assignments)
    }
}
