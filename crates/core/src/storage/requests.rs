//! Maintenance request storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{
    conflict_on_constraint, format_datetime, parse_datetime, parse_datetime_opt, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{MaintenanceRequest, NewMaintenanceRequest, RequestLocation, RequestStatus};

const REQUEST_COLUMNS: &str = "r.id, r.student_id, r.room_id, r.category_id, r.status_id, \
     r.description, r.availability, r.estimated_cost, r.actual_cost, \
     r.submitted_at, r.last_updated_at, r.completed_at";

/// Row-level predicates for a request listing. Every `Some` narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub student_id: Option<i64>,
    pub hall_id: Option<i64>,
    pub status_id: Option<i64>,
    pub category_id: Option<i64>,
    pub active_only: bool,
    pub skip: u32,
    pub limit: u32,
}

pub struct RequestStore<'a> {
    conn: &'a Connection,
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceRequest> {
    Ok(MaintenanceRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        room_id: row.get(2)?,
        category_id: row.get(3)?,
        status_id: row.get(4)?,
        description: row.get(5)?,
        availability: row.get(6)?,
        estimated_cost: row.get(7)?,
        actual_cost: row.get(8)?,
        submitted_at: parse_datetime(&row.get::<_, String>(9)?)?,
        last_updated_at: parse_datetime(&row.get::<_, String>(10)?)?,
        completed_at: parse_datetime_opt(row.get(11)?)?,
    })
}

impl<'a> RequestStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new Pending request filed by `student_id` for `room_id`
    #[instrument(skip(self, request, now))]
    pub fn insert(
        &self,
        student_id: i64,
        room_id: i64,
        request: &NewMaintenanceRequest,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceRequest> {
        let stamp = format_datetime(&now);
        self.conn
            .execute(
                "INSERT INTO maintenance_requests
                    (student_id, room_id, category_id, status_id, description, availability,
                     estimated_cost, submitted_at, last_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    student_id,
                    room_id,
                    request.category_id,
                    RequestStatus::Pending.id(),
                    request.description,
                    request.availability,
                    request.estimated_cost,
                    stamp,
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "request references missing data"))?;

        let id = self.conn.last_insert_rowid();
        self.find(id)?
            .ok_or_else(|| Error::not_found(format!("maintenance request {id}")))
    }

    #[instrument(skip(self))]
    pub fn find(&self, id: i64) -> Result<Option<MaintenanceRequest>> {
        let request = self
            .conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM maintenance_requests r WHERE r.id = ?1"),
                params![id],
                request_from_row,
            )
            .optional()?;
        Ok(request)
    }

    /// Owning student and hall of a request
    pub fn location(&self, id: i64) -> Result<Option<RequestLocation>> {
        let location = self
            .conn
            .query_row(
                "SELECT r.student_id, rm.hall_id FROM maintenance_requests r
                 JOIN rooms rm ON rm.id = r.room_id
                 WHERE r.id = ?1",
                params![id],
                |row| {
                    Ok(RequestLocation {
                        student_id: row.get(0)?,
                        hall_id: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(location)
    }

    /// List requests matching every predicate, newest first
    #[instrument(skip(self))]
    pub fn list(&self, filter: &RequestFilter) -> Result<Vec<MaintenanceRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM maintenance_requests r
             JOIN rooms rm ON rm.id = r.room_id
             WHERE (?1 IS NULL OR r.student_id = ?1)
               AND (?2 IS NULL OR rm.hall_id = ?2)
               AND (?3 IS NULL OR r.status_id = ?3)
               AND (?4 IS NULL OR r.category_id = ?4)
               AND (?5 = 0 OR r.status_id <> ?6)
             ORDER BY r.submitted_at DESC, r.id DESC
             LIMIT ?7 OFFSET ?8"
        ))?;

        let requests = stmt
            .query_map(
                params![
                    filter.student_id,
                    filter.hall_id,
                    filter.status_id,
                    filter.category_id,
                    filter.active_only,
                    RequestStatus::Completed.id(),
                    filter.limit,
                    filter.skip,
                ],
                request_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    /// Persist every mutable field of `request`
    #[instrument(skip(self, request), fields(id = request.id, status_id = request.status_id))]
    pub fn save(&self, request: &MaintenanceRequest) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE maintenance_requests SET
                    category_id = ?1,
                    status_id = ?2,
                    description = ?3,
                    availability = ?4,
                    estimated_cost = ?5,
                    actual_cost = ?6,
                    last_updated_at = ?7,
                    completed_at = ?8
                 WHERE id = ?9",
                params![
                    request.category_id,
                    request.status_id,
                    request.description,
                    request.availability,
                    request.estimated_cost,
                    request.actual_cost,
                    format_datetime(&request.last_updated_at),
                    request.completed_at.as_ref().map(format_datetime),
                    request.id,
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "request references missing data"))?;
        Ok(changed > 0)
    }

    /// Hard delete; assignments cascade, audit rows keep a NULL issue id
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM maintenance_requests WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
