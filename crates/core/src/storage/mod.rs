//! SQLite storage layer for Hallkeep

mod assignments;
mod audit;
mod catalog;
mod migrations;
mod parse;
mod requests;
mod residence;
mod traits;
mod users;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{
    AuditEntry, Category, Hall, HallOfficer, MaintenanceOfficer, MaintenanceRequest,
    NewAssignment, NewAuditEntry, NewMaintenanceRequest, NewUser, OfficerAssignment,
    RequestLocation, Role, Room, Student, User,
};

pub use assignments::AssignmentStore;
pub use audit::AuditStore;
pub use catalog::CatalogStore;
pub use requests::{RequestFilter, RequestStore};
pub use residence::ResidenceStore;
pub use traits::{AuditRepository, IdentityRepository, RequestRepository, Storage};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Run `f` as one unit of work: committed if it returns `Ok`,
    /// rolled back otherwise.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "Rolling back transaction");
                // Dropping the transaction rolls it back
                drop(tx);
                Err(err)
            }
        }
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    /// Halls, rooms and role profiles
    pub fn residence(&self) -> ResidenceStore<'_> {
        ResidenceStore::new(&self.conn)
    }

    pub fn catalog(&self) -> CatalogStore<'_> {
        CatalogStore::new(&self.conn)
    }

    pub fn requests(&self) -> RequestStore<'_> {
        RequestStore::new(&self.conn)
    }

    pub fn assignments(&self) -> AssignmentStore<'_> {
        AssignmentStore::new(&self.conn)
    }

    pub fn audit(&self) -> AuditStore<'_> {
        AuditStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl IdentityRepository for Database {
    fn create_user(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        self.users().create(user, password_hash)
    }

    fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email)
    }

    fn list_users(&self, skip: u32, limit: u32, role: Option<Role>) -> Result<Vec<User>> {
        self.users().list(skip, limit, role)
    }

    fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool> {
        self.users()
            .update(id, name, email, phone_number, password_hash)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        self.users().delete(id)
    }

    fn student_for_user(&self, user_id: i64) -> Result<Option<Student>> {
        self.residence().student_for_user(user_id)
    }

    fn hall_officer_for_user(&self, user_id: i64) -> Result<Option<HallOfficer>> {
        self.residence().hall_officer_for_user(user_id)
    }

    fn upsert_student(
        &self,
        user_id: i64,
        student_number: Option<&str>,
        room_id: Option<i64>,
    ) -> Result<Student> {
        self.residence()
            .upsert_student(user_id, student_number, room_id)
    }

    fn upsert_hall_officer(&self, user_id: i64, hall_id: Option<i64>) -> Result<HallOfficer> {
        self.residence().upsert_hall_officer(user_id, hall_id)
    }

    fn find_room(&self, id: i64) -> Result<Option<Room>> {
        self.residence().find_room(id)
    }

    fn find_hall(&self, id: i64) -> Result<Option<Hall>> {
        self.residence().find_hall(id)
    }

    fn list_halls(&self) -> Result<Vec<Hall>> {
        self.residence().list_halls()
    }

    fn find_maintenance_officer(&self, id: i64) -> Result<Option<MaintenanceOfficer>> {
        self.residence().find_maintenance_officer(id)
    }
}

impl RequestRepository for Database {
    fn find_category(&self, id: i64) -> Result<Option<Category>> {
        self.catalog().find_category(id)
    }

    fn insert_request(
        &self,
        student_id: i64,
        room_id: i64,
        request: &NewMaintenanceRequest,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceRequest> {
        self.requests().insert(student_id, room_id, request, now)
    }

    fn find_request(&self, id: i64) -> Result<Option<MaintenanceRequest>> {
        self.requests().find(id)
    }

    fn request_location(&self, id: i64) -> Result<Option<RequestLocation>> {
        self.requests().location(id)
    }

    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<MaintenanceRequest>> {
        self.requests().list(filter)
    }

    fn save_request(&self, request: &MaintenanceRequest) -> Result<bool> {
        self.requests().save(request)
    }

    fn delete_request(&self, id: i64) -> Result<bool> {
        self.requests().delete(id)
    }

    fn create_assignment(
        &self,
        request_id: i64,
        assignment: &NewAssignment,
        now: DateTime<Utc>,
    ) -> Result<OfficerAssignment> {
        self.assignments().create(request_id, assignment, now)
    }

    fn list_assignments(&self, request_id: i64) -> Result<Vec<OfficerAssignment>> {
        self.assignments().list_for_request(request_id)
    }
}

impl AuditRepository for Database {
    fn record_audit(&self, entry: &NewAuditEntry) -> Result<i64> {
        self.audit().record(entry)
    }

    fn list_audit(&self, skip: u32, limit: u32, issue_id: Option<i64>) -> Result<Vec<AuditEntry>> {
        self.audit().list(skip, limit, issue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "T".into(),
            email: email.into(),
            phone_number: None,
            role: Role::Admin,
            password: String::new(),
        }
    }

    #[test]
    fn test_open_on_disk_runs_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hallkeep.db");

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version(), 3);
        db.users().create(&new_user("a@example.edu"), "h").unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.schema_version(), 3);
        assert!(reopened
            .find_user_by_email("a@example.edu")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .in_transaction(|db| Ok(db.create_user(&new_user("ok@example.edu"), "h")?.id))
            .unwrap();
        assert!(db.find_user_by_id(id).unwrap().is_some());
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.in_transaction(|db| {
            db.create_user(&new_user("gone@example.edu"), "h")?;
            Err(Error::validation("abort"))
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(db.find_user_by_email("gone@example.edu").unwrap().is_none());
    }
}
