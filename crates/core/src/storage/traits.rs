//! Storage repository traits
//!
//! These traits define the storage interface the services are written
//! against, allowing for different implementations (SQLite, mock).

use chrono::{DateTime, Utc};

use super::requests::RequestFilter;
use crate::error::Result;
use crate::models::{
    AuditEntry, Category, Hall, HallOfficer, MaintenanceOfficer, MaintenanceRequest,
    NewAssignment, NewAuditEntry, NewMaintenanceRequest, NewUser, OfficerAssignment,
    RequestLocation, Role, Room, Student, User,
};

/// Users and their role-specific profiles
pub trait IdentityRepository {
    /// Create a user with an already-hashed password
    fn create_user(&self, user: &NewUser, password_hash: &str) -> Result<User>;

    fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Exact, case-sensitive email match
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn list_users(&self, skip: u32, limit: u32, role: Option<Role>) -> Result<Vec<User>>;

    /// Apply the given fields; returns false if the user does not exist
    fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool>;

    fn delete_user(&self, id: i64) -> Result<bool>;

    fn student_for_user(&self, user_id: i64) -> Result<Option<Student>>;

    fn hall_officer_for_user(&self, user_id: i64) -> Result<Option<HallOfficer>>;

    fn upsert_student(
        &self,
        user_id: i64,
        student_number: Option<&str>,
        room_id: Option<i64>,
    ) -> Result<Student>;

    fn upsert_hall_officer(&self, user_id: i64, hall_id: Option<i64>) -> Result<HallOfficer>;

    fn find_room(&self, id: i64) -> Result<Option<Room>>;

    fn find_hall(&self, id: i64) -> Result<Option<Hall>>;

    fn list_halls(&self) -> Result<Vec<Hall>>;

    fn find_maintenance_officer(&self, id: i64) -> Result<Option<MaintenanceOfficer>>;
}

/// Maintenance requests, their reference data and assignments
pub trait RequestRepository {
    fn find_category(&self, id: i64) -> Result<Option<Category>>;

    fn insert_request(
        &self,
        student_id: i64,
        room_id: i64,
        request: &NewMaintenanceRequest,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceRequest>;

    fn find_request(&self, id: i64) -> Result<Option<MaintenanceRequest>>;

    /// Owning student and hall, for visibility checks
    fn request_location(&self, id: i64) -> Result<Option<RequestLocation>>;

    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<MaintenanceRequest>>;

    /// Persist every mutable field; returns false if the request is gone
    fn save_request(&self, request: &MaintenanceRequest) -> Result<bool>;

    fn delete_request(&self, id: i64) -> Result<bool>;

    fn create_assignment(
        &self,
        request_id: i64,
        assignment: &NewAssignment,
        now: DateTime<Utc>,
    ) -> Result<OfficerAssignment>;

    fn list_assignments(&self, request_id: i64) -> Result<Vec<OfficerAssignment>>;
}

/// Append-only audit trail
pub trait AuditRepository {
    fn record_audit(&self, entry: &NewAuditEntry) -> Result<i64>;

    fn list_audit(&self, skip: u32, limit: u32, issue_id: Option<i64>) -> Result<Vec<AuditEntry>>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite or mocks.
pub trait Storage: IdentityRepository + RequestRepository + AuditRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: IdentityRepository + RequestRepository + AuditRepository {}
