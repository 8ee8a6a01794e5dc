//! Hall, room and profile storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{conflict_on_constraint, format_datetime, parse_datetime, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{
    AdminLevel, Administrator, Hall, HallOfficer, MaintenanceOfficer, Room, Specialty, Student,
};

pub struct ResidenceStore<'a> {
    conn: &'a Connection,
}

fn hall_from_row(row: &Row<'_>) -> rusqlite::Result<Hall> {
    Ok(Hall {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        officer_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        hall_id: row.get(1)?,
        room_number: row.get(2)?,
        floor_number: row.get(3)?,
        capacity: row.get(4)?,
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        user_id: row.get(1)?,
        student_number: row.get(2)?,
        room_id: row.get(3)?,
    })
}

impl<'a> ResidenceStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // --- halls ---

    #[instrument(skip(self))]
    pub fn create_hall(&self, name: &str, location: Option<&str>) -> Result<Hall> {
        self.conn
            .execute(
                "INSERT INTO halls (name, location, created_at) VALUES (?1, ?2, ?3)",
                params![name, location, format_datetime(&Utc::now())],
            )
            .map_err(|e| conflict_on_constraint(e, "hall name already used"))?;
        let id = self.conn.last_insert_rowid();
        self.find_hall(id)?
            .ok_or_else(|| Error::not_found(format!("hall {id}")))
    }

    pub fn find_hall(&self, id: i64) -> Result<Option<Hall>> {
        let hall = self
            .conn
            .query_row(
                "SELECT id, name, location, officer_id, created_at FROM halls WHERE id = ?1",
                params![id],
                hall_from_row,
            )
            .optional()?;
        Ok(hall)
    }

    pub fn find_hall_by_name(&self, name: &str) -> Result<Option<Hall>> {
        let hall = self
            .conn
            .query_row(
                "SELECT id, name, location, officer_id, created_at FROM halls WHERE name = ?1",
                params![name],
                hall_from_row,
            )
            .optional()?;
        Ok(hall)
    }

    pub fn list_halls(&self) -> Result<Vec<Hall>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, location, officer_id, created_at FROM halls ORDER BY name",
        )?;
        let halls = stmt
            .query_map([], hall_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(halls)
    }

    // --- rooms ---

    #[instrument(skip(self))]
    pub fn create_room(
        &self,
        hall_id: i64,
        room_number: &str,
        floor_number: Option<i64>,
        capacity: i64,
    ) -> Result<Room> {
        self.conn
            .execute(
                "INSERT INTO rooms (hall_id, room_number, floor_number, capacity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    hall_id,
                    room_number,
                    floor_number,
                    capacity,
                    format_datetime(&Utc::now())
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "room already exists or hall missing"))?;
        let id = self.conn.last_insert_rowid();
        self.find_room(id)?
            .ok_or_else(|| Error::not_found(format!("room {id}")))
    }

    pub fn find_room(&self, id: i64) -> Result<Option<Room>> {
        let room = self
            .conn
            .query_row(
                "SELECT id, hall_id, room_number, floor_number, capacity FROM rooms WHERE id = ?1",
                params![id],
                room_from_row,
            )
            .optional()?;
        Ok(room)
    }

    pub fn find_room_by_number(&self, hall_id: i64, room_number: &str) -> Result<Option<Room>> {
        let room = self
            .conn
            .query_row(
                "SELECT id, hall_id, room_number, floor_number, capacity FROM rooms
                 WHERE hall_id = ?1 AND room_number = ?2",
                params![hall_id, room_number],
                room_from_row,
            )
            .optional()?;
        Ok(room)
    }

    // --- students ---

    #[instrument(skip(self))]
    pub fn student_for_user(&self, user_id: i64) -> Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, user_id, student_number, room_id FROM students WHERE user_id = ?1",
                params![user_id],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    pub fn find_student(&self, id: i64) -> Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, user_id, student_number, room_id FROM students WHERE id = ?1",
                params![id],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    /// Create or update the student profile of a user
    #[instrument(skip(self))]
    pub fn upsert_student(
        &self,
        user_id: i64,
        student_number: Option<&str>,
        room_id: Option<i64>,
    ) -> Result<Student> {
        let now = format_datetime(&Utc::now());
        self.conn
            .execute(
                "INSERT INTO students (user_id, student_number, room_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    student_number = COALESCE(excluded.student_number, student_number),
                    room_id = excluded.room_id,
                    updated_at = excluded.updated_at",
                params![user_id, student_number, room_id, now],
            )
            .map_err(|e| conflict_on_constraint(e, "invalid student profile"))?;
        self.student_for_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("student profile for user {user_id}")))
    }

    // --- hall officers ---

    /// Hall officer profile with the hall it is linked to, if any
    #[instrument(skip(self))]
    pub fn hall_officer_for_user(&self, user_id: i64) -> Result<Option<HallOfficer>> {
        let officer = self
            .conn
            .query_row(
                "SELECT o.id, o.user_id, h.id FROM hall_officers o
                 LEFT JOIN halls h ON h.officer_id = o.id
                 WHERE o.user_id = ?1",
                params![user_id],
                |row| {
                    Ok(HallOfficer {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        hall_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(officer)
    }

    /// Ensure a hall officer profile exists and point `hall_id` (if any) at it
    #[instrument(skip(self))]
    pub fn upsert_hall_officer(&self, user_id: i64, hall_id: Option<i64>) -> Result<HallOfficer> {
        self.conn.execute(
            "INSERT OR IGNORE INTO hall_officers (user_id, created_at) VALUES (?1, ?2)",
            params![user_id, format_datetime(&Utc::now())],
        )?;
        let officer_id: i64 = self.conn.query_row(
            "SELECT id FROM hall_officers WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        // An officer runs at most one hall
        self.conn.execute(
            "UPDATE halls SET officer_id = NULL WHERE officer_id = ?1",
            params![officer_id],
        )?;
        if let Some(hall_id) = hall_id {
            let updated = self
                .conn
                .execute(
                    "UPDATE halls SET officer_id = ?1 WHERE id = ?2",
                    params![officer_id, hall_id],
                )
                .map_err(|e| conflict_on_constraint(e, "hall already has an officer"))?;
            if updated == 0 {
                return Err(Error::validation(format!("hall {hall_id} does not exist")));
            }
        }

        self.hall_officer_for_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("hall officer for user {user_id}")))
    }

    // --- maintenance staff ---

    pub fn ensure_specialty(&self, name: &str) -> Result<Specialty> {
        self.conn.execute(
            "INSERT OR IGNORE INTO specialties (name) VALUES (?1)",
            params![name],
        )?;
        let specialty = self.conn.query_row(
            "SELECT id, name, description FROM specialties WHERE name = ?1",
            params![name],
            |row| {
                Ok(Specialty {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        )?;
        Ok(specialty)
    }

    #[instrument(skip(self))]
    pub fn upsert_maintenance_officer(
        &self,
        user_id: i64,
        specialty_id: i64,
        employee_number: Option<&str>,
    ) -> Result<MaintenanceOfficer> {
        self.conn
            .execute(
                "INSERT INTO maintenance_officers (user_id, specialty_id, employee_number, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    specialty_id = excluded.specialty_id,
                    employee_number = COALESCE(excluded.employee_number, employee_number)",
                params![
                    user_id,
                    specialty_id,
                    employee_number,
                    format_datetime(&Utc::now())
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "invalid maintenance officer profile"))?;
        self.maintenance_officer_for_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("maintenance officer for user {user_id}")))
    }

    pub fn maintenance_officer_for_user(&self, user_id: i64) -> Result<Option<MaintenanceOfficer>> {
        let officer = self
            .conn
            .query_row(
                "SELECT id, user_id, specialty_id, employee_number FROM maintenance_officers
                 WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(MaintenanceOfficer {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        specialty_id: row.get(2)?,
                        employee_number: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(officer)
    }

    pub fn find_maintenance_officer(&self, id: i64) -> Result<Option<MaintenanceOfficer>> {
        let officer = self
            .conn
            .query_row(
                "SELECT id, user_id, specialty_id, employee_number FROM maintenance_officers
                 WHERE id = ?1",
                params![id],
                |row| {
                    Ok(MaintenanceOfficer {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        specialty_id: row.get(2)?,
                        employee_number: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(officer)
    }

    pub fn upsert_administrator(&self, user_id: i64, level: AdminLevel) -> Result<Administrator> {
        self.conn.execute(
            "INSERT INTO administrators (user_id, admin_level, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET admin_level = excluded.admin_level",
            params![user_id, level.as_str(), format_datetime(&Utc::now())],
        )?;
        let admin = self.conn.query_row(
            "SELECT id, user_id, admin_level FROM administrators WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Administrator {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    level: AdminLevel::from_str_lossy(&row.get::<_, String>(2)?),
                })
            },
        )?;
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::storage::Database;

    fn make_user(db: &Database, email: &str, role: Role) -> i64 {
        db.users()
            .create(
                &NewUser {
                    name: email.into(),
                    email: email.into(),
                    phone_number: None,
                    role,
                    password: String::new(),
                },
                "hash",
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_student_profile_upsert() {
        let db = Database::open_in_memory().unwrap();
        let store = db.residence();
        let hall = store.create_hall("Daniel Hall", None).unwrap();
        let room_a = store.create_room(hall.id, "A101", Some(1), 2).unwrap();
        let room_b = store.create_room(hall.id, "A102", Some(1), 2).unwrap();
        let user_id = make_user(&db, "s@stu.example.edu", Role::Student);

        let student = store
            .upsert_student(user_id, Some("CU-001"), Some(room_a.id))
            .unwrap();
        assert_eq!(student.room_id, Some(room_a.id));

        let moved = store.upsert_student(user_id, None, Some(room_b.id)).unwrap();
        assert_eq!(moved.id, student.id);
        assert_eq!(moved.room_id, Some(room_b.id));
        assert_eq!(moved.student_number.as_deref(), Some("CU-001"));
    }

    #[test]
    fn test_one_officer_per_hall() {
        let db = Database::open_in_memory().unwrap();
        let store = db.residence();
        let hall = store.create_hall("Peter Hall", None).unwrap();
        let first = make_user(&db, "o1@example.edu", Role::HallOfficer);
        let second = make_user(&db, "o2@example.edu", Role::HallOfficer);

        let officer = store.upsert_hall_officer(first, Some(hall.id)).unwrap();
        assert_eq!(officer.hall_id, Some(hall.id));

        let err = store.upsert_hall_officer(second, Some(hall.id)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Unlinking frees the hall
        let unlinked = store.upsert_hall_officer(first, None).unwrap();
        assert_eq!(unlinked.hall_id, None);
        let linked = store.upsert_hall_officer(second, Some(hall.id)).unwrap();
        assert_eq!(linked.hall_id, Some(hall.id));
    }

    #[test]
    fn test_officer_for_missing_hall() {
        let db = Database::open_in_memory().unwrap();
        let user = make_user(&db, "o@example.edu", Role::HallOfficer);
        let err = db.residence().upsert_hall_officer(user, Some(999)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_maintenance_officer_profile() {
        let db = Database::open_in_memory().unwrap();
        let store = db.residence();
        let user = make_user(&db, "m@example.edu", Role::MaintenanceOfficer);
        let plumbing = store.ensure_specialty("Plumbing").unwrap();
        assert_eq!(store.ensure_specialty("Plumbing").unwrap().id, plumbing.id);

        let officer = store
            .upsert_maintenance_officer(user, plumbing.id, Some("EMP-7"))
            .unwrap();
        assert_eq!(
            store.find_maintenance_officer(officer.id).unwrap(),
            Some(officer)
        );
    }
}
