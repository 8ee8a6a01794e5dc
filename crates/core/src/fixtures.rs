//! Seed data loaded from a TOML fixture file
//!
//! Fixtures are the only place plaintext passwords appear; they are hashed
//! while seeding and the login path never reads this file.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::{hash_password, PasswordPolicy};
use crate::error::{Error, Result};
use crate::models::{AdminLevel, NewUser, Role};
use crate::storage::Database;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub halls: Vec<HallFixture>,
    #[serde(default)]
    pub users: Vec<UserFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HallFixture {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rooms: Vec<RoomFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomFixture {
    pub number: String,
    #[serde(default)]
    pub floor: Option<i64>,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
}

fn default_capacity() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Hall of a student's room, or the hall an officer runs
    #[serde(default)]
    pub hall: Option<String>,
    /// Students: room number within `hall`
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub student_number: Option<String>,
    /// Maintenance officers
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub employee_number: Option<String>,
    /// Administrators
    #[serde(default)]
    pub admin_level: Option<AdminLevel>,
}

/// What a seeding run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub halls_created: usize,
    pub rooms_created: usize,
    pub users_created: usize,
    pub users_skipped: usize,
}

impl Fixtures {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Seed everything in one transaction. Users whose email already
    /// exists are skipped, so re-running is harmless.
    #[instrument(skip(self, db, policy))]
    pub fn seed(&self, db: &Database, policy: &PasswordPolicy) -> Result<SeedReport> {
        let report = db.in_transaction(|db| {
            let mut report = SeedReport::default();
            for hall in &self.halls {
                seed_hall(db, hall, &mut report)?;
            }
            for user in &self.users {
                seed_user(db, user, policy, &mut report)?;
            }
            Ok(report)
        })?;

        info!(
            halls = report.halls_created,
            rooms = report.rooms_created,
            users = report.users_created,
            skipped = report.users_skipped,
            "Fixtures seeded"
        );
        Ok(report)
    }
}

fn seed_hall(db: &Database, fixture: &HallFixture, report: &mut SeedReport) -> Result<()> {
    let residence = db.residence();
    let hall = match residence.find_hall_by_name(&fixture.name)? {
        Some(hall) => hall,
        None => {
            report.halls_created += 1;
            residence.create_hall(&fixture.name, fixture.location.as_deref())?
        }
    };

    for room in &fixture.rooms {
        if residence.find_room_by_number(hall.id, &room.number)?.is_none() {
            residence.create_room(hall.id, &room.number, room.floor, room.capacity)?;
            report.rooms_created += 1;
        }
    }
    Ok(())
}

fn hall_id_by_name(db: &Database, name: &str) -> Result<i64> {
    db.residence()
        .find_hall_by_name(name)?
        .map(|h| h.id)
        .ok_or_else(|| Error::validation(format!("fixture references unknown hall '{name}'")))
}

fn seed_user(
    db: &Database,
    fixture: &UserFixture,
    policy: &PasswordPolicy,
    report: &mut SeedReport,
) -> Result<()> {
    if db.users().find_by_email(&fixture.email)?.is_some() {
        report.users_skipped += 1;
        return Ok(());
    }

    let new_user = NewUser {
        name: fixture.name.clone(),
        email: fixture.email.clone(),
        phone_number: fixture.phone_number.clone(),
        role: fixture.role,
        password: fixture.password.clone(),
    };
    new_user.validate()?;
    let hash = hash_password(&fixture.password, policy)?;
    let user = db.users().create(&new_user, &hash)?;
    let residence = db.residence();

    match fixture.role {
        Role::Student => {
            let room_id = match (&fixture.hall, &fixture.room) {
                (Some(hall), Some(room)) => {
                    let hall_id = hall_id_by_name(db, hall)?;
                    let room = residence.find_room_by_number(hall_id, room)?.ok_or_else(|| {
                        Error::validation(format!("fixture references unknown room '{room}'"))
                    })?;
                    Some(room.id)
                }
                _ => None,
            };
            residence.upsert_student(user.id, fixture.student_number.as_deref(), room_id)?;
        }
        Role::HallOfficer => {
            let hall_id = fixture
                .hall
                .as_deref()
                .map(|name| hall_id_by_name(db, name))
                .transpose()?;
            residence.upsert_hall_officer(user.id, hall_id)?;
        }
        Role::MaintenanceOfficer => {
            let specialty =
                residence.ensure_specialty(fixture.specialty.as_deref().unwrap_or("General"))?;
            residence.upsert_maintenance_officer(
                user.id,
                specialty.id,
                fixture.employee_number.as_deref(),
            )?;
        }
        Role::Admin => {
            residence.upsert_administrator(user.id, fixture.admin_level.unwrap_or_default())?;
        }
    }

    report.users_created += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialVerifier;
    use std::io::Write;

    const FIXTURE: &str = r#"
        [[halls]]
        name = "Daniel Hall"
        location = "North campus"
        rooms = [
            { number = "A101", floor = 1, capacity = 2 },
            { number = "A102", floor = 1 },
        ]

        [[users]]
        name = "Ada Student"
        email = "ada@stu.example.edu"
        password = "student-pass"
        role = "student"
        hall = "Daniel Hall"
        room = "A101"
        student_number = "CU-0001"

        [[users]]
        name = "Hal Officer"
        email = "hal@example.edu"
        password = "officer-pass"
        role = "hall_officer"
        hall = "Daniel Hall"

        [[users]]
        name = "Tess Technician"
        email = "tess@example.edu"
        password = "tech-pass"
        role = "maintenance_officer"
        specialty = "Electrical"

        [[users]]
        name = "Root"
        email = "root@example.edu"
        password = "admin-pass"
        role = "admin"
        admin_level = "super_admin"
    "#;

    #[test]
    fn test_seed_and_login() {
        let db = Database::open_in_memory().unwrap();
        let fixtures = Fixtures::from_toml_str(FIXTURE).unwrap();

        let report = fixtures.seed(&db, &PasswordPolicy::minimal()).unwrap();
        assert_eq!(
            report,
            SeedReport {
                halls_created: 1,
                rooms_created: 2,
                users_created: 4,
                users_skipped: 0,
            }
        );

        let stored = db.users().find_by_email("ada@stu.example.edu").unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));

        let verifier = CredentialVerifier::new(&db);
        let ada = verifier.verify("ada@stu.example.edu", "student-pass").unwrap();
        assert!(ada.student_id.is_some());
        assert!(ada.room_id.is_some());
        let hal = verifier.verify("hal@example.edu", "officer-pass").unwrap();
        assert!(hal.hall_id.is_some());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let fixtures = Fixtures::from_toml_str(FIXTURE).unwrap();
        fixtures.seed(&db, &PasswordPolicy::minimal()).unwrap();

        let again = fixtures.seed(&db, &PasswordPolicy::minimal()).unwrap();
        assert_eq!(
            again,
            SeedReport {
                halls_created: 0,
                rooms_created: 0,
                users_created: 0,
                users_skipped: 4,
            }
        );
    }

    #[test]
    fn test_bad_reference_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let fixtures = Fixtures::from_toml_str(
            r#"
            [[users]]
            name = "Lost"
            email = "lost@stu.example.edu"
            password = "student-pass"
            role = "student"
            hall = "Nowhere"
            room = "1"
            "#,
        )
        .unwrap();

        let err = fixtures.seed(&db, &PasswordPolicy::minimal()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(db.users().find_by_email("lost@stu.example.edu").unwrap().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let fixtures = Fixtures::load(file.path()).unwrap();
        assert_eq!(fixtures.halls.len(), 1);
        assert_eq!(fixtures.users.len(), 4);

        assert!(matches!(
            Fixtures::from_toml_str("users = 3"),
            Err(Error::Fixture(_))
        ));
    }

    #[test]
    fn test_bundled_fixture_file_seeds() {
        let fixtures = Fixtures::from_toml_str(include_str!("../../../fixtures.toml")).unwrap();
        let db = Database::open_in_memory().unwrap();
        let report = fixtures.seed(&db, &PasswordPolicy::minimal()).unwrap();
        assert_eq!(report.users_created, fixtures.users.len());
        assert_eq!(report.halls_created, 2);
    }
}
