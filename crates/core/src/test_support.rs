//! Shared setup for service tests

use crate::auth::{principal_for, Linkage, Principal};
use crate::models::{NewUser, Role};
use crate::storage::Database;

/// Two halls with one resident each, plus one user per staff role
pub struct World {
    pub db: Database,
    pub hall_a: i64,
    pub hall_b: i64,
    pub room_a: i64,
    pub room_b: i64,
    pub student_a: Principal,
    pub student_b: Principal,
    pub officer_a: Principal,
    pub technician: Principal,
    /// Maintenance officer profile id of `technician`
    pub technician_profile: i64,
    pub admin: Principal,
}

fn user(db: &Database, email: &str, role: Role) -> crate::models::User {
    db.users()
        .create(
            &NewUser {
                name: email.split('@').next().unwrap_or(email).into(),
                email: email.into(),
                phone_number: None,
                role,
                password: String::new(),
            },
            "unused",
        )
        .unwrap()
}

impl World {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let residence = db.residence();

        let hall_a = residence.create_hall("Hall A", None).unwrap().id;
        let hall_b = residence.create_hall("Hall B", None).unwrap().id;
        let room_a = residence.create_room(hall_a, "A1", Some(1), 2).unwrap().id;
        let room_b = residence.create_room(hall_b, "B1", Some(1), 2).unwrap().id;

        let a = user(&db, "alice@stu.example.edu", Role::Student);
        residence.upsert_student(a.id, Some("S-1"), Some(room_a)).unwrap();
        let b = user(&db, "bob@stu.example.edu", Role::Student);
        residence.upsert_student(b.id, Some("S-2"), Some(room_b)).unwrap();

        let officer = user(&db, "officer@example.edu", Role::HallOfficer);
        residence.upsert_hall_officer(officer.id, Some(hall_a)).unwrap();

        let tech = user(&db, "tech@example.edu", Role::MaintenanceOfficer);
        let specialty = residence.ensure_specialty("Plumbing").unwrap();
        let technician_profile = residence
            .upsert_maintenance_officer(tech.id, specialty.id, None)
            .unwrap()
            .id;

        let admin = user(&db, "admin@example.edu", Role::Admin);

        let student_a = principal_for(&db, &a, Linkage::Required).unwrap();
        let student_b = principal_for(&db, &b, Linkage::Required).unwrap();
        let officer_a = principal_for(&db, &officer, Linkage::Required).unwrap();
        let technician = principal_for(&db, &tech, Linkage::Required).unwrap();
        let admin = principal_for(&db, &admin, Linkage::Required).unwrap();

        Self {
            db,
            hall_a,
            hall_b,
            room_a,
            room_b,
            student_a,
            student_b,
            officer_a,
            technician,
            technician_profile,
            admin,
        }
    }
}
