//! Halls, rooms and the role-specific profile records that link users to them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A residential building managed by at most one hall officer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hall {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    /// The hall officer responsible for this hall
    pub officer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub hall_id: i64,
    pub room_number: String,
    pub floor_number: Option<i64>,
    pub capacity: i64,
}

/// Student profile; 1:1 with a user of role `student`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub student_number: Option<String>,
    pub room_id: Option<i64>,
}

/// Hall officer profile; the hall link lives on `halls.officer_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallOfficer {
    pub id: i64,
    pub user_id: i64,
    pub hall_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceOfficer {
    pub id: i64,
    pub user_id: i64,
    pub specialty_id: i64,
    pub employee_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    SuperAdmin,
    #[default]
    Admin,
    Moderator,
}

impl AdminLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::SuperAdmin => "super_admin",
            AdminLevel::Admin => "admin",
            AdminLevel::Moderator => "moderator",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "super_admin" => AdminLevel::SuperAdmin,
            "moderator" => AdminLevel::Moderator,
            _ => AdminLevel::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Administrator {
    pub id: i64,
    pub user_id: i64,
    pub level: AdminLevel,
}

/// Body of a student-profile upsert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentProfile {
    #[serde(default)]
    pub student_number: Option<String>,
    #[serde(default)]
    pub room_id: Option<i64>,
}

/// Body of a hall-officer profile upsert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HallOfficerProfile {
    #[serde(default)]
    pub hall_id: Option<i64>,
}
