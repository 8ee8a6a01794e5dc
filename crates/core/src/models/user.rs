//! User account model

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Platform roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Resident filing requests for their own room
    Student,
    /// Officer responsible for one hall
    HallOfficer,
    /// Technician working requests across all halls
    #[serde(alias = "officer")]
    MaintenanceOfficer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::HallOfficer => "hall_officer",
            Role::MaintenanceOfficer => "maintenance_officer",
            Role::Admin => "admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::HallOfficer => "Hall Officer",
            Role::MaintenanceOfficer => "Maintenance Officer",
            Role::Admin => "Administrator",
        }
    }

    /// Staff roles may move requests through the lifecycle
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Student)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "hall_officer" => Ok(Role::HallOfficer),
            "maintenance_officer" | "officer" => Ok(Role::MaintenanceOfficer),
            "admin" => Ok(Role::Admin),
            other => Err(Error::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user; the password is still raw here
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: Role,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        validate_email(&self.email)?;
        if self.password.len() < 6 {
            return Err(Error::validation("password must be at least 6 characters"));
        }
        Ok(())
    }
}

/// Partial update of a user; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::validation("name must not be empty"));
            }
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            if password.len() < 6 {
                return Err(Error::validation("password must be at least 6 characters"));
            }
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> crate::Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid email address '{email}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [
            Role::Student,
            Role::HallOfficer,
            Role::MaintenanceOfficer,
            Role::Admin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("officer".parse::<Role>().unwrap(), Role::MaintenanceOfficer);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_alias() {
        let role: Role = serde_json::from_str("\"officer\"").unwrap();
        assert_eq!(role, Role::MaintenanceOfficer);
        assert_eq!(
            serde_json::to_string(&Role::HallOfficer).unwrap(),
            "\"hall_officer\""
        );
    }

    #[test]
    fn test_new_user_validation() {
        let mut user = NewUser {
            name: "Ada".into(),
            email: "ada@stu.example.edu".into(),
            phone_number: None,
            role: Role::Student,
            password: "secret123".into(),
        };
        assert!(user.validate().is_ok());

        user.email = "not-an-email".into();
        assert!(user.validate().is_err());

        user.email = "ada@stu.example.edu".into();
        user.password = "123".into();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.edu".into(),
            phone_number: None,
            password_hash: "$argon2id$...".into(),
            role: Role::Student,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }
}
