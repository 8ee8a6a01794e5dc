//! Maintenance request model - the central entity of the lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle states, with their persisted status ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum RequestStatus {
    Pending = 1,
    InProgress = 2,
    UnderReview = 3,
    Completed = 4,
}

impl RequestStatus {
    pub fn id(&self) -> i64 {
        *self as i64
    }

    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(RequestStatus::Pending),
            2 => Ok(RequestStatus::InProgress),
            3 => Ok(RequestStatus::UnderReview),
            4 => Ok(RequestStatus::Completed),
            other => Err(Error::validation(format!(
                "invalid status_id {other}; must be one of 1, 2, 3, 4"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::UnderReview => "Under Review",
            RequestStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == RequestStatus::Completed
    }

    pub fn all() -> &'static [RequestStatus] {
        &[
            RequestStatus::Pending,
            RequestStatus::InProgress,
            RequestStatus::UnderReview,
            RequestStatus::Completed,
        ]
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Row of the `statuses` reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A maintenance request as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: i64,
    pub student_id: i64,
    pub room_id: i64,
    pub category_id: i64,
    pub status_id: i64,
    pub description: String,
    pub availability: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MaintenanceRequest {
    pub fn is_completed(&self) -> bool {
        self.status_id == RequestStatus::Completed.id()
    }
}

/// Where a request lives, for visibility checks on single-resource paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocation {
    pub student_id: i64,
    pub hall_id: i64,
}

/// Body of a create call; the student and room come from the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMaintenanceRequest {
    /// Optional, but when present must be the caller's own room
    #[serde(default)]
    pub room_id: Option<i64>,
    pub category_id: i64,
    pub description: String,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
}

/// Partial update of a request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestChanges {
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    /// Optimistic concurrency check against the stored `last_updated_at`
    #[serde(default)]
    pub expected_last_updated: Option<DateTime<Utc>>,
}

impl RequestChanges {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.status_id.is_none()
            && self.description.is_none()
            && self.availability.is_none()
            && self.estimated_cost.is_none()
            && self.actual_cost.is_none()
    }
}

pub const MAX_DESCRIPTION_LEN: usize = 2000;

pub(crate) fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::validation("description must not be empty"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(format!(
            "description exceeds {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_cost(field: &str, cost: Option<f64>) -> Result<()> {
    match cost {
        Some(c) if !c.is_finite() || c < 0.0 => Err(Error::validation(format!(
            "{field} must be a non-negative amount"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids() {
        for status in RequestStatus::all() {
            assert_eq!(RequestStatus::from_id(status.id()).unwrap(), *status);
        }
        assert!(RequestStatus::from_id(0).is_err());
        assert!(RequestStatus::from_id(5).is_err());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(!RequestStatus::UnderReview.is_terminal());
    }

    #[test]
    fn test_description_validation() {
        assert!(validate_description("leaking tap").is_ok());
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_cost_validation() {
        assert!(validate_cost("estimated_cost", None).is_ok());
        assert!(validate_cost("estimated_cost", Some(12.5)).is_ok());
        assert!(validate_cost("estimated_cost", Some(-1.0)).is_err());
        assert!(validate_cost("actual_cost", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_empty_changes() {
        assert!(RequestChanges::default().is_empty());
        let changes = RequestChanges {
            description: Some("new".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
