//! Officer assignment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A maintenance officer assigned to work a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficerAssignment {
    pub id: i64,
    pub request_id: i64,
    pub officer_id: i64,
    pub assigned_at: DateTime<Utc>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub officer_id: i64,
    #[serde(default)]
    pub estimated_completion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}
