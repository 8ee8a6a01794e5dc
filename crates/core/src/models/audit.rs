//! Audit trail model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Assigned,
    Completed,
    Reopened,
    Deleted,
    Login,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::Assigned => "assigned",
            AuditAction::Completed => "completed",
            AuditAction::Reopened => "reopened",
            AuditAction::Deleted => "deleted",
            AuditAction::Login => "login",
        }
    }

    /// Unknown stored values read back as `Updated`
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "created" => AuditAction::Created,
            "assigned" => AuditAction::Assigned,
            "completed" => AuditAction::Completed,
            "reopened" => AuditAction::Reopened,
            "deleted" => AuditAction::Deleted,
            "login" => AuditAction::Login,
            _ => AuditAction::Updated,
        }
    }
}

/// One row of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub table_affected: Option<String>,
    pub record_id: Option<i64>,
    pub issue_id: Option<i64>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// An audit entry before it has been stored
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub table_affected: &'static str,
    pub record_id: Option<i64>,
    pub issue_id: Option<i64>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn for_request(user_id: i64, action: AuditAction, request_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            table_affected: "maintenance_requests",
            record_id: Some(request_id),
            issue_id: Some(request_id),
            old_values: None,
            new_values: None,
        }
    }

    pub fn with_values(
        mut self,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }
}
