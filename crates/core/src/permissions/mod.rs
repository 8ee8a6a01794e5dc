//! Authorization gate: role permissions and row visibility

use serde::Serialize;
use tracing::warn;

use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::models::{RequestLocation, Role};

/// Actions that can be performed on maintenance requests and the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    // Requests
    CreateRequest,
    EditRequest,
    ChangeStatus,
    RecordCosts,
    DeleteRequest,

    // Work allocation
    AssignOfficer,

    // Administration
    ViewAuditLog,
    ManageUsers,
}

/// Permission matrix for platform roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: Role, action: RequestAction) -> bool {
        match action {
            // Only residents file requests, and only for themselves
            RequestAction::CreateRequest => role == Role::Student,

            // Anyone may edit what they can see
            RequestAction::EditRequest => true,

            // Lifecycle and money - staff only
            RequestAction::ChangeStatus => role.is_staff(),
            RequestAction::RecordCosts => role.is_staff(),

            RequestAction::DeleteRequest => role == Role::Admin,

            RequestAction::AssignOfficer => matches!(role, Role::HallOfficer | Role::Admin),

            RequestAction::ViewAuditLog => role == Role::Admin,
            RequestAction::ManageUsers => role == Role::Admin,
        }
    }

    /// Fail with an authorization error unless `principal` may perform `action`
    pub fn require(principal: &Principal, action: RequestAction) -> Result<()> {
        if Self::can_perform(principal.role, action) {
            return Ok(());
        }
        warn!(
            user_id = principal.id,
            role = %principal.role,
            ?action,
            "Action denied"
        );
        Err(Error::forbidden(format!(
            "role {} may not perform {:?}",
            principal.role, action
        )))
    }
}

/// Mandatory narrowing of the requests a principal may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VisibilityFilter {
    /// No rows (role without the linkage it needs)
    Nothing,
    /// Requests filed by this student profile
    Student(i64),
    /// Requests for rooms in this hall
    Hall(i64),
    /// Unrestricted
    All,
}

impl VisibilityFilter {
    pub fn admits(&self, location: &RequestLocation) -> bool {
        match *self {
            VisibilityFilter::Nothing => false,
            VisibilityFilter::Student(id) => location.student_id == id,
            VisibilityFilter::Hall(id) => location.hall_id == id,
            VisibilityFilter::All => true,
        }
    }
}

/// Compute the visibility filter for a principal
pub fn scope_for(principal: &Principal) -> VisibilityFilter {
    match principal.role {
        Role::Student => principal
            .student_id
            .map_or(VisibilityFilter::Nothing, VisibilityFilter::Student),
        Role::HallOfficer => principal
            .hall_id
            .map_or(VisibilityFilter::Nothing, VisibilityFilter::Hall),
        Role::MaintenanceOfficer | Role::Admin => VisibilityFilter::All,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: 1,
            email: "x@example.edu".into(),
            role,
            display_name: "X".into(),
            student_id: None,
            room_id: None,
            hall_id: None,
            officer_id: None,
        }
    }

    #[test]
    fn test_student_permissions() {
        assert!(PermissionMatrix::can_perform(Role::Student, RequestAction::CreateRequest));
        assert!(PermissionMatrix::can_perform(Role::Student, RequestAction::EditRequest));
        assert!(!PermissionMatrix::can_perform(Role::Student, RequestAction::ChangeStatus));
        assert!(!PermissionMatrix::can_perform(Role::Student, RequestAction::RecordCosts));
        assert!(!PermissionMatrix::can_perform(Role::Student, RequestAction::DeleteRequest));
    }

    #[test]
    fn test_staff_permissions() {
        for role in [Role::HallOfficer, Role::MaintenanceOfficer, Role::Admin] {
            assert!(!PermissionMatrix::can_perform(role, RequestAction::CreateRequest));
            assert!(PermissionMatrix::can_perform(role, RequestAction::ChangeStatus));
            assert!(PermissionMatrix::can_perform(role, RequestAction::RecordCosts));
        }
        assert!(PermissionMatrix::can_perform(Role::HallOfficer, RequestAction::AssignOfficer));
        assert!(!PermissionMatrix::can_perform(
            Role::MaintenanceOfficer,
            RequestAction::AssignOfficer
        ));
    }

    #[test]
    fn test_admin_only_actions() {
        for action in [
            RequestAction::DeleteRequest,
            RequestAction::ViewAuditLog,
            RequestAction::ManageUsers,
        ] {
            assert!(PermissionMatrix::can_perform(Role::Admin, action));
            assert!(!PermissionMatrix::can_perform(Role::HallOfficer, action));
            assert!(!PermissionMatrix::can_perform(Role::MaintenanceOfficer, action));
        }
    }

    #[test]
    fn test_require_reports_authorization_error() {
        let err = PermissionMatrix::require(&principal(Role::Student), RequestAction::DeleteRequest)
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn test_scope_for_roles() {
        let mut student = principal(Role::Student);
        assert_eq!(scope_for(&student), VisibilityFilter::Nothing);
        student.student_id = Some(10);
        assert_eq!(scope_for(&student), VisibilityFilter::Student(10));

        let mut officer = principal(Role::HallOfficer);
        assert_eq!(scope_for(&officer), VisibilityFilter::Nothing);
        officer.hall_id = Some(2);
        assert_eq!(scope_for(&officer), VisibilityFilter::Hall(2));

        assert_eq!(scope_for(&principal(Role::MaintenanceOfficer)), VisibilityFilter::All);
        assert_eq!(scope_for(&principal(Role::Admin)), VisibilityFilter::All);
    }

    #[test]
    fn test_admits() {
        let here = RequestLocation {
            student_id: 10,
            hall_id: 2,
        };
        assert!(VisibilityFilter::Student(10).admits(&here));
        assert!(!VisibilityFilter::Student(11).admits(&here));
        assert!(VisibilityFilter::Hall(2).admits(&here));
        assert!(!VisibilityFilter::Hall(3).admits(&here));
        assert!(VisibilityFilter::All.admits(&here));
        assert!(!VisibilityFilter::Nothing.admits(&here));
    }
}
