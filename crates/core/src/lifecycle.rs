//! Maintenance request lifecycle
//!
//! Owns creation, edits, status transitions with completion bookkeeping,
//! deletion and officer assignment. Every operation is scoped through the
//! authorization gate and leaves an audit row behind.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::invariants::{assert_mutation_invariants, assert_request_invariants};
use crate::models::{
    validate_cost, validate_description, AuditAction, MaintenanceRequest, NewAssignment,
    NewAuditEntry, NewMaintenanceRequest, OfficerAssignment, RequestChanges, RequestStatus,
};
use crate::permissions::{scope_for, PermissionMatrix, RequestAction};
use crate::storage::Storage;

/// Current time at the precision timestamps are stored with
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next `last_updated_at` for a row last stamped `previous`; always later
pub(crate) fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Move `request` to `status`, keeping `completed_at` in step
fn apply_status(request: &mut MaintenanceRequest, status: RequestStatus, now: DateTime<Utc>) {
    request.status_id = status.id();
    if status.is_terminal() {
        if request.completed_at.is_none() {
            request.completed_at = Some(now);
        }
    } else {
        request.completed_at = None;
    }
}

pub struct RequestLifecycle<'a, S> {
    store: &'a S,
}

impl<'a, S: Storage> RequestLifecycle<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fetch a request the principal can see; anything else is not found
    pub fn get(&self, principal: &Principal, id: i64) -> Result<MaintenanceRequest> {
        let not_found = || Error::not_found(format!("maintenance request {id}"));

        let location = self.store.request_location(id)?.ok_or_else(not_found)?;
        if !scope_for(principal).admits(&location) {
            warn!(user_id = principal.id, request_id = id, "Request outside caller scope");
            return Err(not_found());
        }
        self.store.find_request(id)?.ok_or_else(not_found)
    }

    /// File a new request for the calling student's own room
    #[instrument(skip(self, principal, request), fields(user_id = principal.id))]
    pub fn create(
        &self,
        principal: &Principal,
        request: NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest> {
        PermissionMatrix::require(principal, RequestAction::CreateRequest)?;

        let student_id = principal
            .student_id
            .ok_or_else(|| Error::validation("no student record is linked to this account"))?;
        let room_id = principal
            .room_id
            .ok_or_else(|| Error::validation("no room is assigned to this student"))?;
        if let Some(requested) = request.room_id {
            if requested != room_id {
                return Err(Error::validation(format!(
                    "room {requested} is not your room; requests can only be filed for room {room_id}"
                )));
            }
        }

        validate_description(&request.description)?;
        validate_cost("estimated_cost", request.estimated_cost)?;
        if self.store.find_category(request.category_id)?.is_none() {
            return Err(Error::validation(format!(
                "category {} does not exist",
                request.category_id
            )));
        }

        let created = self
            .store
            .insert_request(student_id, room_id, &request, now())?;
        assert_request_invariants(&created);

        self.store.record_audit(
            &NewAuditEntry::for_request(principal.id, AuditAction::Created, created.id)
                .with_values(None, Some(serde_json::to_value(&created)?)),
        )?;

        info!(request_id = created.id, student_id, room_id, "Request created");
        Ok(created)
    }

    /// Apply a partial edit. Status and actual cost need a staff role.
    #[instrument(skip(self, principal, changes), fields(user_id = principal.id))]
    pub fn update(
        &self,
        principal: &Principal,
        id: i64,
        changes: RequestChanges,
    ) -> Result<MaintenanceRequest> {
        PermissionMatrix::require(principal, RequestAction::EditRequest)?;
        if changes.status_id.is_some() {
            PermissionMatrix::require(principal, RequestAction::ChangeStatus)?;
        }
        if changes.actual_cost.is_some() {
            PermissionMatrix::require(principal, RequestAction::RecordCosts)?;
        }

        let before = self.get(principal, id)?;

        if let Some(expected) = changes.expected_last_updated {
            if expected != before.last_updated_at {
                return Err(Error::Conflict(format!(
                    "request {id} was modified at {}; reload and retry",
                    before.last_updated_at
                )));
            }
        }
        if changes.is_empty() {
            return Ok(before);
        }

        let status = changes.status_id.map(RequestStatus::from_id).transpose()?;
        if let Some(description) = &changes.description {
            validate_description(description)?;
        }
        validate_cost("estimated_cost", changes.estimated_cost)?;
        validate_cost("actual_cost", changes.actual_cost)?;
        if let Some(category_id) = changes.category_id {
            if self.store.find_category(category_id)?.is_none() {
                return Err(Error::validation(format!(
                    "category {category_id} does not exist"
                )));
            }
        }

        let stamp = next_update_stamp(before.last_updated_at, now());
        let mut after = before.clone();
        if let Some(category_id) = changes.category_id {
            after.category_id = category_id;
        }
        if let Some(description) = changes.description {
            after.description = description;
        }
        if let Some(availability) = changes.availability {
            after.availability = Some(availability);
        }
        if let Some(cost) = changes.estimated_cost {
            after.estimated_cost = Some(cost);
        }
        if let Some(cost) = changes.actual_cost {
            after.actual_cost = Some(cost);
        }
        if let Some(status) = status {
            apply_status(&mut after, status, stamp);
        }
        after.last_updated_at = stamp;

        self.commit(principal, &before, &after)?;
        Ok(after)
    }

    /// Move a request to any status
    #[instrument(skip(self, principal), fields(user_id = principal.id))]
    pub fn set_status(
        &self,
        principal: &Principal,
        id: i64,
        status: RequestStatus,
    ) -> Result<MaintenanceRequest> {
        PermissionMatrix::require(principal, RequestAction::ChangeStatus)?;
        let before = self.get(principal, id)?;

        let stamp = next_update_stamp(before.last_updated_at, now());
        let mut after = before.clone();
        apply_status(&mut after, status, stamp);
        after.last_updated_at = stamp;

        self.commit(principal, &before, &after)?;
        Ok(after)
    }

    pub fn start(&self, principal: &Principal, id: i64) -> Result<MaintenanceRequest> {
        self.set_status(principal, id, RequestStatus::InProgress)
    }

    pub fn submit_for_review(&self, principal: &Principal, id: i64) -> Result<MaintenanceRequest> {
        self.set_status(principal, id, RequestStatus::UnderReview)
    }

    pub fn complete(&self, principal: &Principal, id: i64) -> Result<MaintenanceRequest> {
        self.set_status(principal, id, RequestStatus::Completed)
    }

    /// Back to Pending from any state
    pub fn reopen(&self, principal: &Principal, id: i64) -> Result<MaintenanceRequest> {
        self.set_status(principal, id, RequestStatus::Pending)
    }

    /// Remove a request and its assignments
    #[instrument(skip(self, principal), fields(user_id = principal.id))]
    pub fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        PermissionMatrix::require(principal, RequestAction::DeleteRequest)?;
        let existing = self.get(principal, id)?;

        if !self.store.delete_request(id)? {
            return Err(Error::not_found(format!("maintenance request {id}")));
        }

        // The row is gone, so the entry cannot reference it as its issue
        self.store.record_audit(&NewAuditEntry {
            user_id: Some(principal.id),
            action: AuditAction::Deleted,
            table_affected: "maintenance_requests",
            record_id: Some(id),
            issue_id: None,
            old_values: Some(serde_json::to_value(&existing)?),
            new_values: None,
        })?;

        info!(request_id = id, "Request deleted");
        Ok(())
    }

    /// Put a maintenance officer on a request; a Pending request starts
    #[instrument(skip(self, principal, assignment), fields(user_id = principal.id, officer_id = assignment.officer_id))]
    pub fn assign(
        &self,
        principal: &Principal,
        request_id: i64,
        assignment: NewAssignment,
    ) -> Result<OfficerAssignment> {
        PermissionMatrix::require(principal, RequestAction::AssignOfficer)?;
        let before = self.get(principal, request_id)?;

        if self
            .store
            .find_maintenance_officer(assignment.officer_id)?
            .is_none()
        {
            return Err(Error::validation(format!(
                "maintenance officer {} does not exist",
                assignment.officer_id
            )));
        }

        let stamp = next_update_stamp(before.last_updated_at, now());
        let created = self.store.create_assignment(request_id, &assignment, stamp)?;

        let mut after = before.clone();
        if before.status_id == RequestStatus::Pending.id() {
            apply_status(&mut after, RequestStatus::InProgress, stamp);
        }
        after.last_updated_at = stamp;
        assert_mutation_invariants(&before, &after);
        assert_request_invariants(&after);
        if !self.store.save_request(&after)? {
            return Err(Error::not_found(format!("maintenance request {request_id}")));
        }

        self.store.record_audit(
            &NewAuditEntry::for_request(principal.id, AuditAction::Assigned, request_id)
                .with_values(
                    Some(json!({ "status_id": before.status_id })),
                    Some(json!({
                        "status_id": after.status_id,
                        "assignment_id": created.id,
                        "officer_id": created.officer_id,
                    })),
                ),
        )?;

        info!(request_id, assignment_id = created.id, "Officer assigned");
        Ok(created)
    }

    pub fn assignments(
        &self,
        principal: &Principal,
        request_id: i64,
    ) -> Result<Vec<OfficerAssignment>> {
        self.get(principal, request_id)?;
        self.store.list_assignments(request_id)
    }

    /// Persist a mutation and audit it
    fn commit(
        &self,
        principal: &Principal,
        before: &MaintenanceRequest,
        after: &MaintenanceRequest,
    ) -> Result<()> {
        assert_mutation_invariants(before, after);
        assert_request_invariants(after);

        if !self.store.save_request(after)? {
            return Err(Error::not_found(format!("maintenance request {}", after.id)));
        }

        let action = match (before.is_completed(), after.is_completed()) {
            (false, true) => AuditAction::Completed,
            (true, false) => AuditAction::Reopened,
            _ => AuditAction::Updated,
        };
        self.store.record_audit(
            &NewAuditEntry::for_request(principal.id, action, after.id).with_values(
                Some(serde_json::to_value(before)?),
                Some(serde_json::to_value(after)?),
            ),
        )?;

        if before.status_id != after.status_id {
            info!(
                request_id = after.id,
                from = before.status_id,
                to = after.status_id,
                "Request status changed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuditRepository;
    use crate::test_support::World;
    use chrono::TimeZone;

    fn leaking_tap() -> NewMaintenanceRequest {
        NewMaintenanceRequest {
            category_id: 1,
            description: "leaking tap".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_stamps_pending() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);

        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();
        assert_eq!(created.status_id, RequestStatus::Pending.id());
        assert_eq!(created.student_id, w.student_a.student_id.unwrap());
        assert_eq!(created.room_id, w.room_a);
        assert!(created.completed_at.is_none());
        assert_eq!(created.submitted_at, created.last_updated_at);

        let fetched = lifecycle.get(&w.student_a, created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_own_room_only() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);

        let same_room = NewMaintenanceRequest {
            room_id: Some(w.room_a),
            ..leaking_tap()
        };
        assert!(lifecycle.create(&w.student_a, same_room).is_ok());

        let other_room = NewMaintenanceRequest {
            room_id: Some(w.room_b),
            ..leaking_tap()
        };
        let err = lifecycle.create(&w.student_a, other_room).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_create_rejected_for_staff() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        for p in [&w.officer_a, &w.technician, &w.admin] {
            let err = lifecycle.create(p, leaking_tap()).unwrap_err();
            assert!(matches!(err, Error::Authorization(_)));
        }
    }

    #[test]
    fn test_create_validation() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);

        let blank = NewMaintenanceRequest {
            description: "  ".into(),
            ..leaking_tap()
        };
        let unknown_category = NewMaintenanceRequest {
            category_id: 999,
            ..leaking_tap()
        };
        let negative = NewMaintenanceRequest {
            estimated_cost: Some(-5.0),
            ..leaking_tap()
        };
        for bad in [blank, unknown_category, negative] {
            assert!(matches!(
                lifecycle.create(&w.student_a, bad),
                Err(Error::Validation(_))
            ));
        }

        let mut roomless = w.student_a.clone();
        roomless.room_id = None;
        assert!(matches!(
            lifecycle.create(&roomless, leaking_tap()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_complete_then_reopen() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let done = lifecycle.complete(&w.officer_a, created.id).unwrap();
        assert_eq!(done.status_id, RequestStatus::Completed.id());
        assert!(done.completed_at.is_some());
        assert!(done.last_updated_at > created.last_updated_at);

        let reopened = lifecycle.reopen(&w.officer_a, created.id).unwrap();
        assert_eq!(reopened.status_id, RequestStatus::Pending.id());
        assert!(reopened.completed_at.is_none());
        assert!(reopened.last_updated_at > done.last_updated_at);

        let stored = lifecycle.get(&w.admin, created.id).unwrap();
        assert_eq!(stored, reopened);
    }

    #[test]
    fn test_completing_twice_keeps_first_stamp() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let first = lifecycle.complete(&w.technician, created.id).unwrap();
        let second = lifecycle.complete(&w.technician, created.id).unwrap();
        assert_eq!(first.completed_at, second.completed_at);
        assert!(second.last_updated_at > first.last_updated_at);
    }

    #[test]
    fn test_full_walk_through_states() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let id = lifecycle.create(&w.student_a, leaking_tap()).unwrap().id;

        assert_eq!(
            lifecycle.start(&w.technician, id).unwrap().status_id,
            RequestStatus::InProgress.id()
        );
        let review = lifecycle.submit_for_review(&w.technician, id).unwrap();
        assert_eq!(review.status_id, RequestStatus::UnderReview.id());
        assert!(review.completed_at.is_none());
        assert!(lifecycle.complete(&w.admin, id).unwrap().is_completed());
    }

    #[test]
    fn test_students_cannot_change_status() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let id = lifecycle.create(&w.student_a, leaking_tap()).unwrap().id;

        assert!(matches!(
            lifecycle.complete(&w.student_a, id),
            Err(Error::Authorization(_))
        ));
        let via_update = RequestChanges {
            status_id: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            lifecycle.update(&w.student_a, id, via_update),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn test_student_edits_own_request() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let edited = lifecycle
            .update(
                &w.student_a,
                created.id,
                RequestChanges {
                    description: Some("leaking tap, now flooding".into()),
                    availability: Some("weekday mornings".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.description, "leaking tap, now flooding");
        assert_eq!(edited.status_id, RequestStatus::Pending.id());
        assert!(edited.last_updated_at > created.last_updated_at);

        let err = lifecycle
            .update(
                &w.student_b,
                created.id,
                RequestChanges {
                    description: Some("not mine".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_update_status_via_changes() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let done = lifecycle
            .update(
                &w.officer_a,
                created.id,
                RequestChanges {
                    status_id: Some(4),
                    actual_cost: Some(42.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.actual_cost, Some(42.0));

        let bad_status = RequestChanges {
            status_id: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            lifecycle.update(&w.officer_a, created.id, bad_status),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_stale_version_conflicts() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let fresh = RequestChanges {
            estimated_cost: Some(10.0),
            expected_last_updated: Some(created.last_updated_at),
            ..Default::default()
        };
        let updated = lifecycle.update(&w.admin, created.id, fresh).unwrap();

        let stale = RequestChanges {
            estimated_cost: Some(20.0),
            expected_last_updated: Some(created.last_updated_at),
            ..Default::default()
        };
        assert!(matches!(
            lifecycle.update(&w.admin, created.id, stale),
            Err(Error::Conflict(_))
        ));
        assert_eq!(
            lifecycle.get(&w.admin, created.id).unwrap().estimated_cost,
            updated.estimated_cost
        );
    }

    #[test]
    fn test_scoped_get() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let in_a = lifecycle.create(&w.student_a, leaking_tap()).unwrap();
        let in_b = lifecycle.create(&w.student_b, leaking_tap()).unwrap();

        assert!(lifecycle.get(&w.officer_a, in_a.id).is_ok());
        assert!(matches!(
            lifecycle.get(&w.officer_a, in_b.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.get(&w.student_a, in_b.id),
            Err(Error::NotFound(_))
        ));
        assert!(lifecycle.get(&w.technician, in_b.id).is_ok());
        assert!(matches!(
            lifecycle.get(&w.admin, in_b.id + 100),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_admin_only() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        assert!(matches!(
            lifecycle.delete(&w.officer_a, created.id),
            Err(Error::Authorization(_))
        ));
        lifecycle.delete(&w.admin, created.id).unwrap();
        assert!(matches!(
            lifecycle.get(&w.admin, created.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.delete(&w.admin, created.id),
            Err(Error::NotFound(_))
        ));

        // Earlier entries survive with the issue reference cleared
        let log = w.db.list_audit(0, 10, None).unwrap();
        assert_eq!(log[0].action, AuditAction::Deleted);
        assert_eq!(log[0].record_id, Some(created.id));
        assert!(log.iter().all(|e| e.issue_id.is_none()));
    }

    #[test]
    fn test_assign_starts_pending_request() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let created = lifecycle.create(&w.student_a, leaking_tap()).unwrap();

        let assignment = lifecycle
            .assign(
                &w.officer_a,
                created.id,
                NewAssignment {
                    officer_id: w.technician_profile,
                    estimated_completion: Some(Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()),
                    notes: Some("bring a wrench".into()),
                },
            )
            .unwrap();
        assert_eq!(assignment.request_id, created.id);

        let after = lifecycle.get(&w.officer_a, created.id).unwrap();
        assert_eq!(after.status_id, RequestStatus::InProgress.id());

        let listed = lifecycle.assignments(&w.student_a, created.id).unwrap();
        assert_eq!(listed, vec![assignment]);

        let again = lifecycle.assign(
            &w.admin,
            created.id,
            NewAssignment {
                officer_id: w.technician_profile,
                estimated_completion: None,
                notes: None,
            },
        );
        assert!(matches!(again, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_assign_checks_scope_and_officer() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let in_b = lifecycle.create(&w.student_b, leaking_tap()).unwrap();
        let assignment = |officer_id| NewAssignment {
            officer_id,
            estimated_completion: None,
            notes: None,
        };

        assert!(matches!(
            lifecycle.assign(&w.officer_a, in_b.id, assignment(w.technician_profile)),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.assign(&w.technician, in_b.id, assignment(w.technician_profile)),
            Err(Error::Authorization(_))
        ));
        assert!(matches!(
            lifecycle.assign(&w.admin, in_b.id, assignment(999)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_mutations_are_audited() {
        let w = World::new();
        let lifecycle = RequestLifecycle::new(&w.db);
        let id = lifecycle.create(&w.student_a, leaking_tap()).unwrap().id;
        lifecycle.complete(&w.admin, id).unwrap();
        lifecycle.reopen(&w.admin, id).unwrap();

        let actions: Vec<_> = w
            .db
            .list_audit(0, 10, Some(id))
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Reopened,
                AuditAction::Completed,
                AuditAction::Created
            ]
        );
    }

    #[test]
    fn test_next_update_stamp_is_strictly_later() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(next_update_stamp(t, t + Duration::seconds(1)), t + Duration::seconds(1));
        assert_eq!(next_update_stamp(t, t), t + Duration::microseconds(1));
        assert_eq!(
            next_update_stamp(t, t - Duration::seconds(5)),
            t + Duration::microseconds(1)
        );
    }
}
