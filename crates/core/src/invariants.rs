//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{MaintenanceRequest, RequestStatus};

/// Validate that a request's state is internally consistent
pub fn assert_request_invariants(request: &MaintenanceRequest) {
    debug_assert!(
        RequestStatus::from_id(request.status_id).is_ok(),
        "Request {} has unknown status {}",
        request.id,
        request.status_id
    );

    // completed_at is set exactly when the request is Completed
    debug_assert_eq!(
        request.completed_at.is_some(),
        request.is_completed(),
        "Request {} has status {} but completed_at {:?}",
        request.id,
        request.status_id,
        request.completed_at
    );

    debug_assert!(
        request.last_updated_at >= request.submitted_at,
        "Request {} was updated before it was submitted",
        request.id
    );

    if let Some(completed_at) = request.completed_at {
        debug_assert!(
            completed_at >= request.submitted_at,
            "Request {} completed before it was submitted",
            request.id
        );
    }
}

/// Validate that a mutation moved the request forward in time
pub fn assert_mutation_invariants(before: &MaintenanceRequest, after: &MaintenanceRequest) {
    debug_assert_eq!(before.id, after.id, "Mutation changed request id");

    debug_assert!(
        after.last_updated_at > before.last_updated_at,
        "Request {} last_updated_at did not advance ({} -> {})",
        after.id,
        before.last_updated_at,
        after.last_updated_at
    );

    // Ownership is fixed at creation
    debug_assert_eq!(
        (before.student_id, before.room_id, before.submitted_at),
        (after.student_id, after.room_id, after.submitted_at),
        "Request {} changed owner or submission time",
        after.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn request() -> MaintenanceRequest {
        let now = Utc::now();
        MaintenanceRequest {
            id: 1,
            student_id: 10,
            room_id: 5,
            category_id: 1,
            status_id: RequestStatus::Pending.id(),
            description: "leaking tap".into(),
            availability: None,
            estimated_cost: None,
            actual_cost: None,
            submitted_at: now,
            last_updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert_request_invariants(&request());

        let mut done = request();
        done.status_id = RequestStatus::Completed.id();
        done.completed_at = Some(done.submitted_at);
        assert_request_invariants(&done);
    }

    #[test]
    #[should_panic(expected = "completed_at")]
    #[cfg(debug_assertions)]
    fn test_completed_without_stamp_panics() {
        let mut bad = request();
        bad.status_id = RequestStatus::Completed.id();
        assert_request_invariants(&bad);
    }

    #[test]
    #[should_panic(expected = "did not advance")]
    #[cfg(debug_assertions)]
    fn test_stale_mutation_panics() {
        let before = request();
        let mut after = before.clone();
        after.last_updated_at = before.last_updated_at - Duration::seconds(1);
        assert_mutation_invariants(&before, &after);
    }
}
