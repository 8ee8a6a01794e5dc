//! Scoped, paginated request listings

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::auth::Principal;
use crate::error::Result;
use crate::models::MaintenanceRequest;
use crate::permissions::{scope_for, VisibilityFilter};
use crate::storage::{RequestFilter, Storage};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 500;

/// Page size bounds, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl QueryLimits {
    /// Clamp a requested page size into `[1, max_limit]`
    pub fn clamp(&self, limit: Option<i64>) -> u32 {
        let max = self.max_limit.max(1);
        match limit {
            None => self.default_limit.clamp(1, max),
            Some(l) if l < 1 => 1,
            Some(l) => u32::try_from(l).unwrap_or(max).min(max),
        }
    }
}

/// Caller-supplied listing options; they can only narrow the gate's scope
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub hall_id: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
}

/// Intersect one mandatory predicate with an optional caller predicate.
/// `None` means the intersection is empty.
fn narrow(mandatory: i64, requested: Option<i64>) -> Option<i64> {
    match requested {
        Some(r) if r != mandatory => None,
        _ => Some(mandatory),
    }
}

pub struct RequestQuery<'a, S> {
    store: &'a S,
    limits: QueryLimits,
}

impl<'a, S: Storage> RequestQuery<'a, S> {
    pub fn new(store: &'a S, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    /// Build the row filter for `principal`, or `None` if nothing is visible
    pub fn filter_for(&self, principal: &Principal, query: &ListQuery) -> Option<RequestFilter> {
        let mut filter = RequestFilter {
            student_id: query.student_id,
            hall_id: query.hall_id,
            status_id: query.status_id,
            category_id: query.category_id,
            active_only: query.active_only,
            skip: query
                .skip
                .map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX)),
            limit: self.limits.clamp(query.limit),
        };

        match scope_for(principal) {
            VisibilityFilter::Nothing => return None,
            VisibilityFilter::Student(id) => filter.student_id = Some(narrow(id, query.student_id)?),
            VisibilityFilter::Hall(id) => filter.hall_id = Some(narrow(id, query.hall_id)?),
            VisibilityFilter::All => {}
        }
        Some(filter)
    }

    #[instrument(skip(self, principal), fields(user_id = principal.id))]
    pub fn list(&self, principal: &Principal, query: &ListQuery) -> Result<Vec<MaintenanceRequest>> {
        match self.filter_for(principal, query) {
            Some(filter) => self.store.list_requests(&filter),
            None => {
                debug!("Listing outside caller scope; returning nothing");
                Ok(Vec::new())
            }
        }
    }

    /// Requests that are not Completed
    pub fn active(&self, principal: &Principal, query: &ListQuery) -> Result<Vec<MaintenanceRequest>> {
        self.list(
            principal,
            &ListQuery {
                active_only: true,
                ..query.clone()
            },
        )
    }

    pub fn by_hall(
        &self,
        principal: &Principal,
        hall_id: i64,
        query: &ListQuery,
    ) -> Result<Vec<MaintenanceRequest>> {
        self.list(
            principal,
            &ListQuery {
                hall_id: Some(hall_id),
                ..query.clone()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::RequestLifecycle;
    use crate::models::{NewMaintenanceRequest, RequestStatus};
    use crate::test_support::World;

    fn file(w: &World, who: &Principal, description: &str) -> MaintenanceRequest {
        RequestLifecycle::new(&w.db)
            .create(
                who,
                NewMaintenanceRequest {
                    category_id: 1,
                    description: description.into(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    fn ids(requests: &[MaintenanceRequest]) -> Vec<i64> {
        let mut ids: Vec<_> = requests.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_limit_clamping() {
        let limits = QueryLimits::default();
        assert_eq!(limits.clamp(None), 100);
        assert_eq!(limits.clamp(Some(0)), 1);
        assert_eq!(limits.clamp(Some(-3)), 1);
        assert_eq!(limits.clamp(Some(25)), 25);
        assert_eq!(limits.clamp(Some(10_000)), 500);
        assert_eq!(limits.clamp(Some(i64::MAX)), 500);
    }

    #[test]
    fn test_student_sees_only_own() {
        let w = World::new();
        let mine = file(&w, &w.student_a, "mine");
        let theirs = file(&w, &w.student_b, "theirs");
        let query = RequestQuery::new(&w.db, QueryLimits::default());

        let listed = query.list(&w.student_a, &ListQuery::default()).unwrap();
        assert_eq!(ids(&listed), vec![mine.id]);

        // Asking for someone else's requests yields nothing, not theirs
        let spoofed = ListQuery {
            student_id: Some(theirs.student_id),
            ..Default::default()
        };
        assert!(query.list(&w.student_a, &spoofed).unwrap().is_empty());
    }

    #[test]
    fn test_hall_officer_cannot_escape_hall() {
        let w = World::new();
        let in_a = file(&w, &w.student_a, "a");
        file(&w, &w.student_b, "b");
        let query = RequestQuery::new(&w.db, QueryLimits::default());

        let listed = query.list(&w.officer_a, &ListQuery::default()).unwrap();
        assert_eq!(ids(&listed), vec![in_a.id]);

        let foreign = ListQuery {
            hall_id: Some(w.hall_b),
            ..Default::default()
        };
        assert!(query.list(&w.officer_a, &foreign).unwrap().is_empty());
        assert!(query
            .by_hall(&w.officer_a, w.hall_b, &ListQuery::default())
            .unwrap()
            .is_empty());
        assert_eq!(
            ids(&query.by_hall(&w.officer_a, w.hall_a, &ListQuery::default()).unwrap()),
            vec![in_a.id]
        );
    }

    #[test]
    fn test_unlinked_principal_sees_nothing() {
        let w = World::new();
        file(&w, &w.student_a, "a");
        let query = RequestQuery::new(&w.db, QueryLimits::default());

        let mut officer = w.officer_a.clone();
        officer.hall_id = None;
        assert!(query.list(&officer, &ListQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_staff_filters_and_active() {
        let w = World::new();
        let a = file(&w, &w.student_a, "a");
        let b = file(&w, &w.student_b, "b");
        RequestLifecycle::new(&w.db).complete(&w.admin, a.id).unwrap();
        let query = RequestQuery::new(&w.db, QueryLimits::default());

        assert_eq!(
            ids(&query.list(&w.technician, &ListQuery::default()).unwrap()),
            ids(&[a.clone(), b.clone()])
        );
        assert_eq!(
            ids(&query.active(&w.technician, &ListQuery::default()).unwrap()),
            vec![b.id]
        );
        let completed = ListQuery {
            status_id: Some(RequestStatus::Completed.id()),
            ..Default::default()
        };
        assert_eq!(ids(&query.list(&w.admin, &completed).unwrap()), vec![a.id]);
        assert_eq!(
            ids(&query.by_hall(&w.admin, w.hall_b, &ListQuery::default()).unwrap()),
            vec![b.id]
        );
    }

    #[test]
    fn test_pagination() {
        let w = World::new();
        for n in 0..5 {
            file(&w, &w.student_a, &format!("request {n}"));
        }
        let query = RequestQuery::new(&w.db, QueryLimits::default());

        let page = ListQuery {
            skip: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(query.list(&w.admin, &page).unwrap().len(), 2);

        let negative_skip = ListQuery {
            skip: Some(-10),
            ..Default::default()
        };
        assert_eq!(query.list(&w.admin, &negative_skip).unwrap().len(), 5);

        let beyond = ListQuery {
            skip: Some(50),
            ..Default::default()
        };
        assert!(query.list(&w.admin, &beyond).unwrap().is_empty());
    }
}
