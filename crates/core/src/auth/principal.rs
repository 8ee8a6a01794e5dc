//! The authenticated identity attached to a call

use serde::Serialize;
use tracing::warn;

use super::token::Claims;
use crate::error::{Error, Result};
use crate::models::{Role, User};
use crate::storage::Storage;

/// Who is calling, with the role-specific linkage the gate needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub display_name: String,
    /// Student profile id (students only)
    pub student_id: Option<i64>,
    /// The student's room
    pub room_id: Option<i64>,
    /// The hall a hall officer runs
    pub hall_id: Option<i64>,
    /// Hall officer profile id
    pub officer_id: Option<i64>,
}

/// How missing role linkage is treated while building a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Linkage {
    /// Missing profile rows are a data-integrity failure
    Required,
    /// Missing profile rows leave the fields empty
    Optional,
}

/// Build a principal from a stored user, resolving role linkage
pub(crate) fn principal_for<S: Storage>(
    store: &S,
    user: &User,
    linkage: Linkage,
) -> Result<Principal> {
    let mut principal = Principal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        display_name: user.name.clone(),
        student_id: None,
        room_id: None,
        hall_id: None,
        officer_id: None,
    };

    match user.role {
        Role::Student => match store.student_for_user(user.id)? {
            Some(student) => {
                principal.student_id = Some(student.id);
                principal.room_id = student.room_id;
            }
            None if linkage == Linkage::Required => {
                return Err(Error::InvariantViolation(format!(
                    "user {} has role student but no student record",
                    user.id
                )));
            }
            None => {}
        },
        Role::HallOfficer => match store.hall_officer_for_user(user.id)? {
            Some(officer) => {
                principal.officer_id = Some(officer.id);
                principal.hall_id = officer.hall_id;
            }
            None if linkage == Linkage::Required => {
                return Err(Error::InvariantViolation(format!(
                    "user {} has role hall_officer but no officer record",
                    user.id
                )));
            }
            None => {}
        },
        Role::MaintenanceOfficer | Role::Admin => {}
    }

    Ok(principal)
}

/// Rebuilds the principal behind a verified token on every call
pub struct PrincipalResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: Storage> PrincipalResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn resolve(&self, claims: &Claims) -> Result<Principal> {
        let user = self
            .store
            .find_user_by_id(claims.uid)?
            .ok_or_else(|| Error::Authentication("account no longer exists".into()))?;

        if user.email != claims.sub || user.role != claims.role {
            warn!(user_id = user.id, "Token no longer matches account");
            return Err(Error::Authentication(
                "token no longer matches account; log in again".into(),
            ));
        }

        principal_for(self.store, &user, Linkage::Optional)
    }
}
