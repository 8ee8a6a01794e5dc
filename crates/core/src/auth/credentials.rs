//! Email/password verification at login

use serde_json::json;
use tracing::{error, info, instrument, warn};

use super::password::{verify_against_dummy, verify_password};
use super::principal::{principal_for, Linkage, Principal};
use crate::error::{Error, Result};
use crate::models::{AuditAction, NewAuditEntry, User};
use crate::storage::Storage;

const BAD_CREDENTIALS: &str = "invalid email or password";

fn bad_credentials() -> Error {
    Error::Authentication(BAD_CREDENTIALS.into())
}

/// Check `password` against the account found for a login attempt.
///
/// Runs an Argon2 verification whether or not the account exists, so it
/// needs no store and should run off the async executor. Unknown email
/// and wrong password fail identically.
pub fn check_password(user: Option<User>, password: &str) -> Result<User> {
    let Some(user) = user else {
        verify_against_dummy(password);
        warn!("Login for unknown email");
        return Err(bad_credentials());
    };
    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "Login with wrong password");
        return Err(bad_credentials());
    }
    Ok(user)
}

/// Checks submitted credentials against the identity store
pub struct CredentialVerifier<'a, S> {
    store: &'a S,
}

impl<'a, S: Storage> CredentialVerifier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Verify `(email, password)` and build the caller's principal in one
    /// pass over the store.
    ///
    /// A student or hall officer account without its profile row is
    /// reported as an invariant violation.
    #[instrument(skip(self, password))]
    pub fn verify(&self, email: &str, password: &str) -> Result<Principal> {
        let user = check_password(self.store.find_user_by_email(email)?, password)?;
        self.complete_login(&user)
    }

    /// Finish a login whose password already checked out against `user`.
    ///
    /// The account is read again; if it was deleted or its email, role or
    /// password changed in between, the login fails as bad credentials.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub fn complete_login(&self, user: &User) -> Result<Principal> {
        let current = self
            .store
            .find_user_by_id(user.id)?
            .filter(|current| {
                current.email == user.email
                    && current.role == user.role
                    && current.password_hash == user.password_hash
            })
            .ok_or_else(|| {
                warn!("Account changed during login");
                bad_credentials()
            })?;

        let principal = principal_for(self.store, &current, Linkage::Required).map_err(|e| {
            if let Error::InvariantViolation(detail) = &e {
                error!(user_id = current.id, %detail, "Account linkage broken");
            }
            e
        })?;

        self.store.record_audit(&NewAuditEntry {
            user_id: Some(current.id),
            action: AuditAction::Login,
            table_affected: "users",
            record_id: Some(current.id),
            issue_id: None,
            old_values: None,
            new_values: Some(json!({ "role": current.role })),
        })?;

        info!(user_id = current.id, role = %current.role, "Login succeeded");
        Ok(principal)
    }
}
