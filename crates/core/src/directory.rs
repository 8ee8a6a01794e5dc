//! Identity administration: user accounts and their profile linkage

use tracing::{info, instrument};

use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::models::{
    HallOfficer, HallOfficerProfile, NewUser, Role, Student, StudentProfile, User, UserUpdate,
};
use crate::permissions::{PermissionMatrix, RequestAction};
use crate::storage::Storage;

/// Admin-only account management.
///
/// Passwords arrive already hashed: Argon2 is slow enough that callers run it
/// before taking the store.
pub struct UserDirectory<'a, S> {
    store: &'a S,
}

impl<'a, S: Storage> UserDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn require_admin(&self, principal: &Principal) -> Result<()> {
        PermissionMatrix::require(principal, RequestAction::ManageUsers)
    }

    fn existing(&self, id: i64) -> Result<User> {
        self.store
            .find_user_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    pub fn list(
        &self,
        principal: &Principal,
        skip: u32,
        limit: u32,
        role: Option<Role>,
    ) -> Result<Vec<User>> {
        self.require_admin(principal)?;
        self.store.list_users(skip, limit, role)
    }

    pub fn get(&self, principal: &Principal, id: i64) -> Result<User> {
        self.require_admin(principal)?;
        self.existing(id)
    }

    pub fn get_by_email(&self, principal: &Principal, email: &str) -> Result<User> {
        self.require_admin(principal)?;
        self.store
            .find_user_by_email(email)?
            .ok_or_else(|| Error::not_found(format!("user with email {email}")))
    }

    #[instrument(skip(self, principal, user), fields(email = %user.email, role = %user.role))]
    pub fn create(&self, principal: &Principal, user: NewUser, password_hash: &str) -> Result<User> {
        self.require_admin(principal)?;
        user.validate()?;
        let created = self.store.create_user(&user, password_hash)?;
        info!(user_id = created.id, "User created");
        Ok(created)
    }

    /// `password_hash` replaces the stored hash when given
    #[instrument(skip(self, principal, update, password_hash))]
    pub fn update(
        &self,
        principal: &Principal,
        id: i64,
        update: UserUpdate,
        password_hash: Option<&str>,
    ) -> Result<User> {
        self.require_admin(principal)?;
        update.validate()?;
        let found = self.store.update_user(
            id,
            update.name.as_deref(),
            update.email.as_deref(),
            update.phone_number.as_deref(),
            password_hash,
        )?;
        if !found {
            return Err(Error::not_found(format!("user {id}")));
        }
        self.existing(id)
    }

    #[instrument(skip(self, principal))]
    pub fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        self.require_admin(principal)?;
        if !self.store.delete_user(id)? {
            return Err(Error::not_found(format!("user {id}")));
        }
        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// The hall a hall officer runs; `None` for everyone else.
    /// Any caller may ask about their own account.
    pub fn hall_for_user(&self, principal: &Principal, id: i64) -> Result<Option<i64>> {
        if principal.id != id {
            self.require_admin(principal)?;
        }
        let user = self.existing(id)?;
        if user.role != Role::HallOfficer {
            return Ok(None);
        }
        Ok(self
            .store
            .hall_officer_for_user(id)?
            .and_then(|officer| officer.hall_id))
    }

    #[instrument(skip(self, principal, profile))]
    pub fn set_student_profile(
        &self,
        principal: &Principal,
        id: i64,
        profile: StudentProfile,
    ) -> Result<Student> {
        self.require_admin(principal)?;
        let user = self.existing(id)?;
        if user.role != Role::Student {
            return Err(Error::validation(format!("user {id} is not a student")));
        }
        if let Some(room_id) = profile.room_id {
            if self.store.find_room(room_id)?.is_none() {
                return Err(Error::validation(format!("room {room_id} does not exist")));
            }
        }
        self.store
            .upsert_student(id, profile.student_number.as_deref(), profile.room_id)
    }

    #[instrument(skip(self, principal, profile))]
    pub fn set_hall_officer_profile(
        &self,
        principal: &Principal,
        id: i64,
        profile: HallOfficerProfile,
    ) -> Result<HallOfficer> {
        self.require_admin(principal)?;
        let user = self.existing(id)?;
        if user.role != Role::HallOfficer {
            return Err(Error::validation(format!("user {id} is not a hall officer")));
        }
        self.store.upsert_hall_officer(id, profile.hall_id)
    }
}
