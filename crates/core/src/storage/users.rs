//! User storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{conflict_on_constraint, format_datetime, parse_datetime, parse_role, OptionalExt};
use crate::error::Result;
use crate::models::{NewUser, Role, User};

const USER_COLUMNS: &str =
    "id, name, email, phone_number, password_hash, role, created_at, updated_at";

pub struct UserStore<'a> {
    conn: &'a Connection,
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone_number: row.get(3)?,
        password_hash: row.get(4)?,
        role: parse_role(&row.get::<_, String>(5)?)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user with an already-hashed password
    #[instrument(skip(self, user, password_hash), fields(email = %user.email, role = %user.role))]
    pub fn create(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        let now = format_datetime(&Utc::now());
        self.conn
            .execute(
                "INSERT INTO users (name, email, phone_number, password_hash, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    user.name,
                    user.email,
                    user.phone_number,
                    password_hash,
                    user.role.as_str(),
                    now,
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "email already registered"))?;

        let id = self.conn.last_insert_rowid();
        self.find_by_id(id)?
            .ok_or_else(|| crate::Error::not_found(format!("user {id}")))
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Find user by exact email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// List users, optionally by role
    #[instrument(skip(self))]
    pub fn list(&self, skip: u32, limit: u32, role: Option<Role>) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY id
             LIMIT ?2 OFFSET ?3"
        ))?;

        let users = stmt
            .query_map(params![role.map(|r| r.as_str()), limit, skip], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Apply changed fields; `password_hash` is the hash of a new password, if any
    #[instrument(skip(self, password_hash))]
    pub fn update(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET
                    name = COALESCE(?1, name),
                    email = COALESCE(?2, email),
                    phone_number = COALESCE(?3, phone_number),
                    password_hash = COALESCE(?4, password_hash),
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    name,
                    email,
                    phone_number,
                    password_hash,
                    format_datetime(&Utc::now()),
                    id
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "email already registered"))?;
        Ok(changed > 0)
    }

    /// Delete a user; profile rows cascade
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| conflict_on_constraint(e, "user still has maintenance requests"))?;
        Ok(deleted > 0)
    }
}
