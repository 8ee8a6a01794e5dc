//! Hallkeep Core Library
//!
//! Models, storage, authentication, the authorization gate and the
//! maintenance request lifecycle for the Hallkeep platform.

pub mod auth;
pub mod directory;
pub mod error;
pub mod fixtures;
pub mod invariants;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod query;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use auth::{
    check_password, hash_password, Claims, CredentialVerifier, IssuedToken, PasswordPolicy,
    Principal, PrincipalResolver, TokenIssuer, DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES,
    MIN_SECRET_LEN,
};
pub use directory::UserDirectory;
pub use error::{Error, ErrorKind, Result};
pub use fixtures::{Fixtures, SeedReport};
pub use lifecycle::RequestLifecycle;
pub use models::*;
pub use permissions::*;
pub use query::{ListQuery, QueryLimits, RequestQuery};
pub use storage::{
    AuditRepository, Database, IdentityRepository, RequestFilter, RequestRepository, Storage,
};
