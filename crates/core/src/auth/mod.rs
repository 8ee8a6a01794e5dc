//! Authentication: password hashing, login and session tokens

mod credentials;
mod password;
mod principal;
mod token;

pub use credentials::{check_password, CredentialVerifier};
pub use password::{hash_password, verify_password, PasswordPolicy};
pub use principal::{Principal, PrincipalResolver};
#[cfg(test)]
pub(crate) use principal::{principal_for, Linkage};
pub use token::{
    Claims, IssuedToken, TokenIssuer, DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES, MIN_SECRET_LEN,
};
