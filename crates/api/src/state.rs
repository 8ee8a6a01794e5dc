//! Shared application state and the per-call unit of work

use std::sync::{Arc, Mutex};

use hallkeep_core::{
    Claims, Database, PasswordPolicy, Principal, PrincipalResolver, QueryLimits, TokenIssuer,
};

use crate::error::{ApiError, Result};

/// State shared by every handler.
///
/// The signing secret, page limits and hash cost are fixed at startup;
/// the database handle is the only thing calls contend on. Password
/// hashing and verification run through [`AppState::blocking`] so they
/// never hold it.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    pub tokens: TokenIssuer,
    pub limits: QueryLimits,
    pub password_policy: PasswordPolicy,
}

impl AppState {
    pub fn new(
        db: Database,
        tokens: TokenIssuer,
        limits: QueryLimits,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            tokens,
            limits,
            password_policy,
        }
    }

    /// Run `f` as one transaction on a blocking worker
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> hallkeep_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
            guard.in_transaction(f).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("database worker failed: {e}")))?
    }

    /// Run CPU-bound work on a blocking worker without the database
    pub async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> hallkeep_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| ApiError::Internal(format!("blocking worker failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// Argon2id hash of `password` under the configured policy
    pub async fn hash_password(&self, password: String) -> Result<String> {
        let policy = self.password_policy;
        self.blocking(move || hallkeep_core::hash_password(&password, &policy))
            .await
    }

    /// Like [`AppState::run`], resolving the caller's principal inside the
    /// same transaction first
    pub async fn run_as<T, F>(&self, claims: Claims, f: F) -> Result<T>
    where
        F: FnOnce(&Database, &Principal) -> hallkeep_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |db| {
            let principal = PrincipalResolver::new(db).resolve(&claims)?;
            f(db, &principal)
        })
        .await
    }
}
