//! Server configuration
//!
//! Read from a TOML file, then overridden by `HALLKEEP_*` environment
//! variables. Every field has a default, so an empty file (or none at all)
//! yields a runnable server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use directories::ProjectDirs;
use hallkeep_core::{
    PasswordPolicy, QueryLimits, DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES, MIN_SECRET_LEN,
};
use rand::RngCore;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Could not determine data directory")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub query: QueryLimits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            allowed_origins: vec!["http://localhost:3000".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Defaults to `hallkeep.db` under the platform data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub secret: Option<String>,
    pub token_ttl_minutes: i64,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl Default for AuthSection {
    fn default() -> Self {
        let policy = PasswordPolicy::default();
        Self {
            secret: None,
            token_ttl_minutes: DEFAULT_TTL_MINUTES,
            hash_memory_kib: policy.memory_kib,
            hash_iterations: policy.iterations,
            hash_parallelism: policy.parallelism,
        }
    }
}

impl AuthSection {
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            memory_kib: self.hash_memory_kib,
            iterations: self.hash_iterations,
            parallelism: self.hash_parallelism,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from `path` if given, then apply the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HALLKEEP_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("HALLKEEP_BIND") {
            self.server.bind = bind.parse().map_err(|e| ConfigError::Invalid {
                name: "HALLKEEP_BIND",
                reason: format!("{e}"),
            })?;
        }
        if let Some(path) = lookup("HALLKEEP_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(secret) = lookup("HALLKEEP_SECRET") {
            self.auth.secret = Some(secret);
        }
        if let Some(ttl) = lookup("HALLKEEP_TOKEN_TTL_MINUTES") {
            self.auth.token_ttl_minutes = ttl.parse().map_err(|e| ConfigError::Invalid {
                name: "HALLKEEP_TOKEN_TTL_MINUTES",
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.auth.token_ttl_minutes) {
            return Err(ConfigError::Invalid {
                name: "auth.token_ttl_minutes",
                reason: format!("must be between 1 and {MAX_TTL_MINUTES}"),
            });
        }
        if let Some(secret) = &self.auth.secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    name: "auth.secret",
                    reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
                });
            }
        }
        if self.query.max_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "query.max_limit",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => {
                let dirs =
                    ProjectDirs::from("dev", "hallkeep", "hallkeep").ok_or(ConfigError::NoDataDir)?;
                Ok(dirs.data_dir().join("hallkeep.db"))
            }
        }
    }

    /// The configured signing secret, or a fresh random one
    pub fn signing_secret(&self) -> Vec<u8> {
        match &self.auth.secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("No auth secret configured; using a random one. Tokens will not survive a restart");
                generate_secret().into_bytes()
            }
        }
    }
}

/// 256 random bits, base64 encoded
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
