//! Signed session tokens (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Principal;
use crate::error::{Error, Result};
use crate::models::Role;

/// Shortest accepted signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Token lifetime unless configured otherwise
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// Longest accepted token lifetime (one day)
pub const MAX_TTL_MINUTES: i64 = 24 * 60;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Email of the principal
    pub sub: String,
    pub uid: i64,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_seconds: i64,
}

/// Issues and validates session tokens with a process-wide secret and lifetime.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Fails if the secret is shorter than [`MIN_SECRET_LEN`] bytes or the
    /// lifetime exceeds [`MAX_TTL_MINUTES`]
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::validation(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if !(-MAX_TTL_MINUTES..=MAX_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(Error::validation(format!(
                "token lifetime must be at most {MAX_TTL_MINUTES} minutes"
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: principal.email.clone(),
            uid: principal.id,
            role: principal.role,
            name: principal.display_name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_at,
            expires_in_seconds: self.ttl.num_seconds(),
        })
    }

    /// Check signature, expiry and required claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Rejected token");
            Error::Authentication("invalid or expired token".into())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(Error::Authentication("token has no subject".into()));
        }
        Ok(data.claims)
    }
}
