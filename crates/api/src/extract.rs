//! Request extractors
//!
//! Bearer token checking, plus body, path and query extractors whose
//! rejections come back as [`ApiError`] JSON like every other failure.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use hallkeep_core::Claims;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Verified claims of the caller's session token.
///
/// Only the signature and expiry are checked here; the principal is
/// rebuilt from storage inside the call's transaction.
#[derive(Debug, Clone)]
pub struct Bearer(pub Claims);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Bearer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            debug!(path = %parts.uri.path(), "Request without bearer token");
            return Err(ApiError::MissingToken);
        };
        let claims = state.tokens.verify(token)?;
        Ok(Bearer(claims))
    }
}

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Typed path segments
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParams<T>(pub T);

/// Typed query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
