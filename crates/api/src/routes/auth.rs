//! Login, token check and logout

use axum::{extract::State, Json};
use hallkeep_core::{check_password, CredentialVerifier, IdentityRepository, Role};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::{Bearer, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hall_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: LoginUser,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Account lookup and the audit write each take the database briefly; the
/// Argon2 check between them runs without it.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let LoginRequest { email, password } = body;
    let found = state
        .run(move |db| db.find_user_by_email(&email))
        .await?;
    let user = state
        .blocking(move || check_password(found, &password))
        .await?;

    let tokens = state.tokens.clone();
    let response = state
        .run(move |db| {
            let principal = CredentialVerifier::new(db).complete_login(&user)?;
            let issued = tokens.issue(&principal)?;
            Ok(LoginResponse {
                access_token: issued.token,
                token_type: "bearer",
                expires_in: issued.expires_in_seconds,
                user: LoginUser {
                    id: principal.id,
                    email: principal.email,
                    name: principal.display_name,
                    role: principal.role,
                    student_id: principal.student_id,
                    room_id: principal.room_id,
                    hall_id: principal.hall_id,
                },
            })
        })
        .await?;
    Ok(Json(response))
}

pub async fn verify(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
) -> Result<Json<VerifyResponse>> {
    let email = state
        .run_as(claims, |_, principal| Ok(principal.email.clone()))
        .await?;
    Ok(Json(VerifyResponse { valid: true, email }))
}

/// Tokens are stateless; the client discards its copy
pub async fn logout() -> Json<MessageResponse> {
    MessageResponse::new("Successfully logged out")
}
