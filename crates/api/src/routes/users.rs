//! Account administration endpoints (admin only, except a user's own hall)

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use hallkeep_core::{
    Claims, Error, HallOfficer, HallOfficerProfile, NewUser, PermissionMatrix, RequestAction,
    Role, Student, StudentProfile, User, UserDirectory, UserUpdate,
};
use serde::{Deserialize, Serialize};

use super::auth::MessageResponse;
use crate::error::Result;
use crate::extract::{Bearer, JsonBody, PathParams, QueryParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct UserHall {
    pub hall_id: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    QueryParams(query): QueryParams<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    let limit = state.limits.clamp(query.limit);
    let skip = query
        .skip
        .map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX));
    let users = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).list(principal, skip, limit, query.role)
        })
        .await?;
    Ok(Json(users))
}

pub async fn get_one(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<User>> {
    let user = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).get(principal, id)
        })
        .await?;
    Ok(Json(user))
}

pub async fn get_by_email(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(email): PathParams<String>,
) -> Result<Json<User>> {
    let user = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).get_by_email(principal, &email)
        })
        .await?;
    Ok(Json(user))
}

/// Role check against the token alone, ahead of hashing; the directory
/// checks again against storage
fn require_manage_users(claims: &Claims) -> Result<()> {
    if PermissionMatrix::can_perform(claims.role, RequestAction::ManageUsers) {
        Ok(())
    } else {
        Err(Error::forbidden("not allowed to manage users").into())
    }
}

pub async fn create(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    require_manage_users(&claims)?;
    body.validate()?;
    let hash = state.hash_password(body.password.clone()).await?;
    let user = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).create(principal, body, &hash)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
    JsonBody(body): JsonBody<UserUpdate>,
) -> Result<Json<User>> {
    require_manage_users(&claims)?;
    body.validate()?;
    let hash = match body.password.clone() {
        Some(password) => Some(state.hash_password(password).await?),
        None => None,
    };
    let user = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).update(principal, id, body, hash.as_deref())
        })
        .await?;
    Ok(Json(user))
}

pub async fn delete(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MessageResponse>> {
    state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).delete(principal, id)
        })
        .await?;
    Ok(MessageResponse::new(format!("User {id} deleted")))
}

pub async fn hall(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<UserHall>> {
    let hall_id = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).hall_for_user(principal, id)
        })
        .await?;
    Ok(Json(UserHall { hall_id }))
}

pub async fn set_student(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
    JsonBody(body): JsonBody<StudentProfile>,
) -> Result<Json<Student>> {
    let student = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).set_student_profile(principal, id, body)
        })
        .await?;
    Ok(Json(student))
}

pub async fn set_hall_officer(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
    JsonBody(body): JsonBody<HallOfficerProfile>,
) -> Result<Json<HallOfficer>> {
    let officer = state
        .run_as(claims, move |db, principal| {
            UserDirectory::new(db).set_hall_officer_profile(principal, id, body)
        })
        .await?;
    Ok(Json(officer))
}
