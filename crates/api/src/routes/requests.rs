//! Maintenance request endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use hallkeep_core::{
    Claims, Database, ListQuery, MaintenanceRequest, NewAssignment, NewMaintenanceRequest,
    OfficerAssignment, Principal, RequestChanges, RequestLifecycle, RequestQuery, RequestStatus,
    Result as CoreResult,
};

use super::auth::MessageResponse;
use crate::error::Result;
use crate::extract::{Bearer, JsonBody, PathParams, QueryParams};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<MaintenanceRequest>>> {
    let limits = state.limits;
    let requests = state
        .run_as(claims, move |db, principal| {
            RequestQuery::new(db, limits).list(principal, &query)
        })
        .await?;
    Ok(Json(requests))
}

pub async fn active(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<MaintenanceRequest>>> {
    let limits = state.limits;
    let requests = state
        .run_as(claims, move |db, principal| {
            RequestQuery::new(db, limits).active(principal, &query)
        })
        .await?;
    Ok(Json(requests))
}

pub async fn by_hall(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(hall_id): PathParams<i64>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<MaintenanceRequest>>> {
    let limits = state.limits;
    let requests = state
        .run_as(claims, move |db, principal| {
            RequestQuery::new(db, limits).by_hall(principal, hall_id, &query)
        })
        .await?;
    Ok(Json(requests))
}

pub async fn get_one(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MaintenanceRequest>> {
    let request = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).get(principal, id)
        })
        .await?;
    Ok(Json(request))
}

pub async fn create(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    JsonBody(body): JsonBody<NewMaintenanceRequest>,
) -> Result<(StatusCode, Json<MaintenanceRequest>)> {
    let created = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).create(principal, body)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
    JsonBody(changes): JsonBody<RequestChanges>,
) -> Result<Json<MaintenanceRequest>> {
    let updated = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).update(principal, id, changes)
        })
        .await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MessageResponse>> {
    state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).delete(principal, id)
        })
        .await?;
    Ok(MessageResponse::new(format!(
        "Maintenance request {id} deleted"
    )))
}

async fn transition<F>(
    state: AppState,
    claims: Claims,
    id: i64,
    apply: F,
) -> Result<Json<MaintenanceRequest>>
where
    F: FnOnce(&RequestLifecycle<'_, Database>, &Principal, i64) -> CoreResult<MaintenanceRequest>
        + Send
        + 'static,
{
    let updated = state
        .run_as(claims, move |db, principal| {
            apply(&RequestLifecycle::new(db), principal, id)
        })
        .await?;
    Ok(Json(updated))
}

pub async fn set_status(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams((id, status_id)): PathParams<(i64, i64)>,
) -> Result<Json<MaintenanceRequest>> {
    let status = RequestStatus::from_id(status_id)?;
    let updated = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).set_status(principal, id, status)
        })
        .await?;
    Ok(Json(updated))
}

pub async fn start(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MaintenanceRequest>> {
    transition(state, claims, id, |lifecycle, principal, id| {
        lifecycle.start(principal, id)
    })
    .await
}

pub async fn submit_for_review(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MaintenanceRequest>> {
    transition(state, claims, id, |lifecycle, principal, id| {
        lifecycle.submit_for_review(principal, id)
    })
    .await
}

pub async fn complete(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MaintenanceRequest>> {
    transition(state, claims, id, |lifecycle, principal, id| {
        lifecycle.complete(principal, id)
    })
    .await
}

pub async fn reopen(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<MaintenanceRequest>> {
    transition(state, claims, id, |lifecycle, principal, id| {
        lifecycle.reopen(principal, id)
    })
    .await
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
) -> Result<Json<Vec<OfficerAssignment>>> {
    let assignments = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).assignments(principal, id)
        })
        .await?;
    Ok(Json(assignments))
}

pub async fn assign(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    PathParams(id): PathParams<i64>,
    JsonBody(body): JsonBody<NewAssignment>,
) -> Result<(StatusCode, Json<OfficerAssignment>)> {
    let assignment = state
        .run_as(claims, move |db, principal| {
            RequestLifecycle::new(db).assign(principal, id, body)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
