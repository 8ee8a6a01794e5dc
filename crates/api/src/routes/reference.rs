//! Reference data and the audit trail

use axum::{extract::State, Json};
use hallkeep_core::{
    AuditEntry, AuditRepository, Category, Hall, IdentityRepository, PermissionMatrix,
    RequestAction, StatusInfo,
};
use serde::Deserialize;

use crate::error::Result;
use crate::extract::{Bearer, QueryParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub issue_id: Option<i64>,
}

pub async fn categories(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
) -> Result<Json<Vec<Category>>> {
    let categories = state
        .run_as(claims, |db, _| db.catalog().categories())
        .await?;
    Ok(Json(categories))
}

pub async fn statuses(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
) -> Result<Json<Vec<StatusInfo>>> {
    let statuses = state
        .run_as(claims, |db, _| db.catalog().statuses())
        .await?;
    Ok(Json(statuses))
}

pub async fn halls(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
) -> Result<Json<Vec<Hall>>> {
    let halls = state.run_as(claims, |db, _| db.list_halls()).await?;
    Ok(Json(halls))
}

pub async fn audit_logs(
    State(state): State<AppState>,
    Bearer(claims): Bearer,
    QueryParams(query): QueryParams<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>> {
    let limit = state.limits.clamp(query.limit);
    let skip = query
        .skip
        .map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX));
    let entries = state
        .run_as(claims, move |db, principal| {
            PermissionMatrix::require(principal, RequestAction::ViewAuditLog)?;
            db.list_audit(skip, limit, query.issue_id)
        })
        .await?;
    Ok(Json(entries))
}
