//! Route table

mod auth;
mod reference;
mod requests;
mod users;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;

pub use auth::{LoginRequest, LoginResponse, LoginUser, MessageResponse, VerifyResponse};

/// Everything served under `/api/v1`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/maintenance-requests",
            get(requests::list).post(requests::create),
        )
        .route("/maintenance-requests/active", get(requests::active))
        .route("/maintenance-requests/hall/{hall_id}", get(requests::by_hall))
        .route(
            "/maintenance-requests/{id}",
            get(requests::get_one)
                .put(requests::update)
                .delete(requests::delete),
        )
        .route(
            "/maintenance-requests/{id}/status/{status_id}",
            patch(requests::set_status),
        )
        .route("/maintenance-requests/{id}/in-progress", patch(requests::start))
        .route(
            "/maintenance-requests/{id}/under-review",
            patch(requests::submit_for_review),
        )
        .route("/maintenance-requests/{id}/complete", patch(requests::complete))
        .route("/maintenance-requests/{id}/reopen", patch(requests::reopen))
        .route(
            "/maintenance-requests/{id}/assignments",
            get(requests::list_assignments).post(requests::assign),
        )
        .route("/users", get(users::list).post(users::create))
        .route("/users/email/{email}", get(users::get_by_email))
        .route(
            "/users/{id}",
            get(users::get_one).put(users::update).delete(users::delete),
        )
        .route("/users/{id}/hall", get(users::hall))
        .route("/users/{id}/student", put(users::set_student))
        .route("/users/{id}/hall-officer", put(users::set_hall_officer))
        .route("/categories", get(reference::categories))
        .route("/statuses", get(reference::statuses))
        .route("/halls", get(reference::halls))
        .route("/audit-logs", get(reference::audit_logs))
}
