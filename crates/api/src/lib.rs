//! Hallkeep HTTP API
//!
//! JSON over HTTP in front of [`hallkeep_core`]. Every handler checks the
//! bearer token, then resolves the caller and does its work inside a
//! single database transaction on a blocking worker.
//!
//! ```ignore
//! let state = AppState::new(db, tokens, QueryLimits::default(), PasswordPolicy::default());
//! let app = hallkeep_api::router(state, &["http://localhost:3000".into()]);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{middleware::from_fn, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Path prefix for the versioned API
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(service_info))
        .nest(API_PREFIX, routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer(allowed_origins))
        .layer(from_fn(middleware::request_id))
        .with_state(state)
}
