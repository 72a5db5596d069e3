//! # API Handlers
//!
//! HTTP endpoints of the Retail API. Plain CRUD comes from [`crud`]; each
//! domain module adds its workflow endpoints and assembles its routers.

use axum::{extract::State, response::Json};

use crate::db;
use crate::error::{ApiError, ErrorType};
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod cash_registers;
pub mod catalog;
pub mod crud;
pub mod currencies;
pub mod invoices;
pub mod purchases;
pub mod rentals;
pub mod sales;
pub mod schools;
pub mod tools;
pub mod tournaments;
pub mod types;

use types::HealthStatus;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is alive", body = HealthStatus)
    ),
    tag = "root"
)]
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Readiness check; pings the database
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Database reachable", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Readiness check failed");
        ErrorType::ServiceUnavailable.with_message("Database is not reachable")
    })?;
    Ok(Json(HealthStatus { status: "ready" }))
}
