//! # Cash Register Handlers
//!
//! Open and close are compare-and-swap transitions; a register already in
//! the target state answers 409.

use axum::{Json, Router, extract::State, routing::post};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::crud_routes;
use crate::handlers::types::{ApiJson, ApiPath};
use crate::models::CashRegister;
use crate::models::cash_register::Model as CashRegisterModel;
use crate::repositories::CashRegisterRepository;
use crate::repositories::cash_register::{CloseRegisterRequest, OpenRegisterRequest};
use crate::server::AppState;

/// Opens a closed register with a starting float
#[utoipa::path(
    post,
    path = "/api/cash-registers/{id}/open",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cash register id")),
    request_body = OpenRegisterRequest,
    responses(
        (status = 200, description = "Register opened", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Register not found", body = ApiError),
        (status = 409, description = "Register already open", body = ApiError)
    ),
    tag = "cash-registers"
)]
pub async fn open(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<OpenRegisterRequest>,
) -> Result<Json<CashRegisterModel>, ApiError> {
    let register = CashRegisterRepository::new(&state.db)
        .open(id, request)
        .await?;
    tracing::info!(register_id = %id, subject = %principal.subject, "Cash register opened");
    Ok(Json(register))
}

/// Closes an open register and records the counted cash
#[utoipa::path(
    post,
    path = "/api/cash-registers/{id}/close",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cash register id")),
    request_body = CloseRegisterRequest,
    responses(
        (status = 200, description = "Register closed with difference computed", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Register not found", body = ApiError),
        (status = 409, description = "Register not open", body = ApiError)
    ),
    tag = "cash-registers"
)]
pub async fn close(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CloseRegisterRequest>,
) -> Result<Json<CashRegisterModel>, ApiError> {
    let register = CashRegisterRepository::new(&state.db)
        .close(id, request)
        .await?;
    tracing::info!(
        register_id = %id,
        subject = %principal.subject,
        difference_cents = ?register.difference_cents,
        "Cash register closed"
    );
    Ok(Json(register))
}

pub fn routes() -> Router<AppState> {
    crud_routes::<CashRegister>()
        .route("/{id}/open", post(open))
        .route("/{id}/close", post(close))
}
