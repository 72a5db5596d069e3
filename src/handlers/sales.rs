//! # Sales Handlers
//!
//! Checkout replaces the generic create, and reads return the sale together
//! with its items.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::LOCATION},
    routing::{get, post},
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::{self, Created};
use crate::handlers::types::{ApiJson, ApiPath};
use crate::models::Sale;
use crate::repositories::SaleRepository;
use crate::repositories::crud::Resource;
use crate::repositories::sale::{CheckoutRequest, SaleDetail};
use crate::server::AppState;

/// Sells the cart: prices the items, settles the payments, decrements stock
/// and credits the register, all in one transaction
#[utoipa::path(
    post,
    path = "/api/sales",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Sale completed", body = SaleDetail),
        (status = 400, description = "Validation error or insufficient payment", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 409, description = "Insufficient stock or register not open", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn checkout(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Created<SaleDetail>, ApiError> {
    let detail = SaleRepository::new(&state.db)
        .checkout(request, &state.config.base_currency)
        .await?;
    tracing::info!(sale_id = %detail.sale.id, subject = %principal.subject, "Checkout completed");

    let location = format!("/api/{}/{}", Sale::COLLECTION, detail.sale.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(detail)))
}

/// Returns a sale with its line items
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale with items", body = SaleDetail),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Sale not found", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn detail(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SaleDetail>, ApiError> {
    Ok(Json(SaleRepository::new(&state.db).detail(id).await?))
}

/// Voids a completed sale, restoring stock and reversing the register credit
#[utoipa::path(
    post,
    path = "/api/sales/{id}/void",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale voided", body = SaleDetail),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Sale not found", body = ApiError),
        (status = 409, description = "Sale already voided", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn void(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SaleDetail>, ApiError> {
    let detail = SaleRepository::new(&state.db).void(id).await?;
    tracing::info!(sale_id = %id, subject = %principal.subject, "Sale voided");
    Ok(Json(detail))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Sale>).post(checkout))
        .route("/search", get(crud::search::<Sale>))
        .route(
            "/{id}",
            get(detail)
                .put(crud::update::<Sale>)
                .delete(crud::delete::<Sale>),
        )
        .route("/{id}/void", post(void))
}
