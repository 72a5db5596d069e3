//! # Catalog Handlers
//!
//! Clients, warehouses and products. All three use the generic CRUD routes;
//! products add a low-stock listing.

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::crud_routes;
use crate::handlers::types::ApiQuery;
use crate::models::product::Model as ProductModel;
use crate::models::{Client, Product, Warehouse};
use crate::pagination::{Page, PageRequest};
use crate::repositories::ProductRepository;
use crate::repositories::product::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::server::AppState;

/// Query parameters for the low-stock listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    /// Products with `stock <= threshold` are listed (default 5)
    pub threshold: Option<i32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Lists products that are at or below the stock threshold
#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    security(("bearer_auth" = [])),
    params(LowStockQuery),
    responses(
        (status = 200, description = "Page of products", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "products"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> Result<Json<Page<ProductModel>>, ApiError> {
    let request = PageRequest::resolve(query.page, query.limit, &state.config)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let page = ProductRepository::new(&state.db)
        .low_stock(threshold, request)
        .await?;
    Ok(Json(page))
}

pub fn client_routes() -> Router<AppState> {
    crud_routes::<Client>()
}

pub fn warehouse_routes() -> Router<AppState> {
    crud_routes::<Warehouse>()
}

pub fn product_routes() -> Router<AppState> {
    crud_routes::<Product>().route("/low-stock", get(low_stock))
}
