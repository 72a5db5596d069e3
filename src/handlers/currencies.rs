//! # Currency Handlers
//!
//! Currencies, expense types and recorded exchanges, plus the stateless
//! conversion endpoint.

use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::{self, Created, created, crud_routes};
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery};
use crate::models::exchange::Model as ExchangeModel;
use crate::models::expense_type::Model as ExpenseTypeModel;
use crate::models::{Currency, Exchange, ExpenseType};
use crate::pagination::{Page, PageParams, PageRequest};
use crate::repositories::CurrencyRepository;
use crate::repositories::currency::{ConvertParams, Conversion, ExchangeInput};
use crate::server::AppState;

/// Converts an amount between two currencies at the current rates
#[utoipa::path(
    get,
    path = "/api/currencies/convert",
    security(("bearer_auth" = [])),
    params(ConvertParams),
    responses(
        (status = 200, description = "Converted amount", body = Conversion),
        (status = 400, description = "Unknown currency or invalid amount", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "currencies"
)]
pub async fn convert(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(params): ApiQuery<ConvertParams>,
) -> Result<Json<Conversion>, ApiError> {
    let conversion = CurrencyRepository::new(&state.db)
        .convert(&params, &state.config.base_currency)
        .await?;
    Ok(Json(conversion))
}

/// Lists expense types filed under a currency
#[utoipa::path(
    get,
    path = "/api/currencies/{id}/expense-types",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Currency id"), PageParams),
    responses(
        (status = 200, description = "Page of expense types", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Currency not found", body = ApiError)
    ),
    tag = "currencies"
)]
pub async fn list_expense_types(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ExpenseTypeModel>>, ApiError> {
    let request = PageRequest::from_params(&params, &state.config)?;
    let page = CurrencyRepository::new(&state.db)
        .expense_types(id, request)
        .await?;
    Ok(Json(page))
}

/// Records an exchange between two currencies at the current rates
#[utoipa::path(
    post,
    path = "/api/exchanges",
    security(("bearer_auth" = [])),
    request_body = ExchangeInput,
    responses(
        (status = 201, description = "Exchange recorded", body = serde_json::Value),
        (status = 400, description = "Unknown currency or invalid amount", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "currencies"
)]
pub async fn record_exchange(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(input): ApiJson<ExchangeInput>,
) -> Result<Created<ExchangeModel>, ApiError> {
    let exchange = CurrencyRepository::new(&state.db)
        .record_exchange(input, &state.config.base_currency)
        .await?;
    Ok(created::<Exchange>(exchange))
}

pub fn currency_routes() -> Router<AppState> {
    crud_routes::<Currency>()
        .route("/convert", get(convert))
        .route("/{id}/expense-types", get(list_expense_types))
}

pub fn expense_type_routes() -> Router<AppState> {
    crud_routes::<ExpenseType>()
}

pub fn exchange_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Exchange>).post(record_exchange))
        .route("/search", get(crud::search::<Exchange>))
        .route(
            "/{id}",
            get(crud::get_one::<Exchange>)
                .put(crud::update::<Exchange>)
                .delete(crud::delete::<Exchange>),
        )
}
