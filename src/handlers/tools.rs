//! # Tool Handlers
//!
//! Stateless calculators shared by every client: payment settlement and the
//! amount in words printed on invoices.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Principal;
use crate::billing::words::WordsError;
use crate::billing::{PaymentQuote, Tender, amount_in_words, quote};
use crate::error::{ApiError, RepositoryError};
use crate::handlers::types::{ApiJson, ApiQuery};
use crate::repositories::CurrencyRepository;
use crate::server::AppState;

/// Body of `POST /api/payments/quote`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Amount due in base-currency cents
    #[schema(example = 15000)]
    pub total_cents: i64,
    #[serde(default)]
    pub tenders: Vec<Tender>,
}

/// `?amount_cents=&currency=`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AmountInWordsQuery {
    #[param(example = 123456)]
    pub amount_cents: i64,
    /// Defaults to the base currency
    #[param(example = "BOB")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AmountInWords {
    pub amount_cents: i64,
    pub currency: String,
    #[schema(example = "MIL DOSCIENTOS TREINTA Y CUATRO 56/100 BOLIVIANOS")]
    pub words: String,
}

/// Settles tenders against a total: change, remaining and coverage
#[utoipa::path(
    post,
    path = "/api/payments/quote",
    security(("bearer_auth" = [])),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Payment quote", body = PaymentQuote),
        (status = 400, description = "Negative amounts, unknown currency or non-cash overpayment", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn payment_quote(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> Result<Json<PaymentQuote>, ApiError> {
    let tenders = CurrencyRepository::new(&state.db)
        .to_base_tenders(&request.tenders, &state.config.base_currency)
        .await?;
    let settlement = quote(request.total_cents, &tenders).map_err(RepositoryError::from)?;
    Ok(Json(settlement))
}

/// Spells an amount out in Spanish, as printed on invoices
#[utoipa::path(
    get,
    path = "/api/tools/amount-in-words",
    security(("bearer_auth" = [])),
    params(AmountInWordsQuery),
    responses(
        (status = 200, description = "Amount in words", body = AmountInWords),
        (status = 400, description = "Amount out of range", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn amount_words(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(query): ApiQuery<AmountInWordsQuery>,
) -> Result<Json<AmountInWords>, ApiError> {
    let currency = query
        .currency
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| state.config.base_currency.clone());

    let words = amount_in_words(query.amount_cents, &currency).map_err(|err| {
        let detail = match err {
            WordsError::Negative => "must not be negative",
            WordsError::TooLarge => "is too large",
        };
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.to_string())
            .with_details(serde_json::json!({ "amount_cents": detail }))
    })?;

    Ok(Json(AmountInWords {
        amount_cents: query.amount_cents,
        currency,
        words,
    }))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/quote", post(payment_quote))
}

pub fn tool_routes() -> Router<AppState> {
    Router::new().route("/amount-in-words", get(amount_words))
}
