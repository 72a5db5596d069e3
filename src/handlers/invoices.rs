//! # Invoice Handlers

use axum::{
    Json, Router,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::{self, Created, created};
use crate::handlers::types::{ApiJson, ApiPath};
use crate::models::Invoice;
use crate::models::invoice::Model as InvoiceModel;
use crate::repositories::InvoiceRepository;
use crate::repositories::invoice::IssueInvoiceRequest;
use crate::server::AppState;

/// Issues the invoice of a completed sale
#[utoipa::path(
    post,
    path = "/api/invoices",
    security(("bearer_auth" = [])),
    request_body = IssueInvoiceRequest,
    responses(
        (status = 201, description = "Invoice issued", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Sale not found", body = ApiError),
        (status = 409, description = "Sale already invoiced or not completed", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn issue(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(request): ApiJson<IssueInvoiceRequest>,
) -> Result<Created<InvoiceModel>, ApiError> {
    let invoice = InvoiceRepository::new(&state.db).issue(request).await?;
    Ok(created::<Invoice>(invoice))
}

/// Printable 40-column text of an invoice
#[utoipa::path(
    get,
    path = "/api/invoices/{id}/print",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Printable invoice", body = String, content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn print(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let text = InvoiceRepository::new(&state.db)
        .print(id, &state.config)
        .await?;
    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

/// Voids an issued invoice
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/void",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice voided", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError),
        (status = 409, description = "Invoice already void", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn void(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<InvoiceModel>, ApiError> {
    Ok(Json(InvoiceRepository::new(&state.db).void(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Invoice>).post(issue))
        .route("/search", get(crud::search::<Invoice>))
        .route(
            "/{id}",
            get(crud::get_one::<Invoice>)
                .put(crud::update::<Invoice>)
                .delete(crud::delete::<Invoice>),
        )
        .route("/{id}/print", get(print))
        .route("/{id}/void", post(void))
}
