//! # Rental Handlers

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::{self, Created, created};
use crate::handlers::types::{ApiJson, ApiPath};
use crate::models::Rental;
use crate::models::rental::Model as RentalModel;
use crate::repositories::RentalRepository;
use crate::repositories::rental::{RentalInput, RentalSettlement, ReturnRequest};
use crate::server::AppState;

/// Lends rentable stock to a client
#[utoipa::path(
    post,
    path = "/api/rentals",
    security(("bearer_auth" = [])),
    request_body = RentalInput,
    responses(
        (status = 201, description = "Rental opened", body = serde_json::Value),
        (status = 400, description = "Validation error or product not rentable", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 409, description = "Insufficient stock", body = ApiError)
    ),
    tag = "rentals"
)]
pub async fn open(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(input): ApiJson<RentalInput>,
) -> Result<Created<RentalModel>, ApiError> {
    let rental = RentalRepository::new(&state.db).open(input).await?;
    Ok(created::<Rental>(rental))
}

/// Settles a rental: bills every started day and restores stock
#[utoipa::path(
    post,
    path = "/api/rentals/{id}/return",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rental id")),
    request_body(content = ReturnRequest, description = "Optional return time; defaults to now"),
    responses(
        (status = 200, description = "Rental returned", body = RentalSettlement),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Rental not found", body = ApiError),
        (status = 409, description = "Rental is not active", body = ApiError)
    ),
    tag = "rentals"
)]
pub async fn return_rental(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    body: Bytes,
) -> Result<Json<RentalSettlement>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ReturnRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                format!("Invalid request body: {err}"),
            )
        })?
    };
    let settlement = RentalRepository::new(&state.db)
        .return_rental(id, request)
        .await?;
    Ok(Json(settlement))
}

/// Cancels an active rental without charge
#[utoipa::path(
    post,
    path = "/api/rentals/{id}/cancel",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rental id")),
    responses(
        (status = 200, description = "Rental cancelled", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Rental not found", body = ApiError),
        (status = 409, description = "Rental is not active", body = ApiError)
    ),
    tag = "rentals"
)]
pub async fn cancel(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RentalModel>, ApiError> {
    Ok(Json(RentalRepository::new(&state.db).cancel(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Rental>).post(open))
        .route("/search", get(crud::search::<Rental>))
        .route(
            "/{id}",
            get(crud::get_one::<Rental>)
                .put(crud::update::<Rental>)
                .delete(crud::delete::<Rental>),
        )
        .route("/{id}/return", post(return_rental))
        .route("/{id}/cancel", post(cancel))
}
