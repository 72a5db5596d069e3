//! # Purchase Handlers

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
use crate::models::Purchase;
use crate::repositories::PurchaseRepository;
use crate::repositories::crud::Resource;
use crate::repositories::purchase::{PurchaseDetail, PurchaseInput};
use crate::server::AppState;

/// Receives goods from a supplier: adds stock and refreshes product costs
#[utoipa::path(
    post,
    path = "/api/purchases",
    security(("bearer_auth" = [])),
    request_body = PurchaseInput,
    responses(
        (status = 201, description = "Purchase received", body = PurchaseDetail),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "purchases"
)]
pub async fn receive(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(input): ApiJson<PurchaseInput>,
) -> Result<Created<PurchaseDetail>, ApiError> {
    let detail = PurchaseRepository::new(&state.db).receive(input).await?;
    let location = format!("/api/{}/{}", Purchase::COLLECTION, detail.purchase.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(detail)))
}

/// Returns a purchase with its line items
#[utoipa::path(
    get,
    path = "/api/purchases/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase with items", body = PurchaseDetail),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Purchase not found", body = ApiError)
    ),
    tag = "purchases"
)]
pub async fn detail(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PurchaseDetail>, ApiError> {
    Ok(Json(PurchaseRepository::new(&state.db).detail(id).await?))
}

/// Cancels a purchase and takes its stock back out
#[utoipa::path(
    post,
    path = "/api/purchases/{id}/cancel",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase cancelled", body = PurchaseDetail),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Purchase not found", body = ApiError),
        (status = 409, description = "Already cancelled or stock already sold", body = ApiError)
    ),
    tag = "purchases"
)]
pub async fn cancel(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PurchaseDetail>, ApiError> {
    Ok(Json(PurchaseRepository::new(&state.db).cancel(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(crud::list::<Purchase>).post(receive))
        .route("/search", get(crud::search::<Purchase>))
        .route(
            "/{id}",
            get(detail)
                .put(crud::update::<Purchase>)
                .delete(crud::delete::<Purchase>),
        )
        .route("/{id}/cancel", post(cancel))
}
