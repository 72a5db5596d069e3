//! # School Handlers
//!
//! Schools, courses and fee payments, plus the two nested listings.

use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::crud_routes;
use crate::handlers::types::{ApiPath, ApiQuery};
use crate::models::course::Model as CourseModel;
use crate::models::fee_payment::Model as FeePaymentModel;
use crate::models::{Course, FeePayment, School};
use crate::pagination::{Page, PageParams, PageRequest};
use crate::repositories::SchoolRepository;
use crate::repositories::school::FeePaymentFilter;
use crate::server::AppState;

/// Lists the courses of a school
#[utoipa::path(
    get,
    path = "/api/schools/{id}/courses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "School id"), PageParams),
    responses(
        (status = 200, description = "Page of courses", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "School not found", body = ApiError)
    ),
    tag = "schools"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<CourseModel>>, ApiError> {
    let request = PageRequest::from_params(&params, &state.config)?;
    Ok(Json(SchoolRepository::new(&state.db).courses(id, request).await?))
}

/// Lists fee payments of a course, optionally for one period
#[utoipa::path(
    get,
    path = "/api/courses/{id}/fee-payments",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Course id"), FeePaymentFilter),
    responses(
        (status = 200, description = "Page of fee payments", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Course not found", body = ApiError)
    ),
    tag = "schools"
)]
pub async fn list_fee_payments(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(filter): ApiQuery<FeePaymentFilter>,
) -> Result<Json<Page<FeePaymentModel>>, ApiError> {
    let request = PageRequest::resolve(filter.page, filter.limit, &state.config)?;
    let page = SchoolRepository::new(&state.db)
        .fee_payments(id, filter.period.as_deref(), request)
        .await?;
    Ok(Json(page))
}

pub fn school_routes() -> Router<AppState> {
    crud_routes::<School>().route("/{id}/courses", get(list_courses))
}

pub fn course_routes() -> Router<AppState> {
    crud_routes::<Course>().route("/{id}/fee-payments", get(list_fee_payments))
}

pub fn fee_payment_routes() -> Router<AppState> {
    crud_routes::<FeePayment>()
}
