//! # Generic CRUD Handlers
//!
//! The six operations every entity router shares. Handlers are generic over a
//! [`Resource`]; the concrete entity is chosen when the router is built with
//! [`crud_routes`].

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::LOCATION},
    routing::get,
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery};
use crate::pagination::{Page, PageParams, PageRequest, SearchParams};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::server::AppState;

/// `201 Created` with a `Location` header pointing at the new record.
pub type Created<T> = (StatusCode, [(axum::http::HeaderName, String); 1], Json<T>);

pub fn created<R: Resource>(model: R::Model) -> Created<R::Model> {
    let location = format!("/api/{}/{}", R::COLLECTION, R::id_of(&model));
    (StatusCode::CREATED, [(LOCATION, location)], Json(model))
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<R::Model>>, ApiError> {
    let request = PageRequest::from_params(&params, &state.config)?;
    Ok(Json(R::list_page(&state.db, request).await?))
}

pub async fn search<R: Resource>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Page<R::Model>>, ApiError> {
    let term = params.term()?;
    let request = PageRequest::resolve(params.page, params.limit, &state.config)?;
    Ok(Json(R::search_page(&state.db, term, request).await?))
}

pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<R::Model>, ApiError> {
    Ok(Json(R::get_by_id(&state.db, id).await?))
}

pub async fn create<R: Creatable>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiJson(input): ApiJson<R::Create>,
) -> Result<Created<R::Model>, ApiError> {
    let model = R::create_record(&state.db, input).await?;
    tracing::info!(entity = R::NAME, id = %R::id_of(&model), "Created record");
    Ok(created::<R>(model))
}

pub async fn update<R: Updatable>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<R::Update>,
) -> Result<Json<R::Model>, ApiError> {
    let current = R::get_by_id(&state.db, id).await?;
    Ok(Json(R::update_record(&state.db, current, input).await?))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    R::remove_by_id(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full six-operation router for `R`, to be nested under `/api/<collection>`.
pub fn crud_routes<R: Creatable + Updatable>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/search", get(search::<R>))
        .route(
            "/{id}",
            get(get_one::<R>).put(update::<R>).delete(delete::<R>),
        )
}
