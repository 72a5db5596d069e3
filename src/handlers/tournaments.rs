//! # Tournament Handlers
//!
//! Players, tournaments and matches use the generic CRUD routes. Lineups,
//! finalization and the champion roster are served here.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::crud::crud_routes;
use crate::handlers::types::{ApiJson, ApiPath};
use crate::models::tournament::Model as TournamentModel;
use crate::models::{Player, Tournament, TournamentMatch};
use crate::repositories::TournamentRepository;
use crate::repositories::tournament::{LineupEntry, MatchPlayerInput, TournamentRoster};
use crate::server::AppState;

/// Lineup of a match
#[utoipa::path(
    get,
    path = "/api/matches/{id}/players",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Match id")),
    responses(
        (status = 200, description = "Players in the match", body = Vec<LineupEntry>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Match not found", body = ApiError)
    ),
    tag = "tournaments"
)]
pub async fn list_match_players(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<LineupEntry>>, ApiError> {
    Ok(Json(
        TournamentRepository::new(&state.db)
            .list_match_players(id)
            .await?,
    ))
}

/// Adds a player to one side of a match
#[utoipa::path(
    post,
    path = "/api/matches/{id}/players",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Match id")),
    request_body = MatchPlayerInput,
    responses(
        (status = 201, description = "Player added", body = LineupEntry),
        (status = 400, description = "Team did not play the match", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Match or player not found", body = ApiError),
        (status = 409, description = "Player already in the lineup", body = ApiError)
    ),
    tag = "tournaments"
)]
pub async fn add_match_player(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<MatchPlayerInput>,
) -> Result<(StatusCode, Json<LineupEntry>), ApiError> {
    let entry = TournamentRepository::new(&state.db)
        .add_match_player(id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Removes a player from a match lineup
#[utoipa::path(
    delete,
    path = "/api/matches/{id}/players/{player_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Match id"),
        ("player_id" = Uuid, Path, description = "Player id")
    ),
    responses(
        (status = 204, description = "Player removed"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Player not in the lineup", body = ApiError)
    ),
    tag = "tournaments"
)]
pub async fn remove_match_player(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath((id, player_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    TournamentRepository::new(&state.db)
        .remove_match_player(id, player_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records champion and runner-up from the final match
#[utoipa::path(
    post,
    path = "/api/tournaments/{id}/finalize",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tournament id")),
    responses(
        (status = 200, description = "Tournament finished", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Tournament not found", body = ApiError),
        (status = 409, description = "Final match missing or undecided", body = ApiError)
    ),
    tag = "tournaments"
)]
pub async fn finalize(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TournamentModel>, ApiError> {
    Ok(Json(TournamentRepository::new(&state.db).finalize(id).await?))
}

/// Players of the champion and runner-up teams
#[utoipa::path(
    get,
    path = "/api/tournaments/{id}/roster",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tournament id")),
    responses(
        (status = 200, description = "Champion and runner-up rosters", body = TournamentRoster),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Tournament not found", body = ApiError),
        (status = 409, description = "Tournament not finalized", body = ApiError)
    ),
    tag = "tournaments"
)]
pub async fn roster(
    State(state): State<AppState>,
    _principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TournamentRoster>, ApiError> {
    Ok(Json(TournamentRepository::new(&state.db).roster(id).await?))
}

pub fn player_routes() -> Router<AppState> {
    crud_routes::<Player>()
}

pub fn tournament_routes() -> Router<AppState> {
    crud_routes::<Tournament>()
        .route("/{id}/finalize", post(finalize))
        .route("/{id}/roster", get(roster))
}

pub fn match_routes() -> Router<AppState> {
    crud_routes::<TournamentMatch>()
        .route(
            "/{id}/players",
            get(list_match_players).post(add_match_player),
        )
        .route("/{id}/players/{player_id}", delete(remove_match_player))
}
