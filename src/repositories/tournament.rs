//! # Tournament Repository
//!
//! Players, tournaments, matches and match lineups. A tournament is finalized
//! from the score of its final match; the roster of champion and runner-up is
//! built from the lineups of every match the tournament played.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::match_player::{self, Entity as MatchPlayer};
use crate::models::player::{self, Entity as Player};
use crate::models::tournament::{self, Entity as Tournament, TournamentStatus};
use crate::models::tournament_match::{self, Entity as TournamentMatch, MatchStage};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, is_valid_document, normalize_optional};

/// Player fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlayerInput {
    pub full_name: String,
    pub document_number: String,
    pub team: Option<String>,
}

impl PlayerInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("full_name", &self.full_name, 120);
        errors.required_text("document_number", &self.document_number, 30);
        errors.check(
            self.document_number.trim().is_empty()
                || is_valid_document(self.document_number.trim()),
            "document_number",
            "may only contain letters, digits and '-'",
        );
        errors.optional_text("team", self.team.as_deref(), 80);
        errors.into_result()
    }

    fn apply(self, active: &mut player::ActiveModel) {
        active.full_name = Set(self.full_name.trim().to_string());
        active.document_number = Set(self.document_number.trim().to_string());
        active.team = Set(normalize_optional(self.team));
        active.updated_at = Set(now());
    }
}

/// Tournament fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TournamentInput {
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    /// `scheduled` or `in_progress`; finishing goes through finalize
    pub status: Option<TournamentStatus>,
}

impl TournamentInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.check(
            self.ends_on.is_none_or(|ends_on| ends_on >= self.starts_on),
            "ends_on",
            "must not be before starts_on",
        );
        errors.check(
            self.status != Some(TournamentStatus::Finished),
            "status",
            "use POST /api/tournaments/{id}/finalize",
        );
        errors.into_result()
    }
}

/// Match fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MatchInput {
    pub tournament_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub stage: MatchStage,
    pub played_at: Option<DateTime<FixedOffset>>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl MatchInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("home_team", &self.home_team, 80);
        errors.required_text("away_team", &self.away_team, 80);
        errors.check(
            !self
                .home_team
                .trim()
                .eq_ignore_ascii_case(self.away_team.trim()),
            "away_team",
            "must differ from home_team",
        );
        errors.check(
            self.home_score.is_some() == self.away_score.is_some(),
            "away_score",
            "home_score and away_score must be given together",
        );
        for (field, score) in [("home_score", self.home_score), ("away_score", self.away_score)] {
            if let Some(score) = score {
                errors.non_negative(field, i64::from(score));
            }
        }
        errors.into_result()
    }

    fn apply(self, active: &mut tournament_match::ActiveModel) {
        active.tournament_id = Set(self.tournament_id);
        active.home_team = Set(self.home_team.trim().to_string());
        active.away_team = Set(self.away_team.trim().to_string());
        active.stage = Set(self.stage);
        active.played_at = Set(self.played_at);
        active.home_score = Set(self.home_score);
        active.away_score = Set(self.away_score);
        active.updated_at = Set(now());
    }
}

/// Body of `POST /api/matches/{id}/players`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MatchPlayerInput {
    pub player_id: Uuid,
    /// Home or away team of the match
    pub team: String,
}

/// A lineup entry with the player's details
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineupEntry {
    pub player_id: Uuid,
    pub full_name: String,
    pub document_number: String,
    pub team: String,
}

/// Players who appeared for one team
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamRoster {
    pub team: String,
    #[schema(value_type = Vec<Object>)]
    pub players: Vec<player::Model>,
}

/// Response of `GET /api/tournaments/{id}/roster`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TournamentRoster {
    pub champion: TeamRoster,
    pub runner_up: TeamRoster,
}

impl Resource for Player {
    const NAME: &'static str = "Player";
    const COLLECTION: &'static str = "players";

    fn id_column() -> player::Column {
        player::Column::Id
    }

    fn created_at_column() -> player::Column {
        player::Column::CreatedAt
    }

    fn search_columns() -> Vec<player::Column> {
        vec![
            player::Column::FullName,
            player::Column::DocumentNumber,
            player::Column::Team,
        ]
    }

    fn id_of(model: &player::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Player {
    type Create = PlayerInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: PlayerInput,
    ) -> Result<player::Model, RepositoryError> {
        input.validate()?;

        let mut active = player::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Player {
    type Update = PlayerInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: player::Model,
        input: PlayerInput,
    ) -> Result<player::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

impl Resource for Tournament {
    const NAME: &'static str = "Tournament";
    const COLLECTION: &'static str = "tournaments";

    fn id_column() -> tournament::Column {
        tournament::Column::Id
    }

    fn created_at_column() -> tournament::Column {
        tournament::Column::CreatedAt
    }

    fn search_columns() -> Vec<tournament::Column> {
        vec![
            tournament::Column::Name,
            tournament::Column::Status,
            tournament::Column::ChampionTeam,
        ]
    }

    fn id_of(model: &tournament::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Tournament {
    type Create = TournamentInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: TournamentInput,
    ) -> Result<tournament::Model, RepositoryError> {
        input.validate()?;

        let now = now();
        let tournament = tournament::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            starts_on: Set(input.starts_on),
            ends_on: Set(input.ends_on),
            status: Set(input.status.unwrap_or_default()),
            champion_team: Set(None),
            runner_up_team: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(tournament.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Tournament {
    type Update = TournamentInput;

    /// A finished tournament stays finished unless a new status is given,
    /// which reopens it and clears the result.
    async fn update_record(
        db: &DatabaseConnection,
        current: tournament::Model,
        input: TournamentInput,
    ) -> Result<tournament::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        active.name = Set(input.name.trim().to_string());
        active.starts_on = Set(input.starts_on);
        active.ends_on = Set(input.ends_on);
        if let Some(status) = input.status {
            active.status = Set(status);
            active.champion_team = Set(None);
            active.runner_up_team = Set(None);
        }
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }
}

impl Resource for TournamentMatch {
    const NAME: &'static str = "Match";
    const COLLECTION: &'static str = "matches";

    fn id_column() -> tournament_match::Column {
        tournament_match::Column::Id
    }

    fn created_at_column() -> tournament_match::Column {
        tournament_match::Column::CreatedAt
    }

    fn search_columns() -> Vec<tournament_match::Column> {
        vec![
            tournament_match::Column::HomeTeam,
            tournament_match::Column::AwayTeam,
            tournament_match::Column::Stage,
        ]
    }

    fn id_of(model: &tournament_match::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for TournamentMatch {
    type Create = MatchInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: MatchInput,
    ) -> Result<tournament_match::Model, RepositoryError> {
        input.validate()?;

        let mut active = tournament_match::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for TournamentMatch {
    type Update = MatchInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: tournament_match::Model,
        input: MatchInput,
    ) -> Result<tournament_match::Model, RepositoryError> {
        input.validate()?;

        let txn = db.begin().await?;
        let renamed = current.home_team != input.home_team.trim()
            || current.away_team != input.away_team.trim();
        if renamed {
            let lineup = MatchPlayer::find()
                .filter(match_player::Column::MatchId.eq(current.id))
                .count(&txn)
                .await?;
            if lineup > 0 {
                return Err(RepositoryError::conflict(
                    "MATCH_HAS_LINEUP",
                    format!(
                        "Match {} has {lineup} lineup entries; remove them before renaming teams",
                        current.id
                    ),
                ));
            }
        }

        let mut active = current.into_active_model();
        input.apply(&mut active);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        Ok(updated)
    }
}

/// Repository for lineups and tournament results
pub struct TournamentRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TournamentRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add_match_player(
        &self,
        match_id: Uuid,
        input: MatchPlayerInput,
    ) -> Result<LineupEntry, RepositoryError> {
        let game = TournamentMatch::get_by_id(self.db, match_id).await?;
        let team = input.team.trim();
        if !game.has_team(team) {
            return Err(RepositoryError::validation(
                "Team did not play this match",
                json!({
                    "team": format!("must be '{}' or '{}'", game.home_team, game.away_team)
                }),
            ));
        }
        let player = Player::get_by_id(self.db, input.player_id).await?;

        let entry = match_player::ActiveModel {
            id: Set(Uuid::new_v4()),
            match_id: Set(game.id),
            player_id: Set(player.id),
            team: Set(team.to_string()),
            created_at: Set(now()),
        }
        .insert(self.db)
        .await?;

        tracing::debug!(%match_id, player_id = %player.id, team = %entry.team, "Added player to lineup");
        Ok(LineupEntry {
            player_id: player.id,
            full_name: player.full_name,
            document_number: player.document_number,
            team: entry.team,
        })
    }

    /// Lineup of a match ordered by team, then player name.
    pub async fn list_match_players(
        &self,
        match_id: Uuid,
    ) -> Result<Vec<LineupEntry>, RepositoryError> {
        TournamentMatch::get_by_id(self.db, match_id).await?;

        let mut lineup: Vec<LineupEntry> = MatchPlayer::find()
            .filter(match_player::Column::MatchId.eq(match_id))
            .find_also_related(Player)
            .all(self.db)
            .await?
            .into_iter()
            .filter_map(|(entry, player)| {
                player.map(|player| LineupEntry {
                    player_id: player.id,
                    full_name: player.full_name,
                    document_number: player.document_number,
                    team: entry.team,
                })
            })
            .collect();
        lineup.sort_by(|a, b| a.team.cmp(&b.team).then_with(|| a.full_name.cmp(&b.full_name)));
        Ok(lineup)
    }

    pub async fn remove_match_player(
        &self,
        match_id: Uuid,
        player_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let result = MatchPlayer::delete_many()
            .filter(match_player::Column::MatchId.eq(match_id))
            .filter(match_player::Column::PlayerId.eq(player_id))
            .exec(self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found(
                "Match player",
                format!("{match_id}/{player_id}"),
            ));
        }
        Ok(())
    }

    /// Sets champion and runner-up from the final match.
    pub async fn finalize(&self, tournament_id: Uuid) -> Result<tournament::Model, RepositoryError> {
        let tournament = Tournament::get_by_id(self.db, tournament_id).await?;

        let final_match = TournamentMatch::find()
            .filter(tournament_match::Column::TournamentId.eq(tournament_id))
            .filter(tournament_match::Column::Stage.eq(MatchStage::Final))
            .order_by_desc(tournament_match::Column::CreatedAt)
            .one(self.db)
            .await?
            .ok_or_else(|| {
                RepositoryError::conflict(
                    "FINAL_MATCH_MISSING",
                    format!("Tournament {} has no final match", tournament.name),
                )
            })?;
        let (champion, runner_up) = final_match.outcome().ok_or_else(|| {
            RepositoryError::conflict(
                "FINAL_MATCH_UNDECIDED",
                "The final match has no decisive score",
            )
        })?;

        let mut active = tournament.into_active_model();
        active.champion_team = Set(Some(champion.to_string()));
        active.runner_up_team = Set(Some(runner_up.to_string()));
        active.status = Set(TournamentStatus::Finished);
        active.updated_at = Set(now());
        let tournament = active.update(self.db).await?;

        tracing::info!(%tournament_id, champion, runner_up, "Finalized tournament");
        Ok(tournament)
    }

    pub async fn roster(&self, tournament_id: Uuid) -> Result<TournamentRoster, RepositoryError> {
        let tournament = Tournament::get_by_id(self.db, tournament_id).await?;
        let (Some(champion), Some(runner_up), TournamentStatus::Finished) = (
            tournament.champion_team,
            tournament.runner_up_team,
            tournament.status,
        ) else {
            return Err(RepositoryError::conflict(
                "TOURNAMENT_NOT_FINALIZED",
                format!("Tournament {} has not been finalized", tournament.name),
            ));
        };

        let match_ids: Vec<Uuid> = TournamentMatch::find()
            .select_only()
            .column(tournament_match::Column::Id)
            .filter(tournament_match::Column::TournamentId.eq(tournament_id))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await?;

        Ok(TournamentRoster {
            champion: self.team_roster(&match_ids, champion).await?,
            runner_up: self.team_roster(&match_ids, runner_up).await?,
        })
    }

    async fn team_roster(
        &self,
        match_ids: &[Uuid],
        team: String,
    ) -> Result<TeamRoster, RepositoryError> {
        let player_ids: BTreeSet<Uuid> = MatchPlayer::find()
            .select_only()
            .column(match_player::Column::PlayerId)
            .filter(match_player::Column::MatchId.is_in(match_ids.iter().copied()))
            .filter(match_player::Column::Team.eq(team.as_str()))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await?
            .into_iter()
            .collect();

        let players = Player::find()
            .filter(player::Column::Id.is_in(player_ids))
            .order_by_asc(player::Column::FullName)
            .order_by_asc(player::Column::Id)
            .all(self.db)
            .await?;

        Ok(TeamRoster { team, players })
    }
}
