//! Tournament match entity model

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tournament_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub stage: MatchStage,
    pub played_at: Option<DateTimeWithTimeZone>,

    /// Both scores are set together once the match is played
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Winner and loser, when the match has a decisive score.
    pub fn outcome(&self) -> Option<(&str, &str)> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) if home > away => {
                Some((self.home_team.as_str(), self.away_team.as_str()))
            }
            (Some(home), Some(away)) if away > home => {
                Some((self.away_team.as_str(), self.home_team.as_str()))
            }
            _ => None,
        }
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    #[sea_orm(string_value = "group")]
    #[default]
    Group,
    #[sea_orm(string_value = "quarterfinal")]
    Quarterfinal,
    #[sea_orm(string_value = "semifinal")]
    Semifinal,
    #[sea_orm(string_value = "final")]
    Final,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tournament::Entity",
        from = "Column::TournamentId",
        to = "super::tournament::Column::Id",
        on_delete = "Cascade"
    )]
    Tournament,
    #[sea_orm(has_many = "super::match_player::Entity")]
    MatchPlayer,
}

impl Related<super::tournament::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tournament.def()
    }
}

impl Related<super::match_player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MatchPlayer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
