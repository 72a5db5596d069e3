//! Migration to create the tournament tables.
//!
//! Creates `players`, `tournaments`, `matches` and the `match_players` join
//! table. Matches cascade with their tournament; players referenced by a match
//! cannot be deleted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Players::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Players::FullName).text().not_null())
                    .col(
                        ColumnDef::new(Players::DocumentNumber)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Players::Team).text().null())
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Players::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tournaments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tournaments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tournaments::Name)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tournaments::StartsOn).date().not_null())
                    .col(ColumnDef::new(Tournaments::EndsOn).date().null())
                    .col(
                        ColumnDef::new(Tournaments::Status)
                            .text()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Tournaments::ChampionTeam).text().null())
                    .col(ColumnDef::new(Tournaments::RunnerUpTeam).text().null())
                    .col(
                        ColumnDef::new(Tournaments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tournaments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Matches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Matches::TournamentId).uuid().not_null())
                    .col(ColumnDef::new(Matches::HomeTeam).text().not_null())
                    .col(ColumnDef::new(Matches::AwayTeam).text().not_null())
                    .col(
                        ColumnDef::new(Matches::Stage)
                            .text()
                            .not_null()
                            .default("group"),
                    )
                    .col(
                        ColumnDef::new(Matches::PlayedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Matches::HomeScore).integer().null())
                    .col(ColumnDef::new(Matches::AwayScore).integer().null())
                    .col(
                        ColumnDef::new(Matches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Matches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_matches_tournament_id")
                            .from(Matches::Table, Matches::TournamentId)
                            .to(Tournaments::Table, Tournaments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_matches_tournament_id")
                    .table(Matches::Table)
                    .col(Matches::TournamentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MatchPlayers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MatchPlayers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MatchPlayers::MatchId).uuid().not_null())
                    .col(ColumnDef::new(MatchPlayers::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(MatchPlayers::Team).text().not_null())
                    .col(
                        ColumnDef::new(MatchPlayers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_players_match_id")
                            .from(MatchPlayers::Table, MatchPlayers::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_players_player_id")
                            .from(MatchPlayers::Table, MatchPlayers::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_match_players_match_player")
                    .table(MatchPlayers::Table)
                    .col(MatchPlayers::MatchId)
                    .col(MatchPlayers::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_match_players_match_player")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(MatchPlayers::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_matches_tournament_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tournaments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Players {
    Table,
    Id,
    FullName,
    DocumentNumber,
    Team,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tournaments {
    Table,
    Id,
    Name,
    StartsOn,
    EndsOn,
    Status,
    ChampionTeam,
    RunnerUpTeam,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Matches {
    Table,
    Id,
    TournamentId,
    HomeTeam,
    AwayTeam,
    Stage,
    PlayedAt,
    HomeScore,
    AwayScore,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MatchPlayers {
    Table,
    Id,
    MatchId,
    PlayerId,
    Team,
    CreatedAt,
}
