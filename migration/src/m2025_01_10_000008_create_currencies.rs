//! Migration to create the currency tables.
//!
//! Creates `currencies`, `expense_types` and `exchanges`. Rates are stored in
//! micro-units of the base currency.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Currencies::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Currencies::Code)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Currencies::Name).text().not_null())
                    .col(ColumnDef::new(Currencies::Symbol).text().not_null())
                    .col(
                        ColumnDef::new(Currencies::RateMicros)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Currencies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Currencies::UpdatedAt)
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
                    .table(ExpenseTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseTypes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseTypes::CurrencyId).uuid().not_null())
                    .col(ColumnDef::new(ExpenseTypes::Name).text().not_null())
                    .col(ColumnDef::new(ExpenseTypes::Description).text().null())
                    .col(
                        ColumnDef::new(ExpenseTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ExpenseTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_types_currency_id")
                            .from(ExpenseTypes::Table, ExpenseTypes::CurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Exchanges::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Exchanges::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Exchanges::FromCurrencyId).uuid().not_null())
                    .col(ColumnDef::new(Exchanges::ToCurrencyId).uuid().not_null())
                    .col(
                        ColumnDef::new(Exchanges::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Exchanges::ResultCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Exchanges::FromRateMicros)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Exchanges::ToRateMicros)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Exchanges::Notes).text().null())
                    .col(
                        ColumnDef::new(Exchanges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Exchanges::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exchanges_from_currency_id")
                            .from(Exchanges::Table, Exchanges::FromCurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exchanges_to_currency_id")
                            .from(Exchanges::Table, Exchanges::ToCurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Exchanges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Currencies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Currencies {
    Table,
    Id,
    Code,
    Name,
    Symbol,
    RateMicros,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ExpenseTypes {
    Table,
    Id,
    CurrencyId,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Exchanges {
    Table,
    Id,
    FromCurrencyId,
    ToCurrencyId,
    AmountCents,
    ResultCents,
    FromRateMicros,
    ToRateMicros,
    Notes,
    CreatedAt,
    UpdatedAt,
}
