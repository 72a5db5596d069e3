//! Migration to create the cash_registers table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CashRegisters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashRegisters::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::Name)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::Status)
                            .text()
                            .not_null()
                            .default("closed"),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::OpeningBalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::ExpectedBalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::ClosingBalanceCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::DifferenceCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::OpenedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CashRegisters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CashRegisters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CashRegisters {
    Table,
    Id,
    Name,
    Status,
    OpeningBalanceCents,
    ExpectedBalanceCents,
    ClosingBalanceCents,
    DifferenceCents,
    OpenedAt,
    ClosedAt,
    CreatedAt,
    UpdatedAt,
}
