//! Database migrations for the Retail API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_catalog;
mod m2025_01_10_000002_create_cash_registers;
mod m2025_01_10_000003_create_sales;
mod m2025_01_10_000004_create_purchases;
mod m2025_01_10_000005_create_invoices;
mod m2025_01_10_000006_create_rentals;
mod m2025_01_10_000007_create_schools;
mod m2025_01_10_000008_create_currencies;
mod m2025_01_10_000009_create_tournaments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_catalog::Migration),
            Box::new(m2025_01_10_000002_create_cash_registers::Migration),
            Box::new(m2025_01_10_000003_create_sales::Migration),
            Box::new(m2025_01_10_000004_create_purchases::Migration),
            Box::new(m2025_01_10_000005_create_invoices::Migration),
            Box::new(m2025_01_10_000006_create_rentals::Migration),
            Box::new(m2025_01_10_000007_create_schools::Migration),
            Box::new(m2025_01_10_000008_create_currencies::Migration),
            Box::new(m2025_01_10_000009_create_tournaments::Migration),
        ]
    }
}
