//! Reference data seeding
//!
//! Inserts the rows a fresh installation needs before the first sale: the
//! base currency and a default warehouse. Running it twice changes nothing.

use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Warehouse;
use crate::models::warehouse;
use crate::repositories::{CurrencyRepository, now};

/// Name of the warehouse created on first seed.
pub const DEFAULT_WAREHOUSE_NAME: &str = "Central";

/// What a seed run inserted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub currencies: usize,
    pub warehouses: usize,
}

/// Seeds the base currency and the default warehouse when missing.
pub async fn seed_reference_data(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let code = config.base_currency.as_str();

    let (_, created) = CurrencyRepository::new(db)
        .ensure_base_currency(code)
        .await
        .with_context(|| format!("Failed to seed base currency {code}"))?;
    if created {
        log::info!("Created base currency: {}", code);
        report.currencies += 1;
    } else {
        log::info!("Base currency '{}' already exists, skipping", code);
    }

    let existing = Warehouse::find()
        .filter(warehouse::Column::Name.eq(DEFAULT_WAREHOUSE_NAME))
        .one(db)
        .await
        .context("Failed to look up default warehouse")?;
    match existing {
        Some(_) => log::info!(
            "Warehouse '{}' already exists, skipping",
            DEFAULT_WAREHOUSE_NAME
        ),
        None => {
            log::info!("Creating warehouse: {}", DEFAULT_WAREHOUSE_NAME);
            warehouse::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(DEFAULT_WAREHOUSE_NAME.to_string()),
                location: Set(None),
                active: Set(true),
                created_at: Set(now()),
                updated_at: Set(now()),
            }
            .insert(db)
            .await
            .context("Failed to create default warehouse")?;
            report.warehouses += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use crate::models::currency::{self, RATE_SCALE};
    use crate::repositories::test_support::test_db;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let db = test_db().await;
        let config = AppConfig::default();

        let first = seed_reference_data(&db, &config).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                currencies: 1,
                warehouses: 1
            }
        );

        let second = seed_reference_data(&db, &config).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let base = Currency::find()
            .filter(currency::Column::Code.eq("BOB"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(base.rate_micros, RATE_SCALE);
        assert_eq!(base.name, "BOLIVIANOS");
    }
}
