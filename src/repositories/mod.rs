//! # Repository Layer
//!
//! Data access for every entity. Plain CRUD goes through the traits in
//! [`crud`]; entities with business workflows (checkout, returns, register
//! transitions, invoicing) also expose a `*Repository` struct holding the
//! transactional operations.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

pub mod cash_register;
pub mod client;
pub mod crud;
pub mod currency;
pub mod invoice;
pub mod product;
pub mod purchase;
pub mod rental;
pub mod sale;
pub mod school;
pub mod tournament;
pub mod warehouse;

pub use cash_register::CashRegisterRepository;
pub use currency::CurrencyRepository;
pub use invoice::InvoiceRepository;
pub use product::ProductRepository;
pub use purchase::PurchaseRepository;
pub use rental::RentalRepository;
pub use sale::SaleRepository;
pub use school::SchoolRepository;
pub use tournament::TournamentRepository;

/// Current time in the column type used by every timestamp.
pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

#[cfg(test)]
pub(crate) mod test_support {
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
    use uuid::Uuid;

    use crate::config::AppConfig;
    use crate::db::{init_pool, run_migrations};
    use crate::models::{client, product};

    use super::now;

    /// Fresh migrated in-memory database.
    pub async fn test_db() -> DatabaseConnection {
        let config = AppConfig {
            profile: "test".to_string(),
            database_url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        let db = init_pool(&config).await.expect("Failed to init test DB");
        run_migrations(&db).await.expect("Failed to migrate test DB");
        db
    }

    /// Migrated SQLite file database behind a multi-connection pool, for
    /// tests where statements must race on separate connections.
    pub async fn pooled_file_db(dir: &tempfile::TempDir) -> DatabaseConnection {
        let path = dir.path().join("retail.db");
        let config = AppConfig {
            profile: "test".to_string(),
            database_url: format!("sqlite://{}?mode=rwc", path.display()),
            db_max_connections: 4,
            ..Default::default()
        };
        let db = init_pool(&config).await.expect("Failed to init pooled test DB");
        run_migrations(&db).await.expect("Failed to migrate pooled test DB");
        db
    }

    pub async fn insert_client(db: &DatabaseConnection, document: &str) -> client::Model {
        client::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Client {document}")),
            document_number: Set(document.to_string()),
            phone: Set(None),
            email: Set(None),
            address: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn insert_product(
        db: &DatabaseConnection,
        code: &str,
        price_cents: i64,
        stock: i32,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Product {code}")),
            description: Set(None),
            price_cents: Set(price_cents),
            cost_cents: Set(0),
            stock: Set(stock),
            warehouse_id: Set(None),
            rentable: Set(true),
            rental_daily_rate_cents: Set(1_000),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(db)
        .await
        .unwrap()
    }
}
