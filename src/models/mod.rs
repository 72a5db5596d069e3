//! # Data Models
//!
//! SeaORM entities for every table of the Retail API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod cash_register;
pub mod client;
pub mod course;
pub mod currency;
pub mod exchange;
pub mod expense_type;
pub mod fee_payment;
pub mod invoice;
pub mod match_player;
pub mod player;
pub mod product;
pub mod purchase;
pub mod purchase_item;
pub mod rental;
pub mod sale;
pub mod sale_item;
pub mod school;
pub mod tournament;
pub mod tournament_match;
pub mod warehouse;

pub use cash_register::Entity as CashRegister;
pub use client::Entity as Client;
pub use course::Entity as Course;
pub use currency::Entity as Currency;
pub use exchange::Entity as Exchange;
pub use expense_type::Entity as ExpenseType;
pub use fee_payment::Entity as FeePayment;
pub use invoice::Entity as Invoice;
pub use match_player::Entity as MatchPlayer;
pub use player::Entity as Player;
pub use product::Entity as Product;
pub use purchase::Entity as Purchase;
pub use purchase_item::Entity as PurchaseItem;
pub use rental::Entity as Rental;
pub use sale::Entity as Sale;
pub use sale_item::Entity as SaleItem;
pub use school::Entity as School;
pub use tournament::Entity as Tournament;
pub use tournament_match::Entity as TournamentMatch;
pub use warehouse::Entity as Warehouse;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "retail-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
