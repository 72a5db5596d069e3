//! Sale entity model
//!
//! A completed checkout. Line items live in [`super::sale_item`]; the tenders
//! used to pay are kept as a JSON array snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub client_id: Option<Uuid>,
    pub cash_register_id: Option<Uuid>,

    pub status: SaleStatus,

    /// Sum of line subtotals
    pub total_cents: i64,

    /// Everything handed over, converted to the base currency
    pub tendered_cents: i64,

    /// Cash part of the tender
    pub cash_cents: i64,

    /// Change returned to the customer, always paid from cash
    pub change_cents: i64,

    /// Tender lines as submitted at checkout
    #[sea_orm(column_type = "JsonBinary")]
    pub payments: Json,

    pub notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
pub enum SaleStatus {
    #[sea_orm(string_value = "completed")]
    #[default]
    Completed,
    #[sea_orm(string_value = "voided")]
    Voided,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItem,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItem.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
