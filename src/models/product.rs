//! Product entity model
//!
//! Catalog items with sale price, last purchase cost and on-hand stock.
//! Rentable products additionally carry a daily rental rate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique product code (SKU or barcode)
    #[sea_orm(unique)]
    pub code: String,

    pub name: String,
    pub description: Option<String>,

    /// Sale price in cents of the base currency
    pub price_cents: i64,

    /// Cost of the most recent purchase in cents
    pub cost_cents: i64,

    /// Units on hand, never negative
    pub stock: i32,

    pub warehouse_id: Option<Uuid>,

    pub rentable: bool,
    pub rental_daily_rate_cents: i64,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
