//! Currency entity model
//!
//! `rate_micros` is the value of one unit of the currency expressed in
//! millionths of the base currency, so the base currency itself has a rate of
//! `1_000_000`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Micro-units in one whole rate unit.
pub const RATE_SCALE: i64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Three upper-case letters
    #[sea_orm(unique)]
    pub code: String,

    pub name: String,
    pub symbol: String,
    pub rate_micros: i64,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_type::Entity")]
    ExpenseType,
}

impl Related<super::expense_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
