//! Currency exchange entity model
//!
//! A recorded conversion. Both rates are snapshotted so later rate changes do
//! not alter history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchanges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub from_currency_id: Uuid,
    pub to_currency_id: Uuid,

    /// Amount handed over, in cents of the source currency
    pub amount_cents: i64,

    /// Amount paid out, in cents of the target currency
    pub result_cents: i64,

    pub from_rate_micros: i64,
    pub to_rate_micros: i64,

    pub notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
