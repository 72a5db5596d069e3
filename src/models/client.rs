//! Client entity model
//!
//! Customers who buy, rent or get invoiced.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A customer record
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// National id or tax number, unique across clients
    #[sea_orm(unique)]
    pub document_number: String,

    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
