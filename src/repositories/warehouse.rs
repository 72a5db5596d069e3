//! # Warehouse Repository
//!
//! Warehouses are referenced by products with a restricting foreign key, so
//! deleting one that still holds products is reported as a conflict by the
//! database.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::warehouse::{ActiveModel, Column, Entity as Warehouse, Model};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, normalize_optional};

fn default_active() -> bool {
    true
}

/// Warehouse fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WarehouseInput {
    #[schema(example = "Central")]
    pub name: String,
    pub location: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl WarehouseInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 80);
        errors.optional_text("location", self.location.as_deref(), 200);
        errors.into_result()
    }

    fn apply(self, active: &mut ActiveModel) {
        active.name = Set(self.name.trim().to_string());
        active.location = Set(normalize_optional(self.location));
        active.active = Set(self.active);
        active.updated_at = Set(now());
    }
}

impl Resource for Warehouse {
    const NAME: &'static str = "Warehouse";
    const COLLECTION: &'static str = "warehouses";

    fn id_column() -> Column {
        Column::Id
    }

    fn created_at_column() -> Column {
        Column::CreatedAt
    }

    fn search_columns() -> Vec<Column> {
        vec![Column::Name, Column::Location]
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Warehouse {
    type Create = WarehouseInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: WarehouseInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Warehouse {
    type Update = WarehouseInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: Model,
        input: WarehouseInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}
