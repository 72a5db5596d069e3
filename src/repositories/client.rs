//! # Client Repository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::client::{self, ActiveModel, Column, Entity as Client, Model};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, is_valid_document, is_valid_email, normalize_optional};

/// Client fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClientInput {
    #[schema(example = "Ana Quispe")]
    pub name: String,
    /// National id or tax number
    #[schema(example = "4567123-LP")]
    pub document_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ClientInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.required_text("document_number", &self.document_number, 30);
        if !self.document_number.trim().is_empty() {
            errors.check(
                is_valid_document(self.document_number.trim()),
                "document_number",
                "may only contain letters, digits and dashes",
            );
        }
        errors.optional_text("phone", self.phone.as_deref(), 30);
        errors.optional_text("address", self.address.as_deref(), 200);
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            errors.check(is_valid_email(email), "email", "is not a valid email address");
        }
        errors.into_result()
    }

    fn apply(self, active: &mut ActiveModel) {
        active.name = Set(self.name.trim().to_string());
        active.document_number = Set(self.document_number.trim().to_string());
        active.phone = Set(normalize_optional(self.phone));
        active.email = Set(normalize_optional(self.email));
        active.address = Set(normalize_optional(self.address));
        active.updated_at = Set(now());
    }
}

impl Resource for Client {
    const NAME: &'static str = "Client";
    const COLLECTION: &'static str = "clients";

    fn id_column() -> Column {
        Column::Id
    }

    fn created_at_column() -> Column {
        Column::CreatedAt
    }

    fn search_columns() -> Vec<Column> {
        vec![Column::Name, Column::DocumentNumber]
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Client {
    type Create = ClientInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: ClientInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = client::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Client {
    type Update = ClientInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: Model,
        input: ClientInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}
