//! # Generic CRUD
//!
//! Every entity router exposes the same six operations. [`Resource`] carries
//! the shared list, search, lookup and delete queries; entities opt into
//! creation and replacement through [`Creatable`] and [`Updatable`].

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::pagination::{Page, PageRequest};

/// An entity served by the generic CRUD routes.
#[async_trait]
pub trait Resource: EntityTrait<Model: Serialize + Sync + 'static> {
    /// Singular display name used in error messages, e.g. `Client`.
    const NAME: &'static str;
    /// Path segment under `/api`, e.g. `clients`.
    const COLLECTION: &'static str;

    fn id_column() -> Self::Column;

    fn created_at_column() -> Self::Column;

    /// Text columns matched by `GET /search`.
    fn search_columns() -> Vec<Self::Column>;

    fn id_of(model: &Self::Model) -> Uuid;

    /// Rejects deletion of rows that are still in a live state.
    fn ensure_deletable(_model: &Self::Model) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Extra condition re-checked by the DELETE statement itself, so a row
    /// that changed state after [`Resource::ensure_deletable`] is kept.
    fn delete_guard() -> Condition {
        Condition::all()
    }

    async fn list_page(
        db: &DatabaseConnection,
        request: PageRequest,
    ) -> Result<Page<Self::Model>, RepositoryError> {
        Self::page_where(db, Condition::all(), request).await
    }

    async fn search_page(
        db: &DatabaseConnection,
        term: &str,
        request: PageRequest,
    ) -> Result<Page<Self::Model>, RepositoryError> {
        let condition = Self::search_columns()
            .into_iter()
            .fold(Condition::any(), |condition, column| {
                condition.add(column.contains(term))
            });
        Self::page_where(db, condition, request).await
    }

    /// Newest first; the id breaks ties so pages are stable.
    async fn page_where(
        db: &DatabaseConnection,
        condition: Condition,
        request: PageRequest,
    ) -> Result<Page<Self::Model>, RepositoryError> {
        let total = Self::find().filter(condition.clone()).count(db).await?;
        let data = Self::find()
            .filter(condition)
            .order_by_desc(Self::created_at_column())
            .order_by_asc(Self::id_column())
            .offset(request.offset())
            .limit(request.limit)
            .all(db)
            .await?;

        Ok(Page::new(data, request, total))
    }

    async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Self::Model, RepositoryError> {
        Self::find()
            .filter(Self::id_column().eq(id))
            .one(db)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Self::NAME, id))
    }

    async fn remove_by_id(db: &DatabaseConnection, id: Uuid) -> Result<(), RepositoryError> {
        let model = Self::get_by_id(db, id).await?;
        Self::ensure_deletable(&model)?;

        let result = Self::delete_many()
            .filter(Self::id_column().eq(id))
            .filter(Self::delete_guard())
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::conflict(
                "CONFLICT",
                format!("{} {id} changed state and cannot be deleted", Self::NAME),
            ));
        }

        tracing::info!(entity = Self::NAME, %id, "Deleted record");
        Ok(())
    }
}

/// Entities created through `POST /api/<collection>`.
#[async_trait]
pub trait Creatable: Resource {
    type Create: DeserializeOwned + Send + 'static;

    async fn create_record(
        db: &DatabaseConnection,
        input: Self::Create,
    ) -> Result<Self::Model, RepositoryError>;
}

/// Entities updated through `PUT /api/<collection>/{id}`.
#[async_trait]
pub trait Updatable: Resource {
    type Update: DeserializeOwned + Send + 'static;

    async fn update_record(
        db: &DatabaseConnection,
        current: Self::Model,
        input: Self::Update,
    ) -> Result<Self::Model, RepositoryError>;
}
