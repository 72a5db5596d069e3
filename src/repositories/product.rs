//! # Product Repository
//!
//! Catalog CRUD plus the stock movements used by sales, purchases and
//! rentals. Stock is only ever changed with a single conditional UPDATE so
//! concurrent checkouts cannot drive it below zero.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::product::{ActiveModel, Column, Entity as Product, Model};
use crate::pagination::{Page, PageRequest};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, normalize_optional};

/// Threshold used by the low-stock report when none is given.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Product fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductInput {
    #[schema(example = "TAL-001")]
    pub code: String,
    #[schema(example = "Taladro percutor")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 45000)]
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock: i32,
    pub warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub rentable: bool,
    #[serde(default)]
    pub rental_daily_rate_cents: i64,
}

impl ProductInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("code", &self.code, 40);
        errors.required_text("name", &self.name, 120);
        errors.optional_text("description", self.description.as_deref(), 500);
        errors.non_negative("price_cents", self.price_cents);
        errors.non_negative("cost_cents", self.cost_cents);
        errors.non_negative("stock", i64::from(self.stock));
        errors.non_negative("rental_daily_rate_cents", self.rental_daily_rate_cents);
        errors.into_result()
    }

    fn apply(self, active: &mut ActiveModel) {
        active.code = Set(self.code.trim().to_string());
        active.name = Set(self.name.trim().to_string());
        active.description = Set(normalize_optional(self.description));
        active.price_cents = Set(self.price_cents);
        active.cost_cents = Set(self.cost_cents);
        active.stock = Set(self.stock);
        active.warehouse_id = Set(self.warehouse_id);
        active.rentable = Set(self.rentable);
        active.rental_daily_rate_cents = Set(self.rental_daily_rate_cents);
        active.updated_at = Set(now());
    }
}

impl Resource for Product {
    const NAME: &'static str = "Product";
    const COLLECTION: &'static str = "products";

    fn id_column() -> Column {
        Column::Id
    }

    fn created_at_column() -> Column {
        Column::CreatedAt
    }

    fn search_columns() -> Vec<Column> {
        vec![Column::Code, Column::Name]
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Product {
    type Create = ProductInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: ProductInput,
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
impl Updatable for Product {
    type Update = ProductInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: Model,
        input: ProductInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

/// Removes `quantity` units if at least that many are on hand.
pub(crate) async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = Product::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).sub(quantity))
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(product_id))
        .filter(Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(RepositoryError::conflict(
            "INSUFFICIENT_STOCK",
            format!("Product {product_id} does not have {quantity} unit(s) in stock"),
        ));
    }
    Ok(())
}

/// Adds `quantity` units back, optionally refreshing the last purchase cost.
pub(crate) async fn put_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    cost_cents: Option<i64>,
) -> Result<(), RepositoryError> {
    let mut update = Product::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).add(quantity))
        .col_expr(Column::UpdatedAt, Expr::value(now()));
    if let Some(cost) = cost_cents {
        update = update.col_expr(Column::CostCents, Expr::value(cost));
    }

    let result = update.filter(Column::Id.eq(product_id)).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(RepositoryError::not_found(Product::NAME, product_id));
    }
    Ok(())
}

/// Repository for product queries beyond plain CRUD
pub struct ProductRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProductRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Products with `stock <= threshold`.
    pub async fn low_stock(
        &self,
        threshold: i32,
        request: PageRequest,
    ) -> Result<Page<Model>, RepositoryError> {
        if threshold < 0 {
            return Err(RepositoryError::validation(
                "Invalid threshold",
                serde_json::json!({ "threshold": "must not be negative" }),
            ));
        }

        Product::page_where(
            self.db,
            Condition::all().add(Column::Stock.lte(threshold)),
            request,
        )
        .await
    }
}
