//! # Purchase Repository
//!
//! Receiving a purchase adds stock and refreshes each product's last cost;
//! cancelling takes the stock back out, failing if some of it has already
//! been sold.

use std::collections::HashSet;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::product::{self, Entity as Product};
use crate::models::purchase::{self, Entity as Purchase, PurchaseStatus};
use crate::models::purchase_item::{self, Entity as PurchaseItem};
use crate::repositories::crud::{Resource, Updatable};
use crate::repositories::now;
use crate::repositories::product::{put_stock, take_stock};
use crate::validation::{FieldErrors, normalize_optional};

/// One received line
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseItemInput {
    pub product_id: Uuid,
    #[schema(example = 12)]
    pub quantity: i32,
    #[schema(example = 3200)]
    pub unit_cost_cents: i64,
}

/// Body of `POST /api/purchases`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseInput {
    #[schema(example = "Distribuidora Andina")]
    pub supplier_name: String,
    pub supplier_invoice: Option<String>,
    pub items: Vec<PurchaseItemInput>,
}

/// Body of `PUT /api/purchases/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseUpdate {
    pub supplier_name: String,
    pub supplier_invoice: Option<String>,
}

/// A purchase with its line items
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseDetail {
    #[schema(value_type = Object)]
    pub purchase: purchase::Model,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<purchase_item::Model>,
}

fn check_supplier(errors: &mut FieldErrors, name: &str, invoice: Option<&str>) {
    errors.required_text("supplier_name", name, 120);
    errors.optional_text("supplier_invoice", invoice, 60);
}

impl Resource for Purchase {
    const NAME: &'static str = "Purchase";
    const COLLECTION: &'static str = "purchases";

    fn id_column() -> purchase::Column {
        purchase::Column::Id
    }

    fn created_at_column() -> purchase::Column {
        purchase::Column::CreatedAt
    }

    fn search_columns() -> Vec<purchase::Column> {
        vec![
            purchase::Column::SupplierName,
            purchase::Column::SupplierInvoice,
        ]
    }

    fn id_of(model: &purchase::Model) -> Uuid {
        model.id
    }

    fn ensure_deletable(model: &purchase::Model) -> Result<(), RepositoryError> {
        if model.status != PurchaseStatus::Cancelled {
            return Err(RepositoryError::conflict(
                "PURCHASE_NOT_CANCELLED",
                "Only cancelled purchases can be deleted",
            ));
        }
        Ok(())
    }

    fn delete_guard() -> Condition {
        Condition::all().add(purchase::Column::Status.eq(PurchaseStatus::Cancelled))
    }
}

#[async_trait]
impl Updatable for Purchase {
    type Update = PurchaseUpdate;

    async fn update_record(
        db: &DatabaseConnection,
        current: purchase::Model,
        input: PurchaseUpdate,
    ) -> Result<purchase::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        check_supplier(
            &mut errors,
            &input.supplier_name,
            input.supplier_invoice.as_deref(),
        );
        errors.into_result()?;

        let mut active = current.into_active_model();
        active.supplier_name = Set(input.supplier_name.trim().to_string());
        active.supplier_invoice = Set(normalize_optional(input.supplier_invoice));
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }
}

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    purchase_id: Uuid,
) -> Result<Vec<purchase_item::Model>, RepositoryError> {
    Ok(PurchaseItem::find()
        .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(purchase_item::Column::CreatedAt)
        .order_by_asc(purchase_item::Column::Id)
        .all(conn)
        .await?)
}

/// Repository for receiving and cancelling purchases
pub struct PurchaseRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PurchaseRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn detail(&self, purchase_id: Uuid) -> Result<PurchaseDetail, RepositoryError> {
        let purchase = Purchase::get_by_id(self.db, purchase_id).await?;
        let items = items_of(self.db, purchase_id).await?;
        Ok(PurchaseDetail { purchase, items })
    }

    pub async fn receive(&self, input: PurchaseInput) -> Result<PurchaseDetail, RepositoryError> {
        let mut errors = FieldErrors::new();
        check_supplier(
            &mut errors,
            &input.supplier_name,
            input.supplier_invoice.as_deref(),
        );
        errors.check(!input.items.is_empty(), "items", "must not be empty");
        for (index, item) in input.items.iter().enumerate() {
            errors.check(
                item.quantity >= 1,
                &format!("items[{index}].quantity"),
                "must be at least 1",
            );
            errors.non_negative(&format!("items[{index}].unit_cost_cents"), item.unit_cost_cents);
        }
        errors.into_result()?;

        let known: HashSet<Uuid> = Product::find()
            .select_only()
            .column(product::Column::Id)
            .filter(product::Column::Id.is_in(input.items.iter().map(|item| item.product_id)))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await?
            .into_iter()
            .collect();

        let mut errors = FieldErrors::new();
        let mut total_cents: i64 = 0;
        let mut lines = Vec::with_capacity(input.items.len());
        for (index, item) in input.items.iter().enumerate() {
            if !known.contains(&item.product_id) {
                errors.add(
                    &format!("items[{index}].product_id"),
                    format!("product {} does not exist", item.product_id),
                );
                continue;
            }
            let subtotal_cents = item
                .unit_cost_cents
                .checked_mul(i64::from(item.quantity))
                .and_then(|subtotal| total_cents.checked_add(subtotal).map(|total| (subtotal, total)));
            let Some((subtotal_cents, running_total)) = subtotal_cents else {
                return Err(RepositoryError::invalid(
                    "VALIDATION_FAILED",
                    "Purchase total is too large",
                ));
            };
            total_cents = running_total;
            lines.push((item, subtotal_cents));
        }
        errors.into_result()?;

        let purchase_id = Uuid::new_v4();
        let now = now();
        let txn = self.db.begin().await?;

        let purchase = purchase::ActiveModel {
            id: Set(purchase_id),
            supplier_name: Set(input.supplier_name.trim().to_string()),
            supplier_invoice: Set(normalize_optional(input.supplier_invoice.clone())),
            status: Set(PurchaseStatus::Received),
            total_cents: Set(total_cents),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (item, subtotal_cents) in lines {
            put_stock(&txn, item.product_id, item.quantity, Some(item.unit_cost_cents)).await?;
            let line = purchase_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(purchase_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_cost_cents: Set(item.unit_cost_cents),
                subtotal_cents: Set(subtotal_cents),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(line);
        }

        txn.commit().await?;

        counter!("purchases_received_total").increment(1);
        tracing::info!(%purchase_id, total_cents, items = items.len(), "Received purchase");
        Ok(PurchaseDetail { purchase, items })
    }

    /// Cancels a received purchase and removes its stock again.
    pub async fn cancel(&self, purchase_id: Uuid) -> Result<PurchaseDetail, RepositoryError> {
        let txn = self.db.begin().await?;

        let result = Purchase::update_many()
            .col_expr(
                purchase::Column::Status,
                Expr::value(PurchaseStatus::Cancelled),
            )
            .col_expr(purchase::Column::UpdatedAt, Expr::value(now()))
            .filter(purchase::Column::Id.eq(purchase_id))
            .filter(purchase::Column::Status.eq(PurchaseStatus::Received))
            .exec(&txn)
            .await?;

        let purchase = Purchase::find_by_id(purchase_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Purchase::NAME, purchase_id))?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::conflict(
                "PURCHASE_ALREADY_CANCELLED",
                format!("Purchase {purchase_id} is already cancelled"),
            ));
        }

        let items = items_of(&txn, purchase_id).await?;
        for item in &items {
            take_stock(&txn, item.product_id, item.quantity).await?;
        }

        txn.commit().await?;

        tracing::info!(%purchase_id, "Cancelled purchase");
        Ok(PurchaseDetail { purchase, items })
    }
}
