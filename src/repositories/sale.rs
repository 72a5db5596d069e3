//! # Sale Repository
//!
//! Checkout and void run inside one database transaction each: stock
//! movements, the sale rows and the register balance either all land or none
//! do.

use std::collections::HashMap;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::billing::payment::{Tender, quote};
use crate::error::RepositoryError;
use crate::models::product::{self, Entity as Product};
use crate::models::sale::{self, Entity as Sale, SaleStatus};
use crate::models::sale_item::{self, Entity as SaleItem};
use crate::repositories::cash_register::{credit_open_register, debit_register};
use crate::repositories::crud::{Resource, Updatable};
use crate::repositories::currency::CurrencyRepository;
use crate::repositories::invoice::void_for_sale;
use crate::repositories::now;
use crate::repositories::product::{put_stock, take_stock};
use crate::validation::{FieldErrors, normalize_optional};

/// One line of a checkout
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

/// Body of `POST /api/sales`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub client_id: Option<Uuid>,
    /// Open register credited with the cash taken
    pub cash_register_id: Option<Uuid>,
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub payments: Vec<Tender>,
    pub notes: Option<String>,
}

/// Body of `PUT /api/sales/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaleUpdate {
    pub client_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// A sale with its line items
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleDetail {
    #[schema(value_type = Object)]
    pub sale: sale::Model,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<sale_item::Model>,
}

impl Resource for Sale {
    const NAME: &'static str = "Sale";
    const COLLECTION: &'static str = "sales";

    fn id_column() -> sale::Column {
        sale::Column::Id
    }

    fn created_at_column() -> sale::Column {
        sale::Column::CreatedAt
    }

    fn search_columns() -> Vec<sale::Column> {
        vec![sale::Column::Notes, sale::Column::Status]
    }

    fn id_of(model: &sale::Model) -> Uuid {
        model.id
    }

    fn ensure_deletable(model: &sale::Model) -> Result<(), RepositoryError> {
        if model.status != SaleStatus::Voided {
            return Err(RepositoryError::conflict(
                "SALE_NOT_VOIDED",
                "Only voided sales can be deleted",
            ));
        }
        Ok(())
    }

    fn delete_guard() -> Condition {
        Condition::all().add(sale::Column::Status.eq(SaleStatus::Voided))
    }
}

#[async_trait]
impl Updatable for Sale {
    type Update = SaleUpdate;

    async fn update_record(
        db: &DatabaseConnection,
        current: sale::Model,
        input: SaleUpdate,
    ) -> Result<sale::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.optional_text("notes", input.notes.as_deref(), 500);
        errors.into_result()?;

        let mut active = current.into_active_model();
        active.client_id = Set(input.client_id);
        active.notes = Set(normalize_optional(input.notes));
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }
}

pub(crate) async fn items_of<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> Result<Vec<sale_item::Model>, RepositoryError> {
    Ok(SaleItem::find()
        .filter(sale_item::Column::SaleId.eq(sale_id))
        .order_by_asc(sale_item::Column::CreatedAt)
        .order_by_asc(sale_item::Column::Id)
        .all(conn)
        .await?)
}

/// Repository for checkout and sale lifecycle
pub struct SaleRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SaleRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn detail(&self, sale_id: Uuid) -> Result<SaleDetail, RepositoryError> {
        let sale = Sale::get_by_id(self.db, sale_id).await?;
        let items = items_of(self.db, sale_id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Prices the cart from current product prices, settles the payments and
    /// records the sale.
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
        base_currency: &str,
    ) -> Result<SaleDetail, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.check(!request.items.is_empty(), "items", "must not be empty");
        for (index, item) in request.items.iter().enumerate() {
            errors.check(
                item.quantity >= 1,
                &format!("items[{index}].quantity"),
                "must be at least 1",
            );
        }
        errors.optional_text("notes", request.notes.as_deref(), 500);
        errors.into_result()?;

        let product_ids: Vec<Uuid> = request.items.iter().map(|item| item.product_id).collect();
        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(self.db)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut errors = FieldErrors::new();
        let mut lines = Vec::with_capacity(request.items.len());
        let mut total_cents: i64 = 0;
        for (index, item) in request.items.iter().enumerate() {
            let Some(product) = products.get(&item.product_id) else {
                errors.add(
                    &format!("items[{index}].product_id"),
                    format!("product {} does not exist", item.product_id),
                );
                continue;
            };
            let subtotal_cents = product
                .price_cents
                .checked_mul(i64::from(item.quantity))
                .ok_or_else(|| RepositoryError::invalid("VALIDATION_FAILED", "Sale total is too large"))?;
            total_cents = total_cents
                .checked_add(subtotal_cents)
                .ok_or_else(|| RepositoryError::invalid("VALIDATION_FAILED", "Sale total is too large"))?;
            lines.push((item, product.price_cents, subtotal_cents));
        }
        errors.into_result()?;

        let tenders = CurrencyRepository::new(self.db)
            .to_base_tenders(&request.payments, base_currency)
            .await?;
        let settlement = quote(total_cents, &tenders)?;
        if !settlement.covered {
            return Err(RepositoryError::Invalid {
                code: "INSUFFICIENT_PAYMENT",
                message: format!(
                    "Payments cover {} of {} cents",
                    settlement.tendered_cents, settlement.total_cents
                ),
                details: Some(json!({ "remaining_cents": settlement.remaining_cents })),
            });
        }

        let sale_id = Uuid::new_v4();
        let now = now();
        let txn = self.db.begin().await?;

        for (item, _, _) in &lines {
            take_stock(&txn, item.product_id, item.quantity).await?;
        }

        let sale = sale::ActiveModel {
            id: Set(sale_id),
            client_id: Set(request.client_id),
            cash_register_id: Set(request.cash_register_id),
            status: Set(SaleStatus::Completed),
            total_cents: Set(settlement.total_cents),
            tendered_cents: Set(settlement.tendered_cents),
            cash_cents: Set(settlement.cash_cents),
            change_cents: Set(settlement.change_cents),
            payments: Set(json!(request.payments)),
            notes: Set(normalize_optional(request.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (item, unit_price_cents, subtotal_cents) in lines {
            let line = sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price_cents: Set(unit_price_cents),
                subtotal_cents: Set(subtotal_cents),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(line);
        }

        if let Some(register_id) = request.cash_register_id {
            credit_open_register(
                &txn,
                register_id,
                settlement.cash_cents - settlement.change_cents,
            )
            .await?;
        }

        txn.commit().await?;

        counter!("sales_completed_total").increment(1);
        tracing::info!(
            %sale_id,
            total_cents = sale.total_cents,
            change_cents = sale.change_cents,
            items = items.len(),
            "Completed sale"
        );
        Ok(SaleDetail { sale, items })
    }

    /// Voids a completed sale, restoring stock and the register credit.
    pub async fn void(&self, sale_id: Uuid) -> Result<SaleDetail, RepositoryError> {
        let txn = self.db.begin().await?;

        let result = Sale::update_many()
            .col_expr(sale::Column::Status, Expr::value(SaleStatus::Voided))
            .col_expr(sale::Column::UpdatedAt, Expr::value(now()))
            .filter(sale::Column::Id.eq(sale_id))
            .filter(sale::Column::Status.eq(SaleStatus::Completed))
            .exec(&txn)
            .await?;

        let sale = Sale::find_by_id(sale_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Sale::NAME, sale_id))?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::conflict(
                "SALE_ALREADY_VOIDED",
                format!("Sale {sale_id} is already voided"),
            ));
        }

        let items = items_of(&txn, sale_id).await?;
        for item in &items {
            put_stock(&txn, item.product_id, item.quantity, None).await?;
        }

        if let Some(register_id) = sale.cash_register_id {
            debit_register(&txn, register_id, sale.cash_cents - sale.change_cents).await?;
        }

        let invoices_voided = void_for_sale(&txn, sale_id).await?;

        txn.commit().await?;

        counter!("sales_voided_total").increment(1);
        tracing::info!(%sale_id, invoices_voided, "Voided sale");
        Ok(SaleDetail { sale, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::payment::TenderMethod;
    use crate::models::cash_register::Entity as CashRegister;
    use crate::repositories::cash_register::{
        CashRegisterInput, CashRegisterRepository, OpenRegisterRequest,
    };
    use crate::repositories::crud::Creatable;
    use crate::repositories::test_support::{insert_product, test_db};

    fn cash(amount_cents: i64) -> Tender {
        Tender {
            method: TenderMethod::Cash,
            amount_cents,
            currency_code: None,
        }
    }

    fn cart(items: &[(Uuid, i32)], payments: Vec<Tender>) -> CheckoutRequest {
        CheckoutRequest {
            client_id: None,
            cash_register_id: None,
            items: items
                .iter()
                .map(|&(product_id, quantity)| CheckoutItem {
                    product_id,
                    quantity,
                })
                .collect(),
            payments,
            notes: None,
        }
    }

    #[tokio::test]
    async fn checkout_prices_decrements_and_gives_change() {
        let db = test_db().await;
        let hammer = insert_product(&db, "H", 4_500, 10).await;
        let nails = insert_product(&db, "N", 150, 100).await;

        let detail = SaleRepository::new(&db)
            .checkout(cart(&[(hammer.id, 2), (nails.id, 10)], vec![cash(20_000)]), "BOB")
            .await
            .unwrap();

        assert_eq!(detail.sale.total_cents, 10_500);
        assert_eq!(detail.sale.change_cents, 9_500);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(Product::get_by_id(&db, hammer.id).await.unwrap().stock, 8);
        assert_eq!(Product::get_by_id(&db, nails.id).await.unwrap().stock, 90);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let plenty = insert_product(&db, "A", 100, 50).await;
        let scarce = insert_product(&db, "B", 100, 1).await;

        let err = SaleRepository::new(&db)
            .checkout(cart(&[(plenty.id, 5), (scarce.id, 2)], vec![cash(700)]), "BOB")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Conflict {
                code: "INSUFFICIENT_STOCK",
                ..
            }
        ));

        assert_eq!(Product::get_by_id(&db, plenty.id).await.unwrap().stock, 50);
        assert_eq!(Sale::find().all(&db).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn underpayment_is_rejected() {
        let db = test_db().await;
        let product = insert_product(&db, "A", 1_000, 5).await;

        let err = SaleRepository::new(&db)
            .checkout(cart(&[(product.id, 1)], vec![cash(999)]), "BOB")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid {
                code: "INSUFFICIENT_PAYMENT",
                ..
            }
        ));
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn empty_cart_and_unknown_product_are_validation_errors() {
        let db = test_db().await;
        let repo = SaleRepository::new(&db);

        assert!(matches!(
            repo.checkout(cart(&[], vec![]), "BOB").await,
            Err(RepositoryError::Invalid {
                code: "VALIDATION_FAILED",
                ..
            })
        ));
        assert!(matches!(
            repo.checkout(cart(&[(Uuid::new_v4(), 1)], vec![]), "BOB").await,
            Err(RepositoryError::Invalid {
                code: "VALIDATION_FAILED",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn register_is_credited_and_void_reverses() {
        let db = test_db().await;
        let product = insert_product(&db, "A", 2_500, 4).await;
        let register = CashRegister::create_record(
            &db,
            CashRegisterInput {
                name: "Caja".to_string(),
            },
        )
        .await
        .unwrap();
        CashRegisterRepository::new(&db)
            .open(register.id, OpenRegisterRequest { opening_balance_cents: 1_000 })
            .await
            .unwrap();

        let mut request = cart(&[(product.id, 1)], vec![cash(3_000)]);
        request.cash_register_id = Some(register.id);
        let repo = SaleRepository::new(&db);
        let detail = repo.checkout(request, "BOB").await.unwrap();

        let credited = CashRegister::get_by_id(&db, register.id).await.unwrap();
        assert_eq!(credited.expected_balance_cents, 3_500);

        let voided = repo.void(detail.sale.id).await.unwrap();
        assert_eq!(voided.sale.status, SaleStatus::Voided);
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 4);
        let reversed = CashRegister::get_by_id(&db, register.id).await.unwrap();
        assert_eq!(reversed.expected_balance_cents, 1_000);

        assert!(matches!(
            repo.void(detail.sale.id).await,
            Err(RepositoryError::Conflict {
                code: "SALE_ALREADY_VOIDED",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn closed_register_blocks_checkout() {
        let db = test_db().await;
        let product = insert_product(&db, "A", 100, 4).await;
        let register = CashRegister::create_record(
            &db,
            CashRegisterInput {
                name: "Caja".to_string(),
            },
        )
        .await
        .unwrap();

        let mut request = cart(&[(product.id, 1)], vec![cash(100)]);
        request.cash_register_id = Some(register.id);
        assert!(matches!(
            SaleRepository::new(&db).checkout(request, "BOB").await,
            Err(RepositoryError::Conflict {
                code: "REGISTER_CLOSED",
                ..
            })
        ));
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn only_voided_sales_can_be_deleted() {
        let db = test_db().await;
        let product = insert_product(&db, "A", 100, 4).await;
        let repo = SaleRepository::new(&db);
        let detail = repo
            .checkout(cart(&[(product.id, 1)], vec![cash(100)]), "BOB")
            .await
            .unwrap();

        assert!(matches!(
            Sale::remove_by_id(&db, detail.sale.id).await,
            Err(RepositoryError::Conflict { .. })
        ));

        repo.void(detail.sale.id).await.unwrap();
        Sale::remove_by_id(&db, detail.sale.id).await.unwrap();
        assert!(items_of(&db, detail.sale.id).await.unwrap().is_empty());
    }
}
