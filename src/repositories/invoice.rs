//! # Invoice Repository
//!
//! Issues one invoice per completed sale. Numbers come from a monotonic
//! `sequence` column guarded by a unique index, so two concurrent issuers
//! cannot share a number; the loser gets a 409.

use std::collections::HashMap;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::billing::invoice_layout::{InvoiceDocument, LayoutLine, render};
use crate::config::AppConfig;
use crate::error::RepositoryError;
use crate::models::client::Entity as Client;
use crate::models::invoice::{self, Entity as Invoice, InvoiceStatus};
use crate::models::product::{self, Entity as Product};
use crate::models::sale::{Entity as Sale, SaleStatus};
use crate::repositories::crud::{Resource, Updatable};
use crate::repositories::now;
use crate::repositories::sale::items_of;
use crate::validation::{FieldErrors, normalize_optional};

/// Printed when the sale has no client and none was given.
pub const ANONYMOUS_CLIENT_NAME: &str = "SIN NOMBRE";
pub const ANONYMOUS_CLIENT_DOCUMENT: &str = "0";

/// Voids the issued invoice of a sale, if any. Runs on the caller's
/// transaction so the sale and its invoice change state together.
pub(crate) async fn void_for_sale<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> Result<u64, RepositoryError> {
    let result = Invoice::update_many()
        .col_expr(invoice::Column::Status, Expr::value(InvoiceStatus::Void))
        .col_expr(invoice::Column::UpdatedAt, Expr::value(now()))
        .filter(invoice::Column::SaleId.eq(sale_id))
        .filter(invoice::Column::Status.eq(InvoiceStatus::Issued))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Body of `POST /api/invoices`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueInvoiceRequest {
    pub sale_id: Uuid,
    pub client_name: Option<String>,
    pub client_document: Option<String>,
}

/// Body of `PUT /api/invoices/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InvoiceUpdate {
    pub client_name: String,
    pub client_document: String,
}

pub fn invoice_number(sequence: i64) -> String {
    format!("F-{sequence:06}")
}

impl Resource for Invoice {
    const NAME: &'static str = "Invoice";
    const COLLECTION: &'static str = "invoices";

    fn id_column() -> invoice::Column {
        invoice::Column::Id
    }

    fn created_at_column() -> invoice::Column {
        invoice::Column::CreatedAt
    }

    fn search_columns() -> Vec<invoice::Column> {
        vec![
            invoice::Column::Number,
            invoice::Column::ClientName,
            invoice::Column::ClientDocument,
        ]
    }

    fn id_of(model: &invoice::Model) -> Uuid {
        model.id
    }

    fn ensure_deletable(model: &invoice::Model) -> Result<(), RepositoryError> {
        if model.status != InvoiceStatus::Void {
            return Err(RepositoryError::conflict(
                "INVOICE_NOT_VOID",
                "Only void invoices can be deleted",
            ));
        }
        Ok(())
    }

    fn delete_guard() -> Condition {
        Condition::all().add(invoice::Column::Status.eq(InvoiceStatus::Void))
    }
}

#[async_trait]
impl Updatable for Invoice {
    type Update = InvoiceUpdate;

    async fn update_record(
        db: &DatabaseConnection,
        current: invoice::Model,
        input: InvoiceUpdate,
    ) -> Result<invoice::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("client_name", &input.client_name, 120);
        errors.required_text("client_document", &input.client_document, 30);
        errors.into_result()?;

        let result = Invoice::update_many()
            .col_expr(
                invoice::Column::ClientName,
                Expr::value(input.client_name.trim().to_string()),
            )
            .col_expr(
                invoice::Column::ClientDocument,
                Expr::value(input.client_document.trim().to_string()),
            )
            .col_expr(invoice::Column::UpdatedAt, Expr::value(now()))
            .filter(invoice::Column::Id.eq(current.id))
            .filter(invoice::Column::Status.eq(InvoiceStatus::Issued))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::conflict(
                "INVOICE_VOID",
                format!("Invoice {} is void", current.number),
            ));
        }

        Invoice::get_by_id(db, current.id).await
    }
}

/// Repository for invoice issuing and printing
pub struct InvoiceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> InvoiceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn issue(
        &self,
        request: IssueInvoiceRequest,
    ) -> Result<invoice::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.optional_text("client_name", request.client_name.as_deref(), 120);
        errors.optional_text("client_document", request.client_document.as_deref(), 30);
        errors.into_result()?;

        let txn = self.db.begin().await?;

        let sale = Sale::find_by_id(request.sale_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Sale::NAME, request.sale_id))?;
        if sale.status != SaleStatus::Completed {
            return Err(RepositoryError::conflict(
                "SALE_NOT_COMPLETED",
                format!("Sale {} is not completed", sale.id),
            ));
        }

        let existing = Invoice::find()
            .filter(invoice::Column::SaleId.eq(sale.id))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Err(RepositoryError::conflict(
                "INVOICE_ALREADY_ISSUED",
                format!("Sale {} already has invoice {}", sale.id, existing.number),
            ));
        }

        let client = match sale.client_id {
            Some(client_id) => Client::find_by_id(client_id).one(&txn).await?,
            None => None,
        };
        let client_name = normalize_optional(request.client_name)
            .or_else(|| client.as_ref().map(|client| client.name.clone()))
            .unwrap_or_else(|| ANONYMOUS_CLIENT_NAME.to_string());
        let client_document = normalize_optional(request.client_document)
            .or_else(|| client.as_ref().map(|client| client.document_number.clone()))
            .unwrap_or_else(|| ANONYMOUS_CLIENT_DOCUMENT.to_string());

        let last_sequence: Option<i64> = Invoice::find()
            .select_only()
            .column_as(invoice::Column::Sequence.max(), "last_sequence")
            .into_tuple::<Option<i64>>()
            .one(&txn)
            .await?
            .flatten();
        let sequence = last_sequence.unwrap_or(0) + 1;

        let now = now();
        let invoice = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale.id),
            sequence: Set(sequence),
            number: Set(invoice_number(sequence)),
            client_name: Set(client_name),
            client_document: Set(client_document),
            total_cents: Set(sale.total_cents),
            status: Set(InvoiceStatus::Issued),
            issued_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        counter!("invoices_issued_total").increment(1);
        tracing::info!(invoice_id = %invoice.id, number = %invoice.number, sale_id = %sale.id, "Issued invoice");
        Ok(invoice)
    }

    pub async fn void(&self, invoice_id: Uuid) -> Result<invoice::Model, RepositoryError> {
        let result = Invoice::update_many()
            .col_expr(invoice::Column::Status, Expr::value(InvoiceStatus::Void))
            .col_expr(invoice::Column::UpdatedAt, Expr::value(now()))
            .filter(invoice::Column::Id.eq(invoice_id))
            .filter(invoice::Column::Status.eq(InvoiceStatus::Issued))
            .exec(self.db)
            .await?;

        let invoice = Invoice::get_by_id(self.db, invoice_id).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::conflict(
                "INVOICE_ALREADY_VOID",
                format!("Invoice {} is already void", invoice.number),
            ));
        }

        tracing::info!(%invoice_id, number = %invoice.number, "Voided invoice");
        Ok(invoice)
    }

    /// Collects everything the printed layout needs.
    pub async fn document(
        &self,
        invoice_id: Uuid,
        config: &AppConfig,
    ) -> Result<InvoiceDocument, RepositoryError> {
        let invoice = Invoice::get_by_id(self.db, invoice_id).await?;
        let items = items_of(self.db, invoice.sale_id).await?;

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let names: HashMap<Uuid, String> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(self.db)
            .await?
            .into_iter()
            .map(|product| (product.id, product.name))
            .collect();

        let lines = items
            .into_iter()
            .map(|item| LayoutLine {
                quantity: item.quantity,
                description: names
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_else(|| item.product_id.to_string()),
                subtotal_cents: item.subtotal_cents,
            })
            .collect();

        Ok(InvoiceDocument {
            business_name: config.business_name.clone(),
            business_tax_id: config.business_tax_id.clone(),
            number: invoice.number,
            issued_at: invoice.issued_at,
            client_name: invoice.client_name,
            client_document: invoice.client_document,
            lines,
            total_cents: invoice.total_cents,
            currency_code: config.base_currency.clone(),
            voided: invoice.status == InvoiceStatus::Void,
        })
    }

    pub async fn print(
        &self,
        invoice_id: Uuid,
        config: &AppConfig,
    ) -> Result<String, RepositoryError> {
        let document = self.document(invoice_id, config).await?;
        Ok(render(&document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::invoice_layout::WIDTH;
    use crate::billing::payment::{Tender, TenderMethod};
    use crate::repositories::sale::{CheckoutItem, CheckoutRequest, SaleRepository};
    use crate::repositories::test_support::{insert_client, insert_product, test_db};

    async fn completed_sale(db: &DatabaseConnection, client_id: Option<Uuid>) -> Uuid {
        let product = insert_product(db, &format!("P-{}", Uuid::new_v4().simple()), 2_550, 10).await;
        SaleRepository::new(db)
            .checkout(
                CheckoutRequest {
                    client_id,
                    cash_register_id: None,
                    items: vec![CheckoutItem {
                        product_id: product.id,
                        quantity: 2,
                    }],
                    payments: vec![Tender {
                        method: TenderMethod::Cash,
                        amount_cents: 5_100,
                        currency_code: None,
                    }],
                    notes: None,
                },
                "BOB",
            )
            .await
            .unwrap()
            .sale
            .id
    }

    fn issue_for(sale_id: Uuid) -> IssueInvoiceRequest {
        IssueInvoiceRequest {
            sale_id,
            client_name: None,
            client_document: None,
        }
    }

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(invoice_number(1), "F-000001");
        assert_eq!(invoice_number(123_456), "F-123456");
        assert_eq!(invoice_number(1_234_567), "F-1234567");
    }

    #[tokio::test]
    async fn issue_numbers_sequentially_and_defaults_client() {
        let db = test_db().await;
        let repo = InvoiceRepository::new(&db);
        let client = insert_client(&db, "4455-LP").await;

        let first = repo
            .issue(issue_for(completed_sale(&db, None).await))
            .await
            .unwrap();
        assert_eq!(first.number, "F-000001");
        assert_eq!(first.client_name, ANONYMOUS_CLIENT_NAME);
        assert_eq!(first.client_document, ANONYMOUS_CLIENT_DOCUMENT);
        assert_eq!(first.total_cents, 5_100);

        let second = repo
            .issue(issue_for(completed_sale(&db, Some(client.id)).await))
            .await
            .unwrap();
        assert_eq!(second.number, "F-000002");
        assert_eq!(second.client_name, client.name);
        assert_eq!(second.client_document, "4455-LP");

        assert!(matches!(
            repo.issue(issue_for(second.sale_id)).await,
            Err(RepositoryError::Conflict {
                code: "INVOICE_ALREADY_ISSUED",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn voided_sale_cannot_be_invoiced() {
        let db = test_db().await;
        let sale_id = completed_sale(&db, None).await;
        SaleRepository::new(&db).void(sale_id).await.unwrap();

        assert!(matches!(
            InvoiceRepository::new(&db).issue(issue_for(sale_id)).await,
            Err(RepositoryError::Conflict {
                code: "SALE_NOT_COMPLETED",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn voiding_the_sale_voids_its_invoice() {
        let db = test_db().await;
        let repo = InvoiceRepository::new(&db);
        let sale_id = completed_sale(&db, None).await;
        let invoice = repo.issue(issue_for(sale_id)).await.unwrap();

        SaleRepository::new(&db).void(sale_id).await.unwrap();

        let stored = Invoice::get_by_id(&db, invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Void);
        assert!(matches!(
            repo.void(invoice.id).await,
            Err(RepositoryError::Conflict {
                code: "INVOICE_ALREADY_VOID",
                ..
            })
        ));

        let text = repo.print(invoice.id, &AppConfig::default()).await.unwrap();
        assert!(text.contains("*** ANULADA ***"));

        Invoice::remove_by_id(&db, invoice.id).await.unwrap();
        Sale::remove_by_id(&db, sale_id).await.unwrap();
    }

    #[tokio::test]
    async fn void_blocks_updates_and_allows_delete() {
        let db = test_db().await;
        let repo = InvoiceRepository::new(&db);
        let invoice = repo
            .issue(issue_for(completed_sale(&db, None).await))
            .await
            .unwrap();

        let renamed = Invoice::update_record(
            &db,
            invoice.clone(),
            InvoiceUpdate {
                client_name: "Ana Rojas".to_string(),
                client_document: "778899".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.client_name, "Ana Rojas");
        assert!(Invoice::remove_by_id(&db, invoice.id).await.is_err());

        let voided = repo.void(invoice.id).await.unwrap();
        assert_eq!(voided.status, InvoiceStatus::Void);
        assert!(repo.void(invoice.id).await.is_err());
        assert!(
            Invoice::update_record(
                &db,
                voided,
                InvoiceUpdate {
                    client_name: "X".to_string(),
                    client_document: "1".to_string(),
                },
            )
            .await
            .is_err()
        );

        Invoice::remove_by_id(&db, invoice.id).await.unwrap();
    }

    #[tokio::test]
    async fn print_renders_items_and_words() {
        let db = test_db().await;
        let repo = InvoiceRepository::new(&db);
        let invoice = repo
            .issue(issue_for(completed_sale(&db, None).await))
            .await
            .unwrap();
        let config = AppConfig {
            business_name: "FERRETERIA EL SOL".to_string(),
            business_tax_id: "1020304050".to_string(),
            base_currency: "BOB".to_string(),
            ..Default::default()
        };

        let text = repo.print(invoice.id, &config).await.unwrap();
        assert!(text.contains("FERRETERIA EL SOL"));
        assert!(text.contains("FACTURA F-000001"));
        assert!(text.contains("51.00"));
        assert!(text.contains("CINCUENTA Y UNO 00/100 BOLIVIANOS"));
        assert!(text.lines().all(|line| line.chars().count() <= WIDTH));
    }
}
