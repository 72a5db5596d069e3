//! # Rental Repository
//!
//! A rental takes stock out when opened and puts it back when returned or
//! cancelled. The charge is computed at return time from whole started days.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::product::Entity as Product;
use crate::models::rental::{self, Entity as Rental, RentalStatus};
use crate::repositories::crud::{Resource, Updatable};
use crate::repositories::now;
use crate::repositories::product::{put_stock, take_stock};
use crate::validation::FieldErrors;

const SECONDS_PER_DAY: i64 = 86_400;

fn default_quantity() -> i32 {
    1
}

/// Body of `POST /api/rentals`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RentalInput {
    pub client_id: Uuid,
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Defaults to now
    pub start_at: Option<DateTime<FixedOffset>>,
    pub due_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub deposit_cents: i64,
}

/// Body of `PUT /api/rentals/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RentalUpdate {
    pub due_at: DateTime<FixedOffset>,
    pub deposit_cents: i64,
}

/// Body of `POST /api/rentals/{id}/return`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReturnRequest {
    /// Defaults to now
    pub returned_at: Option<DateTime<FixedOffset>>,
}

/// Days billed for a rental period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RentalCharge {
    /// Started days between start and return, at least one
    pub days: i64,
    /// Started days past the due date, included in `days`
    pub late_days: i64,
    pub total_cents: i64,
}

/// Outcome of a return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RentalSettlement {
    #[schema(value_type = Object)]
    pub rental: rental::Model,
    pub days: i64,
    pub late_days: i64,
    pub total_cents: i64,
    pub deposit_cents: i64,
    /// `total_cents - deposit_cents`; negative means money back to the client
    pub balance_cents: i64,
}

fn started_days(seconds: i64) -> i64 {
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Computes the charge for returning at `returned_at`.
pub fn rental_charge(
    start_at: DateTime<FixedOffset>,
    due_at: DateTime<FixedOffset>,
    returned_at: DateTime<FixedOffset>,
    daily_rate_cents: i64,
    quantity: i32,
) -> Result<RentalCharge, RepositoryError> {
    if returned_at < start_at {
        return Err(RepositoryError::validation(
            "Return precedes rental start",
            json!({ "returned_at": "must not be before start_at" }),
        ));
    }

    let days = started_days((returned_at - start_at).num_seconds()).max(1);
    let late_days = started_days((returned_at - due_at).num_seconds());
    let total_cents = days
        .checked_mul(daily_rate_cents)
        .and_then(|cents| cents.checked_mul(i64::from(quantity)))
        .ok_or_else(|| RepositoryError::invalid("VALIDATION_FAILED", "Rental charge is too large"))?;

    Ok(RentalCharge {
        days,
        late_days,
        total_cents,
    })
}

impl Resource for Rental {
    const NAME: &'static str = "Rental";
    const COLLECTION: &'static str = "rentals";

    fn id_column() -> rental::Column {
        rental::Column::Id
    }

    fn created_at_column() -> rental::Column {
        rental::Column::CreatedAt
    }

    fn search_columns() -> Vec<rental::Column> {
        vec![rental::Column::Status]
    }

    fn id_of(model: &rental::Model) -> Uuid {
        model.id
    }

    fn ensure_deletable(model: &rental::Model) -> Result<(), RepositoryError> {
        if model.status == RentalStatus::Active {
            return Err(RepositoryError::conflict(
                "RENTAL_ACTIVE",
                "Return or cancel the rental before deleting it",
            ));
        }
        Ok(())
    }

    fn delete_guard() -> Condition {
        Condition::all().add(rental::Column::Status.ne(RentalStatus::Active))
    }
}

fn not_active(rental_id: Uuid) -> RepositoryError {
    RepositoryError::conflict(
        "RENTAL_NOT_ACTIVE",
        format!("Rental {rental_id} is no longer active"),
    )
}

#[async_trait]
impl Updatable for Rental {
    type Update = RentalUpdate;

    async fn update_record(
        db: &DatabaseConnection,
        current: rental::Model,
        input: RentalUpdate,
    ) -> Result<rental::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.non_negative("deposit_cents", input.deposit_cents);
        errors.check(
            input.due_at > current.start_at,
            "due_at",
            "must be after start_at",
        );
        errors.into_result()?;

        let rental_id = current.id;
        let result = Rental::update_many()
            .col_expr(rental::Column::DueAt, Expr::value(input.due_at))
            .col_expr(rental::Column::DepositCents, Expr::value(input.deposit_cents))
            .col_expr(rental::Column::UpdatedAt, Expr::value(now()))
            .filter(rental::Column::Id.eq(rental_id))
            .filter(rental::Column::Status.eq(RentalStatus::Active))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_active(rental_id));
        }

        Rental::get_by_id(db, rental_id).await
    }
}

/// Repository for the rental lifecycle
pub struct RentalRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> RentalRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn open(&self, input: RentalInput) -> Result<rental::Model, RepositoryError> {
        let start_at = input.start_at.unwrap_or_else(now);

        let mut errors = FieldErrors::new();
        errors.positive("quantity", i64::from(input.quantity));
        errors.non_negative("deposit_cents", input.deposit_cents);
        errors.check(input.due_at > start_at, "due_at", "must be after start_at");
        errors.into_result()?;

        let product = Product::find_by_id(input.product_id)
            .one(self.db)
            .await?
            .ok_or_else(|| {
                RepositoryError::validation(
                    "Unknown product",
                    json!({ "product_id": "does not exist" }),
                )
            })?;
        if !product.rentable {
            return Err(RepositoryError::invalid(
                "PRODUCT_NOT_RENTABLE",
                format!("Product {} is not available for rent", product.code),
            ));
        }

        let now = now();
        let txn = self.db.begin().await?;
        take_stock(&txn, product.id, input.quantity).await?;
        let rental = rental::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(input.client_id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            daily_rate_cents: Set(product.rental_daily_rate_cents),
            deposit_cents: Set(input.deposit_cents),
            start_at: Set(start_at),
            due_at: Set(input.due_at),
            returned_at: Set(None),
            total_cents: Set(None),
            late_days: Set(None),
            status: Set(RentalStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        counter!("rentals_opened_total").increment(1);
        tracing::info!(rental_id = %rental.id, product_id = %product.id, quantity = rental.quantity, "Opened rental");
        Ok(rental)
    }

    /// Closes an active rental, billing every started day.
    pub async fn return_rental(
        &self,
        rental_id: Uuid,
        request: ReturnRequest,
    ) -> Result<RentalSettlement, RepositoryError> {
        let current = Rental::get_by_id(self.db, rental_id).await?;
        if current.status != RentalStatus::Active {
            return Err(not_active(rental_id));
        }

        let returned_at = request.returned_at.unwrap_or_else(now);
        let charge = rental_charge(
            current.start_at,
            current.due_at,
            returned_at,
            current.daily_rate_cents,
            current.quantity,
        )?;
        let late_days = i32::try_from(charge.late_days)
            .map_err(|_| RepositoryError::invalid("VALIDATION_FAILED", "Rental is too late"))?;

        let txn = self.db.begin().await?;
        let result = Rental::update_many()
            .col_expr(rental::Column::Status, Expr::value(RentalStatus::Returned))
            .col_expr(rental::Column::ReturnedAt, Expr::value(Some(returned_at)))
            .col_expr(rental::Column::TotalCents, Expr::value(Some(charge.total_cents)))
            .col_expr(rental::Column::LateDays, Expr::value(Some(late_days)))
            .col_expr(rental::Column::UpdatedAt, Expr::value(now()))
            .filter(rental::Column::Id.eq(rental_id))
            .filter(rental::Column::Status.eq(RentalStatus::Active))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_active(rental_id));
        }
        put_stock(&txn, current.product_id, current.quantity, None).await?;
        let rental = Rental::find_by_id(rental_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Rental::NAME, rental_id))?;
        txn.commit().await?;

        counter!("rentals_returned_total").increment(1);
        tracing::info!(
            %rental_id,
            days = charge.days,
            late_days = charge.late_days,
            total_cents = charge.total_cents,
            "Returned rental"
        );

        Ok(RentalSettlement {
            deposit_cents: rental.deposit_cents,
            balance_cents: charge.total_cents - rental.deposit_cents,
            days: charge.days,
            late_days: charge.late_days,
            total_cents: charge.total_cents,
            rental,
        })
    }

    /// Cancels an active rental without charge and restores stock.
    pub async fn cancel(&self, rental_id: Uuid) -> Result<rental::Model, RepositoryError> {
        let current = Rental::get_by_id(self.db, rental_id).await?;

        let txn = self.db.begin().await?;
        let result = Rental::update_many()
            .col_expr(rental::Column::Status, Expr::value(RentalStatus::Cancelled))
            .col_expr(rental::Column::UpdatedAt, Expr::value(now()))
            .filter(rental::Column::Id.eq(rental_id))
            .filter(rental::Column::Status.eq(RentalStatus::Active))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_active(rental_id));
        }
        put_stock(&txn, current.product_id, current.quantity, None).await?;
        let rental = Rental::find_by_id(rental_id)
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Rental::NAME, rental_id))?;
        txn.commit().await?;

        tracing::info!(%rental_id, "Cancelled rental");
        Ok(rental)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{insert_client, insert_product, test_db};
    use chrono::Duration;
    use sea_orm::IntoActiveModel;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn charge_bills_started_days_with_minimum_one() {
        let start = at("2025-01-01T08:00:00Z");
        let due = start + Duration::days(3);

        let same_day = rental_charge(start, due, start + Duration::hours(2), 1_000, 1).unwrap();
        assert_eq!(same_day.days, 1);
        assert_eq!(same_day.late_days, 0);
        assert_eq!(same_day.total_cents, 1_000);

        let instant = rental_charge(start, due, start, 1_000, 1).unwrap();
        assert_eq!(instant.days, 1);

        let exact = rental_charge(start, due, start + Duration::days(2), 1_000, 2).unwrap();
        assert_eq!(exact.days, 2);
        assert_eq!(exact.total_cents, 4_000);

        let partial = rental_charge(start, due, start + Duration::hours(49), 1_000, 1).unwrap();
        assert_eq!(partial.days, 3);
    }

    #[test]
    fn charge_counts_late_days() {
        let start = at("2025-01-01T08:00:00Z");
        let due = start + Duration::days(3);

        let late = rental_charge(start, due, due + Duration::hours(25), 500, 1).unwrap();
        assert_eq!(late.late_days, 2);
        assert_eq!(late.days, 5);
        assert_eq!(late.total_cents, 2_500);

        assert!(rental_charge(start, due, start - Duration::seconds(1), 500, 1).is_err());
    }

    #[tokio::test]
    async fn open_return_cycle_moves_stock() {
        let db = test_db().await;
        let client = insert_client(&db, "1-LP").await;
        let product = insert_product(&db, "DRILL", 0, 2).await;
        let repo = RentalRepository::new(&db);
        let start = at("2025-01-01T08:00:00Z");

        let rental = repo
            .open(RentalInput {
                client_id: client.id,
                product_id: product.id,
                quantity: 2,
                start_at: Some(start),
                due_at: start + Duration::days(1),
                deposit_cents: 5_000,
            })
            .await
            .unwrap();
        assert_eq!(rental.daily_rate_cents, 1_000);
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 0);

        let settlement = repo
            .return_rental(
                rental.id,
                ReturnRequest {
                    returned_at: Some(start + Duration::hours(30)),
                },
            )
            .await
            .unwrap();
        assert_eq!(settlement.days, 2);
        assert_eq!(settlement.late_days, 1);
        assert_eq!(settlement.total_cents, 4_000);
        assert_eq!(settlement.balance_cents, -1_000);
        assert_eq!(settlement.rental.status, RentalStatus::Returned);
        assert_eq!(settlement.rental.late_days, Some(1));
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 2);

        assert!(matches!(
            repo.return_rental(rental.id, ReturnRequest::default()).await,
            Err(RepositoryError::Conflict {
                code: "RENTAL_NOT_ACTIVE",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn open_requires_stock_and_rentable_product() {
        let db = test_db().await;
        let client = insert_client(&db, "1-LP").await;
        let product = insert_product(&db, "DRILL", 0, 1).await;
        let repo = RentalRepository::new(&db);
        let due = now() + Duration::days(1);

        let err = repo
            .open(RentalInput {
                client_id: client.id,
                product_id: product.id,
                quantity: 2,
                start_at: None,
                due_at: due,
                deposit_cents: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Conflict {
                code: "INSUFFICIENT_STOCK",
                ..
            }
        ));

        let mut active = product.into_active_model();
        active.rentable = Set(false);
        let product = active.update(&db).await.unwrap();
        let err = repo
            .open(RentalInput {
                client_id: client.id,
                product_id: product.id,
                quantity: 1,
                start_at: None,
                due_at: due,
                deposit_cents: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid {
                code: "PRODUCT_NOT_RENTABLE",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn update_only_while_active_and_delete_only_after() {
        let db = test_db().await;
        let client = insert_client(&db, "1-LP").await;
        let product = insert_product(&db, "DRILL", 0, 1).await;
        let repo = RentalRepository::new(&db);
        let start = at("2025-01-01T08:00:00Z");

        let rental = repo
            .open(RentalInput {
                client_id: client.id,
                product_id: product.id,
                quantity: 1,
                start_at: Some(start),
                due_at: start + Duration::days(1),
                deposit_cents: 0,
            })
            .await
            .unwrap();

        let extended = Rental::update_record(
            &db,
            rental.clone(),
            RentalUpdate {
                due_at: start + Duration::days(5),
                deposit_cents: 2_000,
            },
        )
        .await
        .unwrap();
        assert_eq!(extended.deposit_cents, 2_000);
        assert!(Rental::remove_by_id(&db, rental.id).await.is_err());

        repo.cancel(rental.id).await.unwrap();
        assert_eq!(Product::get_by_id(&db, product.id).await.unwrap().stock, 1);
        assert!(matches!(
            Rental::update_record(
                &db,
                extended,
                RentalUpdate {
                    due_at: start + Duration::days(6),
                    deposit_cents: 0,
                },
            )
            .await,
            Err(RepositoryError::Conflict { .. })
        ));

        Rental::remove_by_id(&db, rental.id).await.unwrap();
    }
}
