//! # Cash Register Repository
//!
//! Registers move between `closed` and `open` only through [`open`] and
//! [`close`]. Both are single UPDATE statements filtered on the expected
//! current status, so of two concurrent callers exactly one sees a row
//! affected and the other gets a conflict.
//!
//! [`open`]: CashRegisterRepository::open
//! [`close`]: CashRegisterRepository::close

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::cash_register::{
    ActiveModel, CashRegisterStatus, Column, Entity as CashRegister, Model,
};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::FieldErrors;

/// Register name, the only field editable outside the open/close workflow
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CashRegisterInput {
    #[schema(example = "Caja 1")]
    pub name: String,
}

impl CashRegisterInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 80);
        errors.into_result()
    }
}

/// Body of `POST /api/cash-registers/{id}/open`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenRegisterRequest {
    #[schema(example = 50000)]
    pub opening_balance_cents: i64,
}

/// Body of `POST /api/cash-registers/{id}/close`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CloseRegisterRequest {
    /// Cash physically counted in the drawer
    #[schema(example = 73550)]
    pub counted_cents: i64,
}

impl Resource for CashRegister {
    const NAME: &'static str = "Cash register";
    const COLLECTION: &'static str = "cash-registers";

    fn id_column() -> Column {
        Column::Id
    }

    fn created_at_column() -> Column {
        Column::CreatedAt
    }

    fn search_columns() -> Vec<Column> {
        vec![Column::Name, Column::Status]
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn ensure_deletable(model: &Model) -> Result<(), RepositoryError> {
        if model.status == CashRegisterStatus::Open {
            return Err(RepositoryError::conflict(
                "REGISTER_OPEN",
                "Close the register before deleting it",
            ));
        }
        Ok(())
    }

    fn delete_guard() -> Condition {
        Condition::all().add(Column::Status.eq(CashRegisterStatus::Closed))
    }
}

#[async_trait]
impl Creatable for CashRegister {
    type Create = CashRegisterInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: CashRegisterInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let now = now();
        let register = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            status: Set(CashRegisterStatus::Closed),
            opening_balance_cents: Set(0),
            expected_balance_cents: Set(0),
            closing_balance_cents: Set(None),
            difference_cents: Set(None),
            opened_at: Set(None),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(register.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for CashRegister {
    type Update = CashRegisterInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: Model,
        input: CashRegisterInput,
    ) -> Result<Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        active.name = Set(input.name.trim().to_string());
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }
}

/// Adds a sale's net cash to an open register.
pub(crate) async fn credit_open_register<C: ConnectionTrait>(
    conn: &C,
    register_id: Uuid,
    amount_cents: i64,
) -> Result<(), RepositoryError> {
    let result = CashRegister::update_many()
        .col_expr(
            Column::ExpectedBalanceCents,
            Expr::col(Column::ExpectedBalanceCents).add(amount_cents),
        )
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(register_id))
        .filter(Column::Status.eq(CashRegisterStatus::Open))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(missing_or_conflict(conn, register_id, "REGISTER_CLOSED", "is not open").await);
    }
    Ok(())
}

/// Takes back a previous credit, whatever state the register is in now.
pub(crate) async fn debit_register<C: ConnectionTrait>(
    conn: &C,
    register_id: Uuid,
    amount_cents: i64,
) -> Result<(), RepositoryError> {
    let result = CashRegister::update_many()
        .col_expr(
            Column::ExpectedBalanceCents,
            Expr::col(Column::ExpectedBalanceCents).sub(amount_cents),
        )
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(register_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(%register_id, "Register vanished before reversing a sale credit");
    }
    Ok(())
}

async fn missing_or_conflict<C: ConnectionTrait>(
    conn: &C,
    register_id: Uuid,
    code: &'static str,
    reason: &str,
) -> RepositoryError {
    match CashRegister::find_by_id(register_id).one(conn).await {
        Ok(Some(_)) => {
            RepositoryError::conflict(code, format!("Cash register {register_id} {reason}"))
        }
        Ok(None) => RepositoryError::not_found(CashRegister::NAME, register_id),
        Err(err) => RepositoryError::Database(err),
    }
}

/// Repository for register open/close transitions
pub struct CashRegisterRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CashRegisterRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a closed register with the given float.
    pub async fn open(
        &self,
        register_id: Uuid,
        request: OpenRegisterRequest,
    ) -> Result<Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.non_negative("opening_balance_cents", request.opening_balance_cents);
        errors.into_result()?;

        let now = now();
        let result = CashRegister::update_many()
            .col_expr(Column::Status, Expr::value(CashRegisterStatus::Open))
            .col_expr(
                Column::OpeningBalanceCents,
                Expr::value(request.opening_balance_cents),
            )
            .col_expr(
                Column::ExpectedBalanceCents,
                Expr::value(request.opening_balance_cents),
            )
            .col_expr(Column::ClosingBalanceCents, Expr::value(Option::<i64>::None))
            .col_expr(Column::DifferenceCents, Expr::value(Option::<i64>::None))
            .col_expr(Column::OpenedAt, Expr::value(now))
            .col_expr(
                Column::ClosedAt,
                Expr::value(Option::<DateTimeWithTimeZone>::None),
            )
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(register_id))
            .filter(Column::Status.eq(CashRegisterStatus::Closed))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(missing_or_conflict(
                self.db,
                register_id,
                "REGISTER_ALREADY_OPEN",
                "is already open",
            )
            .await);
        }

        counter!("cash_register_transitions_total", "transition" => "open").increment(1);
        tracing::info!(%register_id, opening_balance_cents = request.opening_balance_cents, "Opened cash register");
        CashRegister::get_by_id(self.db, register_id).await
    }

    /// Closes an open register; the difference is computed in the same
    /// statement so a sale landing concurrently is accounted for.
    pub async fn close(
        &self,
        register_id: Uuid,
        request: CloseRegisterRequest,
    ) -> Result<Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.non_negative("counted_cents", request.counted_cents);
        errors.into_result()?;

        let now = now();
        let result = CashRegister::update_many()
            .col_expr(Column::Status, Expr::value(CashRegisterStatus::Closed))
            .col_expr(
                Column::ClosingBalanceCents,
                Expr::value(Some(request.counted_cents)),
            )
            .col_expr(
                Column::DifferenceCents,
                Expr::val(request.counted_cents).sub(Expr::col(Column::ExpectedBalanceCents)),
            )
            .col_expr(Column::ClosedAt, Expr::value(Some(now)))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(register_id))
            .filter(Column::Status.eq(CashRegisterStatus::Open))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(missing_or_conflict(
                self.db,
                register_id,
                "REGISTER_NOT_OPEN",
                "is not open",
            )
            .await);
        }

        counter!("cash_register_transitions_total", "transition" => "close").increment(1);
        let register = CashRegister::get_by_id(self.db, register_id).await?;
        tracing::info!(
            %register_id,
            difference_cents = ?register.difference_cents,
            "Closed cash register"
        );
        Ok(register)
    }
}
