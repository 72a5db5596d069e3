//! # Currency Repository
//!
//! Currencies with their rates against the base currency, the expense types
//! filed under each currency, and recorded exchanges.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::billing::payment::{BaseTender, Tender, convert_cents, to_base_cents};
use crate::billing::words::currency_name;
use crate::config::is_currency_code;
use crate::error::RepositoryError;
use crate::models::currency::{self, Entity as Currency, RATE_SCALE};
use crate::models::exchange::{self, Entity as Exchange};
use crate::models::expense_type::{self, Entity as ExpenseType};
use crate::pagination::{Page, PageRequest};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, normalize_optional};

/// Currency fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CurrencyInput {
    #[schema(example = "USD")]
    pub code: String,
    #[schema(example = "Dólar estadounidense")]
    pub name: String,
    #[schema(example = "$")]
    pub symbol: String,
    /// Value of one unit in base-currency micro-units
    #[schema(example = 6960000)]
    pub rate_micros: i64,
}

impl CurrencyInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.check(
            is_currency_code(self.code.trim()),
            "code",
            "must be three upper-case letters",
        );
        errors.required_text("name", &self.name, 80);
        errors.required_text("symbol", &self.symbol, 8);
        errors.positive("rate_micros", self.rate_micros);
        errors.into_result()
    }

    fn apply(self, active: &mut currency::ActiveModel) {
        active.code = Set(self.code.trim().to_string());
        active.name = Set(self.name.trim().to_string());
        active.symbol = Set(self.symbol.trim().to_string());
        active.rate_micros = Set(self.rate_micros);
        active.updated_at = Set(now());
    }
}

impl Resource for Currency {
    const NAME: &'static str = "Currency";
    const COLLECTION: &'static str = "currencies";

    fn id_column() -> currency::Column {
        currency::Column::Id
    }

    fn created_at_column() -> currency::Column {
        currency::Column::CreatedAt
    }

    fn search_columns() -> Vec<currency::Column> {
        vec![currency::Column::Code, currency::Column::Name]
    }

    fn id_of(model: &currency::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Currency {
    type Create = CurrencyInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: CurrencyInput,
    ) -> Result<currency::Model, RepositoryError> {
        input.validate()?;

        let mut active = currency::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Currency {
    type Update = CurrencyInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: currency::Model,
        input: CurrencyInput,
    ) -> Result<currency::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

/// Expense type fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExpenseTypeInput {
    pub currency_id: Uuid,
    #[schema(example = "Alquiler de local")]
    pub name: String,
    pub description: Option<String>,
}

impl ExpenseTypeInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.optional_text("description", self.description.as_deref(), 500);
        errors.into_result()
    }

    fn apply(self, active: &mut expense_type::ActiveModel) {
        active.currency_id = Set(self.currency_id);
        active.name = Set(self.name.trim().to_string());
        active.description = Set(normalize_optional(self.description));
        active.updated_at = Set(now());
    }
}

impl Resource for ExpenseType {
    const NAME: &'static str = "Expense type";
    const COLLECTION: &'static str = "expense-types";

    fn id_column() -> expense_type::Column {
        expense_type::Column::Id
    }

    fn created_at_column() -> expense_type::Column {
        expense_type::Column::CreatedAt
    }

    fn search_columns() -> Vec<expense_type::Column> {
        vec![expense_type::Column::Name, expense_type::Column::Description]
    }

    fn id_of(model: &expense_type::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for ExpenseType {
    type Create = ExpenseTypeInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: ExpenseTypeInput,
    ) -> Result<expense_type::Model, RepositoryError> {
        input.validate()?;

        let mut active = expense_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for ExpenseType {
    type Update = ExpenseTypeInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: expense_type::Model,
        input: ExpenseTypeInput,
    ) -> Result<expense_type::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

/// Body of `POST /api/exchanges`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExchangeInput {
    #[schema(example = "USD")]
    pub from_code: String,
    #[schema(example = "BOB")]
    pub to_code: String,
    #[schema(example = 10000)]
    pub amount_cents: i64,
    pub notes: Option<String>,
}

/// Body of `PUT /api/exchanges/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExchangeUpdate {
    pub notes: Option<String>,
}

impl Resource for Exchange {
    const NAME: &'static str = "Exchange";
    const COLLECTION: &'static str = "exchanges";

    fn id_column() -> exchange::Column {
        exchange::Column::Id
    }

    fn created_at_column() -> exchange::Column {
        exchange::Column::CreatedAt
    }

    fn search_columns() -> Vec<exchange::Column> {
        vec![exchange::Column::Notes]
    }

    fn id_of(model: &exchange::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Updatable for Exchange {
    type Update = ExchangeUpdate;

    async fn update_record(
        db: &DatabaseConnection,
        current: exchange::Model,
        input: ExchangeUpdate,
    ) -> Result<exchange::Model, RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.optional_text("notes", input.notes.as_deref(), 500);
        errors.into_result()?;

        let mut active = current.into_active_model();
        active.notes = Set(normalize_optional(input.notes));
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }
}

/// `?from=&to=&amount_cents=` for the conversion endpoint
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertParams {
    #[param(example = "USD")]
    pub from: String,
    #[param(example = "BOB")]
    pub to: String,
    #[param(example = 10000)]
    pub amount_cents: i64,
}

/// Result of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount_cents: i64,
    pub result_cents: i64,
    pub from_rate_micros: i64,
    pub to_rate_micros: i64,
}

/// Repository for rate lookups and conversions
pub struct CurrencyRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CurrencyRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Currency row for `code`, inserting it at par when missing. Only meant
    /// for the base currency; the flag tells whether a row was inserted.
    pub async fn ensure_base_currency(
        &self,
        code: &str,
    ) -> Result<(currency::Model, bool), RepositoryError> {
        let existing = Currency::find()
            .filter(currency::Column::Code.eq(code))
            .one(self.db)
            .await?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }

        let now = now();
        let created = currency::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(currency_name(code)),
            symbol: Set(currency_symbol(code).to_string()),
            rate_micros: Set(RATE_SCALE),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await?;
        tracing::info!(code, "Stored base currency at par");
        Ok((created, true))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<currency::Model, RepositoryError> {
        Currency::find()
            .filter(currency::Column::Code.eq(code))
            .one(self.db)
            .await?
            .ok_or_else(|| unknown_currency(code))
    }

    /// Rate of `code`; the base currency needs no row of its own.
    pub async fn rate_for(&self, code: &str, base_currency: &str) -> Result<i64, RepositoryError> {
        match self.find_by_code(code).await {
            Ok(currency) => Ok(currency.rate_micros),
            Err(RepositoryError::Invalid { .. }) if code == base_currency => Ok(RATE_SCALE),
            Err(err) => Err(err),
        }
    }

    pub async fn convert(
        &self,
        params: &ConvertParams,
        base_currency: &str,
    ) -> Result<Conversion, RepositoryError> {
        let from = params.from.trim().to_ascii_uppercase();
        let to = params.to.trim().to_ascii_uppercase();
        let from_rate_micros = self.rate_for(&from, base_currency).await?;
        let to_rate_micros = self.rate_for(&to, base_currency).await?;
        let result_cents = convert_cents(params.amount_cents, from_rate_micros, to_rate_micros)?;

        Ok(Conversion {
            from,
            to,
            amount_cents: params.amount_cents,
            result_cents,
            from_rate_micros,
            to_rate_micros,
        })
    }

    /// Records an exchange at the current rates. Codes are matched
    /// case-insensitively and the base currency needs no stored row, as in
    /// [`convert`](Self::convert); the rates used are snapshotted on the row.
    pub async fn record_exchange(
        &self,
        input: ExchangeInput,
        base_currency: &str,
    ) -> Result<exchange::Model, RepositoryError> {
        let from_code = input.from_code.trim().to_ascii_uppercase();
        let to_code = input.to_code.trim().to_ascii_uppercase();

        let mut errors = FieldErrors::new();
        errors.positive("amount_cents", input.amount_cents);
        errors.optional_text("notes", input.notes.as_deref(), 500);
        errors.check(from_code != to_code, "to_code", "must differ from from_code");
        errors.into_result()?;

        let from = self.exchange_side(&from_code, base_currency).await?;
        let to = self.exchange_side(&to_code, base_currency).await?;
        let result_cents = convert_cents(input.amount_cents, from.rate_micros, to.rate_micros)?;

        let now = now();
        let record = exchange::ActiveModel {
            id: Set(Uuid::new_v4()),
            from_currency_id: Set(from.id),
            to_currency_id: Set(to.id),
            amount_cents: Set(input.amount_cents),
            result_cents: Set(result_cents),
            from_rate_micros: Set(from.rate_micros),
            to_rate_micros: Set(to.rate_micros),
            notes: Set(normalize_optional(input.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await?;

        tracing::info!(
            from = %from.code,
            to = %to.code,
            amount_cents = input.amount_cents,
            result_cents,
            "Recorded currency exchange"
        );
        Ok(record)
    }

    // Exchanges reference both currencies by id, so the base currency is
    // stored on first use instead of being implied.
    async fn exchange_side(
        &self,
        code: &str,
        base_currency: &str,
    ) -> Result<currency::Model, RepositoryError> {
        if code == base_currency {
            Ok(self.ensure_base_currency(code).await?.0)
        } else {
            self.find_by_code(code).await
        }
    }

    /// Expresses every tender in base-currency cents.
    pub async fn to_base_tenders(
        &self,
        tenders: &[Tender],
        base_currency: &str,
    ) -> Result<Vec<BaseTender>, RepositoryError> {
        let mut converted = Vec::with_capacity(tenders.len());
        for tender in tenders {
            let amount_cents = match tender.currency_code.as_deref().map(str::trim) {
                None | Some("") => tender.amount_cents,
                Some(code) if code.eq_ignore_ascii_case(base_currency) => tender.amount_cents,
                Some(code) => {
                    let rate = self
                        .rate_for(&code.to_ascii_uppercase(), base_currency)
                        .await?;
                    to_base_cents(tender.amount_cents, rate)?
                }
            };
            converted.push(BaseTender {
                method: tender.method,
                amount_cents,
            });
        }
        Ok(converted)
    }

    /// Expense types filed under a currency.
    pub async fn expense_types(
        &self,
        currency_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<expense_type::Model>, RepositoryError> {
        Currency::get_by_id(self.db, currency_id).await?;
        ExpenseType::page_where(
            self.db,
            Condition::all().add(expense_type::Column::CurrencyId.eq(currency_id)),
            request,
        )
        .await
    }
}

/// Printed symbol for a currency stored without one.
pub fn currency_symbol(code: &str) -> &'static str {
    match code {
        "BOB" => "Bs",
        "USD" => "$",
        "EUR" => "€",
        _ => "¤",
    }
}

fn unknown_currency(code: &str) -> RepositoryError {
    RepositoryError::Invalid {
        code: "UNKNOWN_CURRENCY",
        message: format!("Currency {code} is not configured"),
        details: Some(json!({ "currency_code": code })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::payment::TenderMethod;
    use crate::repositories::test_support::test_db;

    async fn usd(db: &DatabaseConnection) -> currency::Model {
        Currency::create_record(
            db,
            CurrencyInput {
                code: "USD".to_string(),
                name: "Dólar".to_string(),
                symbol: "$".to_string(),
                rate_micros: 6_960_000,
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn currency_validation() {
        let input = CurrencyInput {
            code: "usd".to_string(),
            name: "".to_string(),
            symbol: "$".to_string(),
            rate_micros: 0,
        };
        match input.validate().unwrap_err() {
            RepositoryError::Invalid { details, .. } => {
                let details = details.unwrap();
                assert!(details.get("code").is_some());
                assert!(details.get("name").is_some());
                assert!(details.get("rate_micros").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn convert_uses_base_fallback() {
        let db = test_db().await;
        usd(&db).await;
        let repo = CurrencyRepository::new(&db);

        let conversion = repo
            .convert(
                &ConvertParams {
                    from: "usd".to_string(),
                    to: "BOB".to_string(),
                    amount_cents: 1_000,
                },
                "BOB",
            )
            .await
            .unwrap();
        assert_eq!(conversion.result_cents, 6_960);
        assert_eq!(conversion.to_rate_micros, RATE_SCALE);

        let err = repo
            .convert(
                &ConvertParams {
                    from: "EUR".to_string(),
                    to: "BOB".to_string(),
                    amount_cents: 1,
                },
                "BOB",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid {
                code: "UNKNOWN_CURRENCY",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn tenders_are_converted_to_base() {
        let db = test_db().await;
        usd(&db).await;

        let tenders = vec![
            Tender {
                method: TenderMethod::Cash,
                amount_cents: 500,
                currency_code: None,
            },
            Tender {
                method: TenderMethod::Card,
                amount_cents: 1_000,
                currency_code: Some("USD".to_string()),
            },
        ];
        let converted = CurrencyRepository::new(&db)
            .to_base_tenders(&tenders, "BOB")
            .await
            .unwrap();
        assert_eq!(converted[0].amount_cents, 500);
        assert_eq!(converted[1].amount_cents, 6_960);
    }

    #[tokio::test]
    async fn exchange_snapshots_rates() {
        let db = test_db().await;
        usd(&db).await;
        Currency::create_record(
            &db,
            CurrencyInput {
                code: "BOB".to_string(),
                name: "Boliviano".to_string(),
                symbol: "Bs".to_string(),
                rate_micros: RATE_SCALE,
            },
        )
        .await
        .unwrap();

        let recorded = CurrencyRepository::new(&db)
            .record_exchange(
                ExchangeInput {
                    from_code: "BOB".to_string(),
                    to_code: "USD".to_string(),
                    amount_cents: 69_600,
                    notes: None,
                },
                "BOB",
            )
            .await
            .unwrap();
        assert_eq!(recorded.result_cents, 10_000);
        assert_eq!(recorded.to_rate_micros, 6_960_000);

        let updated = Exchange::update_record(
            &db,
            recorded,
            ExchangeUpdate {
                notes: Some("cambio de caja".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("cambio de caja"));
        assert_eq!(updated.result_cents, 10_000);
    }

    #[tokio::test]
    async fn exchange_matches_conversion_rules() {
        let db = test_db().await;
        usd(&db).await;
        let repo = CurrencyRepository::new(&db);

        let recorded = repo
            .record_exchange(
                ExchangeInput {
                    from_code: " usd ".to_string(),
                    to_code: "bob".to_string(),
                    amount_cents: 1_000,
                    notes: None,
                },
                "BOB",
            )
            .await
            .unwrap();
        let conversion = repo
            .convert(
                &ConvertParams {
                    from: "usd".to_string(),
                    to: "bob".to_string(),
                    amount_cents: 1_000,
                },
                "BOB",
            )
            .await
            .unwrap();
        assert_eq!(recorded.result_cents, conversion.result_cents);
        assert_eq!(recorded.to_rate_micros, RATE_SCALE);

        let base = repo.find_by_code("BOB").await.unwrap();
        assert_eq!(recorded.to_currency_id, base.id);
        assert_eq!(base.rate_micros, RATE_SCALE);
        assert!(!repo.ensure_base_currency("BOB").await.unwrap().1);

        let same = repo
            .record_exchange(
                ExchangeInput {
                    from_code: "usd".to_string(),
                    to_code: "USD".to_string(),
                    amount_cents: 1_000,
                    notes: None,
                },
                "BOB",
            )
            .await
            .unwrap_err();
        assert!(matches!(same, RepositoryError::Invalid { code: "VALIDATION_FAILED", .. }));

        let unknown = repo
            .record_exchange(
                ExchangeInput {
                    from_code: "eur".to_string(),
                    to_code: "BOB".to_string(),
                    amount_cents: 1_000,
                    notes: None,
                },
                "BOB",
            )
            .await
            .unwrap_err();
        assert!(matches!(unknown, RepositoryError::Invalid { code: "UNKNOWN_CURRENCY", .. }));
    }

    #[tokio::test]
    async fn expense_types_are_scoped_to_currency() {
        let db = test_db().await;
        let dollar = usd(&db).await;
        ExpenseType::create_record(
            &db,
            ExpenseTypeInput {
                currency_id: dollar.id,
                name: "Importación".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let repo = CurrencyRepository::new(&db);
        let page = repo
            .expense_types(dollar.id, PageRequest { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);

        assert!(matches!(
            repo.expense_types(Uuid::new_v4(), PageRequest { page: 1, limit: 10 })
                .await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
