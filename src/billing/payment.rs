//! Payment settlement: how a set of tenders covers a total.
//!
//! Only cash can exceed what is owed, and change is always returned in cash.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::RepositoryError;
use crate::models::currency::RATE_SCALE;

/// How a tender was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TenderMethod {
    Cash,
    Card,
    Transfer,
}

/// One payment line as submitted by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tender {
    pub method: TenderMethod,
    /// Amount in cents of `currency_code`
    #[schema(example = 20000)]
    pub amount_cents: i64,
    /// Currency of the tender; the base currency when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "USD")]
    pub currency_code: Option<String>,
}

/// A tender already expressed in base-currency cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseTender {
    pub method: TenderMethod,
    pub amount_cents: i64,
}

/// Result of settling tenders against a total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentQuote {
    pub total_cents: i64,
    pub tendered_cents: i64,
    pub cash_cents: i64,
    pub non_cash_cents: i64,
    pub change_cents: i64,
    pub remaining_cents: i64,
    /// Whether the tenders pay the total in full
    pub covered: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("total must not be negative")]
    NegativeTotal,
    #[error("tender {index} has a negative amount")]
    NegativeTender { index: usize },
    #[error("card and transfer payments ({non_cash_cents}) exceed the total ({total_cents})")]
    OverpaymentNonCash {
        non_cash_cents: i64,
        total_cents: i64,
    },
    #[error("amount is too large")]
    Overflow,
    #[error("conversion rate must be positive")]
    InvalidRate,
}

impl From<PaymentError> for RepositoryError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::NegativeTotal => RepositoryError::validation(
                error.to_string(),
                json!({ "total_cents": "must not be negative" }),
            ),
            PaymentError::NegativeTender { index } => {
                let mut details = serde_json::Map::new();
                details.insert(
                    format!("tenders[{index}].amount_cents"),
                    json!("must not be negative"),
                );
                RepositoryError::validation(error.to_string(), details.into())
            }
            PaymentError::OverpaymentNonCash { .. } => {
                RepositoryError::invalid("OVERPAYMENT_NON_CASH", error.to_string())
            }
            PaymentError::Overflow | PaymentError::InvalidRate => {
                RepositoryError::invalid("VALIDATION_FAILED", error.to_string())
            }
        }
    }
}

/// Converts `amount_cents` between currencies given each one's value in
/// base-currency micro-units, rounding half away from zero.
pub fn convert_cents(
    amount_cents: i64,
    from_rate_micros: i64,
    to_rate_micros: i64,
) -> Result<i64, PaymentError> {
    if from_rate_micros <= 0 || to_rate_micros <= 0 {
        return Err(PaymentError::InvalidRate);
    }

    let numerator = i128::from(amount_cents) * i128::from(from_rate_micros);
    let denominator = i128::from(to_rate_micros);
    let mut quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator {
        quotient += numerator.signum();
    }

    i64::try_from(quotient).map_err(|_| PaymentError::Overflow)
}

/// Converts a foreign amount into base-currency cents.
pub fn to_base_cents(amount_cents: i64, rate_micros: i64) -> Result<i64, PaymentError> {
    convert_cents(amount_cents, rate_micros, RATE_SCALE)
}

/// Settles base-currency tenders against `total_cents`.
pub fn quote(total_cents: i64, tenders: &[BaseTender]) -> Result<PaymentQuote, PaymentError> {
    if total_cents < 0 {
        return Err(PaymentError::NegativeTotal);
    }

    let mut cash_cents: i64 = 0;
    let mut non_cash_cents: i64 = 0;
    for (index, tender) in tenders.iter().enumerate() {
        if tender.amount_cents < 0 {
            return Err(PaymentError::NegativeTender { index });
        }
        let bucket = match tender.method {
            TenderMethod::Cash => &mut cash_cents,
            TenderMethod::Card | TenderMethod::Transfer => &mut non_cash_cents,
        };
        *bucket = bucket
            .checked_add(tender.amount_cents)
            .ok_or(PaymentError::Overflow)?;
    }

    if non_cash_cents > total_cents {
        return Err(PaymentError::OverpaymentNonCash {
            non_cash_cents,
            total_cents,
        });
    }

    let tendered_cents = cash_cents
        .checked_add(non_cash_cents)
        .ok_or(PaymentError::Overflow)?;

    Ok(PaymentQuote {
        total_cents,
        tendered_cents,
        cash_cents,
        non_cash_cents,
        change_cents: (tendered_cents - total_cents).max(0),
        remaining_cents: (total_cents - tendered_cents).max(0),
        covered: tendered_cents >= total_cents,
    })
}
