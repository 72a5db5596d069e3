//! # Billing
//!
//! Pure money arithmetic shared by checkout and the tool endpoints: payment
//! settlement and currency conversion, Spanish amount-in-words and the
//! printable invoice layout.

pub mod invoice_layout;
pub mod payment;
pub mod words;

pub use payment::{BaseTender, PaymentQuote, Tender, TenderMethod, convert_cents, quote};
pub use words::amount_in_words;
