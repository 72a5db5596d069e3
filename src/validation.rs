//! Field validation helpers that collect per-field messages into the
//! `details` object of a `VALIDATION_FAILED` error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::RepositoryError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

static DOCUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("document regex is valid"));

static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("period regex is valid"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Letters, digits and dashes only.
pub fn is_valid_document(value: &str) -> bool {
    DOCUMENT_RE.is_match(value)
}

/// `YYYY-MM` with a month between 01 and 12.
pub fn is_valid_period(value: &str) -> bool {
    PERIOD_RE.is_match(value)
}

/// Trims a string, returning `None` when nothing is left.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accumulates field errors and turns them into a single repository error.
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: Map<String, Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field`; the first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| Value::String(message.into()));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    /// Non-blank text of at most `max_len` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max_len: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max_len {
            self.add(field, format!("must be at most {max_len} characters"));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value
            && value.trim().chars().count() > max_len
        {
            self.add(field, format!("must be at most {max_len} characters"));
        }
    }

    pub fn non_negative(&mut self, field: &str, value: i64) {
        self.check(value >= 0, field, "must not be negative");
    }

    pub fn positive(&mut self, field: &str, value: i64) {
        self.check(value > 0, field, "must be greater than zero");
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_result(self) -> Result<(), RepositoryError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::validation(
                "Validation failed",
                Value::Object(self.fields),
            ))
        }
    }
}
