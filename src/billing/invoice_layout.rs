//! Fixed-width printable invoice for 40-column receipt printers.

use chrono::{DateTime, FixedOffset};

use super::words::amount_in_words;

/// Printer width in characters.
pub const WIDTH: usize = 40;

const QTY_WIDTH: usize = 4;
const SUBTOTAL_WIDTH: usize = 11;
const DESCRIPTION_WIDTH: usize = WIDTH - QTY_WIDTH - SUBTOTAL_WIDTH - 2;

/// One printed item row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub quantity: i32,
    pub description: String,
    pub subtotal_cents: i64,
}

/// Everything printed on an invoice
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub business_name: String,
    pub business_tax_id: String,
    pub number: String,
    pub issued_at: DateTime<FixedOffset>,
    pub client_name: String,
    pub client_document: String,
    pub lines: Vec<LayoutLine>,
    pub total_cents: i64,
    pub currency_code: String,
    pub voided: bool,
}

/// `1234.56` style amount.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str) -> String {
    let text = truncate(text, WIDTH);
    format!("{text:^WIDTH$}").trim_end().to_string()
}

/// Left label, right-aligned value on one line.
fn spread(label: &str, value: &str) -> String {
    let value = truncate(value, WIDTH);
    let room = WIDTH - value.chars().count();
    let label = truncate(label, room.saturating_sub(1));
    format!("{label:<room$}{value}")
}

/// Greedy word wrap; words longer than a line are cut.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word = truncate(word, width);
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Rows for one item. The description wraps inside its column; quantities
/// and amounts are never cut, and when either is wider than its column the
/// numbers get a row of their own above the description.
fn item_rows(line: &LayoutLine) -> Vec<String> {
    let quantity = line.quantity.to_string();
    let subtotal = format_cents(line.subtotal_cents);
    let description = wrap(&line.description, DESCRIPTION_WIDTH);
    let indent = |part: String| format!("{:QTY_WIDTH$} {part}", "");

    if quantity.chars().count() <= QTY_WIDTH && subtotal.chars().count() <= SUBTOTAL_WIDTH {
        let mut parts = description.into_iter();
        let first = parts.next().unwrap_or_default();
        let mut rows = vec![format!(
            "{quantity:>QTY_WIDTH$} {first:<DESCRIPTION_WIDTH$} {subtotal:>SUBTOTAL_WIDTH$}"
        )];
        rows.extend(parts.map(indent));
        rows
    } else {
        let mut rows = vec![spread(&format!("{quantity:>QTY_WIDTH$}"), &subtotal)];
        rows.extend(description.into_iter().map(indent));
        rows
    }
}

/// Renders the invoice as newline-terminated text, no line wider than
/// [`WIDTH`].
pub fn render(doc: &InvoiceDocument) -> String {
    let rule = "=".repeat(WIDTH);
    let thin_rule = "-".repeat(WIDTH);
    let mut out: Vec<String> = Vec::new();

    out.push(center(&doc.business_name));
    out.push(center(&format!("NIT: {}", doc.business_tax_id)));
    out.push(rule.clone());
    out.push(center(&format!("FACTURA {}", doc.number)));
    if doc.voided {
        out.push(center("*** ANULADA ***"));
    }
    out.push(truncate(
        &format!("Fecha: {}", doc.issued_at.format("%Y-%m-%d %H:%M")),
        WIDTH,
    ));
    out.push(truncate(&format!("Cliente: {}", doc.client_name), WIDTH));
    out.push(truncate(&format!("NIT/CI: {}", doc.client_document), WIDTH));
    out.push(thin_rule.clone());
    out.push(format!(
        "{:>QTY_WIDTH$} {:<DESCRIPTION_WIDTH$} {:>SUBTOTAL_WIDTH$}",
        "CANT", "DESCRIPCION", "SUBTOTAL"
    ));
    for line in &doc.lines {
        out.extend(item_rows(line));
    }
    out.push(thin_rule);
    out.push(spread(
        &format!("TOTAL {}:", doc.currency_code),
        &format_cents(doc.total_cents),
    ));

    let words = amount_in_words(doc.total_cents, &doc.currency_code)
        .unwrap_or_else(|_| format_cents(doc.total_cents));
    out.extend(wrap(&format!("SON: {words}"), WIDTH));
    out.push(rule);
    out.push(center("GRACIAS POR SU PREFERENCIA"));

    let mut text = out
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> InvoiceDocument {
        InvoiceDocument {
            business_name: "FERRETERIA EL MARTILLO".to_string(),
            business_tax_id: "1020304050".to_string(),
            number: "F-000042".to_string(),
            issued_at: DateTime::parse_from_rfc3339("2025-03-01T10:15:00-04:00").unwrap(),
            client_name: "Ana Quispe".to_string(),
            client_document: "4567123-LP".to_string(),
            lines: vec![
                LayoutLine {
                    quantity: 2,
                    description: "Martillo carpintero mango de fibra".to_string(),
                    subtotal_cents: 9_000,
                },
                LayoutLine {
                    quantity: 1,
                    description: "Clavos 2\"".to_string(),
                    subtotal_cents: 3_345_600,
                },
            ],
            total_cents: 3_354_600,
            currency_code: "BOB".to_string(),
            voided: false,
        }
    }

    #[test]
    fn no_line_exceeds_width() {
        let text = render(&document());
        for line in text.lines() {
            assert!(line.chars().count() <= WIDTH, "line too wide: {line:?}");
        }
    }

    #[test]
    fn contains_header_items_and_words() {
        let text = render(&document());
        assert!(text.contains("FACTURA F-000042"));
        assert!(text.contains("Fecha: 2025-03-01 10:15"));
        assert!(text.contains("Cliente: Ana Quispe"));
        assert!(text.contains("   2 Martillo carpintero           90.00"));
        assert!(text.contains("\n     mango de fibra\n"));
        assert!(text.contains("33546.00"));
        assert!(text.contains("SON: TREINTA Y TRES MIL QUINIENTOS"));
        assert!(text.contains("BOLIVIANOS"));
        assert!(!text.contains("ANULADA"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn total_is_right_aligned() {
        let text = render(&document());
        let total = text
            .lines()
            .find(|line| line.starts_with("TOTAL BOB:"))
            .unwrap();
        assert_eq!(total.chars().count(), WIDTH);
        assert!(total.ends_with("33546.00"));
    }

    #[test]
    fn voided_invoice_is_marked() {
        let mut doc = document();
        doc.voided = true;
        assert!(render(&doc).contains("*** ANULADA ***"));
    }

    #[test]
    fn cents_formatting() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(123_456), "1234.56");
        assert_eq!(format_cents(-250), "-2.50");
    }

    #[test]
    fn wrap_splits_on_words() {
        let lines = wrap(&"PALABRA ".repeat(12), WIDTH);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.chars().count() <= WIDTH));
    }

    #[test]
    fn wide_numbers_are_printed_whole() {
        let mut doc = document();
        doc.lines = vec![LayoutLine {
            quantity: 12_345,
            description: "Tornillo autorroscante galvanizado".to_string(),
            subtotal_cents: 99_999_999_999,
        }];
        let text = render(&doc);

        let numbers = text
            .lines()
            .find(|line| line.contains("12345"))
            .expect("quantity row");
        assert!(numbers.ends_with("999999999.99"), "{numbers:?}");
        assert!(text.contains("     Tornillo autorroscante"));
        assert!(text.contains("     galvanizado"));
        for line in text.lines() {
            assert!(line.chars().count() <= WIDTH, "line too wide: {line:?}");
        }
    }
}
