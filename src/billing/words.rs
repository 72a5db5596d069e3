//! Spanish amount-in-words, as printed on invoices:
//! `MIL DOSCIENTOS TREINTA Y CUATRO 56/100 BOLIVIANOS`.
//!
//! `UNO` is shortened to `UN` (and `VEINTIUNO` to `VEINTIÚN`) in front of
//! `MIL` and `MILLÓN`; a trailing unit keeps its full form.

use thiserror::Error;

/// Largest integer part that can be spelled out.
pub const MAX_INTEGER: i64 = 999_999_999_999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WordsError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount exceeds {MAX_INTEGER}.99")]
    TooLarge,
}

const UNITS: [&str; 30] = [
    "CERO",
    "UNO",
    "DOS",
    "TRES",
    "CUATRO",
    "CINCO",
    "SEIS",
    "SIETE",
    "OCHO",
    "NUEVE",
    "DIEZ",
    "ONCE",
    "DOCE",
    "TRECE",
    "CATORCE",
    "QUINCE",
    "DIECISÉIS",
    "DIECISIETE",
    "DIECIOCHO",
    "DIECINUEVE",
    "VEINTE",
    "VEINTIUNO",
    "VEINTIDÓS",
    "VEINTITRÉS",
    "VEINTICUATRO",
    "VEINTICINCO",
    "VEINTISÉIS",
    "VEINTISIETE",
    "VEINTIOCHO",
    "VEINTINUEVE",
];

const TENS: [&str; 10] = [
    "", "", "", "TREINTA", "CUARENTA", "CINCUENTA", "SESENTA", "SETENTA", "OCHENTA", "NOVENTA",
];

const HUNDREDS: [&str; 10] = [
    "",
    "CIENTO",
    "DOSCIENTOS",
    "TRESCIENTOS",
    "CUATROCIENTOS",
    "QUINIENTOS",
    "SEISCIENTOS",
    "SETECIENTOS",
    "OCHOCIENTOS",
    "NOVECIENTOS",
];

fn below_hundred(n: u64, shortened: bool, out: &mut Vec<&'static str>) {
    match n {
        0 => {}
        1 if shortened => out.push("UN"),
        21 if shortened => out.push("VEINTIÚN"),
        1..=29 => out.push(UNITS[n as usize]),
        _ => {
            out.push(TENS[(n / 10) as usize]);
            let unit = n % 10;
            if unit > 0 {
                out.push("Y");
                below_hundred(unit, shortened, out);
            }
        }
    }
}

fn below_thousand(n: u64, shortened: bool, out: &mut Vec<&'static str>) {
    if n == 100 {
        out.push("CIEN");
        return;
    }
    let hundreds = n / 100;
    if hundreds > 0 {
        out.push(HUNDREDS[hundreds as usize]);
    }
    below_hundred(n % 100, shortened, out);
}

fn below_million(n: u64, shortened: bool, out: &mut Vec<&'static str>) {
    let thousands = n / 1_000;
    match thousands {
        0 => {}
        1 => out.push("MIL"),
        _ => {
            below_thousand(thousands, true, out);
            out.push("MIL");
        }
    }
    below_thousand(n % 1_000, shortened, out);
}

/// Spells out a whole number between 0 and [`MAX_INTEGER`].
pub fn integer_to_words(n: u64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }

    let mut out = Vec::new();
    let millions = n / 1_000_000;
    match millions {
        0 => {}
        1 => out.extend(["UN", "MILLÓN"]),
        _ => {
            below_million(millions, true, &mut out);
            out.push("MILLONES");
        }
    }
    below_million(n % 1_000_000, false, &mut out);

    out.join(" ")
}

/// Plural currency name for a code, falling back to the code itself.
pub fn currency_name(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "BOB" => "BOLIVIANOS".to_string(),
        "USD" => "DÓLARES AMERICANOS".to_string(),
        "EUR" => "EUROS".to_string(),
        "ARS" | "CLP" | "MXN" | "COP" | "UYU" => "PESOS".to_string(),
        "PEN" => "SOLES".to_string(),
        "BRL" => "REALES".to_string(),
        other => other.to_string(),
    }
}

/// `"<INTEGER WORDS> <cc>/100 <CURRENCY NAME>"` for an amount in cents.
pub fn amount_in_words(amount_cents: i64, currency_code: &str) -> Result<String, WordsError> {
    if amount_cents < 0 {
        return Err(WordsError::Negative);
    }
    let integer = amount_cents / 100;
    if integer > MAX_INTEGER {
        return Err(WordsError::TooLarge);
    }
    let cents = amount_cents % 100;

    Ok(format!(
        "{} {cents:02}/100 {}",
        integer_to_words(integer as u64),
        currency_name(currency_code)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_example() {
        assert_eq!(
            amount_in_words(123_456, "BOB").unwrap(),
            "MIL DOSCIENTOS TREINTA Y CUATRO 56/100 BOLIVIANOS"
        );
    }

    #[test]
    fn small_numbers() {
        assert_eq!(integer_to_words(0), "CERO");
        assert_eq!(integer_to_words(1), "UNO");
        assert_eq!(integer_to_words(15), "QUINCE");
        assert_eq!(integer_to_words(21), "VEINTIUNO");
        assert_eq!(integer_to_words(22), "VEINTIDÓS");
        assert_eq!(integer_to_words(30), "TREINTA");
        assert_eq!(integer_to_words(31), "TREINTA Y UNO");
        assert_eq!(integer_to_words(99), "NOVENTA Y NUEVE");
    }

    #[test]
    fn hundreds() {
        assert_eq!(integer_to_words(100), "CIEN");
        assert_eq!(integer_to_words(101), "CIENTO UNO");
        assert_eq!(integer_to_words(115), "CIENTO QUINCE");
        assert_eq!(integer_to_words(500), "QUINIENTOS");
        assert_eq!(integer_to_words(999), "NOVECIENTOS NOVENTA Y NUEVE");
    }

    #[test]
    fn thousands_use_shortened_units() {
        assert_eq!(integer_to_words(1_000), "MIL");
        assert_eq!(integer_to_words(1_001), "MIL UNO");
        assert_eq!(integer_to_words(21_000), "VEINTIÚN MIL");
        assert_eq!(integer_to_words(31_000), "TREINTA Y UN MIL");
        assert_eq!(integer_to_words(100_000), "CIEN MIL");
        assert_eq!(integer_to_words(101_000), "CIENTO UN MIL");
        assert_eq!(
            integer_to_words(999_999),
            "NOVECIENTOS NOVENTA Y NUEVE MIL NOVECIENTOS NOVENTA Y NUEVE"
        );
    }

    #[test]
    fn millions() {
        assert_eq!(integer_to_words(1_000_000), "UN MILLÓN");
        assert_eq!(integer_to_words(2_000_000), "DOS MILLONES");
        assert_eq!(integer_to_words(21_000_000), "VEINTIÚN MILLONES");
        assert_eq!(integer_to_words(1_001_000), "UN MILLÓN MIL");
        assert_eq!(integer_to_words(1_000_000_000), "MIL MILLONES");
        assert_eq!(
            integer_to_words(MAX_INTEGER as u64),
            "NOVECIENTOS NOVENTA Y NUEVE MIL NOVECIENTOS NOVENTA Y NUEVE MILLONES \
             NOVECIENTOS NOVENTA Y NUEVE MIL NOVECIENTOS NOVENTA Y NUEVE"
        );
    }

    #[test]
    fn cents_and_currency() {
        assert_eq!(amount_in_words(5, "BOB").unwrap(), "CERO 05/100 BOLIVIANOS");
        assert_eq!(amount_in_words(100, "usd").unwrap(), "UNO 00/100 DÓLARES AMERICANOS");
        assert_eq!(amount_in_words(250, "XYZ").unwrap(), "DOS 50/100 XYZ");
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(amount_in_words(-1, "BOB"), Err(WordsError::Negative));
        assert_eq!(
            amount_in_words((MAX_INTEGER + 1) * 100, "BOB"),
            Err(WordsError::TooLarge)
        );
        assert!(amount_in_words(MAX_INTEGER * 100 + 99, "BOB").is_ok());
    }
}
