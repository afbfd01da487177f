//! Banamex statements.
//!
//! Movements sit between `DETALLE DE OPERACIONES` and `SALDO MINIMO
//! REQUERIDO`. A movement starts at a line carrying a `DD MON` date and
//! continues over the following undated lines. Its amounts are read from
//! the joined text: one amount has no balance, two are amount and balance,
//! three are a leading column followed by amount and balance.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{AMOUNT, ParsedLine};
use crate::ingestion::Amount;
use crate::ingestion::dates::statement_date;
use crate::ingestion::text::{narrow_section, squash_whitespace};

const SECTION_START: &str = "DETALLE DE OPERACIONES";
const SECTION_END: &str = "SALDO MINIMO REQUERIDO";

static LINE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{2}) ([a-z]{3})\b").expect("valid date regex"));

/// Page control stamps printed between movements
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"000180\.B07CHDA\d{3}\.OD\.\d{4}\.\d{2}").expect("valid noise regex")
});

pub(super) fn parse(text: &str, year: i32) -> Vec<ParsedLine> {
    let section = narrow_section(text, SECTION_START, SECTION_END);

    let mut entries: Vec<String> = Vec::new();
    for line in section.lines().map(str::trim) {
        if line.is_empty() || NOISE.is_match(line) {
            continue;
        }
        if find_date(line, year).is_some() {
            entries.push(line.to_string());
        } else if let Some(current) = entries.last_mut() {
            current.push(' ');
            current.push_str(line);
        }
    }

    entries
        .iter()
        .filter_map(|entry| parse_entry(entry, year))
        .collect()
}

/// First `DD MON` token pair with a real month, with its matched text.
fn find_date(line: &str, year: i32) -> Option<(chrono::NaiveDate, &str)> {
    LINE_DATE.captures_iter(line).find_map(|caps| {
        let date = statement_date(&caps[1], &caps[2], year)?;
        Some((date, caps.get(0)?.as_str()))
    })
}

fn parse_entry(entry: &str, year: i32) -> Option<ParsedLine> {
    let (operation_date, date_text) = find_date(entry, year)?;

    let matches: Vec<&str> = AMOUNT.find_iter(entry).map(|m| m.as_str()).collect();
    let amounts: Vec<Amount> = matches.iter().filter_map(|m| Amount::parse(m)).collect();
    if amounts.len() != matches.len() {
        debug!(entry, "Unparseable Banamex amount");
        return None;
    }

    let (amount, balance) = match amounts.as_slice() {
        [amount] => (*amount, None),
        [amount, balance] => (*amount, Some(*balance)),
        [_, amount, balance] => (*amount, Some(*balance)),
        [] => {
            debug!(entry, "Banamex movement without amount");
            return None;
        }
        _ => {
            debug!(entry, count = amounts.len(), "Too many amounts in Banamex movement");
            return None;
        }
    };

    let mut description = entry.replacen(date_text, " ", 1);
    for m in &matches {
        description = description.replacen(m, " ", 1);
    }

    Some(ParsedLine {
        operation_date,
        description: squash_whitespace(&description),
        reference: None,
        amount: amount.abs(),
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const STATEMENT: &str = "Banamex\n\
        ESTADO DE CUENTA AL 31 DE ENERO DE 2024\n\
        DETALLE DE OPERACIONES\n\
        FECHA CONCEPTO RETIROS DEPOSITOS SALDO\n\
        02 ENE SALDO ANTERIOR 8,000.00\n\
        03 ENE PAGO INTERBANCARIO\n\
        REF 445566 PROVEEDOR SA 1,500.00 6,500.00\n\
        000180.B07CHDA012.OD.0131.01\n\
        15 ENE DEPOSITO NOMINA 300.00 12,000.00 18,500.00\n\
        20 ene COMISION 10.00 20.00 30.00 40.00\n\
        SALDO MINIMO REQUERIDO 0.00\n\
        31 ENE FUERA DE SECCION 1.00 2.00\n";

    #[test]
    fn test_parse_movements() {
        let lines = parse(STATEMENT, 2024);
        assert_eq!(lines.len(), 3);

        assert_eq!(lines[0].operation_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(lines[0].description, "SALDO ANTERIOR");
        assert_eq!(lines[0].amount, Amount::parse("8000.00").unwrap());
        assert_eq!(lines[0].balance, None);

        // Continuation line joined, noise stamp dropped
        assert_eq!(lines[1].operation_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(lines[1].description, "PAGO INTERBANCARIO REF 445566 PROVEEDOR SA");
        assert_eq!(lines[1].amount, Amount::parse("1500.00").unwrap());
        assert_eq!(lines[1].balance, Amount::parse("6500.00"));

        // Three amounts: the middle one is the movement
        assert_eq!(lines[2].description, "DEPOSITO NOMINA");
        assert_eq!(lines[2].amount, Amount::parse("12000.00").unwrap());
        assert_eq!(lines[2].balance, Amount::parse("18500.00"));
    }

    #[test]
    fn test_undated_lines_before_first_movement_are_ignored() {
        let text = "DETALLE DE OPERACIONES\nTOTAL 99.00\n05 FEB ABONO 10.00 20.00\nSALDO MINIMO REQUERIDO";
        let lines = parse(text, 2024);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].description, "ABONO");
    }
}
