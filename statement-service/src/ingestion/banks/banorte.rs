//! Banorte statements: `DD-MON-YY DESCRIPTION ... AMOUNT BALANCE`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{ParsedLine, amount_token};
use crate::ingestion::dates::{expand_year, statement_date};

static LINE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})-([A-Za-z]{3})-(\d{2})\b").expect("valid date regex")
});

pub(super) fn parse(text: &str) -> Vec<ParsedLine> {
    text.lines()
        .filter_map(|raw| parse_line(raw.trim()))
        .collect()
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let caps = LINE_DATE.captures(line)?;
    let Some(operation_date) = expand_year(&caps[3])
        .and_then(|year| statement_date(&caps[1], &caps[2], year))
    else {
        debug!(line, "Invalid Banorte date");
        return None;
    };

    let remaining = line.replace(&caps[0], " ");
    let parts: Vec<&str> = remaining.split_whitespace().collect();
    let amounts: Vec<_> = parts.iter().filter_map(|token| amount_token(token)).collect();

    if amounts.len() < 2 {
        debug!(line, "Banorte line needs amount and balance");
        return None;
    }

    let n = amounts.len();
    Some(ParsedLine {
        operation_date,
        description: parts[..parts.len() - 2].join(" "),
        reference: None,
        amount: amounts[n - 2].abs(),
        balance: Some(amounts[n - 1]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::Amount;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_movements() {
        let text = "Banorte Estado de Cuenta Enlace\n\
            FECHA DESCRIPCION MONTO DEL DEPOSITO MONTO DEL RETIRO SALDO\n\
            03-MAR-24 SALDO ANTERIOR 5,000.00\n\
            04-MAR-24 DEPOSITO EN EFECTIVO 2,000.00 7,000.00\n\
            10-mar-24 COMPRA WALMART 450.25 6,549.75\n";

        let lines = parse(text);
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0].operation_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(lines[0].description, "DEPOSITO EN EFECTIVO");
        assert_eq!(lines[0].amount, Amount::parse("2000.00").unwrap());
        assert_eq!(lines[0].balance, Amount::parse("7000.00"));

        assert_eq!(lines[1].operation_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(lines[1].description, "COMPRA WALMART");
    }

    #[test]
    fn test_english_month_abbreviations() {
        let lines = parse("15-AUG-23 PAGO NOMINA 100.00 200.00");
        assert_eq!(lines[0].operation_date, NaiveDate::from_ymd_opt(2023, 8, 15).unwrap());
    }
}
