//! Santander statements. Movements only appear after the cheque-account
//! detail header, which is repeated on every page.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{AMOUNT, ParsedLine};
use crate::ingestion::Amount;
use crate::ingestion::dates::statement_date;
use crate::ingestion::text::{find_loose, squash_whitespace};

const PAGE_BREAK: &str = "\nP-P";
const SECTION_START: &str = "Detalle de movimientos cuenta de cheques.";
const CLOSING_LINE: &str = "SALDO FINAL DEL PERIODO";

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2})-([A-Za-z]{3})-(\d{4})\b").expect("valid date regex")
});

pub(super) fn parse(text: &str) -> Vec<ParsedLine> {
    let sections: Vec<&str> = text
        .split(PAGE_BREAK)
        .filter_map(|page| find_loose(page, SECTION_START, 0).map(|range| &page[range.end..]))
        .collect();

    if sections.is_empty() {
        debug!("No Santander movement sections found");
        return Vec::new();
    }

    sections
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(CLOSING_LINE))
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let caps = DATE.captures(line)?;
    let amounts: Vec<&str> = AMOUNT.find_iter(line).map(|m| m.as_str()).collect();
    if amounts.is_empty() {
        return None;
    }

    let year: i32 = caps[3].parse().ok()?;
    let Some(operation_date) = statement_date(&caps[1], &caps[2], year) else {
        debug!(line, "Invalid Santander date");
        return None;
    };

    let (amount, balance) = match amounts.as_slice() {
        [single] => (Amount::parse(single)?, None),
        [.., amount, balance] => (Amount::parse(amount)?, Some(Amount::parse(balance)?)),
        [] => return None,
    };

    let mut description = line.replace(&caps[0], " ");
    for token in &amounts {
        description = description.replace(token, " ");
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

    const STATEMENT: &str = "Banco Santander Mexico\n\
        Resumen\n\
        02-ABR-2024 IGNORED BEFORE HEADER 1.00 2.00\n\
        Detalle de movimientos cuenta de cheques.\n\
        FECHA FOLIO DESCRIPCION DEPOSITO RETIRO SALDO\n\
        02-ABR-2024 0012345 ABONO TRANSFERENCIA SPEI 3,000.00 11,000.00\n\
        05-ABR-2024 0012346 CARGO DOMICILIACION CFE 820.40 10,179.60\n\
        P-P 1/2\n\
        Detalle de movimientos cuenta de cheques.\n\
        08-ABR-2024 0012347 DEPOSITO EFECTIVO 1,000.00 11,179.60\n\
        SALDO FINAL DEL PERIODO 30-ABR-2024 11,179.60\n";

    #[test]
    fn test_parse_across_pages() {
        let lines = parse(STATEMENT);
        assert_eq!(lines.len(), 3);

        assert_eq!(lines[0].operation_date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(lines[0].description, "0012345 ABONO TRANSFERENCIA SPEI");
        assert_eq!(lines[0].amount, Amount::parse("3000.00").unwrap());
        assert_eq!(lines[0].balance, Amount::parse("11000.00"));

        assert_eq!(lines[1].description, "0012346 CARGO DOMICILIACION CFE");
        assert_eq!(lines[2].operation_date, NaiveDate::from_ymd_opt(2024, 4, 8).unwrap());
    }

    #[test]
    fn test_single_amount_has_no_balance() {
        let text = "Detalle de movimientos cuenta de cheques.\n10-ABR-2024 COMISION 15.00";
        let lines = parse(text);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].balance, None);
        assert_eq!(lines[0].description, "COMISION");
    }

    #[test]
    fn test_without_section_header_nothing_is_read() {
        assert!(parse("02-ABR-2024 ABONO 3,000.00 11,000.00").is_empty());
    }
}
