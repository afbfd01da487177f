//! Banregio statements: `DIA CONCEPTO CARGOS ABONOS SALDO` tables where each
//! line carries only the day of the month.

use chrono::NaiveDate;
use tracing::debug;

use super::{ParsedLine, amount_token};
use crate::ingestion::dates::detect_statement_month;
use crate::ingestion::text::find_loose;

const TABLE_HEADER: &str = "DIA CONCEPTO CARGOS ABONOS SALDO";

pub(super) fn parse(text: &str, year: i32) -> Vec<ParsedLine> {
    let month = detect_statement_month(text).unwrap_or_else(|| {
        debug!("Banregio statement month not found, assuming January");
        1
    });

    let table = match find_loose(text, TABLE_HEADER, 0) {
        Some(range) => &text[range.end..],
        None => text,
    };

    table
        .lines()
        .filter_map(|raw| parse_line(raw.trim(), year, month))
        .collect()
}

fn parse_line(line: &str, year: i32, month: u32) -> Option<ParsedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let day = parts.first()?;
    if day.is_empty() || day.len() > 2 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let Some(operation_date) = day
        .parse()
        .ok()
        .and_then(|d| NaiveDate::from_ymd_opt(year, month, d))
    else {
        debug!(line, "Invalid Banregio day");
        return None;
    };

    let amounts: Vec<_> = parts.iter().filter_map(|token| amount_token(token)).collect();
    let [amount, balance] = amounts.as_slice() else {
        debug!(line, count = amounts.len(), "Banregio line needs movement and balance");
        return None;
    };

    Some(ParsedLine {
        operation_date,
        description: parts[1..parts.len() - 2].join(" "),
        reference: None,
        amount: amount.abs(),
        balance: Some(*balance),
    })
}
