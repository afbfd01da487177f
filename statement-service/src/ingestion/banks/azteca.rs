//! Banco Azteca statements: ISO-dated lines whose last three tokens are
//! cargos, abonos and saldo.

use chrono::NaiveDate;
use tracing::debug;

use super::{ParsedLine, amount_token};
use crate::ingestion::Amount;

const MIN_TOKENS: usize = 7;

/// Leading columns before the concept: dates and references
const CONCEPT_START: usize = 4;

pub(super) fn parse(text: &str) -> Vec<ParsedLine> {
    text.lines()
        .filter_map(|raw| parse_line(raw.trim()))
        .collect()
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < MIN_TOKENS {
        return None;
    }

    let operation_date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").ok()?;

    let n = parts.len();
    let (Some(cargo), Some(abono), Some(balance)) = (
        amount_token(parts[n - 3]),
        amount_token(parts[n - 2]),
        amount_token(parts[n - 1]),
    ) else {
        debug!(line, "Banco Azteca line without cargos/abonos/saldo");
        return None;
    };

    let amount = if abono == Amount::from_cents(0) {
        cargo
    } else {
        abono
    };

    Some(ParsedLine {
        operation_date,
        description: parts[CONCEPT_START..n - 3].join(" "),
        reference: None,
        amount: amount.abs(),
        balance: Some(balance),
    })
}
