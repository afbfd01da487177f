//! BBVA statements: one movement per line, `DD/MON DD/MON DESCRIPTION ... AMOUNTS`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{ParsedLine, amount_token};
use crate::ingestion::dates::statement_date;
use crate::ingestion::text::narrow_section;

const SECTION_START: &str = "Detalle de Movimientos Realizados";
const SECTION_END: &str = "Total de Movimientos";

static LINE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/([A-Za-z]{3})\b").expect("valid date regex"));

pub(super) fn parse(text: &str, year: i32) -> Vec<ParsedLine> {
    let section = narrow_section(text, SECTION_START, SECTION_END);

    section
        .lines()
        .filter_map(|raw| parse_line(raw.trim(), year))
        .collect()
}

fn parse_line(line: &str, year: i32) -> Option<ParsedLine> {
    let caps = LINE_DATE.captures(line)?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() <= 2 {
        return None;
    }

    let Some(operation_date) = statement_date(&caps[1], &caps[2], year) else {
        debug!(line, "Invalid BBVA operation date");
        return None;
    };

    // Token 0 is the operation date and token 1 the settlement date.
    let amounts: Vec<_> = parts
        .iter()
        .enumerate()
        .filter_map(|(index, token)| amount_token(token).map(|amount| (index, amount)))
        .collect();

    let Some(&(first_index, amount)) = amounts.first() else {
        debug!(line, "BBVA line has no amount");
        return None;
    };

    let description = if first_index > 2 {
        parts[2..first_index].join(" ")
    } else {
        String::new()
    };

    // CARGO/ABONO, then OPERACION and LIQUIDACION balances when printed
    let balance = (amounts.len() >= 3).then(|| amounts[1].1);

    Some(ParsedLine {
        operation_date,
        description,
        reference: None,
        amount: amount.abs(),
        balance,
    })
}
