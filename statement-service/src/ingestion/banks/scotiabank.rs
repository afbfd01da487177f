//! Scotiabank statements.
//!
//! Movements span several text lines; only the last one carries the `$`
//! amounts. Lines without money are buffered and joined to the next
//! money-bearing line. The last three tokens are reference, amount and
//! balance.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::ParsedLine;
use crate::ingestion::Amount;
use crate::ingestion::dates::statement_date;
use crate::ingestion::text::narrow_section;

const SECTION_START: &str = "Detalle de tus movimientos";
const SECTION_END: &str = "LAS TASAS DE INTERES ESTAN EXPRESADAS EN TERMINOS ANUALES SIMPLES.";

/// Minimum tokens in a joined movement line
const MIN_TOKENS: usize = 6;

static MONEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\d{1,3}(?:,\d{3})*\.\d{2}").expect("valid money regex"));

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2})[ /](ENE|FEB|MAR|ABR|MAY|JUN|JUL|AGO|SEP|OCT|NOV|DIC)\b")
        .expect("valid date regex")
});

pub(super) fn parse(text: &str, year: i32) -> Vec<ParsedLine> {
    let section = narrow_section(text, SECTION_START, SECTION_END);
    let mut lines = Vec::new();
    let mut buffer = String::new();

    for raw in section.lines() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        // A line opening with a date starts a new movement; anything buffered
        // before it is a table header or page furniture.
        if DATE.find(raw).is_some_and(|m| m.start() == 0) {
            buffer.clear();
        }

        if !MONEY.is_match(raw) {
            buffer.push_str(raw);
            buffer.push(' ');
            continue;
        }

        let line = if buffer.is_empty() {
            raw.to_string()
        } else {
            let joined = format!("{}{}", buffer, raw);
            buffer.clear();
            joined
        };

        if let Some(parsed) = parse_line(&line, year) {
            lines.push(parsed);
        }
    }

    lines
}

fn parse_line(line: &str, year: i32) -> Option<ParsedLine> {
    if line.split_whitespace().count() < MIN_TOKENS {
        debug!(line, "Skipping short Scotiabank line");
        return None;
    }

    let Some(caps) = DATE.captures(line) else {
        debug!(line, "No date in Scotiabank line");
        return None;
    };
    let operation_date = statement_date(&caps[1], &caps[2], year)?;

    let remaining = line.replace(&caps[0], " ");
    let parts: Vec<&str> = remaining.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let n = parts.len();
    let (Some(amount), Some(balance)) = (Amount::parse(parts[n - 2]), Amount::parse(parts[n - 1]))
    else {
        debug!(line, "Unparseable amount or balance in Scotiabank line");
        return None;
    };

    Some(ParsedLine {
        operation_date,
        description: parts[..n - 3].join(" "),
        reference: Some(parts[n - 3].to_string()),
        amount: amount.abs(),
        balance: Some(balance),
    })
}
