//! Bank detection and per-bank statement line parsers.
//!
//! Every parser receives the full extracted text of one statement and the
//! statement year, and returns the movement lines it could read. Lines that
//! do not parse are skipped; only the caller decides whether an empty result
//! is acceptable.

mod azteca;
mod banamex;
mod banorte;
mod banregio;
mod bbva;
mod inbursa;
mod santander;
mod scotiabank;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::{AsRefStr, Display, EnumString};

use super::Amount;

/// Money anywhere in a line: `1,234.56`
pub(crate) static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})*\.\d{2}").expect("valid amount regex"));

/// Money at the start of a token
pub(crate) static AMOUNT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:,\d{3})*\.\d{2}").expect("valid amount regex"));

/// Supported statement issuers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Bank {
    Scotiabank,
    #[serde(rename = "BBVA")]
    #[strum(serialize = "BBVA")]
    Bbva,
    Banorte,
    Santander,
    Banamex,
    Banregio,
    #[serde(rename = "Banco Azteca")]
    #[strum(serialize = "Banco Azteca")]
    Azteca,
    Inbursa,
}

impl Bank {
    /// Detection order; the first bank whose marker appears wins.
    pub const ALL: [Bank; 8] = [
        Bank::Scotiabank,
        Bank::Bbva,
        Bank::Banorte,
        Bank::Santander,
        Bank::Banamex,
        Bank::Banregio,
        Bank::Azteca,
        Bank::Inbursa,
    ];

    /// Case-sensitive markers: statements routinely mention other banks in
    /// upper-case transfer descriptions (`SPEI ENVIADO SCOTIABANK`).
    fn markers(self) -> &'static [&'static str] {
        match self {
            Bank::Scotiabank => &["Scotiabank"],
            Bank::Bbva => &["BBVA"],
            Bank::Banorte => &["Banorte"],
            Bank::Santander => &["Santander"],
            Bank::Banamex => &["Banamex", "Citibanamex"],
            Bank::Banregio => &["Banregio"],
            Bank::Azteca => &["Banco Azteca"],
            Bank::Inbursa => &["Inbursa"],
        }
    }

    pub fn detect(text: &str) -> Option<Bank> {
        Self::ALL
            .into_iter()
            .find(|bank| bank.markers().iter().any(|marker| text.contains(marker)))
    }

    pub fn parse_lines(self, text: &str, year: i32) -> Vec<ParsedLine> {
        match self {
            Bank::Scotiabank => scotiabank::parse(text, year),
            Bank::Bbva => bbva::parse(text, year),
            Bank::Banorte => banorte::parse(text),
            Bank::Santander => santander::parse(text),
            Bank::Banamex => banamex::parse(text, year),
            Bank::Banregio => banregio::parse(text, year),
            Bank::Azteca => azteca::parse(text),
            Bank::Inbursa => inbursa::parse(text, year),
        }
    }
}

/// One movement line as read from a statement, before direction is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub operation_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub amount: Amount,
    pub balance: Option<Amount>,
}

/// Parse an amount token, keeping only the leading money portion.
pub(crate) fn amount_token(token: &str) -> Option<Amount> {
    AMOUNT_PREFIX
        .find(token)
        .and_then(|m| Amount::parse(m.as_str()))
}
