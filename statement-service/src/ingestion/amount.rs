//! Exact money values as printed on statements (`$1,234.56`).

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Sub;

/// A money amount stored as whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Value in currency units, for spreadsheet numeric cells.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse a statement token such as `$1,234.56`, `1234.5` or `-12.00`.
    ///
    /// Thousands separators and a leading `$` are ignored; at most two
    /// decimal places are accepted.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (negative, token) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let token = token.strip_prefix('$').unwrap_or(token);
        let cleaned: String = token.chars().filter(|c| *c != ',').collect();

        let (units, fraction) = match cleaned.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (cleaned.as_str(), ""),
        };

        if units.is_empty()
            || !units.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let units: i64 = units.parse().ok()?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };

        let cents = units.checked_mul(100)?.checked_add(fraction)?;
        Some(Amount(if negative { -cents } else { cents }))
    }

    pub fn abs(self) -> Self {
        Amount(self.0.abs())
    }

    pub fn neg(self) -> Self {
        Amount(-self.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
