//! Statement date handling: Spanish/English month abbreviations and
//! statement year detection.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// A full date with a four-digit year: `05 FEB 2024`, `05/feb/2024`, `05-FEB-2024`.
static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})[ /-]([a-z]{3})[ /-](\d{4})\b").expect("valid full date regex")
});

/// A spelled-out Spanish month: `Periodo del 01 al 31 de ENERO de 2024`.
static MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\b",
    )
    .expect("valid month name regex")
});

/// Month number for a three-letter abbreviation, Spanish or English.
pub fn month_number(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_ascii_uppercase().as_str() {
        "ENE" | "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "ABR" | "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AGO" | "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DIC" | "DEC" => 12,
        _ => return None,
    };
    Some(month)
}

/// Build a date from statement day/month tokens. Returns `None` for
/// unknown months or impossible days (`31 FEB`).
pub fn statement_date(day: &str, month: &str, year: i32) -> Option<NaiveDate> {
    let day: u32 = day.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month_number(month.trim())?, day)
}

/// Expand a two-digit year (`24`) into `2024`.
pub fn expand_year(two_digits: &str) -> Option<i32> {
    let year: i32 = two_digits.parse().ok()?;
    (0..100).contains(&year).then_some(2000 + year)
}

/// First plausible statement year printed as part of a full date.
pub fn detect_statement_year(text: &str) -> Option<i32> {
    FULL_DATE.captures_iter(text).find_map(|caps| {
        month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        (1990..=2100).contains(&year).then_some(year)
    })
}

/// Statement month for layouts that print only the day on each line.
///
/// Taken from the first full date, else the first spelled-out Spanish month.
pub fn detect_statement_month(text: &str) -> Option<u32> {
    FULL_DATE
        .captures_iter(text)
        .find_map(|caps| month_number(&caps[2]))
        .or_else(|| {
            let caps = MONTH_NAME.captures(text)?;
            // "SEPTIEMBRE" and "SETIEMBRE" both start with "SE"
            let name = caps[1].to_ascii_uppercase();
            if name.starts_with("SE") {
                Some(9)
            } else {
                month_number(&name[..3])
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("ENE"), Some(1));
        assert_eq!(month_number("ago"), Some(8));
        assert_eq!(month_number("Dec"), Some(12));
        assert_eq!(month_number("XYZ"), None);
    }

    #[test]
    fn test_statement_date() {
        assert_eq!(
            statement_date("05", "FEB", 2024),
            NaiveDate::from_ymd_opt(2024, 2, 5)
        );
        assert_eq!(statement_date("29", "FEB", 2023), None);
        assert_eq!(statement_date("xx", "FEB", 2024), None);
    }

    #[test]
    fn test_detect_statement_year() {
        let text = "Cuenta 1234 5678\nPeriodo del 01 ENE 2023 al 31 ENE 2023\n05 ENE DEPOSITO";
        assert_eq!(detect_statement_year(text), Some(2023));

        assert_eq!(detect_statement_year("Fecha de corte 31/DIC/2024"), Some(2024));
        assert_eq!(detect_statement_year("05 FEB SPEI"), None);
        // Account-number-like tokens are not mistaken for dates
        assert_eq!(detect_statement_year("12 ABC 2024 05-FEB-2022"), Some(2022));
    }

    #[test]
    fn test_detect_statement_month() {
        assert_eq!(detect_statement_month("Corte al 31/MAR/2024"), Some(3));
        assert_eq!(
            detect_statement_month("Periodo del 01 al 30 de Abril de 2024"),
            Some(4)
        );
        assert_eq!(detect_statement_month("PERIODO SETIEMBRE"), Some(9));
        assert_eq!(detect_statement_month("sin fecha"), None);
    }

    #[test]
    fn test_expand_year() {
        assert_eq!(expand_year("24"), Some(2024));
        assert_eq!(expand_year("x4"), None);
    }
}
