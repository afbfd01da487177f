//! Inbursa statements: `MON DD [REFERENCE] DESCRIPTION ... AMOUNT BALANCE`
//! between `DETALLE DE MOVIMIENTOS` and `RESUMEN DEL CFDI`.

use tracing::debug;

use super::{ParsedLine, amount_token};
use crate::ingestion::dates::statement_date;
use crate::ingestion::text::narrow_section;

const SECTION_START: &str = "DETALLE DE MOVIMIENTOS";
const SECTION_END: &str = "RESUMEN DEL CFDI";

pub(super) fn parse(text: &str, year: i32) -> Vec<ParsedLine> {
    narrow_section(text, SECTION_START, SECTION_END)
        .lines()
        .filter_map(|raw| parse_line(raw.trim(), year))
        .collect()
}

fn parse_line(line: &str, year: i32) -> Option<ParsedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let operation_date = statement_date(parts[1], parts[0], year)?;

    let n = parts.len();
    let (Some(amount), Some(balance)) = (
        amount_token(parts[n - 2].trim_start_matches('$')),
        amount_token(parts[n - 1].trim_start_matches('$')),
    ) else {
        debug!(line, "Inbursa line needs amount and balance");
        return None;
    };

    let reference = (n > 4 && parts[2].bytes().all(|b| b.is_ascii_digit()))
        .then(|| parts[2].to_string());
    let description_start = if reference.is_some() { 3 } else { 2 };

    Some(ParsedLine {
        operation_date,
        description: parts[description_start..n - 2].join(" "),
        reference,
        amount: amount.abs(),
        balance: Some(balance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::Amount;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_movements() {
        let text = "Inbursa\n\
            DETALLE DE MOVIMIENTOS\n\
            FECHA REFERENCIA CONCEPTO CARGOS ABONOS SALDO\n\
            ENE 05 3344556 DEPOSITO SPEI $4,000.00 $9,000.00\n\
            ene 12 COMPRA SUPERMERCADO 725.40 8,274.60\n\
            FEB 31 FECHA INVALIDA 1.00 2.00\n\
            RESUMEN DEL CFDI\n\
            MAR 01 FUERA 1.00 2.00\n";

        let lines = parse(text, 2024);
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0].operation_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(lines[0].reference.as_deref(), Some("3344556"));
        assert_eq!(lines[0].description, "DEPOSITO SPEI");
        assert_eq!(lines[0].amount, Amount::parse("4000.00").unwrap());
        assert_eq!(lines[0].balance, Amount::parse("9000.00"));

        assert_eq!(lines[1].operation_date, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
        assert_eq!(lines[1].reference, None);
        assert_eq!(lines[1].description, "COMPRA SUPERMERCADO");
    }

    #[test]
    fn test_amount_columns_right_after_date_or_reference() {
        let lines = parse("ENE 07 100.00 200.00", 2024);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].description, "");

        let lines = parse("ENE 07 12345 100.00 200.00", 2024);
        assert_eq!(lines[0].reference.as_deref(), Some("12345"));
        assert_eq!(lines[0].description, "");
    }
}
