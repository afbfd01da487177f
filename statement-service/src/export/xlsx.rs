//! Spreadsheet rendering: one worksheet per source document.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, XlsxError};
use std::collections::HashSet;

use super::{DocumentRows, HEADERS};
use crate::error::ExportError;

/// Excel's worksheet name limit, in characters
const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const FALLBACK_SHEET_NAME: &str = "Movimientos";
const MONEY_FORMAT: &str = "0.00";

pub(super) fn render(
    created_at: DateTime<Utc>,
    sheets: &[DocumentRows],
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    workbook.set_properties(&properties(created_at)?);

    let header = Format::new().set_bold();
    let money = Format::new().set_num_format(MONEY_FORMAT);

    let empty = [DocumentRows {
        filename: FALLBACK_SHEET_NAME.to_string(),
        rows: Vec::new(),
    }];
    let sheets = if sheets.is_empty() { &empty[..] } else { sheets };

    let mut used = HashSet::new();
    for document in sheets {
        let name = sheet_name(&document.filename, &mut used);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;

        for (col, title) in HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (index, row) in document.rows.iter().enumerate() {
            let r = index as u32 + 1;
            worksheet.write_string(r, 0, &row.fecha)?;
            worksheet.write_string(r, 1, &row.referencia)?;
            worksheet.write_number_with_format(r, 2, row.deposito.as_f64(), &money)?;
            worksheet.write_number_with_format(r, 3, row.retiro.as_f64(), &money)?;
            worksheet.write_string(r, 4, &row.descripcion)?;
            if let Some(balance) = row.saldo_operacion {
                worksheet.write_number_with_format(r, 5, balance.as_f64(), &money)?;
            }
        }

        worksheet.set_column_width(0, 12)?;
        worksheet.set_column_width(4, 48)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Fixed creation time so identical batches produce identical bytes.
fn properties(created_at: DateTime<Utc>) -> Result<DocProperties, XlsxError> {
    let datetime = ExcelDateTime::from_ymd(
        created_at.year() as u16,
        created_at.month() as u8,
        created_at.day() as u8,
    )?
    .and_hms(
        created_at.hour() as u16,
        created_at.minute() as u8,
        created_at.second(),
    )?;

    Ok(DocProperties::new()
        .set_title("Movimientos combinados")
        .set_creation_datetime(&datetime))
}

/// Worksheet name from a file name, within Excel's rules and unique
/// (case-insensitively) among `used`.
pub(crate) fn sheet_name(filename: &str, used: &mut HashSet<String>) -> String {
    let stem = filename
        .rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("pdf"))
        .map_or(filename, |(stem, _)| stem);

    let cleaned: String = stem
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let base = if cleaned.is_empty() {
        FALLBACK_SHEET_NAME
    } else {
        cleaned
    };

    let mut candidate = truncate_chars(base, MAX_SHEET_NAME);
    let mut counter = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", counter);
        let room = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", truncate_chars(base, room).trim_end(), suffix);
        counter += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
