//! Comma- and tab-separated rendering; all documents in one table.

use super::{DocumentRows, HEADERS};
use crate::error::ExportError;

pub(super) fn render(delimiter: u8, sheets: &[DocumentRows]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(HEADERS)?;

    for row in sheets.iter().flat_map(|sheet| &sheet.rows) {
        let deposito = row.deposito.to_string();
        let retiro = row.retiro.to_string();
        let saldo = row
            .saldo_operacion
            .map(|balance| balance.to_string())
            .unwrap_or_default();

        writer.write_record([
            row.fecha.as_str(),
            row.referencia.as_str(),
            deposito.as_str(),
            retiro.as_str(),
            row.descripcion.as_str(),
            saldo.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::sample_sheets;

    #[test]
    fn test_csv_concatenates_documents() {
        let bytes = render(b',', &sample_sheets()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "fecha,referencia,deposito,retiro,descripcion,saldo_operacion",
                "05/01/2024,N/A,15000.00,0.00,MOVIMIENTO 0,20000.00",
                "06/01/2024,N/A,0.00,2500.00,MOVIMIENTO 1,",
                "05/01/2024,N/A,1250.50,0.00,MOVIMIENTO 0,",
            ]
        );
    }

    #[test]
    fn test_txt_is_tab_separated() {
        let bytes = render(b'\t', &sample_sheets()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "fecha\treferencia\tdeposito\tretiro\tdescripcion\tsaldo_operacion"
        );
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_fields_with_delimiters_are_quoted() {
        let mut sheets = sample_sheets();
        sheets[0].rows[0].descripcion = "PAGO, SERVICIO".to_string();
        let text = String::from_utf8(render(b',', &sheets).unwrap()).unwrap();
        assert!(text.contains("\"PAGO, SERVICIO\""));
    }
}
