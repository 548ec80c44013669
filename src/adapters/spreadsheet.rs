//! Spreadsheet adapters: XLSX workbooks and the always-available CSV writer.

use crate::domain::ReportTable;

/// Write a table as CSV: a header row of column labels, then one line per row.
///
/// An empty table yields empty bytes, which is still a valid CSV file.
#[must_use]
pub fn to_csv(table: &ReportTable) -> Vec<u8> {
    let mut csv = String::new();
    if !table.columns.is_empty() {
        push_csv_row(&mut csv, table.columns.iter().map(String::as_str));
    }
    for row in &table.rows {
        push_csv_row(&mut csv, row.iter().map(String::as_str));
    }
    csv.into_bytes()
}

fn push_csv_row<'a>(csv: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = cells.map(escape_csv).collect();
    csv.push_str(&line.join(","));
    csv.push_str("\r\n");
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(feature = "xlsx")]
pub use xlsx::XlsxEngine;

#[cfg(feature = "xlsx")]
mod xlsx {
    use rust_xlsxwriter::{Format, Workbook, XlsxError};

    use crate::domain::ReportTable;
    use crate::ports::{SpreadsheetEngine, SpreadsheetError};

    /// Column width cap, in characters.
    const MAX_COLUMN_WIDTH: usize = 60;

    impl From<XlsxError> for SpreadsheetError {
        fn from(e: XlsxError) -> Self {
            Self(e.to_string())
        }
    }

    /// `rust_xlsxwriter` engine: one bold header row plus one row per record,
    /// every cell written as text so values read back exactly as rendered.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct XlsxEngine;

    impl SpreadsheetEngine for XlsxEngine {
        fn name(&self) -> &'static str {
            "rust_xlsxwriter"
        }

        fn write_table(
            &self,
            sheet_name: &str,
            table: &ReportTable,
        ) -> Result<Vec<u8>, SpreadsheetError> {
            let mut workbook = Workbook::new();
            let header = Format::new().set_bold();
            let sheet = workbook.add_worksheet();
            sheet.set_name(sheet_name)?;

            for (col, label) in table.columns.iter().enumerate() {
                let col = column_index(col)?;
                sheet.write_string_with_format(0, col, label, &header)?;

                let widest = std::iter::once(label)
                    .chain(table.rows.iter().filter_map(|r| r.get(usize::from(col))))
                    .map(|s| s.chars().count())
                    .max()
                    .unwrap_or(0)
                    .min(MAX_COLUMN_WIDTH);
                sheet.set_column_width(col, (widest + 2) as f64)?;
            }

            for (i, row) in table.rows.iter().enumerate() {
                let row_idx = u32::try_from(i + 1)
                    .map_err(|_| SpreadsheetError("too many rows".into()))?;
                for (col, value) in row.iter().enumerate() {
                    sheet.write_string(row_idx, column_index(col)?, value)?;
                }
            }

            Ok(workbook.save_to_buffer()?)
        }
    }

    fn column_index(col: usize) -> Result<u16, SpreadsheetError> {
        u16::try_from(col).map_err(|_| SpreadsheetError("too many columns".into()))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_workbook_bytes() {
            let table = ReportTable {
                columns: vec!["Record ID".into(), "Result".into()],
                rows: vec![vec!["3".into(), "High risk".into()]],
            };
            let bytes = XlsxEngine
                .write_table("Heart Report", &table)
                .expect("Should write workbook");
            // XLSX is a zip container.
            assert!(bytes.starts_with(b"PK"));
        }

        #[test]
        fn test_invalid_sheet_name_is_error() {
            let err = XlsxEngine.write_table("bad/name[]", &ReportTable::default());
            assert!(err.is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escaping() {
        let table = ReportTable {
            columns: vec!["Patient Name".into(), "Note".into()],
            rows: vec![vec!["Roe, Jane".into(), "said \"hi\"".into()]],
        };
        let csv = String::from_utf8(to_csv(&table)).expect("utf8");
        assert_eq!(
            csv,
            "Patient Name,Note\r\n\"Roe, Jane\",\"said \"\"hi\"\"\"\r\n"
        );
    }

    #[test]
    fn test_empty_table_is_empty_csv() {
        assert!(to_csv(&ReportTable::default()).is_empty());
    }
}
