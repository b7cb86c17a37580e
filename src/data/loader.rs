use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, ExcelDateTime, Reader, Xlsx};
use chrono::NaiveTime;
use log::debug;

use super::model::{CellValue, SourceFormat, Table};
use crate::error::{Result, SweepError};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse raw file bytes into a [`Table`].  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – comma-delimited, first row is the header
/// * `.xlsx` – first worksheet only, first row is the header
pub fn load(bytes: &[u8], extension: &str) -> Result<Table> {
    let format = SourceFormat::from_extension(extension)?;
    let table = match format {
        SourceFormat::Csv => load_csv(bytes)?,
        SourceFormat::Xlsx => load_xlsx(bytes)?,
    };
    debug!(
        "loaded {format} table: {} rows × {} columns",
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Rows shorter than the header are padded with missing cells; longer rows
/// are malformed.
fn load_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(|e| csv_error(&e))?
            .iter()
            .map(|h| h.to_string())
            .collect(),
        None => return Err(SweepError::parse(SourceFormat::Csv, "no header row")),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| csv_error(&e))?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(SweepError::parse(
                SourceFormat::Csv,
                format!(
                    "line {line}: expected at most {} fields, saw {}",
                    headers.len(),
                    record.len()
                ),
            ));
        }
        rows.push(record.iter().map(CellValue::from_raw).collect());
    }

    Ok(Table::from_rows(headers, rows))
}

fn csv_error(err: &csv::Error) -> SweepError {
    SweepError::parse(SourceFormat::Csv, err.to_string())
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| SweepError::parse(SourceFormat::Xlsx, e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SweepError::parse(SourceFormat::Xlsx, "workbook has no worksheets"))?
        .map_err(|e| SweepError::parse(SourceFormat::Xlsx, e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_value(c).to_field()).collect(),
        None => {
            return Err(SweepError::parse(
                SourceFormat::Xlsx,
                "first worksheet is empty",
            ))
        }
    };

    let data = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(Table::from_rows(headers, data))
}

/// Map a worksheet cell onto a raw cell; dtype inference happens later.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::Float(v) => CellValue::Number(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::String(s) => CellValue::from_raw(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => date_text(dt).map_or(CellValue::Missing, CellValue::Text),
        other => CellValue::Text(other.to_string()),
    }
}

/// Render a date cell as text that never parses as a number, so date columns
/// stay text: `2024-01-01`, `2024-01-01 12:30:00`, or `36:15:00` for
/// durations. Serials that do not map to a calendar date are `None`.
fn date_text(dt: &ExcelDateTime) -> Option<String> {
    if dt.is_duration() {
        let secs = dt.as_duration()?.num_seconds();
        let sign = if secs < 0 { "-" } else { "" };
        let secs = secs.unsigned_abs();
        return Some(format!(
            "{sign}{}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        ));
    }
    let datetime = dt.as_datetime()?;
    if datetime.time() == NaiveTime::MIN {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Dtype};
    use calamine::{CellErrorType, ExcelDateTimeType};

    #[test]
    fn csv_header_and_dtypes() {
        let table = load(b"name,value\nx,1\ny,2.5\n", "csv").unwrap();
        assert_eq!(table.column_names(), vec!["name", "value"]);
        assert_eq!(table.column("name").unwrap().dtype(), Dtype::Text);
        assert_eq!(table.column("value").unwrap().dtype(), Dtype::Numeric);
        assert_eq!(table.cell(1, "value"), Some(&CellValue::Number(2.5)));
    }

    #[test]
    fn csv_blank_cells_are_missing() {
        let table = load(b"a,b\n1,\n2,4\n", "csv").unwrap();
        assert_eq!(table.cell(0, "b"), Some(&CellValue::Missing));
        assert_eq!(table.column("b").unwrap().dtype(), Dtype::Numeric);
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let table = load(b"a,b,c\n1,2\n", "csv").unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.cell(0, "c"), Some(&CellValue::Missing));
    }

    #[test]
    fn csv_long_row_is_a_parse_error() {
        let err = load(b"a,b\n1,2,3\n", "csv").unwrap_err();
        match err {
            SweepError::Parse { format, message } => {
                assert_eq!(format, SourceFormat::Csv);
                assert!(message.contains("line 2"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_quoted_fields_keep_commas() {
        let table = load(b"city,pop\n\"Paris, FR\",2100000\n", "csv").unwrap();
        assert_eq!(
            table.cell(0, "city"),
            Some(&CellValue::Text("Paris, FR".into()))
        );
    }

    #[test]
    fn empty_csv_is_a_parse_error() {
        assert!(matches!(load(b"", "csv"), Err(SweepError::Parse { .. })));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        assert!(matches!(
            load(b"a,b\n\xff\xfe,1\n", "csv"),
            Err(SweepError::Parse { .. })
        ));
    }

    #[test]
    fn header_only_csv_has_no_rows() {
        let table = load(b"a,b\n", "csv").unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_cols(), 2);
    }

    #[test]
    fn unsupported_extension() {
        assert!(matches!(
            load(b"a,b\n", ".txt"),
            Err(SweepError::UnsupportedFormat { extension }) if extension == "txt"
        ));
    }

    #[test]
    fn garbage_spreadsheet_is_a_parse_error() {
        assert!(matches!(
            load(b"definitely not a zip archive", "xlsx"),
            Err(SweepError::Parse { format: SourceFormat::Xlsx, .. })
        ));
    }

    #[test]
    fn spreadsheet_cells_map_to_raw_values() {
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Text("true".into()));
        assert_eq!(cell_value(&Data::String(" ".into())), CellValue::Missing);
        assert_eq!(cell_value(&Data::Empty), CellValue::Missing);
        assert_eq!(cell_value(&Data::Error(CellErrorType::NA)), CellValue::Missing);
        assert_eq!(
            cell_value(&Data::Error(CellErrorType::Div0)),
            CellValue::Missing
        );
    }

    fn excel_date(serial: f64) -> Data {
        Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, false))
    }

    #[test]
    fn date_cells_become_formatted_text() {
        assert_eq!(cell_value(&excel_date(45292.0)), CellValue::Text("2024-01-01".into()));
        assert_eq!(
            cell_value(&excel_date(45292.5)),
            CellValue::Text("2024-01-01 12:00:00".into())
        );
        let duration = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_value(&duration), CellValue::Text("36:00:00".into()));
    }

    #[test]
    fn date_column_stays_text() {
        let cells = vec![cell_value(&excel_date(45292.0)), cell_value(&excel_date(45293.0))];
        let col = Column::infer("when", cells);
        assert_eq!(col.dtype(), Dtype::Text);
        assert_eq!(col.values()[1], CellValue::Text("2024-01-02".into()));
    }
}
