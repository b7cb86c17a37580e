//! Minimal OOXML workbook writer: one worksheet named `Sheet1`.
//!
//! Text is written as inline strings so no shared-string table or styles
//! part is needed.

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use super::model::{CellValue, Table};
use crate::error::{Result, SweepError};

const SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Serialize `table` as a single-sheet `.xlsx` package.
pub fn write_workbook(table: &Table) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)?),
    ];
    for (path, xml) in parts {
        zip.start_file(path, options)?;
        zip.write_all(xml.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

fn sheet_xml(table: &Table) -> Result<String> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    if table.n_cols() > 0 {
        let header: Vec<CellValue> = table
            .column_names()
            .into_iter()
            .map(|n| CellValue::Text(n.to_string()))
            .collect();
        write_row(&mut xml, 1, header.iter())?;
        for (i, row) in table.rows().enumerate() {
            write_row(&mut xml, i + 2, row.into_iter())?;
        }
    }

    xml.push_str("</sheetData></worksheet>");
    Ok(xml)
}

fn write_row<'a>(
    xml: &mut String,
    row_number: usize,
    cells: impl Iterator<Item = &'a CellValue>,
) -> Result<()> {
    write!(xml, r#"<row r="{row_number}">"#).map_err(xml_error)?;
    for (col, cell) in cells.enumerate() {
        let cell_ref = format!("{}{row_number}", column_letter(col));
        match cell {
            CellValue::Missing => {}
            CellValue::Number(v) => {
                write!(xml, r#"<c r="{cell_ref}"><v>{v}</v></c>"#).map_err(xml_error)?;
            }
            CellValue::Text(s) => {
                write!(
                    xml,
                    r#"<c r="{cell_ref}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape_xml(s)
                )
                .map_err(xml_error)?;
            }
        }
    }
    xml.push_str("</row>");
    Ok(())
}

fn xml_error(e: std::fmt::Error) -> SweepError {
    SweepError::Write(format!("XML write error: {e}"))
}

/// Spreadsheet column name for a 0-based index: 0 → A, 25 → Z, 26 → AA.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are not valid XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn sheet_cells_skip_missing_values() {
        let table = Table::from_rows(
            vec!["name".into(), "v".into()],
            vec![vec!["x".into(), CellValue::Missing]],
        );
        let xml = sheet_xml(&table).unwrap();
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">name</t></is></c>"#));
        assert!(xml.contains(r#"<row r="2"><c r="A2" t="inlineStr">"#));
        assert!(!xml.contains(r#"r="B2""#));
    }

    #[test]
    fn package_is_a_zip_archive() {
        let table = Table::from_rows(vec!["n".into()], vec![vec![CellValue::Number(1.5)]]);
        let bytes = write_workbook(&table).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
