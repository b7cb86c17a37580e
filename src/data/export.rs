use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::Table;
use super::xlsx;
use crate::error::{Result, SweepError};

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ---------------------------------------------------------------------------
// Target format
// ---------------------------------------------------------------------------

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TargetFormat {
    Csv,
    Xlsx,
}

impl TargetFormat {
    /// Canonical lowercase file extension.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Csv => "csv",
            TargetFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            TargetFormat::Csv => CSV_CONTENT_TYPE,
            TargetFormat::Xlsx => XLSX_CONTENT_TYPE,
        }
    }
}

impl FromStr for TargetFormat {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(TargetFormat::Csv),
            "xlsx" | "excel" | "spreadsheet" => Ok(TargetFormat::Xlsx),
            _ => Err(SweepError::UnsupportedTargetFormat {
                label: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TargetFormat {
    type Error = SweepError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetFormat::Csv => write!(f, "CSV"),
            TargetFormat::Xlsx => write!(f, "Excel"),
        }
    }
}

// ---------------------------------------------------------------------------
// Export artifact
// ---------------------------------------------------------------------------

/// A fully materialized download: bytes plus what to call them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub buffer: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

/// Serialize `table` into `format`, naming the result after `source_name`.
pub fn export(table: &Table, source_name: &str, format: TargetFormat) -> Result<ExportArtifact> {
    let buffer = match format {
        TargetFormat::Csv => write_csv(table)?,
        TargetFormat::Xlsx => xlsx::write_workbook(table)?,
    };
    let filename = export_filename(source_name, format);
    debug!("exported {filename} ({} bytes)", buffer.len());
    Ok(ExportArtifact {
        buffer,
        filename,
        content_type: format.content_type(),
    })
}

/// Replace the extension of `source_name` with the target's canonical one.
pub fn export_filename(source_name: &str, format: TargetFormat) -> String {
    Path::new(source_name)
        .with_extension(format.extension())
        .to_string_lossy()
        .into_owned()
}

/// Header row then one line per row; no index column, missing cells empty.
fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if table.n_cols() > 0 {
        writer.write_record(table.column_names())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|v| v.to_field()))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| SweepError::Write(e.to_string()))
}
