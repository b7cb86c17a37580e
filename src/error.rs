use std::fmt;

use thiserror::Error;

use crate::data::model::SourceFormat;

/// Errors raised by the load → clean → project → export pipeline.
///
/// Each variant aborts only the action (and file) that produced it.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("unsupported file format: {extension:?} (expected .csv or .xlsx)")]
    UnsupportedFormat { extension: String },

    #[error("failed to parse {format} content: {message}")]
    Parse {
        format: SourceFormat,
        message: String,
    },

    #[error("cannot select column {column:?}: {issue}")]
    UnknownColumn { column: String, issue: ColumnIssue },

    #[error("unsupported export format: {label:?} (expected CSV or Excel)")]
    UnsupportedTargetFormat { label: String },

    #[error("failed to write export buffer: {0}")]
    Write(String),
}

impl SweepError {
    pub(crate) fn parse(format: SourceFormat, message: impl Into<String>) -> Self {
        SweepError::Parse {
            format,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        SweepError::Write(err.to_string())
    }
}

impl From<csv::Error> for SweepError {
    fn from(err: csv::Error) -> Self {
        SweepError::Write(err.to_string())
    }
}

impl From<zip::result::ZipError> for SweepError {
    fn from(err: zip::result::ZipError) -> Self {
        SweepError::Write(err.to_string())
    }
}

/// Why a projection request rejected a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnIssue {
    /// The table has no column with that name.
    Absent,
    /// The name appears more than once in the request.
    Duplicate,
}

impl fmt::Display for ColumnIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnIssue::Absent => write!(f, "no such column"),
            ColumnIssue::Duplicate => write!(f, "requested more than once"),
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
