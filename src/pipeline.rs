use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::clean::{CleanOp, CleanReport};
use crate::data::export::{export, ExportArtifact, TargetFormat};
use crate::data::loader::load;
use crate::data::model::{FileRecord, Table};
use crate::data::preview::{preview, ChartPreview};
use crate::data::project::project;
use crate::error::SweepError;

const DEFAULT_PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Pipeline request
// ---------------------------------------------------------------------------

/// What to do with one file: which cleaning steps, which columns, which
/// outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineRequest {
    /// Cleaning steps, applied in this order.
    pub cleaning: Vec<CleanOp>,
    /// Columns to keep, in output order. `None` keeps every column.
    pub columns: Option<Vec<String>>,
    /// Whether to build a chart preview.
    pub visualize: bool,
    /// Export target, if any.
    pub export: Option<TargetFormat>,
    /// Rows in the tabular preview.
    pub preview_rows: usize,
}

impl Default for PipelineRequest {
    fn default() -> Self {
        Self {
            cleaning: Vec::new(),
            columns: None,
            visualize: false,
            export: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file stages
// ---------------------------------------------------------------------------

/// Stages that can fail, reported alongside the failure. Cleaning and
/// chart previews cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Project,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Project => "project",
            Stage::Export => "export",
        };
        write!(f, "{name}")
    }
}

/// A failure tied to the file and stage that produced it.
#[derive(Debug, Error)]
#[error("{file}: {stage} failed: {source}")]
pub struct FileFailure {
    pub file: String,
    pub stage: Stage,
    #[source]
    pub source: SweepError,
}

/// A file whose table has been loaded and may still be cleaned.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub record: FileRecord,
    table: Table,
}

impl LoadedFile {
    /// Parse the record's bytes according to its extension.
    pub fn load(record: FileRecord) -> Result<Self, FileFailure> {
        match load(&record.bytes, &record.extension) {
            Ok(table) => Ok(LoadedFile { record, table }),
            Err(source) => Err(FileFailure {
                file: record.name,
                stage: Stage::Load,
                source,
            }),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Apply one cleaning step; may be called any number of times.
    pub fn clean(self, op: CleanOp) -> (Self, CleanReport) {
        let LoadedFile { record, table } = self;
        let (table, report) = op.apply(table);
        (LoadedFile { record, table }, report)
    }

    /// Restrict to `columns`, or keep all of them for `None`.
    ///
    /// Borrows `self`, so a rejected column list leaves the loaded table
    /// available to the caller.
    pub fn project(&self, columns: Option<&[String]>) -> Result<ProjectedFile, FileFailure> {
        let table = match columns {
            Some(names) => project(&self.table, names).map_err(|source| FileFailure {
                file: self.record.name.clone(),
                stage: Stage::Project,
                source,
            })?,
            None => self.table.clone(),
        };
        Ok(ProjectedFile {
            name: self.record.name.clone(),
            table,
        })
    }
}

/// A projected table, read-only from here on.
#[derive(Debug, Clone)]
pub struct ProjectedFile {
    pub name: String,
    table: Table,
}

impl ProjectedFile {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn preview(&self) -> Option<ChartPreview> {
        preview(&self.table)
    }

    pub fn export(&self, format: TargetFormat) -> Result<ExportArtifact, FileFailure> {
        export(&self.table, &self.name, format).map_err(|source| FileFailure {
            file: self.name.clone(),
            stage: Stage::Export,
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Running a request
// ---------------------------------------------------------------------------

/// Everything produced for one file.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub file_name: String,
    pub size_kb: f64,
    /// First rows of the cleaned, projected table.
    pub head: Table,
    pub cleaning: Vec<(CleanOp, CleanReport)>,
    pub chart: Option<ChartPreview>,
    pub artifact: Option<ExportArtifact>,
}

/// Run `request` against one file.
pub fn process_file(
    record: FileRecord,
    request: &PipelineRequest,
) -> Result<PipelineOutcome, FileFailure> {
    let size_kb = record.size_kb();
    let mut loaded = LoadedFile::load(record)?;
    debug!(
        "{}: loaded {} rows, columns {:?}",
        loaded.record.name,
        loaded.table.n_rows(),
        loaded.table.column_names()
    );

    let mut cleaning = Vec::with_capacity(request.cleaning.len());
    for &op in &request.cleaning {
        let (next, report) = loaded.clean(op);
        loaded = next;
        cleaning.push((op, report));
    }

    let projected = loaded.project(request.columns.as_deref())?;
    let chart = if request.visualize {
        projected.preview()
    } else {
        None
    };
    let artifact = request
        .export
        .map(|format| projected.export(format))
        .transpose()?;

    info!(
        "{}: {} rows × {} columns processed",
        projected.name,
        projected.table.n_rows(),
        projected.table.n_cols()
    );

    Ok(PipelineOutcome {
        file_name: projected.name.clone(),
        size_kb,
        head: projected.table.head(request.preview_rows),
        cleaning,
        chart,
        artifact,
    })
}

/// Run `request` against every file in parallel.
///
/// Results come back in input order; one file failing never stops the rest.
pub fn process_batch(
    records: Vec<FileRecord>,
    request: &PipelineRequest,
) -> Vec<Result<PipelineOutcome, FileFailure>> {
    records
        .into_par_iter()
        .map(|record| {
            let result = process_file(record, request);
            if let Err(failure) = &result {
                warn!("{failure}");
            }
            result
        })
        .collect()
}
