//! Load CSV and Excel files, clean them, keep a column subset, preview the
//! numeric columns and convert them to CSV or Excel, all in memory.
//!
//! ```no_run
//! use data_sweeper::{process_file, FileRecord, PipelineRequest, TargetFormat, CleanOp};
//!
//! let record = FileRecord::new("sales.csv", std::fs::read("sales.csv")?);
//! let request = PipelineRequest {
//!     cleaning: vec![CleanOp::RemoveDuplicates, CleanOp::FillMissingNumeric],
//!     export: Some(TargetFormat::Xlsx),
//!     ..PipelineRequest::default()
//! };
//! let outcome = process_file(record, &request)?;
//! print!("{}", outcome.head);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod data;
pub mod error;
pub mod pipeline;

pub use data::clean::{CleanOp, CleanReport};
pub use data::export::{export, ExportArtifact, TargetFormat};
pub use data::loader::load;
pub use data::model::{CellValue, Column, Dtype, FileRecord, SourceFormat, Table};
pub use data::preview::{preview, ChartPreview, ChartSeries};
pub use data::project::project;
pub use error::{ColumnIssue, SweepError};
pub use pipeline::{
    process_batch, process_file, FileFailure, LoadedFile, PipelineOutcome, PipelineRequest,
    ProjectedFile, Stage,
};
