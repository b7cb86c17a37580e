use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use data_sweeper::{
    process_batch, CleanOp, FileRecord, PipelineOutcome, PipelineRequest, TargetFormat,
};

/// Transform files between CSV and Excel formats with built-in data cleaning
/// and a numeric preview.
#[derive(Debug, Parser)]
#[command(name = "data-sweeper", version)]
struct Cli {
    /// Files to process (.csv or .xlsx)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON pipeline request; the flags below add to it
    #[arg(long)]
    request: Option<PathBuf>,

    /// Drop repeated rows, keeping the first
    #[arg(long)]
    remove_duplicates: bool,

    /// Fill missing numeric cells with the column mean
    #[arg(long)]
    fill_missing: bool,

    /// Columns to keep, comma-separated, in output order
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Show the first numeric columns as series
    #[arg(long)]
    visualize: bool,

    /// Convert to this format (csv or xlsx)
    #[arg(long)]
    to: Option<TargetFormat>,

    /// Directory for converted files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Rows shown in the table preview
    #[arg(long)]
    preview_rows: Option<usize>,
}

impl Cli {
    fn pipeline_request(&self) -> Result<PipelineRequest> {
        let mut request = match &self.request {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading request {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing request {}", path.display()))?
            }
            None => PipelineRequest::default(),
        };

        if self.remove_duplicates && !request.cleaning.contains(&CleanOp::RemoveDuplicates) {
            request.cleaning.push(CleanOp::RemoveDuplicates);
        }
        if self.fill_missing && !request.cleaning.contains(&CleanOp::FillMissingNumeric) {
            request.cleaning.push(CleanOp::FillMissingNumeric);
        }
        if let Some(columns) = &self.columns {
            request.columns = Some(columns.clone());
        }
        request.visualize |= self.visualize;
        if self.to.is_some() {
            request.export = self.to;
        }
        if let Some(rows) = self.preview_rows {
            request.preview_rows = rows;
        }
        Ok(request)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let request = cli.pipeline_request()?;

    let mut failures = 0;
    let mut records = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        match read_record(path) {
            Ok(record) => records.push((path.clone(), record)),
            Err(err) => {
                eprintln!("error: {err:#}");
                failures += 1;
            }
        }
    }

    let (paths, records): (Vec<PathBuf>, Vec<FileRecord>) = records.into_iter().unzip();
    let results = process_batch(records, &request);

    for (path, result) in paths.iter().zip(results) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(failure) => {
                eprintln!("error: {failure}");
                failures += 1;
                continue;
            }
        };
        report(&outcome);
        if let Err(err) = save_artifact(&outcome, path, &cli.out_dir) {
            eprintln!("error: {err:#}");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed", cli.files.len());
    }
    println!("All files processed successfully!");
    Ok(())
}

fn read_record(path: &Path) -> Result<FileRecord> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    Ok(FileRecord::new(name, bytes))
}

fn report(outcome: &PipelineOutcome) {
    println!("File name: {}", outcome.file_name);
    println!("File size: {:.2} KB", outcome.size_kb);
    for (op, report) in &outcome.cleaning {
        match op {
            CleanOp::RemoveDuplicates => {
                println!("Duplicates removed: {} rows", report.rows_removed);
            }
            CleanOp::FillMissingNumeric => {
                println!("Missing values filled: {} cells", report.cells_filled);
            }
        }
    }
    println!("Preview of the first {} rows", outcome.head.n_rows());
    print!("{}", outcome.head);

    match &outcome.chart {
        Some(chart) => {
            for series in &chart.series {
                let points = series.points();
                let min = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
                let max = points.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);
                println!(
                    "Series {}: {} bars, range {min} .. {max}",
                    series.name,
                    points.len()
                );
            }
        }
        None => info!("{}: no numeric columns to chart", outcome.file_name),
    }
    println!();
}

fn save_artifact(outcome: &PipelineOutcome, source: &Path, out_dir: &Path) -> Result<()> {
    let Some(artifact) = &outcome.artifact else {
        return Ok(());
    };
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let target = out_dir.join(&artifact.filename);
    if target.exists() && same_file(&target, source) {
        warn!("refusing to overwrite input {}", source.display());
        bail!(
            "{} would overwrite its own input; choose another --out-dir",
            source.display()
        );
    }
    std::fs::write(&target, &artifact.buffer)
        .with_context(|| format!("writing {}", target.display()))?;
    println!(
        "Wrote {} ({}, {} bytes)",
        target.display(),
        artifact.content_type,
        artifact.buffer.len()
    );
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
