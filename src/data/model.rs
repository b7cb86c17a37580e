use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// Equality and hashing treat `Missing == Missing` and `-0.0 == 0.0` so rows
/// can be compared for duplicate removal.
#[derive(Debug, Clone)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Interpret raw text from a file: blank means missing.
    pub fn from_raw(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(s.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Try to interpret the value as an `f64`.
    ///
    /// Text counts when it parses as a finite number after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => parse_number(s),
            CellValue::Missing => None,
        }
    }

    /// Field text used by the serializers; missing cells are empty.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            other => other.to_string(),
        }
    }

    fn number_bits(v: f64) -> u64 {
        // Collapse -0.0 onto 0.0 so they compare and hash alike.
        if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                Self::number_bits(*a) == Self::number_bits(*b)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Missing, CellValue::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Number(v) => Self::number_bits(*v).hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Missing => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Shortest round-trip form: 1.0 prints as "1", 2.5 as "2.5".
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "<null>"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_raw(s)
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Numeric,
    Text,
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::Numeric => write!(f, "numeric"),
            Dtype::Text => write!(f, "text"),
        }
    }
}

/// A named, dtype-tagged sequence of cells.
///
/// Numeric columns only hold `Number` or `Missing`; text columns only hold
/// `Text` or `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: Dtype,
    values: Vec<CellValue>,
}

impl Column {
    /// Infer the dtype from raw cells and normalize them to it.
    ///
    /// A column is numeric when every non-missing cell parses as a number,
    /// which includes a column with no values at all.
    pub fn infer(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        let numeric = cells
            .iter()
            .all(|c| c.is_missing() || c.as_f64().is_some());

        let (dtype, values) = if numeric {
            let values = cells
                .into_iter()
                .map(|c| c.as_f64().map_or(CellValue::Missing, CellValue::Number))
                .collect();
            (Dtype::Numeric, values)
        } else {
            let values = cells
                .into_iter()
                .map(|c| match c {
                    CellValue::Missing => CellValue::Missing,
                    CellValue::Text(s) => CellValue::Text(s),
                    number => CellValue::Text(number.to_string()),
                })
                .collect();
            (Dtype::Text, values)
        };

        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Rebuild a column with the same name and dtype around new cells.
    pub(crate) fn with_values(&self, values: Vec<CellValue>) -> Self {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

// ---------------------------------------------------------------------------
// Table – the loaded dataset
// ---------------------------------------------------------------------------

/// Ordered, uniquely named columns sharing one row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from a header row and data rows, inferring dtypes.
    ///
    /// Header names are made unique (see [`unique_headers`]). Short rows are
    /// padded with missing cells; cells beyond the header width are ignored,
    /// so loaders must reject over-long rows before calling this.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let names = unique_headers(headers);
        let n_rows = rows.len();

        let mut cells: Vec<Vec<CellValue>> = names
            .iter()
            .map(|_| Vec::with_capacity(n_rows))
            .collect();
        for row in rows {
            let mut row = row.into_iter();
            for col in cells.iter_mut() {
                col.push(row.next().unwrap_or(CellValue::Missing));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();
        Table { columns, n_rows }
    }

    /// Assemble already-typed columns. Callers uphold the length and
    /// uniqueness invariants.
    pub(crate) fn from_columns(columns: Vec<Column>, n_rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == n_rows));
        Table { columns, n_rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Cell at (row, column name).
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.column(column)?.values.get(row)
    }

    /// Cells of one row in column order. `row` must be below `n_rows`.
    pub(crate) fn row(&self, row: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[row]).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// The first `n` rows, for tabular previews.
    pub fn head(&self, n: usize) -> Table {
        let n_rows = n.min(self.n_rows);
        let columns = self
            .columns
            .iter()
            .map(|c| c.with_values(c.values[..n_rows].to_vec()))
            .collect();
        Table { columns, n_rows }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                rendered
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(s, &w)| format!("{s:<w$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "{}", line(self.column_names()))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rendered {
            writeln!(f, "{}", line(row.iter().map(String::as_str).collect()))?;
        }
        Ok(())
    }
}

/// Make header names unique the way spreadsheet tools do: a blank name
/// becomes `Unnamed: {position}` and repeats get `.1`, `.2`, … suffixes.
pub fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    headers
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let base = if raw.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                raw
            };
            let mut name = base.clone();
            let mut k = 1;
            while taken.contains(&name) {
                name = format!("{base}.{k}");
                k += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

// ---------------------------------------------------------------------------
// FileRecord – one uploaded artifact
// ---------------------------------------------------------------------------

/// Input file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Resolve a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            _ => Err(SweepError::UnsupportedFormat { extension: ext }),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "CSV"),
            SourceFormat::Xlsx => write!(f, "Excel"),
        }
    }
}

/// Raw bytes of one uploaded file plus what the name tells us about it.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: String,
    /// Lowercased extension without the dot; empty when the name has none.
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        FileRecord {
            name,
            extension,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infers_numeric_when_all_present_values_parse() {
        let col = Column::infer("v", vec!["1".into(), "".into(), " 2.5 ".into()]);
        assert_eq!(col.dtype(), Dtype::Numeric);
        assert_eq!(
            col.values(),
            &[CellValue::Number(1.0), CellValue::Missing, CellValue::Number(2.5)]
        );
    }

    #[test]
    fn one_word_makes_the_column_text() {
        let col = Column::infer("v", vec!["1".into(), "two".into(), CellValue::Number(3.0)]);
        assert_eq!(col.dtype(), Dtype::Text);
        assert_eq!(col.values()[2], CellValue::Text("3".into()));
    }

    #[test]
    fn all_missing_column_is_numeric() {
        let col = Column::infer("v", vec![CellValue::Missing, "  ".into()]);
        assert_eq!(col.dtype(), Dtype::Numeric);
        assert_eq!(col.missing_count(), 2);
    }

    #[test]
    fn non_finite_spellings_stay_text() {
        let col = Column::infer("v", vec!["inf".into(), "1".into()]);
        assert_eq!(col.dtype(), Dtype::Text);
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(CellValue::Number(-0.0), CellValue::Number(0.0));
        assert_ne!(CellValue::Number(0.0), CellValue::Missing);
    }

    #[test]
    fn headers_are_made_unique() {
        let names = unique_headers(strings(&["a", "", "a", "a", "b"]));
        assert_eq!(names, strings(&["a", "Unnamed: 1", "a.1", "a.2", "b"]));
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let table = Table::from_rows(strings(&["a", "b"]), vec![vec!["1".into()]]);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.cell(0, "b"), Some(&CellValue::Missing));
    }

    #[test]
    fn head_keeps_first_rows() {
        let rows = (0..8).map(|i| vec![CellValue::Number(i as f64)]).collect();
        let table = Table::from_rows(strings(&["n"]), rows);
        let head = table.head(5);
        assert_eq!(head.n_rows(), 5);
        assert_eq!(head.cell(4, "n"), Some(&CellValue::Number(4.0)));
        assert_eq!(table.head(20).n_rows(), 8);
    }

    #[test]
    fn out_of_range_access_is_none() {
        let rows = (0..3).map(|i| vec![CellValue::Number(i as f64)]).collect();
        let table = Table::from_rows(strings(&["n"]), rows);
        assert_eq!(table.cell(99, "n"), None);
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.rows().count(), table.n_rows());
    }

    #[test]
    fn display_renders_aligned_grid() {
        let table = Table::from_rows(
            strings(&["name", "v"]),
            vec![vec!["x".into(), "10".into()], vec!["yy".into(), "".into()]],
        );
        let text = table.to_string();
        assert_eq!(text, "name | v\n-----+-------\nx    | 10\nyy   | <null>\n");
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(SourceFormat::from_extension(".CSV").unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_extension("xlsx").unwrap(), SourceFormat::Xlsx);
        assert!(matches!(
            SourceFormat::from_extension("txt"),
            Err(SweepError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn file_record_reads_extension_from_name() {
        let record = FileRecord::new("Report.XLSX", vec![0; 2048]);
        assert_eq!(record.extension, "xlsx");
        assert_eq!(record.size(), 2048);
        assert!((record.size_kb() - 2.0).abs() < f64::EPSILON);
    }
}
