use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{CellValue, Column, Dtype, Table};

// ---------------------------------------------------------------------------
// Cleaning operations
// ---------------------------------------------------------------------------

/// An optional cleaning step. Steps are applied in the order requested and
/// each is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanOp {
    RemoveDuplicates,
    FillMissingNumeric,
}

impl fmt::Display for CleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanOp::RemoveDuplicates => write!(f, "remove duplicates"),
            CleanOp::FillMissingNumeric => write!(f, "fill missing values"),
        }
    }
}

/// What a cleaning step changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub rows_removed: usize,
    pub cells_filled: usize,
}

impl CleanOp {
    /// Run this step, returning the cleaned table and what changed.
    pub fn apply(self, table: Table) -> (Table, CleanReport) {
        let (table, report) = match self {
            CleanOp::RemoveDuplicates => {
                let before = table.n_rows();
                let out = remove_duplicates(table);
                let report = CleanReport {
                    rows_removed: before - out.n_rows(),
                    ..CleanReport::default()
                };
                (out, report)
            }
            CleanOp::FillMissingNumeric => {
                let before = missing_numeric_cells(&table);
                let out = fill_missing_numeric(table);
                let report = CleanReport {
                    cells_filled: before - missing_numeric_cells(&out),
                    ..CleanReport::default()
                };
                (out, report)
            }
        };
        debug!("{self}: {report:?}");
        (table, report)
    }
}

/// Keep the first occurrence of each distinct row, in order.
///
/// Rows compare across all columns; missing cells equal each other.
pub fn remove_duplicates(table: Table) -> Table {
    let keep: Vec<usize> = {
        let mut seen: HashSet<Vec<&CellValue>> = HashSet::with_capacity(table.n_rows());
        (0..table.n_rows())
            .filter(|&i| seen.insert(table.row(i)))
            .collect()
    };

    if keep.len() == table.n_rows() {
        return table;
    }

    let columns = table
        .columns()
        .iter()
        .map(|c| c.with_values(keep.iter().map(|&i| c.values()[i].clone()).collect()))
        .collect();
    Table::from_columns(columns, keep.len())
}

/// Replace missing cells of every numeric column with that column's mean.
///
/// The mean is taken over the values present before filling. A numeric
/// column with no values at all is left as it is. Text columns are untouched.
pub fn fill_missing_numeric(table: Table) -> Table {
    let n_rows = table.n_rows();
    let columns = table.columns().iter().map(fill_column).collect();
    Table::from_columns(columns, n_rows)
}

fn fill_column(column: &Column) -> Column {
    if column.dtype() != Dtype::Numeric || column.missing_count() == 0 {
        return column.clone();
    }
    let Some(mean) = column_mean(column) else {
        return column.clone();
    };
    let values = column
        .values()
        .iter()
        .map(|v| match v {
            CellValue::Missing => CellValue::Number(mean),
            present => present.clone(),
        })
        .collect();
    column.with_values(values)
}

/// Arithmetic mean of the present numeric values, `None` when there are none.
///
/// When the plain sum overflows, each value is divided by the count before
/// summing instead, so the mean of finite values is always finite.
pub fn column_mean(column: &Column) -> Option<f64> {
    let present: Vec<f64> = column
        .values()
        .iter()
        .filter_map(CellValue::as_f64)
        .collect();
    if present.is_empty() {
        return None;
    }
    let count = present.len() as f64;
    let sum: f64 = present.iter().sum();
    if sum.is_finite() {
        Some(sum / count)
    } else {
        Some(present.iter().map(|v| v / count).sum())
    }
}

fn missing_numeric_cells(table: &Table) -> usize {
    table
        .columns()
        .iter()
        .filter(|c| c.dtype() == Dtype::Numeric)
        .map(Column::missing_count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::from_rows(headers.iter().map(|s| s.to_string()).collect(), rows)
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    #[test]
    fn removes_repeated_rows_keeping_first() {
        let t = table(
            &["a", "b"],
            vec![vec![n(1.0), n(2.0)], vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]],
        );
        let out = remove_duplicates(t);
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.row(0), vec![&n(1.0), &n(2.0)]);
        assert_eq!(out.row(1), vec![&n(3.0), &n(4.0)]);
    }

    #[test]
    fn missing_cells_compare_equal() {
        let t = table(
            &["a", "b"],
            vec![
                vec!["x".into(), CellValue::Missing],
                vec!["y".into(), CellValue::Missing],
                vec!["x".into(), CellValue::Missing],
            ],
        );
        let (out, report) = CleanOp::RemoveDuplicates.apply(t);
        assert_eq!(out.n_rows(), 2);
        assert_eq!(report.rows_removed, 1);
        assert_eq!(out.cell(1, "a"), Some(&CellValue::Text("y".into())));
    }

    #[test]
    fn rows_differing_in_one_column_are_kept() {
        let t = table(
            &["a", "b"],
            vec![vec![n(1.0), n(2.0)], vec![n(1.0), n(3.0)]],
        );
        assert_eq!(remove_duplicates(t).n_rows(), 2);
    }

    #[test]
    fn fills_with_mean_of_present_values() {
        let t = table(
            &["a", "b"],
            vec![vec![n(1.0), CellValue::Missing], vec![n(2.0), n(4.0)]],
        );
        let (out, report) = CleanOp::FillMissingNumeric.apply(t);
        assert_eq!(out.cell(0, "b"), Some(&n(4.0)));
        assert_eq!(report.cells_filled, 1);
    }

    #[test]
    fn mean_is_computed_before_filling() {
        let t = table(
            &["v"],
            vec![
                vec![n(1.0)],
                vec![CellValue::Missing],
                vec![n(5.0)],
                vec![CellValue::Missing],
            ],
        );
        let out = fill_missing_numeric(t);
        assert_eq!(out.cell(1, "v"), Some(&n(3.0)));
        assert_eq!(out.cell(3, "v"), Some(&n(3.0)));
    }

    #[test]
    fn text_columns_are_untouched() {
        let t = table(
            &["name", "v"],
            vec![vec!["x".into(), n(1.0)], vec![CellValue::Missing, n(2.0)]],
        );
        let out = fill_missing_numeric(t);
        assert_eq!(out.cell(1, "name"), Some(&CellValue::Missing));
        assert_eq!(out.column("name").unwrap().dtype(), Dtype::Text);
    }

    #[test]
    fn mean_of_huge_values_stays_finite() {
        let t = table(
            &["v", "w"],
            vec![
                vec![n(1e308), n(1.0)],
                vec![n(1e308), n(2.0)],
                vec![CellValue::Missing, n(3.0)],
            ],
        );
        let out = fill_missing_numeric(t);
        assert_eq!(out.cell(2, "v"), Some(&n(1e308)));

        let opposite = table(&["v"], vec![vec![n(f64::MAX)], vec![n(-f64::MAX)]]);
        assert_eq!(column_mean(opposite.column("v").unwrap()), Some(0.0));
    }

    #[test]
    fn all_missing_numeric_column_stays_missing() {
        let t = table(
            &["empty", "v"],
            vec![
                vec![CellValue::Missing, n(1.0)],
                vec![CellValue::Missing, n(2.0)],
            ],
        );
        let (out, report) = CleanOp::FillMissingNumeric.apply(t);
        assert_eq!(out.column("empty").unwrap().missing_count(), 2);
        assert_eq!(out.column("empty").unwrap().dtype(), Dtype::Numeric);
        assert_eq!(report, CleanReport::default());
    }
}
