use serde::Serialize;

use super::model::{CellValue, Dtype, Table};

/// Numeric columns shown in a chart preview.
const MAX_SERIES: usize = 2;

// ---------------------------------------------------------------------------
// Chart preview
// ---------------------------------------------------------------------------

/// One charted column. The row index is the implicit x-axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    /// One entry per row; `None` where the cell is missing.
    pub values: Vec<Option<f64>>,
}

impl ChartSeries {
    /// `[row, value]` pairs for the present values, ready to draw as bars.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|y| [i as f64, y]))
            .collect()
    }
}

/// Series for the first one or two numeric columns of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPreview {
    pub series: Vec<ChartSeries>,
}

/// Build a bar-chart preview from the first numeric columns in table order.
///
/// Returns `None` when the table has no numeric column; the host decides how
/// to show that.
pub fn preview(table: &Table) -> Option<ChartPreview> {
    let series: Vec<ChartSeries> = table
        .columns()
        .iter()
        .filter(|c| c.dtype() == Dtype::Numeric)
        .take(MAX_SERIES)
        .map(|c| ChartSeries {
            name: c.name().to_string(),
            values: c.values().iter().map(CellValue::as_f64).collect(),
        })
        .collect();

    if series.is_empty() {
        None
    } else {
        Some(ChartPreview { series })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::from_rows(headers.iter().map(|s| s.to_string()).collect(), rows)
    }

    #[test]
    fn picks_first_two_numeric_columns() {
        let t = table(
            &["name", "a", "b", "c"],
            vec![vec!["x".into(), "1".into(), "2".into(), "3".into()]],
        );
        let chart = preview(&t).unwrap();
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn single_numeric_column_gives_one_series() {
        let t = table(
            &["name", "v"],
            vec![vec!["x".into(), "1".into()], vec!["y".into(), "".into()]],
        );
        let chart = preview(&t).unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].values, vec![Some(1.0), None]);
        assert_eq!(chart.series[0].points(), vec![[0.0, 1.0]]);
    }

    #[test]
    fn no_numeric_columns_is_empty() {
        let t = table(&["name"], vec![vec!["x".into()]]);
        assert!(preview(&t).is_none());
    }
}
