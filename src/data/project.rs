use std::collections::HashSet;

use super::model::Table;
use crate::error::{ColumnIssue, Result, SweepError};

/// Keep exactly `names`, in that order, with all rows unchanged.
///
/// Fails without touching `table` when a name is absent or requested twice.
pub fn project<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<Table> {
    let mut requested: HashSet<&str> = HashSet::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());

    for name in names.iter().map(AsRef::as_ref) {
        if !requested.insert(name) {
            return Err(SweepError::UnknownColumn {
                column: name.to_string(),
                issue: ColumnIssue::Duplicate,
            });
        }
        let column = table.column(name).ok_or_else(|| SweepError::UnknownColumn {
            column: name.to_string(),
            issue: ColumnIssue::Absent,
        })?;
        columns.push(column.clone());
    }

    Ok(Table::from_columns(columns, table.n_rows()))
}
