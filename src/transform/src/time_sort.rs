//! Ascending ordering of a group's rows by its time column.

use crate::error::{Result, TransformError};
use crate::row::Row;

/// Sort `rows` ascending by `column`, truncated to whole seconds.
///
/// The sort is stable, so rows sharing a timestamp keep arrival order. Any
/// row whose time value is not numeric-encoded aborts the whole sort.
pub fn sort_by_time(rows: Vec<Row>, column: &str) -> Result<Vec<Row>> {
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let key = time_key(&row, column)?;
            Ok((key, row))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Truncated integer value of a row's time column.
pub fn time_key(row: &Row, column: &str) -> Result<i64> {
    let value = row.get(column).cloned().unwrap_or_default();
    value
        .as_number()
        .map(|seconds| seconds.trunc() as i64)
        .ok_or_else(|| TransformError::coercion(column, &value, "timestamp"))
}
