//! Column/value wire shape to named-field rows.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, TransformError};
use crate::resource;
use crate::value::ScalarValue;

/// One materialized row. Keys iterate in lexicographic order.
pub type Row = BTreeMap<String, ScalarValue>;

/// Column emitted by the engine for stringified identifiers.
const STRINGIFIED_ID_COLUMN: &str = "toString(_id)";
const ID_COLUMN: &str = "_id";
const ID_PREFIX: &str = "id-";

/// The `result` object of a query engine response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub columns: Vec<String>,
    /// `None` when the engine answered `values: null` (no data).
    pub values: Option<Vec<Vec<ScalarValue>>>,
}

impl RawResult {
    pub fn new(columns: Vec<String>, values: Vec<Vec<ScalarValue>>) -> Self {
        Self {
            columns,
            values: Some(values),
        }
    }

    /// Extract `columns` and `values` from an engine `result` object.
    ///
    /// An absent field is a shape error, while `values: null` is the
    /// legitimate empty result.
    pub fn from_result(result: &Value) -> Result<Self> {
        let columns = result
            .get("columns")
            .ok_or(TransformError::MissingField("columns"))?;
        let columns: Vec<String> =
            serde_json::from_value(columns.clone()).map_err(|e| TransformError::UnexpectedShape {
                field: "columns",
                detail: e.to_string(),
            })?;

        let values = match result.get("values") {
            None => return Err(TransformError::MissingField("values")),
            Some(Value::Null) => None,
            Some(values) => Some(serde_json::from_value(values.clone()).map_err(|e| {
                TransformError::UnexpectedShape {
                    field: "values",
                    detail: e.to_string(),
                }
            })?),
        };

        Ok(Self { columns, values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.as_ref().is_none_or(Vec::is_empty)
    }
}

/// Zip every raw row with the column list.
pub fn materialize(raw: &RawResult) -> Result<Vec<Row>> {
    let Some(values) = raw.values.as_ref() else {
        return Ok(Vec::new());
    };

    values
        .iter()
        .enumerate()
        .map(|(index, values)| {
            if values.len() != raw.columns.len() {
                return Err(TransformError::ShapeMismatch {
                    row: index,
                    values: values.len(),
                    columns: raw.columns.len(),
                });
            }
            Ok(raw
                .columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect())
        })
        .collect()
}

/// Materialize rows for the tabular path: positional zip, the stringified
/// identifier rename, then resource field synthesis.
pub fn materialize_flow_rows(raw: &RawResult) -> Result<Vec<Row>> {
    let rows = materialize(raw)?
        .into_iter()
        .map(rename_stringified_id)
        .map(resource::enrich)
        .collect::<Vec<_>>();

    tracing::debug!(rows = rows.len(), columns = raw.columns.len(), "materialized rows");
    Ok(rows)
}

fn rename_stringified_id(mut row: Row) -> Row {
    if let Some(value) = row.remove(STRINGIFIED_ID_COLUMN) {
        row.insert(
            ID_COLUMN.to_string(),
            ScalarValue::Text(format!("{ID_PREFIX}{value}")),
        );
    }
    row
}
