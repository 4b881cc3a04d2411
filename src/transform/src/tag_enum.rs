//! Display names for categorical tag codes.
//!
//! A `show tag <name> values from <table>` query answers with
//! `(code, display name)` rows. Codes are compared through their rendered
//! form, so `0` and `"0"` name the same entry.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TransformError};
use crate::value::ScalarValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDisplay {
    pub display_name: ScalarValue,
}

/// Raw code to display name.
pub type TagEnum = BTreeMap<String, TagDisplay>;

/// SQL listing the values of `tag` in `table`.
pub fn show_tag_values_sql(tag: &str, table: &str) -> String {
    format!("show tag {tag} values from {table}")
}

/// Build the code mapping from a `show tag values` result object.
///
/// A missing `values` field means the backend is malformed; `values: null`
/// means the tag has no values and yields an empty mapping.
pub fn translate(result: &Value) -> Result<TagEnum> {
    let rows = match result.get("values") {
        None => return Err(TransformError::MissingField("values")),
        Some(Value::Null) => return Ok(TagEnum::new()),
        Some(values) => serde_json::from_value::<Vec<Vec<ScalarValue>>>(values.clone()).map_err(
            |e| TransformError::UnexpectedShape {
                field: "values",
                detail: e.to_string(),
            },
        )?,
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let mut cells = row.into_iter();
            match (cells.next(), cells.next()) {
                (Some(code), Some(display_name)) => {
                    Ok((code.render(), TagDisplay { display_name }))
                }
                _ => Err(TransformError::UnexpectedShape {
                    field: "values",
                    detail: format!("row {index} is not a (code, display name) pair"),
                }),
            }
        })
        .collect()
}

/// Translate `code`, if the mapping knows it.
pub fn display_name<'a>(translations: &'a TagEnum, code: &ScalarValue) -> Option<&'a ScalarValue> {
    translations
        .get(&code.render())
        .map(|entry| &entry.display_name)
}
