//! Profiling request shape: a fixed four-field flame graph series.

use serde_json::{Map, Value};

use crate::error::{Result, TransformError};
use crate::project::convert;
use crate::row::{RawResult, materialize};
use crate::series::{FieldKind, Series, SeriesField};

/// Output fields in emission order. `value` and `self` are nanoseconds.
pub const PROFILE_FIELDS: [(&str, FieldKind); 4] = [
    ("level", FieldKind::NullableNumber),
    ("value", FieldKind::NullableNumber),
    ("label", FieldKind::Text),
    ("self", FieldKind::NullableNumber),
];

/// Project a profiling result into one series.
pub fn profile_series(raw: &RawResult, meta: Map<String, Value>) -> Result<Series> {
    if let Some(missing) = PROFILE_FIELDS
        .iter()
        .map(|(name, _)| *name)
        .find(|name| !raw.columns.iter().any(|column| column == name))
    {
        return Err(TransformError::MissingField(missing));
    }

    let rows = materialize(raw)?;
    let mut fields: Vec<SeriesField> = PROFILE_FIELDS
        .iter()
        .map(|(name, kind)| SeriesField::new(*name, *kind))
        .collect();

    for row in &rows {
        for ((name, kind), field) in PROFILE_FIELDS.iter().zip(fields.iter_mut()) {
            let value = row.get(*name).cloned().unwrap_or_default();
            field.push(convert(*kind, name, &value)?);
        }
    }

    tracing::debug!(frames = rows.len(), "projected profile");
    Ok(Series::new(fields, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::FieldValues;
    use crate::value::ScalarValue;

    fn columns() -> Vec<String> {
        ["label", "level", "self", "value"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_profile_fields_in_fixed_order() {
        let raw = RawResult::new(
            columns(),
            vec![
                vec!["root".into(), ScalarValue::number(0), ScalarValue::number(0), ScalarValue::number(1500)],
                vec!["main".into(), ScalarValue::number(1), "700".into(), ScalarValue::number(1500)],
            ],
        );

        let series = profile_series(&raw, Map::new()).unwrap();
        let names: Vec<&str> = series.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["level", "value", "label", "self"]);
        assert_eq!(
            series.field("self").unwrap().values,
            FieldValues::NullableNumber(vec![Some(0.0), Some(700.0)])
        );
        assert_eq!(
            series.field("label").unwrap().values,
            FieldValues::Text(vec!["root".to_string(), "main".to_string()])
        );
    }

    #[test]
    fn test_missing_column_is_named() {
        let raw = RawResult::new(
            vec!["label".to_string(), "level".to_string(), "value".to_string()],
            vec![],
        );
        assert_eq!(
            profile_series(&raw, Map::new()),
            Err(TransformError::MissingField("self"))
        );
    }

    #[test]
    fn test_null_values_yield_empty_fields() {
        let raw = RawResult {
            columns: columns(),
            values: None,
        };
        let series = profile_series(&raw, Map::new()).unwrap();
        assert_eq!(series.fields.len(), 4);
        assert!(series.is_empty());
    }

    #[test]
    fn test_non_numeric_value_is_coercion_failure() {
        let raw = RawResult::new(
            columns(),
            vec![vec!["root".into(), ScalarValue::number(0), ScalarValue::number(0), "lots".into()]],
        );
        assert!(matches!(
            profile_series(&raw, Map::new()),
            Err(TransformError::Coercion { expected: "number", .. })
        ));
    }
}
