//! Typed output series and the sink they are emitted into.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;

/// Declared element type of an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Time,
    /// Numbers with a distinct "no value" marker
    NullableNumber,
    Text,
}

/// Column values of one output field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    NullableNumber(Vec<Option<f64>>),
    Text(Vec<String>),
}

impl FieldValues {
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Time => Self::Time(Vec::new()),
            FieldKind::NullableNumber => Self::NullableNumber(Vec::new()),
            FieldKind::Text => Self::Text(Vec::new()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Time(_) => FieldKind::Time,
            Self::NullableNumber(_) => FieldKind::NullableNumber,
            Self::Text(_) => FieldKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Time(values) => values.len(),
            Self::NullableNumber(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single typed value, appended to a field of the same kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Time(DateTime<Utc>),
    NullableNumber(Option<f64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesField {
    pub name: String,
    pub values: FieldValues,
}

impl SeriesField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::empty(kind),
        }
    }

    /// Append `value`. Values of another kind are a programming error and
    /// are dropped with a warning.
    pub fn push(&mut self, value: FieldValue) {
        match (&mut self.values, value) {
            (FieldValues::Time(values), FieldValue::Time(v)) => values.push(v),
            (FieldValues::NullableNumber(values), FieldValue::NullableNumber(v)) => values.push(v),
            (FieldValues::Text(values), FieldValue::Text(v)) => values.push(v),
            (values, value) => {
                tracing::warn!(
                    field = %self.name,
                    declared = ?values.kind(),
                    ?value,
                    "dropping value of mismatched kind"
                );
            }
        }
    }
}

/// One output series. `meta` is caller context forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub fields: Vec<SeriesField>,
    pub meta: Map<String, Value>,
    /// Group key on the grouped path, `None` for a single ungrouped series
    pub group: Option<String>,
}

impl Series {
    pub fn new(fields: Vec<SeriesField>, meta: Map<String, Value>) -> Self {
        Self {
            fields,
            meta,
            group: None,
        }
    }

    pub fn with_group(mut self, key: impl Into<String>) -> Self {
        self.group = Some(key.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&SeriesField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Number of rows, taken from the first field.
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, |field| field.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiver of finished series, one call per group.
pub trait SeriesSink {
    fn emit(&mut self, series: Series) -> Result<()>;
}

impl SeriesSink for Vec<Series> {
    fn emit(&mut self, series: Series) -> Result<()> {
        self.push(series);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_matching_kind() {
        let mut field = SeriesField::new("m", FieldKind::NullableNumber);
        field.push(FieldValue::NullableNumber(Some(1.0)));
        field.push(FieldValue::NullableNumber(None));
        assert_eq!(field.values, FieldValues::NullableNumber(vec![Some(1.0), None]));
    }

    #[test]
    fn test_push_mismatched_kind_is_dropped() {
        let mut field = SeriesField::new("m", FieldKind::Text);
        field.push(FieldValue::NullableNumber(Some(1.0)));
        assert!(field.values.is_empty());
    }

    #[test]
    fn test_vec_sink_collects_series() {
        let mut sink: Vec<Series> = Vec::new();
        sink.emit(Series::default()).unwrap();
        assert_eq!(sink.len(), 1);
    }
}
