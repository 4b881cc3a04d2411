//! Per-column type decisions and value conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::FieldRoles;
use crate::error::{Result, TransformError};
use crate::row::Row;
use crate::series::{FieldKind, FieldValue, Series, SeriesField};
use crate::value::ScalarValue;

/// Type code of a categorical metric that renders as text.
pub const TEXT_METRIC_TYPE: i64 = 7;

/// A metric the caller asked for, as `(name, type-code)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredMetric {
    pub name: String,
    #[serde(rename = "type")]
    pub type_code: i64,
}

impl DeclaredMetric {
    pub fn new(name: impl Into<String>, type_code: i64) -> Self {
        Self {
            name: name.into(),
            type_code,
        }
    }
}

/// Decides each column's field kind and converts values into it.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    roles: &'a FieldRoles,
    metrics: &'a [DeclaredMetric],
    verify_metric_types: bool,
}

impl<'a> Projector<'a> {
    pub fn new(roles: &'a FieldRoles, metrics: &'a [DeclaredMetric]) -> Self {
        Self {
            roles,
            metrics,
            verify_metric_types: true,
        }
    }

    /// Whether text-typed metrics (type-code 7) are honoured. When off,
    /// every declared metric projects as a nullable number.
    pub fn verify_metric_types(mut self, verify: bool) -> Self {
        self.verify_metric_types = verify;
        self
    }

    pub fn kind_of(&self, column: &str) -> FieldKind {
        if self.roles.is_time(column) {
            return FieldKind::Time;
        }

        let mut declared = self.metrics.iter().filter(|m| m.name == column).peekable();
        if declared.peek().is_none() {
            return FieldKind::Text;
        }

        if !self.verify_metric_types || declared.any(|m| m.type_code != TEXT_METRIC_TYPE) {
            FieldKind::NullableNumber
        } else {
            FieldKind::Text
        }
    }

    pub fn convert(&self, column: &str, value: &ScalarValue) -> Result<FieldValue> {
        convert(self.kind_of(column), column, value)
    }

    /// Project `rows` into a series with one field per column. `names` maps
    /// each column position to its exposed field name.
    pub fn project(
        &self,
        columns: &[String],
        names: &[String],
        rows: &[Row],
        meta: Map<String, Value>,
    ) -> Result<Series> {
        let kinds: Vec<FieldKind> = columns.iter().map(|c| self.kind_of(c)).collect();
        let mut fields: Vec<SeriesField> = names
            .iter()
            .zip(&kinds)
            .map(|(name, kind)| SeriesField::new(name.clone(), *kind))
            .collect();

        for row in rows {
            for ((column, kind), field) in columns.iter().zip(&kinds).zip(fields.iter_mut()) {
                let value = row.get(column).cloned().unwrap_or_default();
                field.push(convert(*kind, column, &value)?);
            }
        }

        Ok(Series::new(fields, meta))
    }
}

/// Convert one value into `kind`.
pub fn convert(kind: FieldKind, column: &str, value: &ScalarValue) -> Result<FieldValue> {
    match kind {
        FieldKind::Time => value
            .as_number()
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds.trunc() as i64, 0))
            .map(FieldValue::Time)
            .ok_or_else(|| TransformError::coercion(column, value, "timestamp")),
        FieldKind::NullableNumber => match value {
            ScalarValue::Null => Ok(FieldValue::NullableNumber(None)),
            other => other
                .to_f64(column)
                .map(|number| FieldValue::NullableNumber(Some(number))),
        },
        FieldKind::Text => Ok(FieldValue::Text(value.render())),
    }
}
