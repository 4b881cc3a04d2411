//! Runtime encoding of a single wire scalar.
//!
//! The engine sends no schema, so every cell is classified by what it
//! actually holds. Numbers keep the text they arrived with; strings that
//! parse as a finite number still count as numeric-encoded because the
//! engine commonly transmits numbers as strings.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, TransformError};

/// One cell of a tabular result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    #[default]
    Null,
    /// A JSON number, kept as its source text
    Number(String),
    Text(String),
}

impl ScalarValue {
    pub fn number(value: impl ToString) -> Self {
        Self::Number(value.to_string())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The float value when the cell is numeric-encoded.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(text) | Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// String form used for labels, group keys and text fields.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Coerce to a float, failing with a type assertion error for `column`.
    pub fn to_f64(&self, column: &str) -> Result<f64> {
        self.as_number()
            .ok_or_else(|| TransformError::coercion(column, self, "number"))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number(text) | Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Number(value.to_string())
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Number(text) => {
                if let Ok(int) = text.parse::<i64>() {
                    serializer.serialize_i64(int)
                } else if let Ok(uint) = text.parse::<u64>() {
                    serializer.serialize_u64(uint)
                } else {
                    match text.parse::<f64>() {
                        Ok(float) if float.is_finite() => serializer.serialize_f64(float),
                        _ => serializer.serialize_str(text),
                    }
                }
            }
        }
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = ScalarValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string or null")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Null)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Number(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Number(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Number(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(ScalarValue::Text(v))
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_string_is_numeric_encoded() {
        let value = ScalarValue::text("3.14");
        assert!(value.is_numeric());
        assert_eq!(value.as_number(), Some(3.14));
    }

    #[test]
    fn test_plain_text_is_not_numeric() {
        for text in ["10.0.0.1", "HTTP", "", "NaN", "inf"] {
            assert!(!ScalarValue::text(text).is_numeric(), "{text}");
        }
    }

    #[test]
    fn test_null_is_neither_numeric_nor_text() {
        let value = ScalarValue::Null;
        assert!(value.is_null());
        assert!(!value.is_numeric());
        assert_eq!(value.render(), "null");
    }

    #[test]
    fn test_number_renders_source_text() {
        let value: ScalarValue = serde_json::from_value(json!(1700000000)).unwrap();
        assert_eq!(value, ScalarValue::Number("1700000000".to_string()));
        assert_eq!(value.render(), "1700000000");
    }

    #[test]
    fn test_deserialize_rejects_non_scalars() {
        assert!(serde_json::from_value::<ScalarValue>(json!(true)).is_err());
        assert!(serde_json::from_value::<ScalarValue>(json!([1])).is_err());
        assert!(serde_json::from_value::<ScalarValue>(json!({"a": 1})).is_err());
    }

    #[test]
    fn test_serialize_keeps_json_kinds() {
        let row = vec![
            ScalarValue::number(42),
            ScalarValue::number(1.5),
            ScalarValue::text("42"),
            ScalarValue::Null,
        ];
        assert_eq!(serde_json::to_value(&row).unwrap(), json!([42, 1.5, "42", null]));
    }

    #[test]
    fn test_to_f64_reports_column_on_failure() {
        let err = ScalarValue::text("abc").to_f64("metric_m").unwrap_err();
        assert_eq!(
            err,
            TransformError::Coercion {
                column: "metric_m".to_string(),
                value: "abc".to_string(),
                expected: "number",
            }
        );
    }
}
