/// Result type alias for transformation operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors raised while turning an engine response into series.
///
/// Every variant is fatal for the request that produced it.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransformError {
    /// A required wire field is absent from the engine response
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A row does not line up with the column list
    #[error("row {row} has {values} values but the result declares {columns} columns")]
    ShapeMismatch {
        row: usize,
        values: usize,
        columns: usize,
    },

    /// A wire field holds a value of the wrong JSON kind
    #[error("unexpected value for {field}: {detail}")]
    UnexpectedShape { field: &'static str, detail: String },

    /// A value could not be coerced to the kind its column requires
    #[error("type assertion failed: column {column}, value {value}, expected {expected}")]
    Coercion {
        column: String,
        value: String,
        expected: &'static str,
    },

    /// The series sink refused a finished series
    #[error("failed to emit series: {0}")]
    Sink(String),
}

impl TransformError {
    pub(crate) fn coercion(column: &str, value: impl ToString, expected: &'static str) -> Self {
        Self::Coercion {
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_the_field() {
        let err = TransformError::MissingField("values");
        assert_eq!(err.to_string(), "missing field: values");
    }

    #[test]
    fn test_coercion_names_column_value_and_kind() {
        let err = TransformError::coercion("time_1", "abc", "timestamp");
        let msg = err.to_string();
        assert!(msg.contains("time_1"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("timestamp"));
    }
}
