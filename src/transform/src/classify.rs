//! Metric/time/tag role assignment.

use crate::row::Row;

/// Semantic role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Metric,
    Time,
    Tag,
}

/// Partition of a result's columns, each list in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRoles {
    pub metrics: Vec<String>,
    pub times: Vec<String>,
    pub tags: Vec<String>,
}

impl FieldRoles {
    /// Column the time sorter orders by: the first time column.
    pub fn sort_column(&self) -> Option<&str> {
        self.times.first().map(String::as_str)
    }

    pub fn is_time(&self, column: &str) -> bool {
        self.times.iter().any(|c| c == column)
    }
}

/// Classify every column of `sample` against the declared metric names.
///
/// A declared metric name wins even when the name also contains `time`.
/// A `time` column only counts as time when its sampled value is
/// numeric-encoded; otherwise it is a tag. The roles are computed once from
/// the first row and assumed to hold for the whole result.
pub fn classify<S: AsRef<str>>(sample: &Row, metric_names: &[S]) -> FieldRoles {
    let mut roles = FieldRoles::default();

    for (column, value) in sample {
        let role = if metric_names.iter().any(|m| m.as_ref() == column) {
            FieldRole::Metric
        } else if column.contains("time") && value.is_numeric() {
            FieldRole::Time
        } else {
            FieldRole::Tag
        };

        match role {
            FieldRole::Metric => roles.metrics.push(column.clone()),
            FieldRole::Time => roles.times.push(column.clone()),
            FieldRole::Tag => roles.tags.push(column.clone()),
        }
    }

    tracing::trace!(?roles, "classified columns");
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarValue;

    fn sample() -> Row {
        [
            ("time_1", ScalarValue::text("1700000000")),
            ("tag_a", ScalarValue::text("x")),
            ("metric_m", ScalarValue::text("10")),
            ("response_time_label", ScalarValue::text("slow")),
            ("start_time", ScalarValue::number(12)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_classify_partitions_columns() {
        let roles = classify(&sample(), &["metric_m"]);
        assert_eq!(roles.metrics, vec!["metric_m"]);
        assert_eq!(roles.times, vec!["start_time", "time_1"]);
        assert_eq!(roles.tags, vec!["response_time_label", "tag_a"]);
        assert_eq!(roles.sort_column(), Some("start_time"));
    }

    #[test]
    fn test_metric_wins_over_time_heuristic() {
        let roles = classify(&sample(), &["start_time"]);
        assert_eq!(roles.metrics, vec!["start_time"]);
        assert_eq!(roles.times, vec!["time_1"]);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let first = classify(&sample(), &["metric_m"]);
        for _ in 0..5 {
            assert_eq!(classify(&sample(), &["metric_m"]), first);
        }
    }

    #[test]
    fn test_null_time_column_is_a_tag() {
        let mut row = sample();
        row.insert("time_1".to_string(), ScalarValue::Null);
        let roles = classify(&row, &["metric_m"]);
        assert!(!roles.is_time("time_1"));
        assert!(roles.tags.contains(&"time_1".to_string()));
    }
}
