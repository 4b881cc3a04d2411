//! The default tabular path: rows, roles, optional grouping, projection.

use serde_json::{Map, Value};

use crate::alias::resolve_alias;
use crate::classify::{FieldRoles, classify};
use crate::error::Result;
use crate::group::{KEY_DELIMITER, group_rows};
use crate::project::{DeclaredMetric, Projector};
use crate::row::{RawResult, Row, materialize_flow_rows};
use crate::series::SeriesSink;
use crate::sql::uses_group_by;
use crate::time_sort::sort_by_time;

/// Label used when a group has neither an alias nor displayable tags.
const FALLBACK_LABEL: &str = "*";

/// Caller override for prefixing metric fields with their column name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowMetrics {
    /// Prefix only when more than one metric is declared
    #[default]
    Auto,
    Always,
    Never,
}

impl ShowMetrics {
    /// Decode the `showMetrics` wire code: `1` always, `0` never, anything
    /// else automatic.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::Always,
            Some(0) => Self::Never,
            _ => Self::Auto,
        }
    }

    fn resolve(self, declared_metrics: usize) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => declared_metrics > 1,
        }
    }
}

/// What the caller declared about a tabular query.
#[derive(Debug, Clone, Default)]
pub struct TabularRequest {
    pub sql: String,
    pub format_as: String,
    pub alias: String,
    pub metrics: Vec<DeclaredMetric>,
    pub show_metrics: ShowMetrics,
}

impl TabularRequest {
    fn is_declared_metric(&self, column: &str) -> bool {
        self.metrics.iter().any(|m| m.name == column)
    }
}

/// Run the tabular pipeline over `raw`, emitting one series per group (or a
/// single series when grouping is off). Returns the number of series
/// emitted; an empty result emits nothing.
pub fn transform_tabular(
    raw: &RawResult,
    request: &TabularRequest,
    meta: &Map<String, Value>,
    sink: &mut impl SeriesSink,
) -> Result<usize> {
    let rows = materialize_flow_rows(raw)?;
    let Some(first) = rows.first() else {
        tracing::debug!("query returned no rows");
        return Ok(0);
    };

    let metric_names: Vec<&str> = request.metrics.iter().map(|m| m.name.as_str()).collect();
    let roles = classify(first, &metric_names);
    let columns: Vec<String> = first.keys().cloned().collect();

    if !uses_group_by(&request.format_as, &request.sql) {
        tracing::debug!(rows = rows.len(), "emitting ungrouped series");
        let series = Projector::new(&roles, &request.metrics).project(
            &columns,
            &columns,
            &rows,
            meta.clone(),
        )?;
        sink.emit(series)?;
        return Ok(1);
    }

    let show_metrics = request.show_metrics.resolve(request.metrics.len());
    let projector = Projector::new(&roles, &request.metrics).verify_metric_types(false);
    let groups = group_rows(rows, &roles.tags);
    let emitted = groups.len();

    for group in groups {
        let rows = match roles.sort_column() {
            Some(column) if !group.rows.is_empty() => sort_by_time(group.rows, column)?,
            _ => group.rows,
        };

        let label = series_label(&request.alias, &rows, &roles);
        let names: Vec<String> = columns
            .iter()
            .map(|column| {
                if !request.is_declared_metric(column) {
                    column.clone()
                } else if show_metrics {
                    format!("{label}-{column}")
                } else {
                    label.clone()
                }
            })
            .collect();

        tracing::trace!(group = %group.key, %label, rows = rows.len(), "emitting group");
        let series = projector
            .project(&columns, &names, &rows, meta.clone())?
            .with_group(group.key);
        sink.emit(series)?;
    }

    Ok(emitted)
}

/// Alias of the group's first row, else its displayable tag values, else
/// [`FALLBACK_LABEL`]. Tags whose name contains `_id` are not displayable.
fn series_label(alias: &str, rows: &[Row], roles: &FieldRoles) -> String {
    let Some(sample) = rows.first() else {
        return FALLBACK_LABEL.to_string();
    };

    let aliased = resolve_alias(alias, sample);
    if !aliased.is_empty() {
        return aliased;
    }

    let tags: Vec<String> = roles
        .tags
        .iter()
        .filter(|tag| !tag.contains("_id"))
        .filter_map(|tag| sample.get(tag).map(|value| value.render()))
        .collect();

    if tags.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        tags.join(KEY_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{FieldValues, Series};
    use crate::value::ScalarValue;
    use serde_json::json;

    fn raw(columns: &[&str], rows: Vec<Vec<ScalarValue>>) -> RawResult {
        RawResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn grouped_request(metrics: &[&str]) -> TabularRequest {
        TabularRequest {
            sql: "SELECT tag_a, Sum(m) AS metric_m FROM t GROUP BY tag_a".to_string(),
            format_as: "timeSeries".to_string(),
            alias: String::new(),
            metrics: metrics.iter().map(|m| DeclaredMetric::new(*m, 1)).collect(),
            show_metrics: ShowMetrics::Auto,
        }
    }

    fn run(raw: &RawResult, request: &TabularRequest) -> Vec<Series> {
        let mut sink = Vec::new();
        transform_tabular(raw, request, &Map::new(), &mut sink).unwrap();
        sink
    }

    #[test]
    fn test_grouped_time_series_end_to_end() {
        let raw = raw(
            &["time_1", "tag_a", "metric_m"],
            vec![
                vec!["1700000060".into(), "x".into(), "20".into()],
                vec!["1700000000".into(), "x".into(), "10".into()],
            ],
        );

        let series = run(&raw, &grouped_request(&["metric_m"]));
        assert_eq!(series.len(), 1);

        let metric = series[0].field("x").expect("metric field is labeled by group");
        assert_eq!(
            metric.values,
            FieldValues::NullableNumber(vec![Some(10.0), Some(20.0)])
        );
        let FieldValues::Time(times) = &series[0].field("time_1").unwrap().values else {
            panic!("time_1 should be a time field");
        };
        assert_eq!(times[0].timestamp(), 1_700_000_000);
        assert_eq!(times[1].timestamp(), 1_700_000_060);
    }

    #[test]
    fn test_multiple_metrics_are_prefixed_with_label() {
        let raw = raw(
            &["time_1", "tag_a", "m1", "m2"],
            vec![vec![ScalarValue::number(1), "x".into(), "1".into(), ScalarValue::Null]],
        );

        let series = run(&raw, &grouped_request(&["m1", "m2"]));
        assert!(series[0].field("x-m1").is_some());
        assert_eq!(
            series[0].field("x-m2").unwrap().values,
            FieldValues::NullableNumber(vec![None])
        );
        assert!(series[0].field("tag_a").is_some());
    }

    #[test]
    fn test_show_metrics_override() {
        let raw = raw(
            &["tag_a", "m1"],
            vec![vec!["x".into(), ScalarValue::number(1)]],
        );
        let mut request = grouped_request(&["m1"]);
        request.show_metrics = ShowMetrics::from_code(Some(1));
        assert!(run(&raw, &request)[0].field("x-m1").is_some());

        let mut request = grouped_request(&["m1", "m2"]);
        request.show_metrics = ShowMetrics::from_code(Some(0));
        assert!(run(&raw, &request)[0].field("x").is_some());
    }

    #[test]
    fn test_alias_labels_group() {
        let raw = raw(
            &["tag_a", "tag_b", "m"],
            vec![
                vec!["x".into(), "1".into(), ScalarValue::number(1)],
                vec!["y".into(), "2".into(), ScalarValue::number(2)],
            ],
        );
        let mut request = grouped_request(&["m"]);
        request.alias = "${tag_a}/${tag_b}".to_string();

        let series = run(&raw, &request);
        assert_eq!(series.len(), 2);
        assert!(series[0].field("x/1").is_some());
        assert!(series[1].field("y/2").is_some());
        assert_eq!(series[0].group.as_deref(), Some("x,1"));
        assert_eq!(series[1].group.as_deref(), Some("y,2"));
    }

    #[test]
    fn test_label_skips_identifier_tags() {
        let raw = raw(
            &["pod_id", "pod", "m"],
            vec![vec![ScalarValue::number(7), "web-0".into(), ScalarValue::number(1)]],
        );
        let series = run(&raw, &grouped_request(&["m"]));
        assert!(series[0].field("web-0").is_some());
    }

    #[test]
    fn test_label_falls_back_to_star() {
        let raw = raw(&["time", "m"], vec![vec![ScalarValue::number(1), ScalarValue::number(1)]]);
        let series = run(&raw, &grouped_request(&["m"]));
        assert!(series[0].field("*").is_some());
    }

    #[test]
    fn test_ungrouped_honours_text_metrics() {
        let raw = raw(
            &["protocol", "bytes"],
            vec![vec![ScalarValue::number(20), ScalarValue::text("5")]],
        );
        let request = TabularRequest {
            sql: "SELECT protocol, bytes FROM t".to_string(),
            format_as: "table".to_string(),
            metrics: vec![DeclaredMetric::new("protocol", 7), DeclaredMetric::new("bytes", 1)],
            ..Default::default()
        };

        let series = run(&raw, &request);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].group, None);
        assert_eq!(
            series[0].field("protocol").unwrap().values,
            FieldValues::Text(vec!["20".to_string()])
        );
        assert_eq!(
            series[0].field("bytes").unwrap().values,
            FieldValues::NullableNumber(vec![Some(5.0)])
        );
    }

    #[test]
    fn test_group_sort_failure_aborts() {
        let raw = raw(
            &["time_1", "tag_a", "m"],
            vec![
                vec![ScalarValue::number(1), "x".into(), ScalarValue::number(1)],
                vec!["later".into(), "x".into(), ScalarValue::number(1)],
            ],
        );
        let mut sink = Vec::new();
        let result = transform_tabular(&raw, &grouped_request(&["m"]), &Map::new(), &mut sink);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_result_emits_nothing() {
        let empty = RawResult {
            columns: vec!["a".to_string()],
            values: None,
        };
        let mut sink = Vec::new();
        let emitted =
            transform_tabular(&empty, &grouped_request(&[]), &Map::new(), &mut sink).unwrap();
        assert_eq!(emitted, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_meta_is_forwarded_unchanged() {
        let raw = raw(&["a"], vec![vec!["x".into()]]);
        let meta = json!({"returnTags": [{"name": "a"}], "from": 1})
            .as_object()
            .cloned()
            .unwrap();
        let mut sink = Vec::new();
        transform_tabular(&raw, &TabularRequest::default(), &meta, &mut sink).unwrap();
        assert_eq!(sink[0].meta, meta);
    }
}
