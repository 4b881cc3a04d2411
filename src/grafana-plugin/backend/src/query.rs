//! Decoding and validation of one panel query.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use common::config::DatasourceConfig;
use transform::{DeclaredMetric, ShowMetrics};

const TRACING_FLAME_APP: &str = "appTracingFlame";
const PROFILING_APP: &str = "profiling";

/// Instance settings entered on the datasource configuration page.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSettings {
    pub request_url: Option<String>,
    pub trace_url: Option<String>,
    pub token: Option<String>,
}

impl DataSourceSettings {
    /// Settings from the instance JSON, falling back to `defaults` per key.
    /// Requests that target no datasource instance carry no JSON at all.
    pub fn resolve(json_data: Option<&Value>, defaults: &DatasourceConfig) -> Self {
        let settings: Self = json_data
            .map(|json| {
                serde_json::from_value(json.clone()).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "ignoring malformed instance settings");
                    Self::default()
                })
            })
            .unwrap_or_default();

        Self {
            request_url: settings.request_url.or_else(|| defaults.request_url.clone()),
            trace_url: settings.trace_url.or_else(|| defaults.trace_url.clone()),
            token: settings.token.or_else(|| defaults.token.clone()),
        }
    }
}

/// Query definition as sent by the frontend. Every field is optional so
/// that absence is reported by [`validate`] in a fixed order.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuerierQuery {
    pub query_text: Option<String>,
    pub sql: Option<String>,
    pub return_metrics: Option<Vec<Value>>,
    pub return_tags: Option<Vec<Value>>,
    pub meta_extra: Option<Map<String, Value>>,
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub debug: Option<bool>,
}

/// The JSON document carried as a string in `queryText`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QueryText {
    app_type: Option<String>,
    db: Option<String>,
    sources: Option<String>,
    format_as: Option<String>,
    alias: Option<String>,
    show_metrics: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    Missing(&'static str),
    #[error("queryText is not valid JSON: {0}")]
    QueryText(String),
    #[error("returnMetrics entry {index} is missing field: {field}")]
    MetricField { index: usize, field: &'static str },
}

/// Engine endpoints for one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoints {
    pub request_url: String,
    pub trace_url: String,
    pub token: Option<String>,
}

/// Fields shared by the default and profiling shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelQuery {
    pub format_as: String,
    pub alias: String,
    pub show_metrics: ShowMetrics,
    pub metrics: Vec<DeclaredMetric>,
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppQuery {
    Default(PanelQuery),
    Profiling(PanelQuery),
    TracingFlame {
        id: String,
        debug: bool,
        meta: Map<String, Value>,
    },
}

/// A query that passed validation and can be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub endpoints: Endpoints,
    pub sql: String,
    pub db: String,
    pub sources: String,
    pub app: AppQuery,
}

/// Check `query` against the resolved `settings`. `Ok(None)` means the SQL
/// is empty and the query answers with no data.
pub fn validate(
    settings: &DataSourceSettings,
    query: QuerierQuery,
) -> Result<Option<ValidatedQuery>, ValidationError> {
    let query_text = query
        .query_text
        .as_deref()
        .ok_or(ValidationError::Missing("queryText"))?;
    let text: QueryText = serde_json::from_str(query_text)
        .map_err(|e| ValidationError::QueryText(e.to_string()))?;

    let request_url = settings
        .request_url
        .clone()
        .ok_or(ValidationError::Missing("requestUrl"))?;
    let trace_url = settings
        .trace_url
        .clone()
        .ok_or(ValidationError::Missing("traceUrl"))?;
    let sql = query.sql.ok_or(ValidationError::Missing("sql"))?;
    let return_metrics = query
        .return_metrics
        .ok_or(ValidationError::Missing("returnMetrics"))?;
    let return_tags = query
        .return_tags
        .ok_or(ValidationError::Missing("returnTags"))?;
    let app_type = text.app_type.ok_or(ValidationError::Missing("appType"))?;
    let db = text.db.ok_or(ValidationError::Missing("db"))?;
    let sources = text.sources.ok_or(ValidationError::Missing("sources"))?;

    if sql.is_empty() {
        tracing::debug!("empty sql, answering with no data");
        return Ok(None);
    }

    let endpoints = Endpoints {
        request_url,
        trace_url,
        token: settings.token.clone().filter(|t| !t.is_empty()),
    };

    let app = if app_type == TRACING_FLAME_APP {
        let id = query.id.ok_or(ValidationError::Missing("_id"))?;
        AppQuery::TracingFlame {
            id,
            debug: query.debug.unwrap_or(false),
            meta: json_object(json!({ "tags": return_tags, "metrics": return_metrics })),
        }
    } else {
        let meta_extra = query.meta_extra.ok_or(ValidationError::Missing("metaExtra"))?;
        let format_as = text.format_as.ok_or(ValidationError::Missing("formatAs"))?;
        let alias = text.alias.ok_or(ValidationError::Missing("alias"))?;
        let metrics = declared_metrics(&return_metrics)?;

        let panel = PanelQuery {
            format_as,
            alias,
            show_metrics: ShowMetrics::from_code(
                text.show_metrics
                    .filter(|code| code.fract() == 0.0)
                    .map(|code| code as i64),
            ),
            metrics,
            meta: json_object(json!({
                "returnTags": return_tags,
                "returnMetrics": return_metrics,
                "from": meta_extra.get("from").cloned().unwrap_or(Value::Null),
                "to": meta_extra.get("to").cloned().unwrap_or(Value::Null),
                "common": meta_extra.get("common").cloned().unwrap_or(Value::Null),
            })),
        };

        if app_type == PROFILING_APP {
            AppQuery::Profiling(panel)
        } else {
            AppQuery::Default(panel)
        }
    };

    Ok(Some(ValidatedQuery {
        endpoints,
        sql,
        db,
        sources,
        app,
    }))
}

fn declared_metrics(entries: &[Value]) -> Result<Vec<DeclaredMetric>, ValidationError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or(ValidationError::MetricField {
                    index,
                    field: "name",
                })?;
            let type_code = entry
                .get("type")
                .and_then(|code| code.as_i64().or_else(|| code.as_f64().map(|f| f as i64)))
                .ok_or(ValidationError::MetricField {
                    index,
                    field: "type",
                })?;
            Ok(DeclaredMetric::new(name, type_code))
        })
        .collect()
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
