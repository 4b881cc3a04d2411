//! Tracing-flame request shape.
//!
//! The tracing engine returns the services and spans of one trace. Each
//! span is enriched with display names for its categorical tags, the flow
//! log rows behind the spans are fetched separately, and all three payloads
//! are emitted as JSON text in a single fixed-field series.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Result, TransformError};
use crate::row::Row;
use crate::series::{FieldKind, FieldValue, Series, SeriesField};
use crate::tag_enum::{TagEnum, display_name};
use crate::value::ScalarValue;

pub const FLOW_LOG_DATABASE: &str = "flow_log";
pub const L7_FLOW_LOG_TABLE: &str = "l7_flow_log";

/// Tags whose codes are translated on every span.
pub const TRANSLATED_TAGS: [&str; 3] = ["l7_protocol", "response_status", "tap_side"];

/// Protocol codes that carry no meaningful name and translate to "".
const UNNAMED_PROTOCOL_CODES: [f64; 2] = [0.0, 1.0];
const PROTOCOL_TAG: &str = "l7_protocol";

pub const SERVICES_FIELD: &str = "services";
pub const TRACING_FIELD: &str = "tracing";
pub const DETAIL_LIST_FIELD: &str = "detailList";

/// Tag name to its code mapping.
pub type TagTranslations = BTreeMap<String, TagEnum>;

/// The `DATA` object of a tracing engine response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracePayload {
    pub services: Vec<Value>,
    pub tracing: Vec<Map<String, Value>>,
}

impl TracePayload {
    /// Parse a tracing engine response body. `DATA` holding an array means
    /// the trace was not found and yields `None`.
    pub fn from_response(body: &Value) -> Result<Option<Self>> {
        let data = body.get("DATA").ok_or(TransformError::MissingField("DATA"))?;
        if data.is_array() {
            return Ok(None);
        }

        let services = data
            .get(SERVICES_FIELD)
            .ok_or(TransformError::MissingField("services"))?;
        let services: Vec<Value> = serde_json::from_value(services.clone()).map_err(|e| {
            TransformError::UnexpectedShape {
                field: "services",
                detail: e.to_string(),
            }
        })?;

        let tracing = data
            .get(TRACING_FIELD)
            .ok_or(TransformError::MissingField("tracing"))?;
        let tracing: Vec<Map<String, Value>> =
            serde_json::from_value(tracing.clone()).map_err(|e| TransformError::UnexpectedShape {
                field: "tracing",
                detail: e.to_string(),
            })?;

        Ok(Some(Self { services, tracing }))
    }

    /// Flow log ids referenced by every span, in span order.
    pub fn span_ids(&self) -> Vec<String> {
        self.tracing
            .iter()
            .filter_map(|span| span.get("_ids").and_then(Value::as_array))
            .flatten()
            .filter_map(|id| match id {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Spans with an `Enum(<tag>)` entry added for every translated tag.
    pub fn enrich(self, translations: &TagTranslations) -> Self {
        let tracing = self
            .tracing
            .into_iter()
            .map(|span| enrich_span(span, translations))
            .collect();
        Self { tracing, ..self }
    }
}

fn scalar_of(value: Option<&Value>) -> ScalarValue {
    match value {
        Some(Value::Number(n)) => ScalarValue::Number(n.to_string()),
        Some(Value::String(s)) => ScalarValue::Text(s.clone()),
        _ => ScalarValue::Null,
    }
}

fn enrich_span(mut span: Map<String, Value>, translations: &TagTranslations) -> Map<String, Value> {
    for (tag, mapping) in translations {
        let raw = span.get(tag).cloned().unwrap_or(Value::Null);
        let code = scalar_of(Some(&raw));

        // TODO: protocol codes 0 and 1 are blanked without a known reason;
        // confirm with the querier owners whether other unnamed codes exist.
        let unnamed = tag == PROTOCOL_TAG
            && code
                .as_number()
                .is_some_and(|n| UNNAMED_PROTOCOL_CODES.contains(&n));

        let translated = if unnamed {
            Value::String(String::new())
        } else {
            display_name(mapping, &code)
                .and_then(|name| serde_json::to_value(name).ok())
                .unwrap_or(raw)
        };
        span.insert(format!("Enum({tag})"), translated);
    }
    span
}

/// One series holding the services, enriched spans and detail rows as
/// compact JSON text.
pub fn flame_series(
    payload: &TracePayload,
    detail_rows: &[Row],
    meta: Map<String, Value>,
) -> Result<Series> {
    let payloads = [
        (SERVICES_FIELD, serde_json::to_string(&payload.services)),
        (TRACING_FIELD, serde_json::to_string(&payload.tracing)),
        (DETAIL_LIST_FIELD, serde_json::to_string(detail_rows)),
    ];

    let fields = payloads
        .into_iter()
        .map(|(name, json)| {
            let json = json.map_err(|e| TransformError::Sink(e.to_string()))?;
            let mut field = SeriesField::new(name, FieldKind::Text);
            field.push(FieldValue::Text(json));
            Ok(field)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Series::new(fields, meta))
}
