use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by the query engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "OPT_STATUS", alias = "opt_status", default)]
    pub opt_status: String,
    #[serde(rename = "DESCRIPTION", alias = "description", default)]
    pub description: String,
    /// The tabular `{columns, values}` object
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub debug: Value,
}

/// Form body of a query engine request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularQuery {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    /// Sent as `data_precision`; the caller calls it `sources`
    #[serde(rename = "data_precision", skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

impl TabularQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into()).filter(|db: &String| !db.is_empty());
        self
    }

    pub fn with_sources(mut self, sources: impl Into<String>) -> Self {
        self.sources = Some(sources.into()).filter(|s: &String| !s.is_empty());
        self
    }
}

/// JSON body of a tracing engine request for one span id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "DATABASE")]
    pub database: String,
    #[serde(rename = "TABLE")]
    pub table: String,
    #[serde(rename = "MAX_ITERATION")]
    pub max_iteration: u32,
    #[serde(rename = "NETWORK_DELAY_US")]
    pub network_delay_us: u64,
    pub time_start: i64,
    pub time_end: i64,
}

impl TraceRequest {
    pub const DATABASE: &'static str = "flow_log";
    pub const TABLE: &'static str = "l7_flow_log";
    pub const MAX_ITERATION: u32 = 30;
    pub const NETWORK_DELAY_US: u64 = 3_000_000;

    pub fn new(id: impl Into<String>, time_start: i64, time_end: i64) -> Self {
        Self {
            id: id.into(),
            database: Self::DATABASE.to_string(),
            table: Self::TABLE.to_string(),
            max_iteration: Self::MAX_ITERATION,
            network_delay_us: Self::NETWORK_DELAY_US,
            time_start,
            time_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_accepts_both_casings() {
        let upper: ApiResponse = serde_json::from_value(json!({
            "OPT_STATUS": "SUCCESS",
            "DESCRIPTION": "",
            "result": {"columns": [], "values": null}
        }))
        .unwrap();
        let lower: ApiResponse = serde_json::from_value(json!({
            "opt_status": "SUCCESS",
            "description": "",
            "result": {"columns": [], "values": null}
        }))
        .unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.debug, Value::Null);
    }

    #[test]
    fn test_trace_request_body() {
        let body = serde_json::to_value(TraceRequest::new("42", 100, 200)).unwrap();
        assert_eq!(
            body,
            json!({
                "_id": "42",
                "DATABASE": "flow_log",
                "TABLE": "l7_flow_log",
                "MAX_ITERATION": 30,
                "NETWORK_DELAY_US": 3000000,
                "time_start": 100,
                "time_end": 200
            })
        );
    }

    #[test]
    fn test_empty_db_and_sources_are_omitted() {
        let query = TabularQuery::new("show databases").with_db("").with_sources("");
        assert_eq!(query.db, None);
        assert_eq!(query.sources, None);
    }
}
