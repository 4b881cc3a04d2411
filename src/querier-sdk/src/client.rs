use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::SdkError;
use crate::model::{ApiResponse, TabularQuery, TraceRequest};

const QUERY_PATH: &str = "/v1/query/?debug=true";
const TRACE_PATH: &str = "/v1/stats/querier/L7FlowTracing";

/// Transport settings applied once when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the query engine and the tracing engine
#[derive(Debug, Clone)]
pub struct QuerierClient {
    request_url: String,
    trace_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl QuerierClient {
    /// Create a client for the given engine base URLs. An empty token means
    /// requests are sent without authorization.
    pub fn new(
        request_url: &str,
        trace_url: &str,
        token: Option<&str>,
        options: ClientOptions,
    ) -> Result<Self, SdkError> {
        Url::parse(request_url)?;
        Url::parse(trace_url)?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self {
            request_url: request_url.trim_end_matches('/').to_string(),
            trace_url: trace_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            http,
        })
    }

    /// Run one SQL statement against the query engine.
    pub async fn query(&self, query: &TabularQuery) -> Result<ApiResponse, SdkError> {
        if query.sql.is_empty() {
            return Err(SdkError::EmptySql);
        }

        let url = format!("{}{QUERY_PATH}", self.request_url);
        tracing::info!(db = ?query.db, sql = %query.sql, "querying engine");

        let mut request = self.http.post(&url).form(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        handle_response(request.send().await?).await
    }

    /// Fetch the span tree of one trace from the tracing engine.
    pub async fn trace(&self, trace: &TraceRequest, debug: bool) -> Result<Value, SdkError> {
        let url = format!("{}{TRACE_PATH}?debug={debug}", self.trace_url);
        tracing::info!(id = %trace.id, "requesting trace");

        let resp = self
            .http
            .post(&url)
            .header("X-User-Id", "1")
            .header("X-User-Type", "1")
            .json(trace)
            .send()
            .await?;
        handle_response(resp).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, SdkError> {
    if resp.status().is_success() {
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(status, %body, "engine request failed");
        Err(SdkError::Status { status, body })
    }
}
