mod frames;
mod handler;
mod query;

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use common::Configuration;
use frames::FrameSink;
use futures::FutureExt;
use grafana_plugin_sdk::{backend, data, prelude::*};
use handler::{TimeRange, run_query};
use querier_sdk::{ClientOptions, QuerierClient};
use query::{DataSourceSettings, Endpoints, QuerierQuery, validate};
use thiserror::Error;
use tokio::sync::Mutex;

/// Querier datasource plugin for Grafana
#[derive(Clone, Debug, Default, GrafanaPlugin)]
#[grafana_plugin(plugin_type = "datasource")]
pub struct QuerierDataSource {
    config: Arc<Configuration>,
    /// One client, and so one connection pool, per set of endpoints
    clients: Arc<Mutex<HashMap<Endpoints, QuerierClient>>>,
}

/// Query error type
#[derive(Debug, Error)]
#[error("Error querying the querier for query {}", .ref_id)]
pub struct QueryError {
    ref_id: String,
    #[source]
    source: anyhow::Error,
}

impl backend::DataQueryError for QueryError {
    fn ref_id(self) -> String {
        self.ref_id
    }
}

impl QuerierDataSource {
    pub fn new(config: Configuration) -> Self {
        tracing::info!(
            timeout = ?config.http.timeout,
            connect_timeout = ?config.http.connect_timeout,
            "querier datasource initialized"
        );
        Self {
            config: Arc::new(config),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.config.http.timeout,
            connect_timeout: self.config.http.connect_timeout,
        }
    }

    /// Get or create the client for `endpoints`.
    async fn client_for(&self, endpoints: &Endpoints) -> anyhow::Result<QuerierClient> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(endpoints) {
            return Ok(client.clone());
        }

        tracing::debug!(
            request_url = %endpoints.request_url,
            trace_url = %endpoints.trace_url,
            "creating querier client"
        );
        let client = QuerierClient::new(
            &endpoints.request_url,
            &endpoints.trace_url,
            endpoints.token.as_deref(),
            self.client_options(),
        )?;
        clients.insert(endpoints.clone(), client.clone());
        Ok(client)
    }

    /// Validate and run one query, returning its frames.
    async fn handle_query(
        &self,
        settings: &DataSourceSettings,
        query: backend::DataQuery<QuerierQuery>,
    ) -> anyhow::Result<Vec<data::Frame>> {
        let range = TimeRange {
            from: query.time_range.from.timestamp(),
            to: query.time_range.to.timestamp(),
        };
        let Some(validated) = validate(settings, query.query)? else {
            return Ok(Vec::new());
        };

        let client = self.client_for(&validated.endpoints).await?;

        let mut sink = FrameSink::default();
        let emitted = run_query(&client, validated, range, &mut sink).await?;
        tracing::debug!(emitted, "query finished");

        Ok(sink.into_frames())
    }
}

#[async_trait::async_trait]
impl backend::DataService for QuerierDataSource {
    type Query = QuerierQuery;
    type QueryError = QueryError;
    type Stream = backend::BoxDataResponseStream<Self::QueryError>;

    async fn query_data(
        &self,
        request: backend::QueryDataRequest<Self::Query, Self>,
    ) -> Self::Stream {
        tracing::debug!(
            "Received query_data request with {} queries",
            request.queries.len()
        );

        let json_data = request
            .plugin_context
            .instance_settings
            .as_ref()
            .map(|instance| &instance.json_data);
        let settings = DataSourceSettings::resolve(json_data, &self.config.datasource);
        let datasource = self.clone();

        Box::pin(
            request
                .queries
                .into_iter()
                .map(|query| {
                    let ds = datasource.clone();
                    let settings = settings.clone();
                    async move {
                        let ref_id = query.ref_id.clone();
                        let frames = isolate(&ref_id, ds.handle_query(&settings, query)).await?;
                        respond(ref_id, &frames)
                    }
                })
                .collect::<futures::stream::FuturesOrdered<_>>(),
        )
    }
}

/// Run one query's work so that its failure, panics included, is reported
/// against `ref_id` alone.
async fn isolate<F>(ref_id: &str, work: F) -> Result<Vec<data::Frame>, QueryError>
where
    F: Future<Output = anyhow::Result<Vec<data::Frame>>>,
{
    AssertUnwindSafe(work)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(panic_error(panic)))
        .map_err(|e| {
            tracing::error!("Query failed for ref_id {}: {:?}", ref_id, e);
            QueryError {
                ref_id: ref_id.to_string(),
                source: e,
            }
        })
}

/// Check every frame and wrap them in the response for `ref_id`.
fn respond(ref_id: String, frames: &[data::Frame]) -> Result<backend::DataResponse, QueryError> {
    let checked = frames
        .iter()
        .map(data::Frame::check)
        .collect::<Result<Vec<_>, _>>();

    match checked {
        Ok(checked) => Ok(backend::DataResponse::new(ref_id, checked)),
        Err(e) => {
            tracing::error!("Frame validation failed for ref_id {}: {:?}", ref_id, e);
            Err(QueryError {
                ref_id,
                source: anyhow::anyhow!("frame validation failed: {e}"),
            })
        }
    }
}

fn panic_error(panic: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    anyhow::anyhow!("query panicked: {message}")
}

#[grafana_plugin_sdk::main(
    services(data),
    init_subscriber = true,
    shutdown_handler = "0.0.0.0:10000"
)]
async fn plugin() -> QuerierDataSource {
    let config = Configuration::global().cloned().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default configuration");
        Configuration::default()
    });
    QuerierDataSource::new(config)
}
