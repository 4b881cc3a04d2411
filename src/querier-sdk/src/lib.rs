mod client;
mod error;
mod model;

pub use client::{ClientOptions, QuerierClient};
pub use error::SdkError;
pub use model::{ApiResponse, TabularQuery, TraceRequest};

use serde_json::Value;

/// The two engine calls the datasource makes. Implemented by
/// [`QuerierClient`] and by in-memory fakes in tests.
#[async_trait::async_trait]
pub trait QuerierApi: Send + Sync {
    async fn query(&self, query: &TabularQuery) -> Result<ApiResponse, SdkError>;

    async fn trace(&self, trace: &TraceRequest, debug: bool) -> Result<Value, SdkError>;
}

#[async_trait::async_trait]
impl QuerierApi for QuerierClient {
    async fn query(&self, query: &TabularQuery) -> Result<ApiResponse, SdkError> {
        QuerierClient::query(self, query).await
    }

    async fn trace(&self, trace: &TraceRequest, debug: bool) -> Result<Value, SdkError> {
        QuerierClient::trace(self, trace, debug).await
    }
}
