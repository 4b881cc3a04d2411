/// Errors from the querier SDK
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// HTTP transport error, including timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The engine answered with a non-success status
    #[error("engine returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// JSON deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// A base URL could not be parsed
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The query engine refuses an empty statement
    #[error("sql must not be empty")]
    EmptySql,
}
