use crate::DatasourceType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("engine not found: {0:?}")]
    UnsupportedEngine(String),
    #[error("\"{0}\" is not supported for range queries")]
    UnsupportedOperation(DatasourceType),
    #[error("{0} param is missing")]
    MissingParameter(&'static str),
    #[error("cannot build request: {0}")]
    RequestBuild(String),
    #[error("error getting response from {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest_middleware::Error,
    },
    #[error("unexpected response code {code} for {endpoint}. Response body {body}")]
    UnexpectedStatus {
        code: u16,
        endpoint: String,
        body: String,
    },
    #[error("response error, errorType: {error_type}, error: {message}")]
    Query { error_type: String, message: String },
    #[error("cannot parse response: {0}")]
    Parse(String),
    #[error("query cancelled")]
    Cancelled,
    #[error("query deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Stripping the url keeps credentials embedded in the endpoint out of the message.
    pub(crate) fn transport(endpoint: String, source: reqwest_middleware::Error) -> Self {
        let source = match source {
            reqwest_middleware::Error::Reqwest(err) => {
                reqwest_middleware::Error::Reqwest(err.without_url())
            }
            other => other,
        };
        Error::Transport { endpoint, source }
    }

    /// Whether the error was produced by the caller's context rather than the backend.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}
