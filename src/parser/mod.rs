//! Engine-specific decoding of datasource responses into [`Metric`]s.
//!
//! Parsers are pure functions of the issued request and the validated
//! response. They never see a non-200 response: status checks happen in
//! the adapter before the body is handed over.

pub mod graphite;
pub mod prometheus;

use crate::{storage::redacted, Error, Metric};
use bytes::Bytes;
use reqwest::{header::HeaderMap, Method, StatusCode};
use url::Url;

/// Descriptor of a request that was sent to the datasource.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub method: Method,
    pub url: Url,
}

impl QueryRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// Request url safe to print: the password is masked.
    pub fn redacted_url(&self) -> String {
        redacted(&self.url)
    }
}

/// Fully read datasource response.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type ParseFn = fn(&QueryRequest, QueryResponse) -> Result<Vec<Metric>, Error>;

fn decode<'a, T: serde::Deserialize<'a>>(req: &QueryRequest, body: &'a [u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|err| {
        Error::Parse(format!(
            "error parsing metrics for {}: {err}",
            req.redacted_url()
        ))
    })
}
