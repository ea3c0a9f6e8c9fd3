mod graphite;
mod prometheus;

use crate::{
    parser::{self, ParseFn, QueryRequest, QueryResponse},
    AuthProvider, DatasourceType, Error, Metric, Querier, QuerierBuilder, QuerierParams,
    QueryContext, QueryParams,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use reqwest_middleware::ClientWithMiddleware;
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

/// Longest part of a failed response body kept in the error.
const MAX_BODY_EXCERPT: usize = 4096;

/// Datasource adapter for Prometheus- and Graphite-compatible backends.
///
/// The http client and the auth provider are shared between clones, the
/// rest of the configuration is owned by every clone. Customized adapters
/// are derived with [`QuerierBuilder::build_with_params`], which never
/// touches the adapter it is called on.
#[derive(Clone)]
pub struct VmStorage {
    client: ClientWithMiddleware,
    auth: Option<Arc<dyn AuthProvider>>,
    datasource_url: String,
    append_type_prefix: bool,
    look_back: Duration,
    query_step: Duration,

    datasource_type: DatasourceType,
    evaluation_interval: Duration,
    extra_params: QueryParams,
}

impl VmStorage {
    pub fn new(base_url: &str, client: impl Into<ClientWithMiddleware>) -> Self {
        Self {
            client: client.into(),
            auth: None,
            datasource_url: base_url.trim_end_matches('/').to_string(),
            append_type_prefix: false,
            look_back: Duration::ZERO,
            query_step: Duration::ZERO,
            datasource_type: DatasourceType::default(),
            evaluation_interval: Duration::ZERO,
            extra_params: QueryParams::new(),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Prepends `/prometheus` or `/graphite` to request paths, as required
    /// by cluster deployments that serve both APIs behind one address.
    pub fn with_append_type_prefix(mut self, append_type_prefix: bool) -> Self {
        self.append_type_prefix = append_type_prefix;
        self
    }

    /// Shifts the evaluation timestamp of instant queries into the past.
    pub fn with_look_back(mut self, look_back: Duration) -> Self {
        self.look_back = look_back;
        self
    }

    /// Explicit `step` param, takes precedence over the evaluation interval.
    pub fn with_query_step(mut self, query_step: Duration) -> Self {
        self.query_step = query_step;
        self
    }

    /// Default `step` for range queries, replaced by [`Self::apply_params`].
    pub fn with_evaluation_interval(mut self, evaluation_interval: Duration) -> Self {
        self.evaluation_interval = evaluation_interval;
        self
    }

    pub fn with_datasource_type(mut self, datasource_type: DatasourceType) -> Self {
        self.datasource_type = datasource_type;
        self
    }

    pub fn with_extra_params(mut self, extra_params: QueryParams) -> Self {
        self.extra_params = extra_params;
        self
    }

    /// Applies the overrides. Consumes the adapter, so it can only be
    /// called on an owned value such as a fresh clone.
    pub fn apply_params(mut self, params: QuerierParams) -> Self {
        if let Some(datasource_type) = params.datasource_type {
            self.datasource_type = datasource_type;
        }
        self.evaluation_interval = params.evaluation_interval;
        if let Some(query_params) = params.query_params {
            self.extra_params.merge_override(&query_params);
        }
        self
    }

    pub fn datasource_url(&self) -> &str {
        &self.datasource_url
    }

    pub fn datasource_type(&self) -> DatasourceType {
        self.datasource_type
    }

    pub fn evaluation_interval(&self) -> Duration {
        self.evaluation_interval
    }

    pub fn look_back(&self) -> Duration {
        self.look_back
    }

    pub fn query_step(&self) -> Duration {
        self.query_step
    }

    pub fn append_type_prefix(&self) -> bool {
        self.append_type_prefix
    }

    pub fn extra_params(&self) -> &QueryParams {
        &self.extra_params
    }

    /// Executes an instant query and returns the parsed response.
    #[tracing::instrument(skip(self, ctx), level = "debug", fields(engine = %self.datasource_type))]
    pub async fn query(
        &self,
        ctx: &QueryContext,
        query: &str,
        ts: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error> {
        let mut url = self.request_url()?;
        let parse: ParseFn = match self.datasource_type {
            DatasourceType::Prometheus => {
                self.set_prometheus_instant_params(&mut url, query, ts);
                parser::prometheus::parse_response
            }
            DatasourceType::Graphite => {
                self.set_graphite_params(&mut url, query, ts);
                parser::graphite::parse_response
            }
        };
        self.execute(ctx, url, parse).await
    }

    /// Executes `query` over the given time range.
    /// Only the Prometheus engine supports range queries.
    #[tracing::instrument(skip(self, ctx), level = "debug", fields(engine = %self.datasource_type))]
    pub async fn query_range(
        &self,
        ctx: &QueryContext,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error> {
        if !self.datasource_type.supports_range_queries() {
            return Err(Error::UnsupportedOperation(self.datasource_type));
        }
        if is_unset(start) {
            return Err(Error::MissingParameter("start"));
        }
        if is_unset(end) {
            return Err(Error::MissingParameter("end"));
        }
        let mut url = self.request_url()?;
        let parse: ParseFn = match self.datasource_type {
            DatasourceType::Prometheus => {
                self.set_prometheus_range_params(&mut url, query, start, end);
                parser::prometheus::parse_response
            }
            DatasourceType::Graphite => {
                return Err(Error::UnsupportedOperation(self.datasource_type));
            }
        };
        self.execute(ctx, url, parse).await
    }

    fn request_url(&self) -> Result<Url, Error> {
        Url::parse(&self.datasource_url)
            .map_err(|err| Error::RequestBuild(format!("invalid datasource url: {err}")))
    }

    fn request_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.auth {
            auth.set_headers(&mut headers, true)?;
        }
        Ok(headers)
    }

    /// Params shared by every engine: the ones already present in the
    /// datasource url, overridden by the extra params.
    fn base_params(&self, url: &Url) -> QueryParams {
        let mut params = QueryParams::from_url(url);
        for (key, values) in self.extra_params.iter() {
            params.set_all(key.clone(), values.clone());
        }
        params
    }

    fn append_path(&self, url: &mut Url, type_prefix: &str, path: &str) {
        let prefix = if self.append_type_prefix { type_prefix } else { "" };
        let full_path = format!("{}{prefix}{path}", url.path().trim_end_matches('/'));
        url.set_path(&full_path);
    }

    async fn execute(
        &self,
        ctx: &QueryContext,
        url: Url,
        parse: ParseFn,
    ) -> Result<Vec<Metric>, Error> {
        let headers = self.request_headers()?;
        let req = QueryRequest::new(Method::POST, url);
        let resp = ctx.run(self.send(&req, headers)).await?;
        parse(&req, resp)
    }

    async fn send(&self, req: &QueryRequest, headers: HeaderMap) -> Result<QueryResponse, Error> {
        let endpoint = req.redacted_url();
        tracing::debug!(url = %endpoint, "sending datasource request");

        let response = self
            .client
            .request(req.method.clone(), req.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(url = %endpoint, "datasource request failed");
                Error::transport(endpoint.clone(), err)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(url = %endpoint, status = status.as_u16(), "unexpected datasource response");
            let body = read_partial_body(response).await;
            return Err(Error::UnexpectedStatus {
                code: status.as_u16(),
                endpoint,
                body: body_excerpt(&body),
            });
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::transport(endpoint.clone(), err.into()))?;
        Ok(QueryResponse {
            status,
            headers,
            body,
        })
    }
}

impl fmt::Debug for VmStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmStorage")
            .field("datasource_url", &self.datasource_url)
            .field("auth", &self.auth)
            .field("append_type_prefix", &self.append_type_prefix)
            .field("look_back", &self.look_back)
            .field("query_step", &self.query_step)
            .field("datasource_type", &self.datasource_type)
            .field("evaluation_interval", &self.evaluation_interval)
            .field("extra_params", &self.extra_params)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Querier for VmStorage {
    async fn query(
        &self,
        ctx: &QueryContext,
        query: &str,
        ts: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error> {
        VmStorage::query(self, ctx, query, ts).await
    }

    async fn query_range(
        &self,
        ctx: &QueryContext,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error> {
        VmStorage::query_range(self, ctx, query, start, end).await
    }
}

impl QuerierBuilder for VmStorage {
    fn build_with_params(&self, params: QuerierParams) -> Box<dyn Querier> {
        Box::new(self.clone().apply_params(params))
    }
}

/// Url with the password masked, safe for logs and error messages.
pub fn redacted(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut url = url.clone();
    // Only fails for urls that cannot carry credentials in the first place.
    let _ = url.set_password(Some("xxxxx"));
    url.to_string()
}

fn is_unset(ts: DateTime<Utc>) -> bool {
    ts == DateTime::<Utc>::default() || ts == DateTime::<Utc>::MIN_UTC
}

/// `ts` moved `by` into the past, saturating at the earliest representable time.
fn shift_back(ts: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|by| ts.checked_sub_signed(by))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Formats a duration the way Prometheus parses `step`. Prometheus has
/// millisecond precision, so shorter steps are rounded up to `1ms`.
fn format_step(step: Duration) -> String {
    let millis = step.as_millis().max(1);
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

/// Reads the body of a failed response up to the excerpt limit. A broken
/// body keeps whatever arrived before the failure.
async fn read_partial_body(mut response: reqwest::Response) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() < MAX_BODY_EXCERPT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err.without_url(), "failed to read datasource response body");
                break;
            }
        }
    }
    body
}

fn body_excerpt(body: &[u8]) -> String {
    let excerpt = &body[..body.len().min(MAX_BODY_EXCERPT)];
    String::from_utf8_lossy(excerpt).into_owned()
}
