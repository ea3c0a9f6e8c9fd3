use crate::{DatasourceType, Error, Metric, QueryContext, QueryParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Read access to a metrics datasource.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Evaluates `query` at `ts`.
    async fn query(
        &self,
        ctx: &QueryContext,
        query: &str,
        ts: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error>;

    /// Evaluates `query` over `[start, end]`.
    async fn query_range(
        &self,
        ctx: &QueryContext,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Metric>, Error>;
}

/// Builds independent, customized queriers from a shared base.
pub trait QuerierBuilder: Send + Sync {
    fn build_with_params(&self, params: QuerierParams) -> Box<dyn Querier>;
}

/// Per call site overrides applied on top of a base datasource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerierParams {
    pub datasource_type: Option<DatasourceType>,
    pub evaluation_interval: Duration,
    /// Values replace the base params of the same key.
    pub query_params: Option<QueryParams>,
}

impl QuerierParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datasource_type(mut self, datasource_type: DatasourceType) -> Self {
        self.datasource_type = Some(datasource_type);
        self
    }

    pub fn with_evaluation_interval(mut self, evaluation_interval: Duration) -> Self {
        self.evaluation_interval = evaluation_interval;
        self
    }

    pub fn with_query_params(mut self, query_params: QueryParams) -> Self {
        self.query_params = Some(query_params);
        self
    }
}
