mod auth;
mod context;
mod datasource_type;
mod error;
mod metric;
mod params;
mod querier;
mod settings;
mod storage;

pub mod parser;

pub use auth::{AuthConfig, AuthProvider};
pub use context::QueryContext;
pub use datasource_type::DatasourceType;
pub use error::Error;
pub use metric::{Metric, Sample};
pub use params::QueryParams;
pub use querier::{Querier, QuerierBuilder, QuerierParams};
pub use settings::{BasicAuthSettings, DatasourceSettings, Settings};
pub use storage::{redacted, VmStorage};
