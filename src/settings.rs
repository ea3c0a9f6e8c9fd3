use crate::{redacted, AuthConfig, AuthProvider, DatasourceType, QueryParams, VmStorage};
use config::{Config, File};
use serde::{de::IgnoredAny, Deserialize};
use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub datasource: DatasourceSettings,

    // Is required as we deny unknown fields, but allow users provide
    // path to config through PREFIX__CONFIG env variable.
    #[serde(rename = "config")]
    pub config_path: IgnoredAny,
}

#[serde_with::serde_as]
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasourceSettings {
    pub url: Url,
    #[serde(rename = "type")]
    pub datasource_type: DatasourceType,
    /// Prepend `/prometheus` or `/graphite` to request paths.
    pub append_type_prefix: bool,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub lookback: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub query_step: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub evaluation_interval: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub http_timeout: Duration,
    pub extra_params: BTreeMap<String, Vec<String>>,
    pub basic_auth: Option<BasicAuthSettings>,
    pub bearer_token: Option<String>,
    /// Static headers in `Name: value` form.
    pub headers: Vec<String>,
}

impl Default for DatasourceSettings {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8428").expect("valid url"),
            datasource_type: DatasourceType::default(),
            append_type_prefix: false,
            lookback: Duration::ZERO,
            query_step: Duration::ZERO,
            evaluation_interval: Duration::ZERO,
            http_timeout: Duration::from_secs(30),
            extra_params: BTreeMap::new(),
            basic_auth: None,
            bearer_token: None,
            headers: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthSettings {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// Secrets are skipped so settings can be logged on startup.
impl fmt::Debug for DatasourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceSettings")
            .field("url", &redacted(&self.url))
            .field("datasource_type", &self.datasource_type)
            .field("append_type_prefix", &self.append_type_prefix)
            .field("lookback", &self.lookback)
            .field("query_step", &self.query_step)
            .field("evaluation_interval", &self.evaluation_interval)
            .field("http_timeout", &self.http_timeout)
            .field("extra_params", &self.extra_params)
            .field("basic_auth", &self.basic_auth)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl fmt::Debug for BasicAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthSettings")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl DatasourceSettings {
    pub fn auth(&self) -> anyhow::Result<Option<AuthConfig>> {
        if self.basic_auth.is_some() && self.bearer_token.is_some() {
            anyhow::bail!("only one of basic_auth and bearer_token can be set");
        }
        let mut auth = match (&self.basic_auth, &self.bearer_token) {
            (Some(basic), _) => AuthConfig::basic(&basic.username, &basic.password)?,
            (_, Some(token)) => AuthConfig::bearer(token)?,
            (None, None) => AuthConfig::new(),
        };
        for header in &self.headers {
            auth = auth.with_header_line(header)?;
        }
        Ok((!auth.is_empty()).then_some(auth))
    }

    /// Builds the base adapter with its own http client.
    pub fn build(&self) -> anyhow::Result<VmStorage> {
        let client = reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()?;
        let mut storage = VmStorage::new(self.url.as_str(), client)
            .with_datasource_type(self.datasource_type)
            .with_append_type_prefix(self.append_type_prefix)
            .with_look_back(self.lookback)
            .with_query_step(self.query_step)
            .with_evaluation_interval(self.evaluation_interval)
            .with_extra_params(QueryParams::from(self.extra_params.clone()));
        if let Some(auth) = self.auth()? {
            let auth: Arc<dyn AuthProvider> = Arc::new(auth);
            storage = storage.with_auth(auth);
        }
        tracing::info!(url = %redacted(&self.url), engine = %self.datasource_type, "datasource configured");
        Ok(storage)
    }
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let config_path = std::env::var("METRICS_DATASOURCE__CONFIG");

        let mut builder = Config::builder();
        if let Ok(config_path) = config_path {
            builder = builder.add_source(File::with_name(&config_path));
        };
        let environment = config::Environment::with_prefix("METRICS_DATASOURCE")
            .try_parsing(true)
            .separator("__")
            .list_separator(";")
            .with_list_parse_key("datasource.headers");
        builder = builder.add_source(environment);

        let settings: Settings = builder.build()?.try_deserialize()?;

        Ok(settings)
    }
}
