use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use once_cell::sync::OnceCell;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// File consulted by [`Configuration::load`], relative to the working directory.
pub const CONFIG_FILE: &str = "querier-datasource.toml";
/// Environment prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "QUERIER_DS__";

/// Engine endpoints used when the Grafana instance settings omit them.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DatasourceConfig {
    /// Base URL of the query engine
    pub request_url: Option<String>,
    /// Base URL of the tracing engine
    pub trace_url: Option<String>,
    /// Bearer token sent to the query engine
    pub token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout applied to every engine call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Configuration {
    pub datasource: DatasourceConfig,
    pub http: HttpConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Defaults, then the TOML file at `path` if present, then the environment.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let config: Self = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        tracing::debug!(
            timeout = ?config.http.timeout,
            request_url = ?config.datasource.request_url,
            "loaded configuration"
        );
        Ok(config)
    }

    /// The process-wide configuration, loaded on first use.
    pub fn global() -> Result<&'static Configuration, Box<figment::Error>> {
        CONFIG.get_or_try_init(Self::load)
    }
}
