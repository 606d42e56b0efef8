//! Runtime configuration.
//!
//! # Responsibility
//! - Select the store backend and identity strategy.
//! - Carry search projection, CSV and logging settings.
//! - Read `INTERVENTIONS_*` variables for executables.
//!
//! # Invariants
//! - Backend selection is an injection decision; the engine never branches
//!   on which backend it was given.

use crate::export::csv::{CsvError, CsvOptions};
use crate::identity::IdStrategy;
use crate::search::filter::SearchProjection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_FILE_NAME: &str = "interventions.sqlite3";
pub const DEFAULT_REMOTE_TABLE: &str = "interventions";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const ENV_BACKEND: &str = "INTERVENTIONS_BACKEND";
const ENV_DB_PATH: &str = "INTERVENTIONS_DB_PATH";
const ENV_REMOTE_URL: &str = "INTERVENTIONS_REMOTE_URL";
const ENV_REMOTE_API_KEY: &str = "INTERVENTIONS_REMOTE_API_KEY";
const ENV_REMOTE_TABLE: &str = "INTERVENTIONS_REMOTE_TABLE";
const ENV_CONNECT_TIMEOUT_MS: &str = "INTERVENTIONS_CONNECT_TIMEOUT_MS";
const ENV_REQUEST_TIMEOUT_MS: &str = "INTERVENTIONS_REQUEST_TIMEOUT_MS";
const ENV_ID_STRATEGY: &str = "INTERVENTIONS_ID_STRATEGY";
const ENV_SEARCH_FIELDS: &str = "INTERVENTIONS_SEARCH_FIELDS";
const ENV_CSV_DELIMITER: &str = "INTERVENTIONS_CSV_DELIMITER";
const ENV_LOG_LEVEL: &str = "INTERVENTIONS_LOG_LEVEL";
const ENV_LOG_DIR: &str = "INTERVENTIONS_LOG_DIR";
const ENV_SESSION: &str = "INTERVENTIONS_SESSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Engine behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub id_strategy: IdStrategy,
    /// "Session present" signal from the external identity provider.
    pub authenticated: bool,
}

impl EngineConfig {
    pub fn new(id_strategy: IdStrategy) -> Self {
        Self {
            id_strategy,
            authenticated: true,
        }
    }

    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

/// Connection settings for the REST backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub connect_timeout: Duration,
    /// Read/write timeout applied to every request.
    pub request_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: DEFAULT_REMOTE_TABLE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Local { db_path: PathBuf },
    Remote(RemoteConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging is enabled only when set; must be absolute.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Everything an executable needs to wire the engine.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub engine: EngineConfig,
    pub search: SearchProjection,
    pub csv: CsvOptions,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or blank keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match get(ENV_BACKEND).as_deref().unwrap_or("local") {
            "local" => BackendConfig::Local {
                db_path: get(ENV_DB_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME)),
            },
            "remote" => {
                let base_url = get(ENV_REMOTE_URL).ok_or(ConfigError::Missing(ENV_REMOTE_URL))?;
                let api_key =
                    get(ENV_REMOTE_API_KEY).ok_or(ConfigError::Missing(ENV_REMOTE_API_KEY))?;
                let mut remote = RemoteConfig::new(base_url, api_key);
                if let Some(table) = get(ENV_REMOTE_TABLE) {
                    remote = remote.with_table(table);
                }
                if let Some(value) = get(ENV_CONNECT_TIMEOUT_MS) {
                    remote.connect_timeout = parse_millis(ENV_CONNECT_TIMEOUT_MS, &value)?;
                }
                if let Some(value) = get(ENV_REQUEST_TIMEOUT_MS) {
                    remote.request_timeout = parse_millis(ENV_REQUEST_TIMEOUT_MS, &value)?;
                }
                BackendConfig::Remote(remote)
            }
            other => {
                return Err(invalid(ENV_BACKEND, other, "expected local|remote"));
            }
        };

        let id_strategy = match get(ENV_ID_STRATEGY) {
            Some(value) => IdStrategy::parse(&value)
                .ok_or_else(|| invalid(ENV_ID_STRATEGY, &value, "expected client|server"))?,
            None => IdStrategy::default(),
        };

        let authenticated = match get(ENV_SESSION) {
            Some(value) => parse_flag(ENV_SESSION, &value)?,
            None => true,
        };

        let search = match get(ENV_SEARCH_FIELDS) {
            Some(value) => SearchProjection::from_names(value.split(','))
                .map_err(|name| invalid(ENV_SEARCH_FIELDS, &value, &format!("unknown field `{name}`")))?,
            None => SearchProjection::default(),
        };

        let csv = match get(ENV_CSV_DELIMITER) {
            Some(value) => {
                let mut chars = value.chars();
                let delimiter = match (chars.next(), chars.next()) {
                    (Some(delimiter), None) => delimiter,
                    _ => return Err(invalid(ENV_CSV_DELIMITER, &value, "expected one character")),
                };
                CsvOptions::default()
                    .with_delimiter(delimiter)
                    .map_err(|err: CsvError| invalid(ENV_CSV_DELIMITER, &value, &err.to_string()))?
            }
            None => CsvOptions::default(),
        };

        let mut logging = LoggingConfig::default();
        if let Some(level) = get(ENV_LOG_LEVEL) {
            logging.level = level;
        }
        logging.log_dir = get(ENV_LOG_DIR).map(PathBuf::from);

        Ok(Self {
            backend,
            engine: EngineConfig::new(id_strategy).with_authenticated(authenticated),
            search,
            csv,
            logging,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(invalid(key, value, "timeout must be positive")),
        Ok(millis) => Ok(Duration::from_millis(millis)),
        Err(err) => Err(invalid(key, value, &err.to_string())),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "present" => Ok(true),
        "0" | "false" | "no" | "absent" => Ok(false),
        _ => Err(invalid(key, value, "expected true|false")),
    }
}
