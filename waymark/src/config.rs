//! Environment configuration.
//!
//! ```text
//! WAYMARK_HOST          bind address          (default 127.0.0.1)
//! WAYMARK_PORT          bind port             (default 3000)
//! WAYMARK_API_ROOT      route root segment    (default api)
//! WAYMARK_PROJECT_ROOT  source search root    (optional)
//! WAYMARK_LOG_FORMAT    pretty | json         (default pretty)
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const HOST_VAR: &str = "WAYMARK_HOST";
pub const PORT_VAR: &str = "WAYMARK_PORT";
pub const API_ROOT_VAR: &str = "WAYMARK_API_ROOT";
pub const PROJECT_ROOT_VAR: &str = "WAYMARK_PROJECT_ROOT";
pub const LOG_FORMAT_VAR: &str = "WAYMARK_LOG_FORMAT";

/// Loads `.env` from the current directory or a parent, if present.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Invalid {
                key: LOG_FORMAT_VAR,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaymarkConfig {
    pub host: String,
    pub port: u16,
    pub api_root: String,
    pub project_root: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for WaymarkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_root: "api".to_string(),
            project_root: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl WaymarkConfig {
    /// Reads the configuration from the process environment. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: PORT_VAR,
                value: port.clone(),
            })?;
        }
        if let Some(api_root) = lookup(API_ROOT_VAR) {
            let api_root = api_root.trim().trim_matches('/');
            if api_root.is_empty() {
                return Err(ConfigError::Invalid {
                    key: API_ROOT_VAR,
                    value: api_root.to_string(),
                });
            }
            config.api_root = api_root.to_string();
        }
        if let Some(root) = lookup(PROJECT_ROOT_VAR).filter(|r| !r.trim().is_empty()) {
            config.project_root = Some(PathBuf::from(root));
        }
        if let Some(format) = lookup(LOG_FORMAT_VAR) {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
