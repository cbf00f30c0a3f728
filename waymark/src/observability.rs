//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;

/// Subscriber settings. `RUST_LOG` wins over the default filter.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: LogFormat,
    pub default_filter: String,
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_filter: "info".to_string(),
            with_target: true,
        }
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Installs the global subscriber. Returns `false` if one was already
    /// installed.
    pub fn init(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.filter());

        let result = match self.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(self.with_target),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_target(self.with_target),
                )
                .try_init(),
        };

        result.is_ok()
    }
}
