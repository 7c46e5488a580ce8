//! Tracing initialisation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate overrides, e.g. `chainbroker-rpc: debug`
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives such as `warn,chainbroker_rpc=debug`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={level}", component.replace('-', "_")));
        }
        directives
    }
}

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. `RUST_LOG`, when set, replaces the
/// configured directives.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
