//! CLI configuration file.
//!
//! ```yaml
//! log:
//!   level: info
//!   json: false
//! endpoints:
//!   default_min_confirmations: 2
//!   request_timeout_ms: 15000
//!   chains:
//!     1:
//!       rpc_url: https://eth.example.org
//!     137:
//!       rpc_url: https://polygon.example.org
//!       min_confirmations: 64
//! ```

use anyhow::{Context, Result};
use chainbroker_rpc::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::logging::LogConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl BrokerConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("parse config YAML")?;
        config.endpoints.validate()?;
        Ok(config)
    }

    /// Reads `path`, or falls back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        Self::from_yaml(&content)
    }
}
