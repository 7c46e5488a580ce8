//! Chain endpoint selection.
//!
//! A project may bring its own RPC URL; otherwise the shared endpoint
//! configured for the chain id is used. Shared clients are built once and
//! reused, override clients are built per lookup.

use chainbroker_core::BrokerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::client::{ChainRpc, JsonRpcChain};

/// Per-chain shared endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Overrides `default_min_confirmations` for this chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confirmations: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Shared endpoints keyed by chain id
    #[serde(default)]
    pub chains: BTreeMap<u64, ChainConfig>,
    #[serde(default = "default_min_confirmations")]
    pub default_min_confirmations: u64,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_min_confirmations() -> u64 {
    1
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            chains: BTreeMap::new(),
            default_min_confirmations: default_min_confirmations(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

impl EndpointConfig {
    /// Single shared endpoint, handy for tests and one-off tools.
    pub fn single_chain(chain_id: u64, rpc_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.chains.insert(
            chain_id,
            ChainConfig {
                rpc_url: rpc_url.into(),
                min_confirmations: None,
            },
        );
        config
    }

    pub fn validate(&self) -> Result<(), BrokerError> {
        for (chain_id, chain) in &self.chains {
            validate_url(&chain.rpc_url).map_err(|reason| BrokerError::Config {
                reason: format!("chain {chain_id}: {reason}"),
            })?;
        }
        if self.request_timeout_ms == 0 {
            return Err(BrokerError::Config {
                reason: "request_timeout_ms must be positive".into(),
            });
        }
        Ok(())
    }
}

fn validate_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid RPC URL '{raw}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported RPC scheme '{other}' in '{raw}'")),
    }
}

/// Where and how strictly to resolve a request's chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEndpoint {
    pub chain_id: u64,
    pub rpc_url: String,
    pub min_confirmations: u64,
    /// The URL came from the project rather than the shared config
    pub project_override: bool,
}

pub struct EndpointResolver {
    config: EndpointConfig,
    shared: RwLock<HashMap<u64, Arc<dyn ChainRpc>>>,
}

impl EndpointResolver {
    pub fn new(config: EndpointConfig) -> Result<Self, BrokerError> {
        config.validate()?;
        Ok(Self {
            config,
            shared: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Picks the project override when given, else the shared endpoint.
    pub fn endpoint(
        &self,
        chain_id: u64,
        project_rpc_url: Option<&str>,
    ) -> Result<ChainEndpoint, BrokerError> {
        let shared = self.config.chains.get(&chain_id);
        let min_confirmations = shared
            .and_then(|c| c.min_confirmations)
            .unwrap_or(self.config.default_min_confirmations);

        if let Some(url) = project_rpc_url.filter(|u| !u.trim().is_empty()) {
            validate_url(url).map_err(|reason| BrokerError::Config { reason })?;
            return Ok(ChainEndpoint {
                chain_id,
                rpc_url: url.to_string(),
                min_confirmations,
                project_override: true,
            });
        }

        let shared = shared.ok_or(BrokerError::UnsupportedChain { chain_id })?;
        Ok(ChainEndpoint {
            chain_id,
            rpc_url: shared.rpc_url.clone(),
            min_confirmations,
            project_override: false,
        })
    }

    /// A client for `endpoint`, reusing the shared one for its chain.
    pub fn connect(&self, endpoint: &ChainEndpoint) -> Result<Arc<dyn ChainRpc>, BrokerError> {
        if endpoint.project_override {
            return self.build(&endpoint.rpc_url);
        }
        if let Some(client) = self
            .shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint.chain_id)
        {
            return Ok(client.clone());
        }

        let mut shared = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = shared.get(&endpoint.chain_id) {
            return Ok(client.clone());
        }
        let client = self.build(&endpoint.rpc_url)?;
        tracing::info!(chain_id = endpoint.chain_id, url = %endpoint.rpc_url, "shared chain client created");
        shared.insert(endpoint.chain_id, client.clone());
        Ok(client)
    }

    fn build(&self, url: &str) -> Result<Arc<dyn ChainRpc>, BrokerError> {
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        let chain = JsonRpcChain::http(url, timeout).map_err(|e| BrokerError::Config {
            reason: e.to_string(),
        })?;
        Ok(Arc::new(chain))
    }
}
