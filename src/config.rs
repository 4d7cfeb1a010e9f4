use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Default gas price applied when neither the caller nor the configuration
/// supplies one: 20 Gwei, in wei.
pub const DEFAULT_GAS_PRICE: u64 = 20_000_000_000;

/// Default polling period for the chain-watching primitives, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub gas: GasDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasDefaults {
    /// Gas price fallback in wei. Documented default rather than a buried
    /// literal; every call may still override it.
    pub gas_price: u64,
    pub gas_limit: Option<u64>,
}

impl Default for GasDefaults {
    fn default() -> Self {
        Self {
            gas_price: DEFAULT_GAS_PRICE,
            gas_limit: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "ethereum".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-mainnet.g.alchemy.com/v2/demo".to_string(),
                chain_id: 1,
                explorer_url: Some("https://etherscan.io".to_string()),
            },
        );

        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-sepolia.g.alchemy.com/v2/demo".to_string(),
                chain_id: 11155111,
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            },
        );

        Self {
            networks,
            default_network: "ethereum".to_string(),
            polling: PollingConfig::default(),
            gas: GasDefaults::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::Config(format!("failed to read config file {path:?}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config file {path:?}: {e}")))
    }

    /// Save configuration to a TOML file.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Config(format!("failed to create config directory {parent:?}: {e}"))
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| Error::Config(format!("failed to write config file {path:?}: {e}")))
    }

    /// Load configuration with fallback to defaults, then apply environment
    /// variable substitutions.
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("failed to load config file, using defaults: {e}");
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    pub fn add_network(&mut self, name: String, config: NetworkConfig) {
        self.networks.insert(name, config);
    }

    pub fn network(&self, name: Option<&str>) -> Result<&NetworkConfig> {
        let name = name.unwrap_or(&self.default_network);
        self.networks
            .get(name)
            .ok_or_else(|| Error::Config(format!("network '{name}' not configured")))
    }

    /// Substitutes `ALCHEMY_API_KEY` into demo/placeholder RPC URLs.
    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("ALCHEMY_API_KEY") {
            for (network_name, network_config) in &mut self.networks {
                if network_config.rpc_url.contains("alchemy.com/v2/demo") {
                    network_config.rpc_url = network_config
                        .rpc_url
                        .replace("/demo", &format!("/{api_key}"));
                    tracing::debug!("updated {network_name} RPC URL with API key");
                }
            }
        } else {
            for (network_name, network_config) in &self.networks {
                if network_config.rpc_url.contains("/demo") {
                    tracing::warn!(
                        "using demo RPC endpoint for {network_name}, set ALCHEMY_API_KEY for better reliability"
                    );
                }
            }
        }
    }

    /// Default config file path under the user's config directory.
    pub fn default_config_path() -> Result<std::path::PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
        Ok(config_dir.join("minieth").join("config.toml"))
    }
}
