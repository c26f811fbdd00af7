// crates/trustgate-daemon/src/config.rs
//
// Runtime configuration for the Trustgate daemon.
// Loaded from a TOML file or populated with sensible defaults.

use std::fs;

use serde::Deserialize;

use trustgate_core::address::Address;
use trustgate_core::attestation::RegistryDomain;
use trustgate_core::encoding::decode_fixed;
use trustgate_core::error::TrustgateError;
use trustgate_rpc::{PrincipalConfig, RateLimitConfig, RpcConfig};

/// Storage backend for snapshots, wallets, loan requests, and audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Host address for the API server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the API server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Chain id the authority's signatures are bound to.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Address of the registry the authority's signatures are bound to.
    #[serde(default)]
    pub registry_address: Address,

    /// Hex ed25519 public key of the attestation authority.
    #[serde(default)]
    pub authority_public_key: Option<String>,

    /// Upper bound on each bridge read, in milliseconds.
    #[serde(default = "default_bridge_timeout_ms")]
    pub bridge_timeout_ms: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// API callers, keyed by the SHA-256 of their bearer token.
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
}

fn default_data_dir() -> String {
    "~/.trustgate/data".to_string()
}

fn default_storage() -> StorageBackend {
    StorageBackend::Rocksdb
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chain_id() -> u64 {
    31337
}

fn default_bridge_timeout_ms() -> u64 {
    2_000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: default_storage(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            log_level: default_log_level(),
            chain_id: default_chain_id(),
            registry_address: Address::ZERO,
            authority_public_key: None,
            bridge_timeout_ms: default_bridge_timeout_ms(),
            rate_limit: RateLimitConfig::default(),
            max_body_bytes: default_max_body_bytes(),
            principals: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn domain(&self) -> RegistryDomain {
        RegistryDomain {
            registry_address: self.registry_address,
            chain_id: self.chain_id,
        }
    }

    /// Registry address of the configured authority key.
    ///
    /// The daemon refuses to start without one: a registry with no authority
    /// would reject every update.
    pub fn authority_address(&self) -> Result<Address, TrustgateError> {
        let key = self.authority_public_key.as_deref().ok_or_else(|| {
            TrustgateError::InvalidRequest("authority_public_key is not configured".to_string())
        })?;
        let key = decode_fixed::<32>(key.trim())?;
        Ok(Address::from_public_key(&key))
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
            max_body_bytes: self.max_body_bytes,
            rate_limit: self.rate_limit,
        }
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
