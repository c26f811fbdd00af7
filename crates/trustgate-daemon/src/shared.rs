// crates/trustgate-daemon/src/shared.rs
//
// DaemonServices: the component graph of a running daemon.
//
// Constructed once in main.rs from the loaded DaemonConfig, then handed to
// the API server and the registry event logger.

use std::sync::Arc;
use std::time::Duration;

use trustgate_core::clock::{Clock, SystemClock};
use trustgate_core::error::TrustgateError;
use trustgate_core::traits::{AuditSink, LoanRequestStore, TrustSnapshotStore, WalletDirectory};
use trustgate_lending::LoanRequestOrchestrator;
use trustgate_registry::ReputationRegistry;
use trustgate_rpc::ApiContext;
use trustgate_store::{MemoryStore, RocksStore};
use trustgate_verify::VerificationBridge;

use crate::config::{expand_tilde, DaemonConfig, StorageBackend};

/// The four storage roles, backed by a single store.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn TrustSnapshotStore>,
    pub wallets: Arc<dyn WalletDirectory>,
    pub loan_requests: Arc<dyn LoanRequestStore>,
    pub audit: Arc<dyn AuditSink>,
}

impl Storage {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TrustSnapshotStore + WalletDirectory + LoanRequestStore + AuditSink + 'static,
    {
        Self {
            snapshots: store.clone(),
            wallets: store.clone(),
            loan_requests: store.clone(),
            audit: store,
        }
    }

    /// Open the configured backend.
    pub fn open(config: &DaemonConfig) -> Result<Self, TrustgateError> {
        match config.storage {
            StorageBackend::Rocksdb => {
                let path = format!("{}/rocksdb", expand_tilde(&config.data_dir));
                let store = RocksStore::open(&path)?;
                tracing::info!("RocksDB store opened at {}", path);
                Ok(Self::from_store(Arc::new(store)))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; nothing survives a restart");
                Ok(Self::from_store(Arc::new(MemoryStore::new())))
            }
        }
    }
}

/// Shared components of the daemon.
#[derive(Clone)]
pub struct DaemonServices {
    pub registry: Arc<ReputationRegistry>,
    pub bridge: Arc<VerificationBridge>,
    pub orchestrator: Arc<LoanRequestOrchestrator>,
    pub storage: Storage,
    pub clock: Arc<dyn Clock>,
}

impl DaemonServices {
    pub fn new(config: &DaemonConfig, storage: Storage) -> Result<Self, TrustgateError> {
        let authority = config.authority_address()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let registry = Arc::new(ReputationRegistry::new(config.domain(), authority));
        let bridge = Arc::new(
            VerificationBridge::new(
                storage.snapshots.clone(),
                storage.wallets.clone(),
                registry.clone(),
                clock.clone(),
            )
            .with_timeout(Duration::from_millis(config.bridge_timeout_ms)),
        );
        let orchestrator = Arc::new(LoanRequestOrchestrator::new(
            bridge.clone(),
            storage.loan_requests.clone(),
            clock.clone(),
        ));

        Ok(Self {
            registry,
            bridge,
            orchestrator,
            storage,
            clock,
        })
    }

    pub fn api_context(&self) -> ApiContext {
        ApiContext {
            snapshots: self.storage.snapshots.clone(),
            wallets: self.storage.wallets.clone(),
            loan_requests: self.storage.loan_requests.clone(),
            audit: self.storage.audit.clone(),
            registry: self.registry.clone(),
            bridge: self.bridge.clone(),
            orchestrator: self.orchestrator.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustgate_core::address::Address;

    fn memory_config() -> DaemonConfig {
        DaemonConfig {
            storage: StorageBackend::Memory,
            authority_public_key: Some(hex_key(7)),
            ..DaemonConfig::default()
        }
    }

    fn hex_key(byte: u8) -> String {
        format!("{:02x}", byte).repeat(32)
    }

    #[test]
    fn test_services_wire_configured_authority() {
        let config = memory_config();
        let storage = Storage::open(&config).unwrap();
        let services = DaemonServices::new(&config, storage).unwrap();
        assert_eq!(
            services.registry.authority(),
            Address::from_public_key(&[7u8; 32])
        );
        assert_eq!(services.registry.domain().chain_id, config.chain_id);
    }

    #[test]
    fn test_missing_authority_refuses_to_start() {
        let config = DaemonConfig {
            authority_public_key: None,
            ..memory_config()
        };
        let storage = Storage::open(&config).unwrap();
        assert!(DaemonServices::new(&config, storage).is_err());
    }
}
