//! `Registry`: a synced identity index plus its engine.
//!
//! Construction runs the first sync pass and fails if it fails: an empty
//! index would be indistinguishable from "nothing registered yet".

use std::sync::Arc;

use tokio::task::JoinHandle;

use chainregistry_core::config::RegistryConfig;
use chainregistry_core::error::RegistryError;
use chainregistry_core::index::{IdentityIndex, IndexStats};
use chainregistry_core::query::RegistryQuery;
use chainregistry_core::source::LogSource;

use crate::engine::{SyncEngine, SyncReport};

/// A queryable fid / fname registry kept in sync with the chain.
pub struct Registry {
    engine: Arc<SyncEngine>,
}

impl Registry {
    /// Validate `config`, run the initial sync, and return the ready registry.
    pub async fn connect(
        config: RegistryConfig,
        source: Arc<dyn LogSource>,
    ) -> Result<Self, RegistryError> {
        let index = Arc::new(IdentityIndex::from_config(&config));
        let engine = SyncEngine::new(config, source, index)?;
        let report = engine.sync().await?;
        let stats = engine.index().stats();
        tracing::info!(
            head = report.head,
            fids = stats.fids,
            fnames = stats.fnames,
            "Registry ready"
        );
        Ok(Self {
            engine: Arc::new(engine),
        })
    }

    /// Run an incremental sync pass from the stored cursors.
    pub async fn resync(&self) -> Result<SyncReport, RegistryError> {
        self.engine.sync().await
    }

    /// Spawn a task that resyncs every `refresh_interval_ms` until
    /// [`shutdown`](Self::shutdown). Failed passes are logged and retried on
    /// the next tick.
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let interval = engine.config().refresh_interval();
        let cancel = engine.cancellation_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match engine.sync().await {
                    Ok(report) => tracing::debug!(target = report.target, "Refresh complete"),
                    Err(RegistryError::Cancelled) => break,
                    Err(e) => tracing::warn!(error = %e, "Refresh failed, retrying next interval"),
                }
            }
            tracing::info!("Refresh task stopped");
        })
    }

    /// Stop any running pass at its next window boundary and end the refresh task.
    pub fn shutdown(&self) {
        self.engine.cancel();
    }

    pub fn index(&self) -> Arc<IdentityIndex> {
        Arc::clone(self.engine.index())
    }

    pub fn stats(&self) -> IndexStats {
        self.engine.index().stats()
    }

    pub fn config(&self) -> &RegistryConfig {
        self.engine.config()
    }
}

impl RegistryQuery for Registry {
    fn fid_by_address(&self, address: &str) -> Result<u64, RegistryError> {
        self.engine.index().fid_by_address(address)
    }

    fn fid_by_fname(&self, fname: &str) -> Result<u64, RegistryError> {
        self.engine.index().fid_by_fname(fname)
    }

    fn address_by_fname(&self, fname: &str) -> Result<String, RegistryError> {
        self.engine.index().address_by_fname(fname)
    }

    fn address_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        self.engine.index().address_by_fid(fid)
    }

    fn fname_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        self.engine.index().fname_by_fid(fid)
    }

    fn fname_by_address(&self, address: &str) -> Result<String, RegistryError> {
        self.engine.index().fname_by_address(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alloy_primitives::{Address, B256};
    use chainregistry_core::config::ContractConfig;
    use chainregistry_core::source::MemoryLogSource;
    use chainregistry_core::types::{LogEntry, Stream};

    const IDS: Address = Address::repeat_byte(0x01);
    const NAMES: Address = Address::repeat_byte(0x02);
    const TRANSFER: B256 = B256::repeat_byte(0x04);

    fn config() -> RegistryConfig {
        RegistryConfig {
            id_registry: ContractConfig::new(IDS, B256::repeat_byte(0x03), 100),
            name_registry: ContractConfig::new(NAMES, TRANSFER, 100),
            window_size: 50,
            window_delay_ms: 0,
            refresh_interval_ms: 1_000,
            ..Default::default()
        }
    }

    fn transfer(block: u64, owner: u8, name: &str) -> LogEntry {
        let mut word = [0u8; 32];
        word[..name.len()].copy_from_slice(name.as_bytes());
        LogEntry::new(
            block,
            vec![
                TRANSFER,
                Address::ZERO.into_word(),
                Address::repeat_byte(owner).into_word(),
                B256::from(word),
            ],
        )
    }

    #[tokio::test]
    async fn connect_fails_when_source_is_down() {
        let source = Arc::new(MemoryLogSource::new(500));
        source.fail_after(NAMES, 0);

        let err = Registry::connect(config(), source).await.err().unwrap();
        assert!(matches!(err, RegistryError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn resync_picks_up_new_blocks() {
        let source = Arc::new(MemoryLogSource::new(200));
        source.push(NAMES, transfer(150, 0xaa, "alice"));
        let registry = Registry::connect(config(), source.clone()).await.unwrap();
        assert!(registry.address_by_fname("alice").is_ok());

        source.push(NAMES, transfer(250, 0xbb, "alice"));
        source.set_head(300);
        let report = registry.resync().await.unwrap();

        assert_eq!(report.names.from_block, 201);
        assert_eq!(
            registry.address_by_fname("alice").unwrap(),
            format!("0x{}", "bb".repeat(20))
        );
        assert_eq!(registry.stats().name_cursor.block_number, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_task_follows_head_until_shutdown() {
        let source = Arc::new(MemoryLogSource::new(200));
        let registry = Registry::connect(config(), source.clone()).await.unwrap();
        let refresh = registry.spawn_refresh();

        source.set_head(400);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(registry.index().cursor(Stream::Ids).block_number, 400);

        registry.shutdown();
        refresh.await.unwrap();
        assert_eq!(registry.resync().await.unwrap_err(), RegistryError::Cancelled);
    }
}
