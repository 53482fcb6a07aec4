//! The sync engine: one pass brings both halves of the index up to the head.
//!
//! ```text
//! head ← LogSource::head_height()
//! target = head - confirmation_depth
//!   ├── task: scan IdRegistry   Register  [ids cursor + 1, target] → ids half
//!   └── task: scan NameRegistry Transfer  [names cursor + 1, target] → names half
//! join both → SyncReport | first error
//! ```
//!
//! Both scan tasks are awaited to completion before the pass returns, so a
//! failure in one never leaves the other writing in the background, and two
//! simultaneous failures cannot block each other.
//!
//! The pass lock is held by the scan tasks themselves. If the caller drops
//! the `sync()` future, the tasks run on to their end and the next pass
//! waits for them, so each index half keeps a single writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chainregistry_core::config::{ContractConfig, RegistryConfig};
use chainregistry_core::error::RegistryError;
use chainregistry_core::events::{RegisterEvent, TransferEvent};
use chainregistry_core::index::IdentityIndex;
use chainregistry_core::source::LogSource;
use chainregistry_core::types::Stream;

use crate::scanner::{BatchedScanner, ScanReport};
use crate::sink::{IndexSink, IndexedEvent};

/// Outcome of a successful sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Chain head observed at the start of the pass.
    pub head: u64,
    /// Block both cursors now sit at.
    pub target: u64,
    pub ids: ScanReport,
    pub names: ScanReport,
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    /// Total `filter_logs` calls made by the pass.
    pub fn fetches(&self) -> u64 {
        self.ids.windows + self.names.windows
    }
}

/// Runs sync passes over both registration streams.
pub struct SyncEngine {
    config: RegistryConfig,
    source: Arc<dyn LogSource>,
    index: Arc<IdentityIndex>,
    cancel: CancellationToken,
    /// Serializes passes so each index half has a single writer.
    pass: Arc<Mutex<()>>,
}

impl SyncEngine {
    pub fn new(
        config: RegistryConfig,
        source: Arc<dyn LogSource>,
        index: Arc<IdentityIndex>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            index,
            cancel: CancellationToken::new(),
            pass: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<IdentityIndex> {
        &self.index
    }

    /// Token that stops running and future passes when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the current pass at its next window boundary. Later passes fail
    /// immediately with [`RegistryError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run one sync pass.
    ///
    /// On success both cursors are at the pass target. On failure each half
    /// keeps the windows it fully merged, and the next pass resumes there.
    pub async fn sync(&self) -> Result<SyncReport, RegistryError> {
        let pass = Arc::new(Arc::clone(&self.pass).lock_owned().await);
        if self.cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let head = self.source.head_height().await?;
        let target = head.saturating_sub(self.config.confirmation_depth);
        tracing::info!(
            head,
            target,
            ids_cursor = self.index.cursor(Stream::Ids).block_number,
            names_cursor = self.index.cursor(Stream::Names).block_number,
            "Starting sync pass"
        );

        let scanner = BatchedScanner::new(
            Arc::clone(&self.source),
            self.config.window_size,
            self.config.window_delay(),
        )
        .with_cancellation(self.cancel.clone());

        let ids = self.spawn_scan::<RegisterEvent>(
            scanner.clone(),
            self.config.id_registry.clone(),
            target,
            Arc::clone(&pass),
        );
        let names = self.spawn_scan::<TransferEvent>(
            scanner,
            self.config.name_registry.clone(),
            target,
            pass,
        );

        let (ids, names) = futures::future::join(ids, names).await;
        let ids = flatten(Stream::Ids, ids);
        let names = flatten(Stream::Names, names);

        match (ids, names) {
            (Ok(ids), Ok(names)) => {
                let report = SyncReport {
                    head,
                    target,
                    ids,
                    names,
                    completed_at: Utc::now(),
                };
                tracing::info!(
                    target,
                    fetches = report.fetches(),
                    id_logs = report.ids.logs,
                    name_logs = report.names.logs,
                    "Sync pass complete"
                );
                Ok(report)
            }
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }

    fn spawn_scan<E: IndexedEvent>(
        &self,
        scanner: BatchedScanner,
        contract: ContractConfig,
        target: u64,
        pass: Arc<OwnedMutexGuard<()>>,
    ) -> JoinHandle<Result<ScanReport, RegistryError>> {
        let index = Arc::clone(&self.index);
        tokio::spawn(async move {
            let _pass = pass;
            let from = index.cursor(E::STREAM).next_block();
            let mut sink = IndexSink::<E>::new(index);
            scanner
                .scan(E::STREAM, &contract, from, target, &mut sink)
                .await
        })
    }
}

/// Collapse a join result into the scan result, logging any failure.
fn flatten(
    stream: Stream,
    joined: Result<Result<ScanReport, RegistryError>, tokio::task::JoinError>,
) -> Result<ScanReport, RegistryError> {
    let result = joined.unwrap_or_else(|e| Err(RegistryError::Task(e.to_string())));
    if let Err(e) = &result {
        tracing::error!(%stream, error = %e, "Scan failed");
    }
    result
}
