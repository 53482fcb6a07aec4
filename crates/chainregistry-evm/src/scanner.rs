//! Windowed log scanner.
//!
//! Walks `[from, to]` in fixed-size windows, one `filter_logs` call per
//! window, with a fixed pause between windows to stay under provider rate
//! limits. Windows are visited in ascending order, which is what makes
//! latest-wins merging correct for keys that change owner.
//!
//! Failure is fail-fast: the first fetch or fold error aborts the scan.
//! Windows committed before the failure stay committed.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use chainregistry_core::config::ContractConfig;
use chainregistry_core::error::RegistryError;
use chainregistry_core::source::LogSource;
use chainregistry_core::types::{LogEntry, Stream};

/// Receives the logs of each window.
///
/// `fold` is called once per log in upstream order, then `commit` once the
/// whole window folded. If a fold fails, `discard` is called instead and the
/// scan aborts.
pub trait ScanSink: Send {
    fn fold(&mut self, log: &LogEntry) -> Result<(), RegistryError>;

    /// Make the window's folded logs visible, up to and including `through_block`.
    fn commit(&mut self, through_block: u64);

    fn discard(&mut self);
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// First block requested (inclusive).
    pub from_block: u64,
    /// Target block (inclusive).
    pub to_block: u64,
    /// Number of windows fetched and committed.
    pub windows: u64,
    /// Number of logs folded.
    pub logs: usize,
}

/// Scans one contract/topic pair over a block range in bounded windows.
#[derive(Clone)]
pub struct BatchedScanner {
    source: Arc<dyn LogSource>,
    window_size: u64,
    window_delay: Duration,
    cancel: CancellationToken,
}

impl BatchedScanner {
    /// `window_size` is clamped to at least one block.
    pub fn new(source: Arc<dyn LogSource>, window_size: u64, window_delay: Duration) -> Self {
        Self {
            source,
            window_size: window_size.max(1),
            window_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next window boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Scan `[from_block, to_block]` for `contract`'s event, folding every
    /// matching log into `sink`.
    pub async fn scan<K: ScanSink + ?Sized>(
        &self,
        stream: Stream,
        contract: &ContractConfig,
        from_block: u64,
        to_block: u64,
        sink: &mut K,
    ) -> Result<ScanReport, RegistryError> {
        let mut report = ScanReport {
            from_block,
            to_block,
            ..Default::default()
        };
        if from_block > to_block {
            tracing::debug!(%stream, from_block, to_block, "nothing to scan");
            return Ok(report);
        }

        let mut start = from_block;
        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(%stream, at = start, "scan cancelled");
                return Err(RegistryError::Cancelled);
            }

            let end = start.saturating_add(self.window_size - 1).min(to_block);
            let logs = self
                .source
                .filter_logs(contract.address, contract.topic, start, end)
                .await
                .map_err(|e| {
                    tracing::warn!(%stream, from = start, to = end, error = %e, "window fetch failed");
                    e
                })?;

            for log in &logs {
                let folded = match log.topic(0) {
                    Some(topic) if *topic == contract.topic => sink.fold(log),
                    _ => Err(RegistryError::decode(
                        log.block_number,
                        format!("log topic0 is not {}", contract.topic),
                    )),
                };
                if let Err(e) = folded {
                    sink.discard();
                    tracing::warn!(%stream, from = start, to = end, error = %e, "window fold failed");
                    return Err(e);
                }
            }
            sink.commit(end);

            report.windows += 1;
            report.logs += logs.len();
            tracing::info!(
                %stream,
                from = start,
                to = end,
                target = to_block,
                logs = logs.len(),
                "window merged"
            );

            if end >= to_block {
                break;
            }
            start = end + 1;

            if !self.window_delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        tracing::warn!(%stream, at = start, "scan cancelled");
                        return Err(RegistryError::Cancelled);
                    }
                    _ = tokio::time::sleep(self.window_delay) => {}
                }
            }
        }

        Ok(report)
    }
}
