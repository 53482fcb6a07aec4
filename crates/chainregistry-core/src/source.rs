//! The log source boundary, plus an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;

use crate::error::RegistryError;
use crate::types::LogEntry;

/// A blockchain node that can answer log queries.
///
/// Implementations map transport failures to
/// [`RegistryError::SourceUnavailable`] and malformed responses to
/// [`RegistryError::Decode`].
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Current chain head height.
    async fn head_height(&self) -> Result<u64, RegistryError>;

    /// All logs emitted by `address` with `topics[0] == topic` in
    /// `[from_block, to_block]`, in chain order.
    async fn filter_logs(
        &self,
        address: Address,
        topic: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, RegistryError>;
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for Arc<T> {
    async fn head_height(&self) -> Result<u64, RegistryError> {
        (**self).head_height().await
    }

    async fn filter_logs(
        &self,
        address: Address,
        topic: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, RegistryError> {
        (**self).filter_logs(address, topic, from_block, to_block).await
    }
}

// ─── In-memory source (for testing) ───────────────────────────────────────────

#[derive(Default)]
struct MemoryChain {
    head: u64,
    logs: Vec<(Address, LogEntry)>,
    /// Every `filter_logs` call: (address, from, to).
    fetches: Vec<(Address, u64, u64)>,
    /// Remaining successful fetches per address before failing.
    fail_after: HashMap<Address, usize>,
    head_unavailable: bool,
}

/// In-memory log source for tests and local demos.
///
/// Supports failure injection so partial-sync behaviour can be exercised.
/// Every `filter_logs` call is recorded and kept until
/// [`clear_fetches`](Self::clear_fetches), so long-running demos should clear
/// the log between passes.
#[derive(Default)]
pub struct MemoryLogSource {
    chain: Mutex<MemoryChain>,
}

impl MemoryLogSource {
    pub fn new(head: u64) -> Self {
        let source = Self::default();
        source.set_head(head);
        source
    }

    fn chain(&self) -> std::sync::MutexGuard<'_, MemoryChain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_head(&self, head: u64) {
        self.chain().head = head;
    }

    /// Append a log emitted by `address`.
    pub fn push(&self, address: Address, log: LogEntry) {
        self.chain().logs.push((address, log));
    }

    /// Let `successes` more fetches for `address` succeed, then fail every one.
    pub fn fail_after(&self, address: Address, successes: usize) {
        self.chain().fail_after.insert(address, successes);
    }

    /// Make `head_height` fail (or succeed again).
    pub fn set_head_unavailable(&self, unavailable: bool) {
        self.chain().head_unavailable = unavailable;
    }

    /// Remove all injected failures.
    pub fn heal(&self) {
        let mut chain = self.chain();
        chain.fail_after.clear();
        chain.head_unavailable = false;
    }

    /// Total number of `filter_logs` calls served or refused.
    pub fn fetch_count(&self) -> usize {
        self.chain().fetches.len()
    }

    /// Forget recorded fetches. Injected failures are left as they are.
    pub fn clear_fetches(&self) {
        self.chain().fetches.clear();
    }

    /// Block ranges requested for `address`, in call order.
    pub fn fetched_ranges(&self, address: Address) -> Vec<(u64, u64)> {
        self.chain()
            .fetches
            .iter()
            .filter(|(a, _, _)| *a == address)
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn head_height(&self) -> Result<u64, RegistryError> {
        let chain = self.chain();
        if chain.head_unavailable {
            return Err(RegistryError::SourceUnavailable("head unavailable".into()));
        }
        Ok(chain.head)
    }

    async fn filter_logs(
        &self,
        address: Address,
        topic: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, RegistryError> {
        let mut chain = self.chain();
        chain.fetches.push((address, from_block, to_block));

        if let Some(remaining) = chain.fail_after.get_mut(&address) {
            if *remaining == 0 {
                return Err(RegistryError::SourceUnavailable(format!(
                    "injected failure for {address} in [{from_block}, {to_block}]"
                )));
            }
            *remaining -= 1;
        }

        let mut logs: Vec<LogEntry> = chain
            .logs
            .iter()
            .filter(|(a, log)| {
                *a == address
                    && log.topic(0) == Some(&topic)
                    && (from_block..=to_block).contains(&log.block_number)
            })
            .map(|(_, log)| log.clone())
            .collect();
        logs.sort_by_key(|log| log.block_number);
        Ok(logs)
    }
}
