//! Merge steps that fold scanned logs into the identity index.

use std::sync::Arc;

use chainregistry_core::error::RegistryError;
use chainregistry_core::events::{RegisterEvent, TransferEvent};
use chainregistry_core::index::IdentityIndex;
use chainregistry_core::types::{LogEntry, Stream};

use crate::scanner::ScanSink;

/// An event type that owns one half of the identity index.
pub trait IndexedEvent: Sized + Send + Sync + 'static {
    /// The stream (and index half) this event feeds.
    const STREAM: Stream;

    fn decode(log: &LogEntry) -> Result<Self, RegistryError>;

    /// Apply a decoded window and advance the stream's cursor.
    fn apply(index: &IdentityIndex, events: &[Self], through_block: u64);
}

impl IndexedEvent for RegisterEvent {
    const STREAM: Stream = Stream::Ids;

    fn decode(log: &LogEntry) -> Result<Self, RegistryError> {
        RegisterEvent::decode(log)
    }

    fn apply(index: &IdentityIndex, events: &[Self], through_block: u64) {
        index.apply_registrations(events, through_block);
    }
}

impl IndexedEvent for TransferEvent {
    const STREAM: Stream = Stream::Names;

    fn decode(log: &LogEntry) -> Result<Self, RegistryError> {
        TransferEvent::decode(log)
    }

    fn apply(index: &IdentityIndex, events: &[Self], through_block: u64) {
        index.apply_transfers(events, through_block);
    }
}

/// Stages decoded events for the current window and applies them on commit.
pub struct IndexSink<E> {
    index: Arc<IdentityIndex>,
    staged: Vec<E>,
}

impl<E: IndexedEvent> IndexSink<E> {
    pub fn new(index: Arc<IdentityIndex>) -> Self {
        Self {
            index,
            staged: Vec::new(),
        }
    }
}

impl<E: IndexedEvent> ScanSink for IndexSink<E> {
    fn fold(&mut self, log: &LogEntry) -> Result<(), RegistryError> {
        self.staged.push(E::decode(log)?);
        Ok(())
    }

    fn commit(&mut self, through_block: u64) {
        E::apply(&self.index, &self.staged, through_block);
        self.staged.clear();
    }

    fn discard(&mut self) {
        self.staged.clear();
    }
}
