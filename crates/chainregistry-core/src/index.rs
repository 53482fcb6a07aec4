//! The in-memory identity index.
//!
//! Two halves, each behind its own `RwLock`:
//!
//! ```text
//! ids:   fid   → address   (+ address → [fid])    + SyncCursor
//! names: fname → address   (+ address → [fname])  + SyncCursor
//! ```
//!
//! An address may own several keys. Reverse lookups answer with the most
//! recently merged key the address still owns.
//!
//! Each half has exactly one writer (its scanner) and any number of readers.
//! A window of events is applied together with its cursor advance under a
//! single write guard, so readers never observe a half-merged window.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::cursor::SyncCursor;
use crate::events::{RegisterEvent, TransferEvent};
use crate::types::Stream;

/// address → keys it owns, most recently merged last.
struct Owners<K> {
    by_address: HashMap<String, Vec<K>>,
}

impl<K: PartialEq> Owners<K> {
    fn new() -> Self {
        Self {
            by_address: HashMap::new(),
        }
    }

    fn bind(&mut self, owner: &str, key: K) {
        let keys = self.by_address.entry(owner.to_string()).or_default();
        keys.retain(|k| *k != key);
        keys.push(key);
    }

    fn unbind(&mut self, owner: &str, key: &K) {
        if let Some(keys) = self.by_address.get_mut(owner) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_address.remove(owner);
            }
        }
    }

    fn latest(&self, owner: &str) -> Option<&K> {
        self.by_address.get(owner).and_then(|keys| keys.last())
    }
}

/// fid ⇄ address half.
struct IdTable {
    by_fid: HashMap<u64, String>,
    owners: Owners<u64>,
    cursor: SyncCursor,
}

impl IdTable {
    fn insert(&mut self, fid: u64, owner: &str) {
        if let Some(prev) = self.by_fid.insert(fid, owner.to_string()) {
            if prev != owner {
                self.owners.unbind(&prev, &fid);
            }
        }
        self.owners.bind(owner, fid);
    }
}

/// fname ⇄ address half.
struct NameTable {
    by_fname: HashMap<String, String>,
    owners: Owners<String>,
    cursor: SyncCursor,
}

impl NameTable {
    fn insert(&mut self, fname: &str, owner: &str) {
        if let Some(prev) = self.by_fname.insert(fname.to_string(), owner.to_string()) {
            if prev != owner {
                self.owners.unbind(&prev, &fname.to_string());
            }
        }
        self.owners.bind(owner, fname.to_string());
    }
}

/// Point-in-time summary of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub fids: usize,
    pub fnames: usize,
    pub id_cursor: SyncCursor,
    pub name_cursor: SyncCursor,
}

/// Bidirectional fid / fname / address index with per-stream cursors.
pub struct IdentityIndex {
    ids: RwLock<IdTable>,
    names: RwLock<NameTable>,
}

impl IdentityIndex {
    /// Create an empty index whose cursors sit at the given deployment blocks.
    pub fn new(id_deployment_block: u64, name_deployment_block: u64) -> Self {
        Self {
            ids: RwLock::new(IdTable {
                by_fid: HashMap::new(),
                owners: Owners::new(),
                cursor: SyncCursor::at_deployment(id_deployment_block),
            }),
            names: RwLock::new(NameTable {
                by_fname: HashMap::new(),
                owners: Owners::new(),
                cursor: SyncCursor::at_deployment(name_deployment_block),
            }),
        }
    }

    /// Create an empty index positioned at the configured deployment blocks.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            config.id_registry.deployment_block,
            config.name_registry.deployment_block,
        )
    }

    /// Apply one window of `Register` events and advance the id cursor to
    /// `through_block`.
    ///
    /// Events must be in upstream (ascending block) order; later events for
    /// the same fid overwrite earlier ones.
    pub fn apply_registrations(&self, events: &[RegisterEvent], through_block: u64) {
        let mut ids = write(&self.ids);
        for ev in events {
            ids.insert(ev.fid, &ev.owner);
        }
        ids.cursor.advance(through_block);
        tracing::debug!(
            events = events.len(),
            through_block,
            fids = ids.by_fid.len(),
            "merged id window"
        );
    }

    /// Apply one window of `Transfer` events and advance the name cursor to
    /// `through_block`.
    pub fn apply_transfers(&self, events: &[TransferEvent], through_block: u64) {
        let mut names = write(&self.names);
        for ev in events {
            if ev.fname.is_empty() {
                tracing::warn!(block = ev.block_number, owner = %ev.owner, "skipping empty fname");
                continue;
            }
            names.insert(&ev.fname, &ev.owner);
        }
        names.cursor.advance(through_block);
        tracing::debug!(
            events = events.len(),
            through_block,
            fnames = names.by_fname.len(),
            "merged name window"
        );
    }

    /// Current cursor of one stream.
    pub fn cursor(&self, stream: Stream) -> SyncCursor {
        match stream {
            Stream::Ids => read(&self.ids).cursor,
            Stream::Names => read(&self.names).cursor,
        }
    }

    pub fn stats(&self) -> IndexStats {
        let ids = read(&self.ids);
        let names = read(&self.names);
        IndexStats {
            fids: ids.by_fid.len(),
            fnames: names.by_fname.len(),
            id_cursor: ids.cursor,
            name_cursor: names.cursor,
        }
    }

    pub(crate) fn address_of_fid(&self, fid: u64) -> Option<String> {
        read(&self.ids).by_fid.get(&fid).cloned()
    }

    pub(crate) fn fid_of_address(&self, address: &str) -> Option<u64> {
        read(&self.ids).owners.latest(address).copied()
    }

    pub(crate) fn address_of_fname(&self, fname: &str) -> Option<String> {
        read(&self.names).by_fname.get(fname).cloned()
    }

    pub(crate) fn fname_of_address(&self, address: &str) -> Option<String> {
        read(&self.names).owners.latest(address).cloned()
    }
}

impl Default for IdentityIndex {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

// Writers hold the guard for a whole window, so a poisoned table is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(block: u64, fid: u64, owner: &str) -> RegisterEvent {
        RegisterEvent {
            block_number: block,
            fid,
            owner: owner.into(),
        }
    }

    fn xfer(block: u64, fname: &str, owner: &str) -> TransferEvent {
        TransferEvent {
            block_number: block,
            fname: fname.into(),
            owner: owner.into(),
        }
    }

    #[test]
    fn later_register_overwrites_and_moves_reverse_entry() {
        let index = IdentityIndex::new(0, 0);
        index.apply_registrations(&[reg(10, 1, "0xa"), reg(20, 1, "0xb")], 20);

        assert_eq!(index.address_of_fid(1).as_deref(), Some("0xb"));
        assert_eq!(index.fid_of_address("0xb"), Some(1));
        assert_eq!(index.fid_of_address("0xa"), None);
    }

    #[test]
    fn reverse_entry_kept_when_other_fid_moved_in() {
        let index = IdentityIndex::new(0, 0);
        index.apply_registrations(&[reg(10, 1, "0xa"), reg(11, 2, "0xa")], 11);
        index.apply_registrations(&[reg(12, 1, "0xc")], 12);

        assert_eq!(index.fid_of_address("0xa"), Some(2));
        assert_eq!(index.fid_of_address("0xc"), Some(1));
    }

    #[test]
    fn address_keeps_remaining_fname_when_one_moves_away() {
        let index = IdentityIndex::new(0, 0);
        index.apply_transfers(&[xfer(1, "alice", "0xa"), xfer(2, "bob", "0xa")], 2);
        assert_eq!(index.fname_of_address("0xa").as_deref(), Some("bob"));

        index.apply_transfers(&[xfer(3, "bob", "0xb")], 3);
        assert_eq!(index.address_of_fname("alice").as_deref(), Some("0xa"));
        assert_eq!(index.fname_of_address("0xa").as_deref(), Some("alice"));
        assert_eq!(index.fname_of_address("0xb").as_deref(), Some("bob"));
    }

    #[test]
    fn address_keeps_remaining_fid_when_one_moves_away() {
        let index = IdentityIndex::new(0, 0);
        index.apply_registrations(&[reg(1, 2, "0xa"), reg(2, 1, "0xa")], 2);
        index.apply_registrations(&[reg(3, 1, "0xb")], 3);

        assert_eq!(index.address_of_fid(2).as_deref(), Some("0xa"));
        assert_eq!(index.fid_of_address("0xa"), Some(2));
        assert_eq!(index.fid_of_address("0xb"), Some(1));
    }

    #[test]
    fn re_registering_same_owner_makes_it_latest() {
        let index = IdentityIndex::new(0, 0);
        index.apply_registrations(&[reg(1, 1, "0xa"), reg(2, 2, "0xa"), reg(3, 1, "0xa")], 3);
        assert_eq!(index.fid_of_address("0xa"), Some(1));

        index.apply_registrations(&[reg(4, 1, "0xb")], 4);
        assert_eq!(index.fid_of_address("0xa"), Some(2));
    }

    #[test]
    fn empty_fname_is_skipped() {
        let index = IdentityIndex::new(0, 0);
        index.apply_transfers(&[xfer(1, "", "0xa"), xfer(2, "carol", "0xb")], 2);

        let stats = index.stats();
        assert_eq!(stats.fnames, 1);
        assert_eq!(stats.name_cursor.block_number, 2);
        assert_eq!(index.fname_of_address("0xa"), None);
    }

    #[test]
    fn replaying_a_window_is_idempotent() {
        let index = IdentityIndex::new(0, 0);
        let window = [xfer(5, "alice", "0xa"), xfer(6, "bob", "0xb"), xfer(7, "alice", "0xc")];
        index.apply_transfers(&window, 10);
        let once = index.stats();
        let alice = index.address_of_fname("alice");

        index.apply_transfers(&window, 10);
        assert_eq!(index.stats(), once);
        assert_eq!(index.address_of_fname("alice"), alice);
        assert_eq!(index.fname_of_address("0xa"), None);
        assert_eq!(index.fname_of_address("0xc").as_deref(), Some("alice"));
    }

    #[test]
    fn cursors_advance_independently() {
        let index = IdentityIndex::new(100, 200);
        index.apply_registrations(&[], 150);

        assert_eq!(index.cursor(Stream::Ids).block_number, 150);
        assert_eq!(index.cursor(Stream::Names), SyncCursor::at_deployment(200));
    }

    #[test]
    fn stats_count_entries() {
        let index = IdentityIndex::new(0, 0);
        index.apply_registrations(&[reg(1, 1, "0xa"), reg(2, 2, "0xb")], 2);
        index.apply_transfers(&[xfer(3, "carol", "0xa")], 3);

        let stats = index.stats();
        assert_eq!(stats.fids, 2);
        assert_eq!(stats.fnames, 1);
        assert_eq!(stats.name_cursor.block_number, 3);
    }
}
