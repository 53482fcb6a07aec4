//! Sync cursor: tracks how far one registration stream has been merged.

use serde::{Deserialize, Serialize};

/// The highest block whose events are fully merged into one half of the index.
///
/// A fresh cursor sits at the contract's deployment block with nothing merged
/// yet, so the deployment block itself is the first one scanned. The cursor
/// only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Last fully merged block (or the deployment block if nothing merged).
    pub block_number: u64,
    /// `false` until the first window has been merged.
    pub merged: bool,
}

impl SyncCursor {
    /// Create a cursor positioned at a contract's deployment block.
    pub fn at_deployment(block_number: u64) -> Self {
        Self {
            block_number,
            merged: false,
        }
    }

    /// Record that every block up to `block_number` is merged.
    ///
    /// Lower values are ignored.
    pub fn advance(&mut self, block_number: u64) {
        if !self.merged || block_number > self.block_number {
            self.block_number = self.block_number.max(block_number);
            self.merged = true;
        }
    }

    /// Returns the next block to scan.
    pub fn next_block(&self) -> u64 {
        if self.merged {
            self.block_number + 1
        } else {
            self.block_number
        }
    }

    /// Returns `true` if there is nothing left to scan up to `target`.
    pub fn is_caught_up(&self, target: u64) -> bool {
        self.next_block() > target
    }
}
