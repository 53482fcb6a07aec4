//! Shared types: log entries, stream identifiers and address canonicalization.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

// ─── LogEntry ─────────────────────────────────────────────────────────────────

/// A single contract log as delivered by a [`LogSource`](crate::LogSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// Raw non-indexed payload.
    pub data: Vec<u8>,
}

impl LogEntry {
    pub fn new(block_number: u64, topics: Vec<B256>) -> Self {
        Self {
            block_number,
            topics,
            data: Vec::new(),
        }
    }

    /// Returns the topic at `index`, if present.
    pub fn topic(&self, index: usize) -> Option<&B256> {
        self.topics.get(index)
    }
}

// ─── Stream ───────────────────────────────────────────────────────────────────

/// One of the two registration log streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// `Register` events from the id registry (fid → address).
    Ids,
    /// `Transfer` events from the name registry (fname → address).
    Names,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ids => write!(f, "ids"),
            Self::Names => write!(f, "names"),
        }
    }
}

// ─── Addresses ────────────────────────────────────────────────────────────────

/// Canonical form of an address: `0x` followed by 40 lowercase hex digits.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Normalize a user-supplied address string to canonical form.
///
/// Accepts any case, with or without `0x`. Returns `None` if the input is not
/// exactly 20 hex-encoded bytes.
pub fn normalize_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", digits.to_ascii_lowercase()))
}
