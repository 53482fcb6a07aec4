//! Decoding of the two registration events from raw logs.
//!
//! Both events carry everything we need in indexed topics:
//!
//! ```text
//! Register(address indexed to, uint256 indexed id, ...)
//!   topics = [sig, to, id]
//! Transfer(address indexed from, address indexed to, uint256 indexed tokenId)
//!   topics = [sig, from, to, tokenId]   // tokenId is the fname, right-padded
//! ```

use alloy_primitives::{Address, B256, U256};

use crate::error::RegistryError;
use crate::types::{format_address, LogEntry};

/// A decoded id-registry `Register` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEvent {
    pub block_number: u64,
    pub fid: u64,
    /// Canonical lowercase owner address.
    pub owner: String,
}

/// A decoded name-registry `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub block_number: u64,
    pub fname: String,
    /// Canonical lowercase destination address.
    pub owner: String,
}

impl RegisterEvent {
    /// Decode a `Register` log.
    pub fn decode(log: &LogEntry) -> Result<Self, RegistryError> {
        let owner = address_topic(log, 1)?;
        let id_word = required_topic(log, 2)?;
        let fid = u64::try_from(U256::from_be_bytes(id_word.0)).map_err(|_| {
            RegistryError::decode(log.block_number, format!("fid {id_word} exceeds u64"))
        })?;
        Ok(Self {
            block_number: log.block_number,
            fid,
            owner,
        })
    }
}

impl TransferEvent {
    /// Decode a `Transfer` log.
    pub fn decode(log: &LogEntry) -> Result<Self, RegistryError> {
        let owner = address_topic(log, 2)?;
        let fname = fname_from_word(required_topic(log, 3)?);
        Ok(Self {
            block_number: log.block_number,
            fname,
            owner,
        })
    }
}

fn required_topic(log: &LogEntry, index: usize) -> Result<&B256, RegistryError> {
    log.topic(index).ok_or_else(|| {
        RegistryError::decode(
            log.block_number,
            format!("expected topic[{index}], log has {} topics", log.topics.len()),
        )
    })
}

fn address_topic(log: &LogEntry, index: usize) -> Result<String, RegistryError> {
    let word = required_topic(log, index)?;
    Ok(format_address(&Address::from_word(*word)))
}

/// Turn a right-zero-padded 32-byte word into an fname.
///
/// Invalid UTF-8 is replaced, never rejected. An all-zero word yields an
/// empty name, which the index skips.
fn fname_from_word(word: &B256) -> String {
    let bytes = word.as_slice();
    let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}
