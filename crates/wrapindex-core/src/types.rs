//! Shared types for the indexing pipeline.

use std::fmt;

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

// ─── LogEntry ─────────────────────────────────────────────────────────────────

/// A raw log record as delivered by the chain, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Contract that emitted the log.
    pub address: Address,
    /// `topics[0]` is the event signature hash; the rest are indexed params.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed params.
    pub data: Bytes,
    pub block_number: u64,
    pub log_index: u64,
}

impl LogEntry {
    /// Position of this log on the chain, used as its idempotency key.
    pub fn id(&self) -> EventId {
        EventId {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }
}

// ─── EventId ──────────────────────────────────────────────────────────────────

/// Identifies one log by `(block_number, log_index)`.
///
/// Ordering matches chain order: by block, then by position within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub block_number: u64,
    pub log_index: u64,
}

impl EventId {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

// ─── BlockRange ───────────────────────────────────────────────────────────────

/// An inclusive `[from, to]` block window for one `eth_getLogs` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// The next window after `cursor`, at most `width` blocks wide and never
    /// past `head`. Returns `None` when the cursor has caught up.
    pub fn next_window(cursor: u64, width: u64, head: u64) -> Option<Self> {
        let from = cursor.checked_add(1)?;
        if from > head || width == 0 {
            return None;
        }
        let to = from.saturating_add(width - 1).min(head);
        Some(Self { from, to })
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> u64 {
        self.to.saturating_sub(self.from) + 1
    }

    pub fn contains(&self, block: u64) -> bool {
        self.from <= block && block <= self.to
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// Address + topic0 filter for log queries.
///
/// Topics are OR-ed: a log matches if its `topics[0]` is any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<B256>,
}

impl LogFilter {
    pub fn new(address: Address, topics: impl IntoIterator<Item = B256>) -> Self {
        Self {
            address,
            topics: topics.into_iter().collect(),
        }
    }

    /// Returns `true` if `log` would be returned by a node applying this filter.
    pub fn matches(&self, log: &LogEntry) -> bool {
        log.address == self.address
            && log
                .topics
                .first()
                .map(|t0| self.topics.is_empty() || self.topics.contains(t0))
                .unwrap_or(false)
    }
}

// ─── Address keys ─────────────────────────────────────────────────────────────

/// Canonical storage key for an address: lowercase, `0x`-prefixed hex.
pub fn address_key(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
