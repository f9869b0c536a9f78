//! Indexer cursor — tracks the current position in the chain.

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::BlockRange;

/// The last block whose logs have been fully applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub block_number: u64,
}

impl Cursor {
    pub fn new(block_number: u64) -> Self {
        Self { block_number }
    }

    /// Move the cursor forward. Moving backwards is rejected.
    pub fn advance(&mut self, block_number: u64) -> Result<(), IndexerError> {
        if block_number < self.block_number {
            return Err(IndexerError::Other(format!(
                "cursor cannot move backwards from {} to {block_number}",
                self.block_number
            )));
        }
        self.block_number = block_number;
        Ok(())
    }

    /// The next window to scan, or `None` when caught up with `head`.
    pub fn next_window(&self, width: u64, head: u64) -> Option<BlockRange> {
        BlockRange::next_window(self.block_number, width, head)
    }
}
