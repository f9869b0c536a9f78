//! Cursor persistence — the indexer's crash-recovery position.
//!
//! The cursor is the last block whose logs have been fully applied to the
//! ledger. It is seeded once from configuration, only ever moves forward,
//! and is written strictly after the ledger writes it covers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::cursor::Cursor;
use crate::error::IndexerError;

/// Trait for storing and loading the scan cursor.
///
/// Implementations include `MemoryCursorStore`, `InMemoryStorage`,
/// `SqliteStorage`, and `PostgresStorage`.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// The last processed block, or `None` on a fresh store.
    async fn cursor(&self) -> Result<Option<u64>, IndexerError>;

    /// Persist (upsert) the last processed block.
    async fn set_cursor(&self, block_number: u64) -> Result<(), IndexerError>;
}

/// Owns the cursor lifecycle for one scanner.
pub struct CursorManager {
    store: Arc<dyn CursorStore>,
    current: Option<Cursor>,
}

impl CursorManager {
    pub fn new(store: Arc<dyn CursorStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// The cursor as last loaded or committed.
    pub fn current(&self) -> Option<Cursor> {
        self.current
    }

    /// Load the persisted cursor, seeding it from `starting_block` on first run.
    ///
    /// A fresh store with no starting block configured is a configuration
    /// error; so is any failure to read the store.
    pub async fn bootstrap(&mut self, starting_block: Option<u64>) -> Result<Cursor, IndexerError> {
        let stored = self
            .store
            .cursor()
            .await
            .map_err(|e| IndexerError::Config(format!("cannot read cursor: {e}")))?;

        let cursor = match stored {
            Some(block) => {
                info!(block, "resuming from persisted cursor");
                Cursor::new(block)
            }
            None => {
                let block = starting_block.ok_or_else(|| {
                    IndexerError::Config(
                        "no cursor persisted and no starting block configured".into(),
                    )
                })?;
                self.store.set_cursor(block).await?;
                info!(block, "seeded cursor from starting block");
                Cursor::new(block)
            }
        };

        self.current = Some(cursor);
        Ok(cursor)
    }

    /// Persist `block_number` as the new cursor.
    ///
    /// The in-memory cursor only moves once the store write succeeds, so a
    /// failed commit leaves the next window unchanged.
    pub async fn commit(&mut self, block_number: u64) -> Result<Cursor, IndexerError> {
        let mut next = self
            .current
            .ok_or_else(|| IndexerError::Other("cursor committed before bootstrap".into()))?;
        next.advance(block_number)?;
        self.store.set_cursor(block_number).await?;
        self.current = Some(next);
        Ok(next)
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory cursor store for tests and ephemeral scanners.
#[derive(Default)]
pub struct MemoryCursorStore {
    block: Mutex<Option<u64>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(block_number: u64) -> Self {
        Self {
            block: Mutex::new(Some(block_number)),
        }
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn cursor(&self) -> Result<Option<u64>, IndexerError> {
        self.block
            .lock()
            .map(|b| *b)
            .map_err(|e| IndexerError::Storage(e.to_string()))
    }

    async fn set_cursor(&self, block_number: u64) -> Result<(), IndexerError> {
        let mut block = self
            .block
            .lock()
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        *block = Some(block_number);
        Ok(())
    }
}
