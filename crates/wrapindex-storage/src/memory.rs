//! In-memory storage backend.
//!
//! Stores the cursor, holder balances, and applied-event ids in RAM behind a
//! single lock, so every trait operation is atomic. Useful for testing and
//! short-lived indexers that don't need persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use num_bigint::BigInt;

use wrapindex_core::checkpoint::CursorStore;
use wrapindex_core::error::IndexerError;
use wrapindex_core::ledger::{Delta, HolderBalance, LedgerStore};
use wrapindex_core::types::EventId;
use wrapindex_core::Address;

#[derive(Default)]
struct State {
    cursor: Option<u64>,
    balances: HashMap<Address, BigInt>,
    applied: BTreeSet<EventId>,
    /// Snapshot order, built on first read and dropped on every balance write.
    sorted: Option<Vec<HolderBalance>>,
}

impl State {
    fn add(&mut self, address: Address, delta: &BigInt) -> BigInt {
        self.sorted = None;
        let entry = self.balances.entry(address).or_default();
        *entry += delta;
        entry.clone()
    }

    fn sorted(&mut self) -> &[HolderBalance] {
        let balances = &self.balances;
        self.sorted.get_or_insert_with(|| sorted_holders(balances))
    }
}

/// In-memory indexer storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, IndexerError> {
        self.state
            .lock()
            .map_err(|e| IndexerError::Storage(format!("memory store poisoned: {e}")))
    }

    /// Number of applied-event ids still retained.
    pub fn applied_len(&self) -> usize {
        self.lock().map(|s| s.applied.len()).unwrap_or(0)
    }

    /// Every holder with its balance, sorted like a snapshot.
    pub fn holders(&self) -> Vec<HolderBalance> {
        self.lock().map(|mut s| s.sorted().to_vec()).unwrap_or_default()
    }
}

fn sorted_holders(balances: &HashMap<Address, BigInt>) -> Vec<HolderBalance> {
    let mut rows: Vec<HolderBalance> = balances
        .iter()
        .map(|(address, balance)| HolderBalance {
            address: *address,
            balance: balance.clone(),
        })
        .collect();
    rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));
    rows
}

// ─── CursorStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl CursorStore for InMemoryStorage {
    async fn cursor(&self) -> Result<Option<u64>, IndexerError> {
        Ok(self.lock()?.cursor)
    }

    async fn set_cursor(&self, block_number: u64) -> Result<(), IndexerError> {
        self.lock()?.cursor = Some(block_number);
        Ok(())
    }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for InMemoryStorage {
    async fn balance(&self, address: &Address) -> Result<Option<BigInt>, IndexerError> {
        Ok(self.lock()?.balances.get(address).cloned())
    }

    async fn add_to_balance(
        &self,
        address: &Address,
        delta: &BigInt,
    ) -> Result<BigInt, IndexerError> {
        Ok(self.lock()?.add(*address, delta))
    }

    async fn apply_event(&self, id: EventId, deltas: &[Delta]) -> Result<bool, IndexerError> {
        let mut state = self.lock()?;
        if !state.applied.insert(id) {
            return Ok(false);
        }
        for delta in deltas {
            state.add(delta.address, &delta.amount);
        }
        Ok(true)
    }

    async fn prune_applied(&self, block: u64) -> Result<u64, IndexerError> {
        let mut state = self.lock()?;
        let before = state.applied.len();
        state.applied.retain(|id| id.block_number > block);
        Ok((before - state.applied.len()) as u64)
    }

    async fn holders_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<HolderBalance>, IndexerError> {
        let mut state = self.lock()?;
        Ok(state
            .sorted()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn holder_count(&self) -> Result<u64, IndexerError> {
        Ok(self.lock()?.balances.len() as u64)
    }
}
