//! Snapshot reporter — pages through the ledger, largest balances first.
//!
//! Read-only; safe to run concurrently with a scanner. Each row is read
//! atomically, but a snapshot taken while the scanner is applying events is
//! not a consistent point-in-time view across addresses.

use std::sync::Arc;

use num_bigint::BigInt;
use serde::Serialize;

use crate::error::IndexerError;
use crate::ledger::{HolderBalance, LedgerStore};
use crate::types::address_key;

pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Totals gathered while paging through a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Non-empty pages read.
    pub pages: u64,
    pub rows: u64,
    /// Sum of every balance read.
    pub total: BigInt,
}

/// Serializable view of one ledger row; balances are decimal strings.
#[derive(Debug, Clone, Serialize)]
pub struct HolderRow {
    pub address: String,
    pub balance: String,
}

impl From<&HolderBalance> for HolderRow {
    fn from(h: &HolderBalance) -> Self {
        Self {
            address: address_key(&h.address),
            balance: h.balance.to_string(),
        }
    }
}

pub struct SnapshotReporter {
    store: Arc<dyn LedgerStore>,
    page_size: u64,
}

impl SnapshotReporter {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Fetch the zero-based page `index`.
    pub async fn page(&self, index: u64) -> Result<Vec<HolderBalance>, IndexerError> {
        let offset = index.saturating_mul(self.page_size);
        self.store.holders_page(offset, self.page_size).await
    }

    /// Call `f` with each page in order until the first empty page.
    pub async fn for_each_page<F>(&self, mut f: F) -> Result<ReportSummary, IndexerError>
    where
        F: FnMut(u64, &[HolderBalance]) + Send,
    {
        let mut summary = ReportSummary::default();
        let mut index = 0u64;
        loop {
            let rows = self.page(index).await?;
            if rows.is_empty() {
                break;
            }
            f(index, &rows);
            summary.pages += 1;
            summary.rows += rows.len() as u64;
            for row in &rows {
                summary.total += &row.balance;
            }
            index += 1;
        }
        Ok(summary)
    }

    /// Read the whole snapshot into memory.
    pub async fn collect(&self) -> Result<Vec<HolderBalance>, IndexerError> {
        let mut all = Vec::new();
        self.for_each_page(|_, rows| all.extend_from_slice(rows)).await?;
        Ok(all)
    }
}
