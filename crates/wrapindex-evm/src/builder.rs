//! Fluent builder API for creating chain scanners.
//!
//! # Example
//!
//! ```rust,no_run
//! use wrapindex_evm::ScannerBuilder;
//! use wrapindex_core::{Address, BurnPolicy};
//!
//! let config = ScannerBuilder::new()
//!     .contract(Address::repeat_byte(0x22))
//!     .starting_block(6_082_465)
//!     .window_width(100)
//!     .burn_policy(BurnPolicy::Subtract)
//!     .build_config();
//! ```

use std::sync::Arc;

use wrapindex_core::checkpoint::CursorStore;
use wrapindex_core::error::IndexerError;
use wrapindex_core::indexer::ScannerConfig;
use wrapindex_core::ledger::{BurnPolicy, LedgerStore};
use wrapindex_core::Address;

use crate::fetcher::EvmRpcClient;
use crate::scanner::ChainScanner;

/// Fluent builder for [`ScannerConfig`] and [`ChainScanner`].
#[derive(Default)]
pub struct ScannerBuilder {
    config: ScannerConfig,
}

impl ScannerBuilder {
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
        }
    }

    /// Set the token contract to index.
    pub fn contract(mut self, contract: Address) -> Self {
        self.config.contract = contract;
        self
    }

    /// Set the cursor seeded on a fresh store.
    pub fn starting_block(mut self, block: u64) -> Self {
        self.config.starting_block = Some(block);
        self
    }

    /// Set the number of blocks per `eth_getLogs` window.
    pub fn window_width(mut self, width: u64) -> Self {
        self.config.window_width = width;
        self
    }

    /// Set the caught-up polling interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the delay between retries in milliseconds.
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Give up after `n` consecutive RPC retries.
    pub fn max_rpc_retries(mut self, n: u32) -> Self {
        self.config.max_rpc_retries = Some(n);
        self
    }

    pub fn burn_policy(mut self, policy: BurnPolicy) -> Self {
        self.config.burn_policy = policy;
        self
    }

    /// Toggle exactly-once application of re-scanned events.
    pub fn idempotent(mut self, enabled: bool) -> Self {
        self.config.idempotent = enabled;
        self
    }

    /// Build the `ScannerConfig`.
    pub fn build_config(self) -> ScannerConfig {
        self.config
    }

    /// Validate the config and build a scanner over the given client and stores.
    pub fn build<C: EvmRpcClient>(
        self,
        client: C,
        cursor: Arc<dyn CursorStore>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Result<ChainScanner<C>, IndexerError> {
        ChainScanner::new(self.config, client, cursor, ledger)
    }
}
