//! Scanner configuration and state types.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::ledger::{BurnPolicy, LedgerPolicy};
use crate::retry::RetryPolicy;

/// Configuration for a scanner instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Token contract whose logs are indexed.
    pub contract: Address,
    /// Cursor value seeded on first run; scanning begins at the block after
    /// it. Only consulted when the store holds no cursor yet.
    pub starting_block: Option<u64>,
    /// Maximum number of blocks per `eth_getLogs` query.
    pub window_width: u64,
    /// How long to wait before re-reading the chain height once caught up
    /// (milliseconds).
    pub poll_interval_ms: u64,
    /// Delay before retrying a failed RPC call or a window that failed to
    /// persist (milliseconds).
    pub retry_backoff_ms: u64,
    /// Give up after this many consecutive RPC retries. `None` = never.
    pub max_rpc_retries: Option<u32>,
    /// What `Burn` events do to balances.
    pub burn_policy: BurnPolicy,
    /// Deduplicate events by `(block, log_index)` so re-scanned windows are
    /// applied at most once.
    pub idempotent: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            contract: Address::ZERO,
            starting_block: None,
            window_width: 100,
            poll_interval_ms: 15_000,
            retry_backoff_ms: 15_000,
            max_rpc_retries: None,
            burn_policy: BurnPolicy::Ignore,
            idempotent: true,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.window_width == 0 {
            return Err(IndexerError::Config("window width must be at least 1 block".into()));
        }
        if self.contract == Address::ZERO {
            return Err(IndexerError::Config("token contract address is not set".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_rpc_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            burn: self.burn_policy,
            idempotent: self.idempotent,
        }
    }
}

/// Runtime state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerState {
    /// Not yet started.
    Created,
    /// Loading or seeding the cursor and reading the chain height.
    Bootstrapping,
    /// Working through windows behind the chain head.
    Scanning,
    /// Caught up; waiting for new blocks.
    Idle,
    /// Waiting out a backoff after an RPC or store failure.
    Backoff,
    /// Terminated.
    Stopped,
    /// Encountered an unrecoverable error.
    Error,
}

impl std::fmt::Display for ScannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Bootstrapping => write!(f, "bootstrapping"),
            Self::Scanning => write!(f, "scanning"),
            Self::Idle => write!(f, "idle"),
            Self::Backoff => write!(f, "backoff"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}
