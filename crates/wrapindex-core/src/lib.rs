//! wrapindex-core — foundation for the resumable token-holder indexer.
//!
//! # Architecture
//!
//! ```text
//! ScannerBuilder → ChainScanner
//!                      ├── CursorManager    (seed / resume / monotonic commit)
//!                      ├── EventDecoder     (Transfer + Burn, topic-hash keyed)
//!                      ├── Ledger           (signed deltas, exactly-once per log)
//!                      └── Storage backend (memory / SQLite / Postgres)
//!
//! SnapshotReporter ── reads the same LedgerStore, never writes
//! ```

pub mod checkpoint;
pub mod clock;
pub mod cursor;
pub mod error;
pub mod events;
pub mod indexer;
pub mod ledger;
pub mod report;
pub mod retry;
pub mod types;

pub use checkpoint::{CursorManager, CursorStore};
pub use clock::{InstantSleeper, Sleeper, TokioSleeper};
pub use cursor::Cursor;
pub use error::{DecodeError, IndexerError};
pub use events::{DecodedEvent, EventDecoder, EventKind};
pub use indexer::{ScannerConfig, ScannerState};
pub use ledger::{ApplyOutcome, BurnPolicy, Delta, HolderBalance, Ledger, LedgerPolicy, LedgerStore};
pub use report::{ReportSummary, SnapshotReporter};
pub use retry::RetryPolicy;
pub use types::{BlockRange, EventId, LogEntry, LogFilter};

/// Re-exported so downstream crates agree on primitive types.
pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use num_bigint::BigInt;
