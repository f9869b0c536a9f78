//! wrapindex-storage — pluggable storage backends for WrapIndex.
//!
//! Every backend implements both [`CursorStore`] and [`LedgerStore`]; the
//! cursor and the balances live in separate tables and never share keys.
//!
//! Backends:
//! - [`memory`] — in-memory (dev/testing, no persistence)
//! - `sqlite` — SQLite via `sqlx` (embedded, single-file persistence)
//! - `postgres` — PostgreSQL via `sqlx` (exact `NUMERIC` balances)

use std::sync::Arc;

use wrapindex_core::checkpoint::CursorStore;
use wrapindex_core::error::IndexerError;
use wrapindex_core::ledger::LedgerStore;

pub mod encoding;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStorage;

/// Which backend a connection string selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite,
    Postgres,
}

impl BackendKind {
    /// `memory`, `postgres://…` / `postgresql://…`, and anything else is
    /// treated as a SQLite URL or file path.
    pub fn from_url(url: &str) -> Self {
        if url.eq_ignore_ascii_case("memory") || url.eq_ignore_ascii_case(":memory:") {
            Self::Memory
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::Postgres
        } else {
            Self::Sqlite
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// One backend viewed through both store traits.
#[derive(Clone)]
pub struct StorageHandle {
    pub kind: BackendKind,
    pub cursor: Arc<dyn CursorStore>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl StorageHandle {
    pub fn new<S>(kind: BackendKind, store: Arc<S>) -> Self
    where
        S: CursorStore + LedgerStore + 'static,
    {
        Self {
            kind,
            cursor: store.clone(),
            ledger: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(BackendKind::Memory, Arc::new(InMemoryStorage::new()))
    }
}

/// Open the backend selected by `url`.
pub async fn connect(url: &str) -> Result<StorageHandle, IndexerError> {
    let kind = BackendKind::from_url(url);
    match kind {
        BackendKind::Memory => Ok(StorageHandle::in_memory()),

        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => {
            let store = sqlite::SqliteStorage::open(url).await?;
            Ok(StorageHandle::new(kind, Arc::new(store)))
        }

        #[cfg(feature = "postgres")]
        BackendKind::Postgres => {
            let store = postgres::PostgresStorage::connect(url).await?;
            Ok(StorageHandle::new(kind, Arc::new(store)))
        }

        #[allow(unreachable_patterns)]
        other => Err(IndexerError::Config(format!(
            "storage backend '{other}' is not compiled in (enable the '{other}' feature)"
        ))),
    }
}
