//! SQLite storage backend for WrapIndex.
//!
//! Persists the cursor, holder balances, and applied-event ids to a single
//! SQLite file. Uses `sqlx` with WAL mode so a reporter can read while the
//! scanner writes.
//!
//! # Usage
//! ```rust,no_run
//! use wrapindex_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./holders.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//! - `cursor` — single row holding the last processed block
//! - `holders` — address → decimal balance, plus an order-preserving sort key
//! - `applied_events` — `(block_number, log_index)` of events already applied

use std::str::FromStr;

use async_trait::async_trait;
use num_bigint::BigInt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use wrapindex_core::checkpoint::CursorStore;
use wrapindex_core::error::IndexerError;
use wrapindex_core::ledger::{Delta, HolderBalance, LedgerStore};
use wrapindex_core::types::{address_key, EventId};
use wrapindex_core::Address;

use crate::encoding::{balance_sort_key, parse_address, parse_balance};

fn storage_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// SQLite-backed storage for the cursor and the holder ledger.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./holders.db"`) or a SQLite URL
    /// (`"sqlite:./holders.db"`). The file is created if missing.
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}")
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(storage_err)?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await.map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so the
    /// pool is pinned to one connection. All data is lost when it is dropped.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), IndexerError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cursor (
                id           INTEGER PRIMARY KEY CHECK (id = 1),
                block_number INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS holders (
                address  TEXT PRIMARY KEY,
                balance  TEXT NOT NULL,
                sort_key TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_holders_sort ON holders (sort_key DESC, address);",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS applied_events (
                block_number INTEGER NOT NULL,
                log_index    INTEGER NOT NULL,
                PRIMARY KEY (block_number, log_index)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Read-modify-write of one balance on an open connection or transaction.
    async fn add_on(
        conn: &mut SqliteConnection,
        address: &Address,
        delta: &BigInt,
    ) -> Result<BigInt, IndexerError> {
        let key = address_key(address);
        let row = sqlx::query("SELECT balance FROM holders WHERE address = ?")
            .bind(&key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(storage_err)?;

        let current = match row {
            Some(r) => parse_balance(&r.get::<String, _>("balance"))?,
            None => BigInt::default(),
        };
        let next = current + delta;

        sqlx::query(
            "INSERT INTO holders (address, balance, sort_key) VALUES (?, ?, ?)
             ON CONFLICT(address) DO UPDATE
             SET balance = excluded.balance, sort_key = excluded.sort_key",
        )
        .bind(&key)
        .bind(next.to_string())
        .bind(balance_sort_key(&next))
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;

        Ok(next)
    }
}

// ─── CursorStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl CursorStore for SqliteStorage {
    async fn cursor(&self) -> Result<Option<u64>, IndexerError> {
        let row = sqlx::query("SELECT block_number FROM cursor WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.map(|r| r.get::<i64, _>("block_number") as u64))
    }

    async fn set_cursor(&self, block_number: u64) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT INTO cursor (id, block_number, updated_at) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE
             SET block_number = excluded.block_number, updated_at = excluded.updated_at",
        )
        .bind(block_number as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(block = block_number, "cursor saved");
        Ok(())
    }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for SqliteStorage {
    async fn balance(&self, address: &Address) -> Result<Option<BigInt>, IndexerError> {
        let row = sqlx::query("SELECT balance FROM holders WHERE address = ?")
            .bind(address_key(address))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.map(|r| parse_balance(&r.get::<String, _>("balance")))
            .transpose()
    }

    async fn add_to_balance(
        &self,
        address: &Address,
        delta: &BigInt,
    ) -> Result<BigInt, IndexerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let balance = Self::add_on(&mut tx, address, delta).await?;
        tx.commit().await.map_err(storage_err)?;
        Ok(balance)
    }

    async fn apply_event(&self, id: EventId, deltas: &[Delta]) -> Result<bool, IndexerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let inserted = sqlx::query(
            "INSERT INTO applied_events (block_number, log_index) VALUES (?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(id.block_number as i64)
        .bind(id.log_index as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await.map_err(storage_err)?;
            return Ok(false);
        }

        for delta in deltas {
            Self::add_on(&mut tx, &delta.address, &delta.amount).await?;
        }

        tx.commit().await.map_err(storage_err)?;
        debug!(%id, deltas = deltas.len(), "event applied");
        Ok(true)
    }

    async fn prune_applied(&self, block: u64) -> Result<u64, IndexerError> {
        let result = sqlx::query("DELETE FROM applied_events WHERE block_number <= ?")
            .bind(block as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    async fn holders_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<HolderBalance>, IndexerError> {
        let rows = sqlx::query(
            "SELECT address, balance FROM holders
             ORDER BY sort_key DESC, address ASC
             LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|r| {
                Ok(HolderBalance {
                    address: parse_address(&r.get::<String, _>("address"))?,
                    balance: parse_balance(&r.get::<String, _>("balance"))?,
                })
            })
            .collect()
    }

    async fn holder_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM holders")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
