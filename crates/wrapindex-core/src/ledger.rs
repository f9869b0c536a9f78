//! Balance ledger — turns decoded events into signed per-address deltas.
//!
//! Balances are arbitrary-precision signed integers. An address that has never
//! been touched has an implicit balance of zero; a zero balance is a normal
//! state and the row is never removed.
//!
//! # Exactly-once application
//!
//! With [`LedgerPolicy::idempotent`] set, every event is applied through
//! [`LedgerStore::apply_event`], which records the event's `(block, log_index)`
//! in the same atomic step as its deltas. A window re-scanned after a crash
//! between apply and cursor commit is then a no-op for events already applied.
//! Without it, deltas go through [`LedgerStore::add_to_balance`] one by one and
//! a re-scan double-counts.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IndexerError;
use crate::events::DecodedEvent;
use crate::types::EventId;

// ─── Deltas ───────────────────────────────────────────────────────────────────

/// A signed balance adjustment for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub address: Address,
    pub amount: BigInt,
}

impl Delta {
    pub fn credit(address: Address, value: U256) -> Self {
        Self {
            address,
            amount: u256_to_bigint(value),
        }
    }

    pub fn debit(address: Address, value: U256) -> Self {
        Self {
            address,
            amount: -u256_to_bigint(value),
        }
    }
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderBalance {
    pub address: Address,
    pub balance: BigInt,
}

// ─── Policy ───────────────────────────────────────────────────────────────────

/// What a `Burn` event does to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnPolicy {
    /// Burns are observed and logged but leave balances untouched.
    ///
    /// Tracked holder totals then exceed on-chain supply by the burned amount.
    #[default]
    Ignore,
    /// Burns debit the burner's balance.
    Subtract,
}

impl std::str::FromStr for BurnPolicy {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "subtract" => Ok(Self::Subtract),
            other => Err(IndexerError::Config(format!(
                "unknown burn policy '{other}' (expected 'ignore' or 'subtract')"
            ))),
        }
    }
}

impl std::fmt::Display for BurnPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Subtract => write!(f, "subtract"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    pub burn: BurnPolicy,
    /// Deduplicate events by `(block, log_index)`.
    pub idempotent: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            burn: BurnPolicy::Ignore,
            idempotent: true,
        }
    }
}

/// Deltas an event produces, in application order.
///
/// A transfer debits the sender before crediting the recipient, so a
/// self-transfer nets to zero.
pub fn deltas_for(event: &DecodedEvent, burn: BurnPolicy) -> Vec<Delta> {
    match event {
        DecodedEvent::Transfer { from, to, value } => {
            vec![Delta::debit(*from, *value), Delta::credit(*to, *value)]
        }
        DecodedEvent::Burn { from, amount, .. } => match burn {
            BurnPolicy::Ignore => Vec::new(),
            BurnPolicy::Subtract => vec![Delta::debit(*from, *amount)],
        },
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Persistent address → balance mapping.
///
/// Implementations include `InMemoryStorage`, `SqliteStorage`, and
/// `PostgresStorage`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance, or `None` if the address was never touched.
    async fn balance(&self, address: &Address) -> Result<Option<BigInt>, IndexerError>;

    /// Atomically add `delta` to the balance of `address` (absent = zero) and
    /// return the new balance.
    async fn add_to_balance(&self, address: &Address, delta: &BigInt)
        -> Result<BigInt, IndexerError>;

    /// Atomically apply all `deltas` and record `id` as applied.
    ///
    /// Returns `false` and changes nothing if `id` was already applied.
    async fn apply_event(&self, id: EventId, deltas: &[Delta]) -> Result<bool, IndexerError>;

    /// Forget applied ids at or below `block`. Returns how many were removed.
    async fn prune_applied(&self, block: u64) -> Result<u64, IndexerError>;

    /// A page of holders ordered by balance descending, then address ascending.
    async fn holders_page(&self, offset: u64, limit: u64)
        -> Result<Vec<HolderBalance>, IndexerError>;

    /// Number of addresses with a balance row.
    async fn holder_count(&self) -> Result<u64, IndexerError>;
}

// ─── Ledger ───────────────────────────────────────────────────────────────────

/// Result of applying one decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Deltas were written.
    Applied { deltas: usize },
    /// The event was applied by an earlier pass and was skipped.
    Duplicate,
    /// The event produced no deltas under the current policy.
    Observed,
}

/// Applies decoded events to a [`LedgerStore`] according to a [`LedgerPolicy`].
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Add `amount` to `address`'s balance as a single atomic read-modify-write.
    pub async fn apply_delta(
        &self,
        address: &Address,
        amount: &BigInt,
    ) -> Result<BigInt, IndexerError> {
        let balance = self.store.add_to_balance(address, amount).await?;
        debug!(%address, delta = %amount, %balance, "balance updated");
        Ok(balance)
    }

    /// Apply `event`, identified on-chain by `id`.
    pub async fn apply(
        &self,
        id: EventId,
        event: &DecodedEvent,
    ) -> Result<ApplyOutcome, IndexerError> {
        let deltas = deltas_for(event, self.policy.burn);

        if self.policy.idempotent {
            // Recorded even with no deltas so a replayed burn is reported as such.
            if !self.store.apply_event(id, &deltas).await? {
                debug!(event = event.name(), %id, "already applied, skipping");
                return Ok(ApplyOutcome::Duplicate);
            }
        } else {
            for delta in &deltas {
                self.apply_delta(&delta.address, &delta.amount).await?;
            }
        }

        if deltas.is_empty() {
            Ok(ApplyOutcome::Observed)
        } else {
            Ok(ApplyOutcome::Applied {
                deltas: deltas.len(),
            })
        }
    }

    /// Drop idempotency records that a committed cursor has made redundant.
    pub async fn prune(&self, committed: u64) -> Result<u64, IndexerError> {
        if !self.policy.idempotent {
            return Ok(0);
        }
        self.store.prune_applied(committed).await
    }

    pub async fn balance(&self, address: &Address) -> Result<BigInt, IndexerError> {
        Ok(self.store.balance(address).await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[test]
    fn transfer_debits_then_credits() {
        let event = DecodedEvent::Transfer {
            from: addr(1),
            to: addr(2),
            value: U256::from(100u64),
        };
        let deltas = deltas_for(&event, BurnPolicy::Ignore);
        assert_eq!(
            deltas,
            vec![
                Delta {
                    address: addr(1),
                    amount: BigInt::from(-100)
                },
                Delta {
                    address: addr(2),
                    amount: BigInt::from(100)
                },
            ]
        );
    }

    #[test]
    fn transfer_deltas_conserve() {
        let event = DecodedEvent::Transfer {
            from: addr(1),
            to: addr(2),
            value: U256::MAX,
        };
        let sum: BigInt = deltas_for(&event, BurnPolicy::Subtract)
            .iter()
            .map(|d| d.amount.clone())
            .sum();
        assert_eq!(sum, BigInt::from(0));
    }

    #[test]
    fn burn_policy_controls_deltas() {
        let event = DecodedEvent::Burn {
            from: addr(1),
            amount: U256::from(50u64),
            data: Bytes::new(),
        };
        assert!(deltas_for(&event, BurnPolicy::Ignore).is_empty());
        assert_eq!(
            deltas_for(&event, BurnPolicy::Subtract),
            vec![Delta {
                address: addr(1),
                amount: BigInt::from(-50)
            }]
        );
    }

    #[test]
    fn u256_max_converts_exactly() {
        let big = u256_to_bigint(U256::MAX);
        assert_eq!(
            big.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        assert_eq!(u256_to_bigint(U256::ZERO), BigInt::from(0));
    }

    #[test]
    fn burn_policy_parse() {
        assert_eq!("ignore".parse::<BurnPolicy>().unwrap(), BurnPolicy::Ignore);
        assert_eq!("Subtract".parse::<BurnPolicy>().unwrap(), BurnPolicy::Subtract);
        assert!("melt".parse::<BurnPolicy>().is_err());
        assert_eq!(BurnPolicy::default(), BurnPolicy::Ignore);
    }
}
