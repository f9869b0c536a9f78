//! Event schemas and the log decoder.
//!
//! The token contract emits two events the indexer cares about:
//!
//! ```text
//! Transfer(address indexed from, address indexed to, uint256 value)
//! Burn(address indexed from, uint256 amount, bytes data)
//! ```
//!
//! A log is classified by its `topics[0]`, which is the keccak256 hash of the
//! canonical signature. Hashes are computed once per process and shared by
//! every [`EventDecoder`].

use std::sync::OnceLock;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, Bytes, B256, U256};
use tiny_keccak::{Hasher, Keccak};

use crate::error::DecodeError;
use crate::types::LogEntry;

pub const TRANSFER_SIGNATURE: &str = "Transfer(address,address,uint256)";
pub const BURN_SIGNATURE: &str = "Burn(address,uint256,bytes)";

/// Compute the keccak256 topic hash of a canonical event signature.
pub fn keccak256_signature(signature: &str) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    B256::from(output)
}

fn schema_topics() -> &'static (B256, B256) {
    static TOPICS: OnceLock<(B256, B256)> = OnceLock::new();
    TOPICS.get_or_init(|| {
        (
            keccak256_signature(TRANSFER_SIGNATURE),
            keccak256_signature(BURN_SIGNATURE),
        )
    })
}

// ─── Decoded events ───────────────────────────────────────────────────────────

/// Which known schema a log matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transfer,
    Burn,
}

/// A validated, typed token event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Burn {
        from: Address,
        amount: U256,
        data: Bytes,
    },
}

impl DecodedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Transfer { .. } => EventKind::Transfer,
            Self::Burn { .. } => EventKind::Burn,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Burn { .. } => "Burn",
        }
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────

/// Classifies raw logs by topic hash and decodes the known ones.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    transfer: B256,
    burn: B256,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder {
    pub fn new() -> Self {
        let (transfer, burn) = *schema_topics();
        Self { transfer, burn }
    }

    /// Topic hashes of every known schema, for building a log filter.
    pub fn topics(&self) -> [B256; 2] {
        [self.transfer, self.burn]
    }

    pub fn classify(&self, topic0: &B256) -> Option<EventKind> {
        if *topic0 == self.transfer {
            Some(EventKind::Transfer)
        } else if *topic0 == self.burn {
            Some(EventKind::Burn)
        } else {
            None
        }
    }

    /// Decode `log` into a typed event.
    ///
    /// Returns `Ok(None)` when `topics[0]` is not a known schema; such logs are
    /// ignored rather than treated as failures.
    pub fn decode(&self, log: &LogEntry) -> Result<Option<DecodedEvent>, DecodeError> {
        let topic0 = log.topics.first().ok_or(DecodeError::NoTopics)?;

        match self.classify(topic0) {
            Some(EventKind::Transfer) => {
                let from = address_topic(&log.topics, 1, "from")?;
                let to = address_topic(&log.topics, 2, "to")?;
                let value = decode_uint(&log.data, "value")?;
                Ok(Some(DecodedEvent::Transfer { from, to, value }))
            }
            Some(EventKind::Burn) => {
                let from = address_topic(&log.topics, 1, "from")?;
                let (amount, data) = decode_burn_data(&log.data)?;
                Ok(Some(DecodedEvent::Burn { from, amount, data }))
            }
            None => Ok(None),
        }
    }
}

/// Indexed address params are left-padded to a 32-byte word.
fn address_topic(topics: &[B256], index: usize, field: &'static str) -> Result<Address, DecodeError> {
    let word = topics
        .get(index)
        .ok_or(DecodeError::MissingTopic { field })?;
    if word.as_slice()[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::InvalidField {
            field,
            reason: format!("non-zero padding in address word {word}"),
        });
    }
    Ok(Address::from_word(*word))
}

fn decode_uint(data: &[u8], field: &'static str) -> Result<U256, DecodeError> {
    match DynSolType::Uint(256).abi_decode(data) {
        Ok(DynSolValue::Uint(value, _)) => Ok(value),
        Ok(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected uint256, got {other:?}"),
        }),
        Err(e) => Err(DecodeError::InvalidField {
            field,
            reason: e.to_string(),
        }),
    }
}

fn decode_burn_data(data: &[u8]) -> Result<(U256, Bytes), DecodeError> {
    let ty = DynSolType::Tuple(vec![DynSolType::Uint(256), DynSolType::Bytes]);
    // The head word is `amount`; anything failing past it belongs to `data`.
    let field = if data.len() < 32 { "amount" } else { "data" };

    let decoded = ty
        .abi_decode_sequence(data)
        .map_err(|e| DecodeError::InvalidField {
            field,
            reason: e.to_string(),
        })?;

    match decoded {
        DynSolValue::Tuple(values) => match values.as_slice() {
            [DynSolValue::Uint(amount, _), DynSolValue::Bytes(bytes)] => {
                Ok((*amount, Bytes::from(bytes.clone())))
            }
            other => Err(DecodeError::InvalidField {
                field,
                reason: format!("unexpected burn payload shape: {other:?}"),
            }),
        },
        other => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected tuple, got {other:?}"),
        }),
    }
}

// ─── Encoding helpers ─────────────────────────────────────────────────────────

/// Left-pad an address into an indexed topic word.
pub fn address_word(address: Address) -> B256 {
    address.into_word()
}

/// ABI-encode a `uint256` as event data.
pub fn uint_word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}
