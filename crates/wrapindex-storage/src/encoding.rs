//! Text encodings shared by the SQL backends.
//!
//! Balances are stored as decimal strings so no precision is lost. SQLite has
//! no exact arbitrary-precision numeric type, so it also stores a sort key
//! whose byte order matches numeric order.

use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::Zero;

use wrapindex_core::error::IndexerError;
use wrapindex_core::Address;

/// Digits in the length field of a sort key. Supports balances up to
/// 9999 decimal digits, far beyond any sum of `uint256` values.
const LEN_WIDTH: usize = 4;
const MAX_LEN: usize = 9999;

/// Encode `balance` so that lexicographic order of keys equals numeric order.
///
/// ```text
/// positive: "2" + len(4 digits) + digits
/// zero:     "1"
/// negative: "0" + (9999 - len)(4 digits) + nines-complement of digits
/// ```
pub fn balance_sort_key(balance: &BigInt) -> String {
    if balance.is_zero() {
        return "1".to_string();
    }
    let digits = balance.magnitude().to_str_radix(10);
    let len = digits.len().min(MAX_LEN);
    match balance.sign() {
        Sign::Minus => {
            let complement: String = digits
                .bytes()
                .map(|d| char::from(b'9' - (d - b'0')))
                .collect();
            format!("0{:0width$}{complement}", MAX_LEN - len, width = LEN_WIDTH)
        }
        _ => format!("2{:0width$}{digits}", len, width = LEN_WIDTH),
    }
}

pub fn parse_balance(raw: &str) -> Result<BigInt, IndexerError> {
    BigInt::from_str(raw.trim())
        .map_err(|e| IndexerError::Storage(format!("corrupt balance '{raw}': {e}")))
}

pub fn parse_address(raw: &str) -> Result<Address, IndexerError> {
    Address::from_str(raw).map_err(|e| IndexerError::Storage(format!("corrupt address '{raw}': {e}")))
}
