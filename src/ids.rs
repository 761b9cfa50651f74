//! Identifiers and deterministic record keys
//!
//! Every derived record is addressable from data already carried by the
//! event, so no secondary index is needed:
//!
//! | Record | Key |
//! |---|---|
//! | Vault, participant, factory, asset | `0x<address>` |
//! | Position | `0x<vault>-0x<participant>` |
//! | Flow / call / audit record | `0x<tx>-<log index>[-<role>]` |
//! | Daily bucket | `0x<vault>-<day>` or `global-<day>` |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid hex in identifier: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], IdParseError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|_| IdParseError::InvalidHex(s.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| IdParseError::WrongLength { expected: N, actual })
}

macro_rules! fixed_hex_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s).map($name)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_hex_id!(Address, 20);
fixed_hex_id!(TxHash, 32);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Causal-group metadata carried by every inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub tx_hash: TxHash,
    pub log_index: u32,
    pub block_number: u64,
    pub block_time: i64,
}

impl EventMeta {
    /// Key for the record written at this event's own position
    pub fn record_key(&self) -> String {
        call_key(&self.tx_hash, self.log_index)
    }

    /// Key for an additional record of the given role from the same event
    pub fn role_key(&self, role: &str) -> String {
        format!("{}-{}", self.record_key(), role)
    }
}

/// Key for a record at `(tx, position)`, used by the correlation probe
pub fn call_key(tx_hash: &TxHash, log_index: u32) -> String {
    format!("{}-{}", tx_hash, log_index)
}

pub fn position_key(vault: &Address, participant: &Address) -> String {
    format!("{}-{}", vault, participant)
}

/// Day-aligned bucket start: `floor(ts / 86400) * 86400`
pub fn day_start(timestamp: i64) -> i64 {
    timestamp.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

pub fn vault_day_key(vault: &Address, day: i64) -> String {
    format!("{}-{}", vault, day)
}

pub fn global_day_key(day: i64) -> String {
    format!("global-{}", day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_and_display() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(addr.to_string(), "0x00000000000000000000000000000000000000aa");
        assert!(!addr.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0xdeadbeef".parse::<Address>().unwrap_err();
        assert_eq!(err, IdParseError::WrongLength { expected: 20, actual: 4 });
        assert!(matches!("0xzz".parse::<TxHash>(), Err(IdParseError::InvalidHex(_))));
    }

    #[test]
    fn test_role_keys_do_not_collide() {
        let meta = EventMeta {
            tx_hash: TxHash([1u8; 32]),
            log_index: 4,
            block_number: 10,
            block_time: 1_700_000_000,
        };
        assert_ne!(meta.record_key(), meta.role_key("value"));
        assert_ne!(meta.role_key("approval"), meta.role_key("wrap"));
        assert!(meta.record_key().ends_with("-4"));
        assert_eq!(meta.record_key(), call_key(&meta.tx_hash, 4));
    }

    #[test]
    fn test_day_start() {
        assert_eq!(day_start(86_400 * 3 + 5), 86_400 * 3);
        assert_eq!(day_start(86_400 * 3), 86_400 * 3);
        assert_eq!(day_start(86_399), 0);
    }
}
