//! Daily buckets, protocol ledger and protocol constants

use crate::amount::Amount;
use crate::ids::{global_day_key, vault_day_key, Address};
use crate::store::Record;
use serde::{Deserialize, Serialize};

/// Per-vault daily rollup
///
/// Flow sums accumulate; valuation fields are last-write-wins snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVaultStat {
    pub id: String,
    pub vault: Address,
    pub date: i64,
    pub daily_deposits: Amount,
    pub daily_withdrawals: Amount,
    /// deposits + withdrawals (gross, not net)
    pub daily_volume: Amount,
    pub deposit_count: u64,
    pub withdrawal_count: u64,
    pub new_participants: u64,
    pub total_assets: Amount,
    pub total_supply: Amount,
    pub share_price: Amount,
    pub aum: Amount,
}

impl DailyVaultStat {
    pub fn empty(vault: Address, date: i64) -> Self {
        Self {
            id: vault_day_key(&vault, date),
            vault,
            date,
            daily_deposits: Amount::zero(),
            daily_withdrawals: Amount::zero(),
            daily_volume: Amount::zero(),
            deposit_count: 0,
            withdrawal_count: 0,
            new_participants: 0,
            total_assets: Amount::zero(),
            total_supply: Amount::zero(),
            share_price: Amount::zero(),
            aum: Amount::zero(),
        }
    }
}

/// Protocol-wide daily rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProtocolStat {
    pub id: String,
    pub date: i64,
    /// `YYYY-MM-DD` (UTC)
    pub day_label: String,
    pub daily_deposits: Amount,
    pub daily_withdrawals: Amount,
    pub daily_volume: Amount,
    pub new_participants: u64,
    // snapshots from the protocol ledger
    pub total_value_locked: Amount,
    pub vault_count: u64,
    pub participant_count: u64,
}

impl DailyProtocolStat {
    pub fn empty(date: i64) -> Self {
        let day_label = chrono::DateTime::from_timestamp(date, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Self {
            id: global_day_key(date),
            date,
            day_label,
            daily_deposits: Amount::zero(),
            daily_withdrawals: Amount::zero(),
            daily_volume: Amount::zero(),
            new_participants: 0,
            total_value_locked: Amount::zero(),
            vault_count: 0,
            participant_count: 0,
        }
    }
}

pub const PROTOCOL_METRICS_KEY: &str = "protocol";
pub const PROTOCOL_CONSTANTS_KEY: &str = "constants";

/// Running protocol totals, maintained by delta application only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetrics {
    pub id: String,
    pub total_value_locked: Amount,
    pub vault_count: u64,
    pub participant_count: u64,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub last_updated: i64,
}

impl ProtocolMetrics {
    pub fn empty() -> Self {
        Self {
            id: PROTOCOL_METRICS_KEY.to_string(),
            total_value_locked: Amount::zero(),
            vault_count: 0,
            participant_count: 0,
            total_deposited: Amount::zero(),
            total_withdrawn: Amount::zero(),
            last_updated: 0,
        }
    }
}

/// Write-once-per-field cache of externally sourced fee constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    pub id: String,
    pub protocol_fee: Amount,
    pub max_management_fee: Amount,
    pub max_performance_fee: Amount,
}

impl ProtocolConstants {
    pub fn empty() -> Self {
        Self {
            id: PROTOCOL_CONSTANTS_KEY.to_string(),
            protocol_fee: Amount::zero(),
            max_management_fee: Amount::zero(),
            max_performance_fee: Amount::zero(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.protocol_fee.is_zero()
            && !self.max_management_fee.is_zero()
            && !self.max_performance_fee.is_zero()
    }
}

impl Record for DailyVaultStat {
    const TABLE: &'static str = "daily_vault_stat";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for DailyProtocolStat {
    const TABLE: &'static str = "daily_protocol_stat";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for ProtocolMetrics {
    const TABLE: &'static str = "protocol_metrics";

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for ProtocolConstants {
    const TABLE: &'static str = "protocol_constants";

    fn key(&self) -> String {
        self.id.clone()
    }
}
