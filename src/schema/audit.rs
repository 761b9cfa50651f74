//! Append-only audit records
//!
//! Keys are derived from causal-group metadata (`tx-logIndex`) plus a role
//! suffix when one event produces several records of the same table.
//! `ContractCall` is the one exception to write-once: its classification is
//! filled in later by the correlation index.

use crate::amount::Amount;
use crate::ids::{Address, EventMeta};
use crate::store::Record;
use serde::{Deserialize, Serialize};

macro_rules! keyed_by_id {
    ($ty:ty, $table:expr) => {
        impl Record for $ty {
            const TABLE: &'static str = $table;

            fn key(&self) -> String {
                self.id.clone()
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub vault: Address,
    pub participant: Address,
    pub sender: Address,
    pub assets: Amount,
    pub shares: Amount,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub vault: Address,
    pub participant: Address,
    pub sender: Address,
    pub receiver: Address,
    pub assets: Amount,
    pub shares: Amount,
    pub meta: EventMeta,
}

/// Lifecycle transition; labels are stored exactly as decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: String,
    pub vault: Address,
    pub epoch: u64,
    pub old_state: String,
    pub new_state: String,
    /// Raw codes as emitted; `None` for transitions the engine derives itself
    pub old_code: Option<u8>,
    pub new_code: Option<u8>,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochChange {
    pub id: String,
    pub vault: Address,
    pub old_epoch: u64,
    pub new_epoch: u64,
    pub total_assets_returned: Amount,
    pub meta: EventMeta,
}

/// What caused a valuation refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Deposit,
    Withdraw,
    EpochChange,
    ContractCall,
    AutoRealization,
    Transfer,
    YieldHarvest,
    ManualSync,
}

/// One valuation transition (old → new) of a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub id: String,
    pub vault: Address,
    pub old_total_assets: Amount,
    pub new_total_assets: Amount,
    pub old_total_supply: Amount,
    pub new_total_supply: Amount,
    pub old_share_price: Amount,
    pub new_share_price: Amount,
    pub old_aum: Amount,
    pub new_aum: Amount,
    pub old_usd_value: Option<Amount>,
    pub new_usd_value: Option<Amount>,
    pub change_type: ChangeType,
    pub trigger_event: String,
    pub meta: EventMeta,
}

/// Classification of a generic contract call
///
/// `Unclassified` is the local placeholder until a classification event
/// from the same transaction is correlated. Codes outside the known set
/// decode to `Unknown(code)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Unclassified,
    NotUsed,
    Approve,
    Exchange,
    AddLiquidity,
    RemoveLiquidity,
    Stake,
    Unstake,
    Claim,
    WrapNativeToken,
    UnwrapNativeToken,
    Unknown(u16),
}

impl TransactionType {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => TransactionType::NotUsed,
            1 => TransactionType::Approve,
            2 => TransactionType::Exchange,
            3 => TransactionType::AddLiquidity,
            4 => TransactionType::RemoveLiquidity,
            5 => TransactionType::Stake,
            6 => TransactionType::Unstake,
            7 => TransactionType::Claim,
            8 => TransactionType::WrapNativeToken,
            9 => TransactionType::UnwrapNativeToken,
            other => TransactionType::Unknown(other),
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, TransactionType::Unclassified)
    }
}

/// Generic call observed in a transaction, keyed `(tx, position)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    pub id: String,
    pub vault: Address,
    pub target: Address,
    /// Hex-encoded calldata (`0x` prefixed)
    pub data: String,
    pub value: Amount,
    pub transaction_type: TransactionType,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoRealization {
    pub id: String,
    pub vault: Address,
    pub triggered_by: Address,
    pub pre_realization_value: Amount,
    pub total_fees_extracted: Amount,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllPositionsLiquidation {
    pub id: String,
    pub vault: Address,
    pub total_converted_value: Amount,
    pub meta: EventMeta,
}

/// Yield harvest with its fee split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harvest {
    pub id: String,
    pub vault: Address,
    pub asset: Address,
    pub amount: Amount,
    pub management_fee: Amount,
    pub performance_fee: Amount,
    pub protocol_fee: Amount,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferType {
    YieldHarvest,
    Erc20Approval,
    Erc721Approval,
    WrapNativeToken,
    UnwrapNativeToken,
}

impl TransferType {
    /// Key suffix distinguishing this record from the call at the same position
    pub fn role(&self) -> &'static str {
        match self {
            TransferType::YieldHarvest => "harvest",
            TransferType::Erc20Approval => "approval",
            TransferType::Erc721Approval => "nft-approval",
            TransferType::WrapNativeToken => "wrap",
            TransferType::UnwrapNativeToken => "unwrap",
        }
    }
}

/// Token movement or allowance granted outside the vault's share accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTokenTransfer {
    pub id: String,
    pub vault: Address,
    pub token: Address,
    pub transfer_type: TransferType,
    pub amount: Amount,
    pub destination: Address,
    pub meta: EventMeta,
}

keyed_by_id!(Deposit, "deposit");
keyed_by_id!(Withdrawal, "withdrawal");
keyed_by_id!(StateChange, "state_change");
keyed_by_id!(EpochChange, "epoch_change");
keyed_by_id!(ValueChange, "value_change");
keyed_by_id!(ContractCall, "contract_call");
keyed_by_id!(AutoRealization, "auto_realization");
keyed_by_id!(AllPositionsLiquidation, "liquidation");
keyed_by_id!(Harvest, "harvest");
keyed_by_id!(ExternalTokenTransfer, "external_transfer");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_fallback() {
        assert_eq!(TransactionType::from_code(2), TransactionType::Exchange);
        assert_eq!(TransactionType::from_code(500), TransactionType::Unknown(500));
        assert!(!TransactionType::Unclassified.is_classified());
        assert!(TransactionType::NotUsed.is_classified());
    }

    #[test]
    fn test_transfer_roles_are_distinct() {
        let roles = [
            TransferType::YieldHarvest,
            TransferType::Erc20Approval,
            TransferType::Erc721Approval,
            TransferType::WrapNativeToken,
            TransferType::UnwrapNativeToken,
        ]
        .map(|t| t.role());
        for (i, a) in roles.iter().enumerate() {
            for b in &roles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
