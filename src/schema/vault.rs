//! Vault aggregate

use crate::amount::Amount;
use crate::ids::{Address, EventMeta, TxHash};
use crate::lifecycle::VaultState;
use crate::store::Record;
use serde::{Deserialize, Serialize};

/// Per-vault financial and lifecycle state
///
/// Created by `VaultCreated`, mutated by every flow/epoch/valuation event,
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub id: Address,
    /// Owning principal (manager)
    pub manager: Address,
    pub underlying_asset: Address,
    pub name: String,
    pub symbol: String,
    pub max_capacity: Amount,

    // Valuation (maintained by the valuation engine)
    pub total_assets: Amount,
    pub total_supply: Amount,
    pub share_price: Amount,
    pub aum: Amount,
    /// `None` when the USD source was unreachable on the last refresh
    pub usd_value: Option<Amount>,

    pub state: VaultState,
    pub current_epoch: u64,

    // Oracle protection
    pub harvest_cooldown: u64,
    pub max_price_deviation_bps: u64,
    pub emergency_mode: bool,

    pub is_paused: bool,

    // Fee parameters, populated once from authoritative reads
    pub management_fee: Amount,
    pub performance_fee: Amount,

    // Bookkeeping
    pub last_value_update: i64,
    pub value_update_count: u64,
    pub last_contract_call: i64,

    pub created_block: u64,
    pub created_at: i64,
    pub created_tx: TxHash,
}

pub struct NewVault {
    pub id: Address,
    pub manager: Address,
    pub underlying_asset: Address,
    pub name: String,
    pub symbol: String,
    pub max_capacity: Amount,
}

impl Vault {
    /// Fresh vault with every counter explicitly zeroed
    pub fn create(params: NewVault, meta: &EventMeta) -> Self {
        Self {
            id: params.id,
            manager: params.manager,
            underlying_asset: params.underlying_asset,
            name: params.name,
            symbol: params.symbol,
            max_capacity: params.max_capacity,
            total_assets: Amount::zero(),
            total_supply: Amount::zero(),
            share_price: Amount::scale(),
            aum: Amount::zero(),
            usd_value: None,
            state: VaultState::Fundraising,
            current_epoch: 0,
            harvest_cooldown: 0,
            max_price_deviation_bps: 0,
            emergency_mode: false,
            is_paused: false,
            management_fee: Amount::zero(),
            performance_fee: Amount::zero(),
            last_value_update: meta.block_time,
            value_update_count: 0,
            last_contract_call: 0,
            created_block: meta.block_number,
            created_at: meta.block_time,
            created_tx: meta.tx_hash,
        }
    }
}

impl Record for Vault {
    const TABLE: &'static str = "vault";

    fn key(&self) -> String {
        self.id.to_string()
    }
}
