//! Factory, asset registry and governance records

use crate::amount::Amount;
use crate::ids::{Address, EventMeta};
use crate::store::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultFactory {
    pub id: Address,
    pub admin: Option<Address>,
    pub treasury: Option<Address>,
    pub governance: Option<Address>,
    pub asset_handler: Option<Address>,
    pub implementation: Option<Address>,
    pub storage_version: u64,
    pub total_vaults: u64,
    pub is_paused: bool,
}

impl VaultFactory {
    pub fn empty(id: Address) -> Self {
        Self {
            id,
            admin: None,
            treasury: None,
            governance: None,
            asset_handler: None,
            implementation: None,
            storage_version: 0,
            total_vaults: 0,
            is_paused: false,
        }
    }
}

/// Which factory address slot an event reassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryField {
    Admin,
    Treasury,
    Governance,
    AssetHandler,
    Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfigChange {
    pub id: String,
    pub factory: Address,
    pub field: FactoryField,
    pub address: Address,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultCreated {
    pub id: String,
    pub factory: Address,
    pub vault: Address,
    pub manager: Address,
    pub underlying_asset: Address,
    pub name: String,
    pub symbol: String,
    pub max_capacity: Amount,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultUpgraded {
    pub id: String,
    pub vault: Address,
    pub new_implementation: Address,
    pub meta: EventMeta,
}

/// Ownership handover on a factory or vault contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipTransfer {
    pub id: String,
    pub contract: Address,
    pub previous_owner: Address,
    pub new_owner: Address,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseChange {
    pub id: String,
    pub contract: Address,
    pub account: Address,
    pub paused: bool,
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistedAsset {
    pub id: Address,
    pub factory: Address,
    pub token_type: u16,
    pub allowed: bool,
    pub added_at: i64,
    pub added_block: u64,
    pub removed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingAsset {
    pub id: Address,
    pub factory: Address,
    pub token_type: u16,
    pub is_active: bool,
    pub added_at: i64,
    pub added_block: u64,
    pub removed_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Asset,
    Contract,
}

/// Latest guard registered for an asset type or external contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRegistration {
    pub id: String,
    pub kind: GuardKind,
    /// Asset type code or external contract address, as text
    pub subject: String,
    pub guard: Address,
    pub meta: EventMeta,
}

impl GuardRegistration {
    pub fn key_for(kind: GuardKind, subject: &str) -> String {
        match kind {
            GuardKind::Asset => format!("asset-{}", subject),
            GuardKind::Contract => format!("contract-{}", subject),
        }
    }
}

impl Record for VaultFactory {
    const TABLE: &'static str = "vault_factory";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for WhitelistedAsset {
    const TABLE: &'static str = "whitelisted_asset";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for UnderlyingAsset {
    const TABLE: &'static str = "underlying_asset";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

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

keyed_by_id!(FactoryConfigChange, "factory_config_change");
keyed_by_id!(VaultCreated, "vault_created");
keyed_by_id!(VaultUpgraded, "vault_upgraded");
keyed_by_id!(OwnershipTransfer, "ownership_transfer");
keyed_by_id!(PauseChange, "pause_change");
keyed_by_id!(GuardRegistration, "guard_registration");
