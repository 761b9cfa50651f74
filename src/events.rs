//! Inbound event types
//!
//! One variant per decoded contract event. Events arrive as JSON lines:
//!
//! ```json
//! {"meta":{"tx_hash":"0x..","log_index":3,"block_number":100,"block_time":1700000000},
//!  "source":"0x<emitting contract>",
//!  "kind":{"type":"Deposit","sender":"0x..","owner":"0x..","assets":"100","shares":"100"}}
//! ```
//!
//! Events sharing a `tx_hash` may arrive in any relative order.

use crate::amount::Amount;
use crate::ids::{Address, EventMeta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub meta: EventMeta,
    /// Contract that emitted the event (factory, vault, guard, governance)
    pub source: Address,
    pub kind: EventKind,
}

/// Platform guard activity, each mapping to a fixed call classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformAction {
    ExchangeFrom,
    ExchangeTo,
    AddLiquidity,
    RemoveLiquidity,
    UnwrapNativeToken,
    VertexDeposit,
    VertexSlowMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    // ── Factory ────────────────────────────────────────────────
    VaultCreated {
        vault: Address,
        manager: Address,
        underlying_asset: Address,
        name: String,
        symbol: String,
        max_capacity: Amount,
    },
    VaultUpgraded {
        vault: Address,
        new_implementation: Address,
    },
    VaultImplementationUpdated {
        implementation: Address,
    },
    AssetWhitelisted {
        asset: Address,
        token_type: u16,
        allowed: bool,
    },
    AssetWhitelistRemoved {
        asset: Address,
    },
    UnderlyingAssetAdded {
        asset: Address,
        token_type: u16,
    },
    UnderlyingAssetRemoved {
        asset: Address,
    },
    AdminAddressSet {
        address: Address,
    },
    TreasuryAddressSet {
        address: Address,
    },
    GovernanceAddressSet {
        address: Address,
    },
    AssetHandlerSet {
        address: Address,
    },
    VaultStorageVersionSet {
        version: u64,
    },
    FactoryOwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    FactoryPaused {
        account: Address,
    },
    FactoryUnpaused {
        account: Address,
    },

    // ── Vault ──────────────────────────────────────────────────
    StateChanged {
        old_state: u8,
        new_state: u8,
        epoch: u64,
    },
    EpochAdvanced {
        old_epoch: u64,
        new_epoch: u64,
        total_assets_returned: Amount,
    },
    Deposit {
        sender: Address,
        owner: Address,
        assets: Amount,
        shares: Amount,
    },
    Withdraw {
        sender: Address,
        receiver: Address,
        owner: Address,
        assets: Amount,
        shares: Amount,
    },
    ContractCalled {
        target: Address,
        #[serde(default)]
        data: String,
        value: Amount,
    },
    AutoRealizationTriggered {
        triggered_by: Address,
        pre_realization_value: Amount,
        total_fees_extracted: Amount,
    },
    AllPositionsLiquidated {
        total_converted_value: Amount,
    },
    OracleProtectionUpdated {
        harvest_cooldown: u64,
        max_price_deviation_bps: u64,
        emergency_mode: bool,
    },
    EmergencyOracleModeActivated,
    HarvestBlocked,
    /// Vault-specific echoes of `Deposit`/`Withdraw`; payload is ignored
    Deposited,
    Withdrawn,
    /// Share allowance; not a value transfer
    Approval {
        owner: Address,
        spender: Address,
        value: Amount,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
    },
    YieldHarvested {
        asset: Address,
        amount: Amount,
        management_fee: Amount,
        performance_fee: Amount,
        protocol_fee: Amount,
    },

    // ── Asset guard ────────────────────────────────────────────
    Erc20Approval {
        vault: Address,
        token: Address,
        spender: Address,
        amount: Amount,
    },
    Erc721Approval {
        vault: Address,
        token: Address,
        spender: Address,
        token_id: Amount,
    },
    WrapNativeToken {
        vault: Address,
        token: Address,
        amount: Amount,
    },
    UnwrapNativeToken {
        vault: Address,
        token: Address,
        amount: Amount,
    },
    Initialized {
        version: u64,
    },

    // ── Platform guard (call classification) ───────────────────
    PlatformActivity {
        vault: Address,
        action: PlatformAction,
        #[serde(default)]
        amount: Option<Amount>,
    },
    TransactionClassified {
        vault: Address,
        code: u16,
        #[serde(default)]
        amount: Option<Amount>,
    },

    // ── Governance ─────────────────────────────────────────────
    AssetGuardSet {
        asset_type: u16,
        guard_address: Address,
    },
    ContractGuardSet {
        ext_contract: Address,
        guard_address: Address,
    },
}

impl EventKind {
    /// Event name for logs and `trigger_event` fields
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::VaultCreated { .. } => "VaultCreated",
            EventKind::VaultUpgraded { .. } => "VaultUpgraded",
            EventKind::VaultImplementationUpdated { .. } => "VaultImplementationUpdated",
            EventKind::AssetWhitelisted { .. } => "AssetWhitelisted",
            EventKind::AssetWhitelistRemoved { .. } => "AssetWhitelistRemoved",
            EventKind::UnderlyingAssetAdded { .. } => "UnderlyingAssetAdded",
            EventKind::UnderlyingAssetRemoved { .. } => "UnderlyingAssetRemoved",
            EventKind::AdminAddressSet { .. } => "AdminAddressSet",
            EventKind::TreasuryAddressSet { .. } => "TreasuryAddressSet",
            EventKind::GovernanceAddressSet { .. } => "GovernanceAddressSet",
            EventKind::AssetHandlerSet { .. } => "AssetHandlerSet",
            EventKind::VaultStorageVersionSet { .. } => "VaultStorageVersionSet",
            EventKind::FactoryOwnershipTransferred { .. } => "FactoryOwnershipTransferred",
            EventKind::FactoryPaused { .. } => "FactoryPaused",
            EventKind::FactoryUnpaused { .. } => "FactoryUnpaused",
            EventKind::StateChanged { .. } => "StateChanged",
            EventKind::EpochAdvanced { .. } => "EpochAdvanced",
            EventKind::Deposit { .. } => "Deposit",
            EventKind::Withdraw { .. } => "Withdraw",
            EventKind::ContractCalled { .. } => "ContractCalled",
            EventKind::AutoRealizationTriggered { .. } => "AutoRealizationTriggered",
            EventKind::AllPositionsLiquidated { .. } => "AllPositionsLiquidated",
            EventKind::OracleProtectionUpdated { .. } => "OracleProtectionUpdated",
            EventKind::EmergencyOracleModeActivated => "EmergencyOracleModeActivated",
            EventKind::HarvestBlocked => "HarvestBlocked",
            EventKind::Deposited => "Deposited",
            EventKind::Withdrawn => "Withdrawn",
            EventKind::Approval { .. } => "Approval",
            EventKind::Paused { .. } => "Paused",
            EventKind::Unpaused { .. } => "Unpaused",
            EventKind::OwnershipTransferred { .. } => "OwnershipTransferred",
            EventKind::Transfer { .. } => "Transfer",
            EventKind::YieldHarvested { .. } => "YieldHarvested",
            EventKind::Erc20Approval { .. } => "ERC20Approval",
            EventKind::Erc721Approval { .. } => "ERC721Approval",
            EventKind::WrapNativeToken { .. } => "WrapNativeToken",
            EventKind::UnwrapNativeToken { .. } => "UnwrapNativeToken",
            EventKind::Initialized { .. } => "Initialized",
            EventKind::PlatformActivity { .. } => "PlatformActivity",
            EventKind::TransactionClassified { .. } => "TransactionClassified",
            EventKind::AssetGuardSet { .. } => "AssetGuardSet",
            EventKind::ContractGuardSet { .. } => "ContractGuardSet",
        }
    }
}
