//! Derived record types
//!
//! Mutable aggregates (vault, participant, position, daily buckets, ledger)
//! are upserted in place. Audit records (flows, state/epoch/value changes,
//! calls, harvests, transfers) are write-once.

pub mod audit;
pub mod factory;
pub mod participant;
pub mod stats;
pub mod vault;

pub use audit::{
    AllPositionsLiquidation, AutoRealization, ChangeType, ContractCall, Deposit, EpochChange,
    ExternalTokenTransfer, Harvest, StateChange, TransactionType, TransferType, ValueChange,
    Withdrawal,
};
pub use factory::{
    FactoryConfigChange, FactoryField, GuardKind, GuardRegistration, OwnershipTransfer,
    PauseChange, UnderlyingAsset, VaultCreated, VaultFactory, VaultUpgraded, WhitelistedAsset,
};
pub use participant::{Participant, Position};
pub use stats::{DailyProtocolStat, DailyVaultStat, ProtocolConstants, ProtocolMetrics};
pub use vault::{NewVault, Vault};
