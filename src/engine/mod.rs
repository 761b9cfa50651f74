//! Indexer engine - orchestration layer for derived vault state
//!
//! ## Architecture
//!
//! ```text
//! IndexedEvent
//!     ↓
//! IndexerEngine::process()          (dispatch by event kind)
//!     ↓
//! handlers::{factory, vault, guards}
//!     ├─ EntityStore               (get-or-create, upsert, audit append)
//!     ├─ ValuationEngine           (authoritative reads → ValueChange)
//!     ├─ CorrelationIndex          (classification → ContractCall)
//!     ├─ daily::record_flow        (per-vault + global day buckets)
//!     └─ ledger                    (protocol totals by delta)
//! ```
//!
//! Events are processed one at a time, to completion, in arrival order.
//! Handlers only return `Err` for store failures; everything else is logged
//! and counted in `Diagnostics`.

pub mod correlation;
pub mod daily;
pub mod ledger;
pub mod valuation;

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::IndexerResult;
use crate::events::{EventKind, IndexedEvent};
use crate::ids::{Address, EventMeta};
use crate::reader::AuthoritativeReader;
use crate::schema::{FactoryField, ProtocolMetrics, Vault};
use crate::store::{EntityStore, MemoryStore, Record, StoreExt};
use correlation::CorrelationIndex;
use daily::FlowSample;
use std::sync::Arc;
use valuation::{ValuationContext, ValuationEngine, ValuationSnapshot};

pub struct IndexerEngine {
    pub(crate) store: Box<dyn EntityStore>,
    pub(crate) reader: Arc<dyn AuthoritativeReader>,
    pub(crate) correlation: CorrelationIndex,
    pub(crate) diagnostics: Diagnostics,
}

impl IndexerEngine {
    pub fn new(
        store: Box<dyn EntityStore>,
        reader: Arc<dyn AuthoritativeReader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            reader,
            correlation: CorrelationIndex::new(config.correlation_window),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Engine over a fresh in-memory store
    pub fn in_memory(reader: Arc<dyn AuthoritativeReader>) -> Self {
        Self::new(Box::new(MemoryStore::new()), reader, EngineConfig::default())
    }

    /// Apply one event to the derived state
    pub fn process(&mut self, event: &IndexedEvent) -> IndexerResult<()> {
        self.diagnostics.events_processed += 1;
        log::debug!(
            "Processing {} from {} ({})",
            event.kind.name(),
            event.source,
            event.meta.record_key()
        );

        let meta = &event.meta;
        let source = event.source;

        match &event.kind {
            // Factory
            EventKind::VaultCreated {
                vault,
                manager,
                underlying_asset,
                name,
                symbol,
                max_capacity,
            } => self.on_vault_created(
                meta,
                source,
                *vault,
                *manager,
                *underlying_asset,
                name,
                symbol,
                max_capacity,
            ),
            EventKind::VaultUpgraded {
                vault,
                new_implementation,
            } => self.on_vault_upgraded(meta, *vault, *new_implementation),
            EventKind::VaultImplementationUpdated { implementation } => {
                self.on_implementation_updated(meta, source, *implementation)
            }
            EventKind::AssetWhitelisted {
                asset,
                token_type,
                allowed,
            } => self.on_asset_whitelisted(meta, source, *asset, *token_type, *allowed),
            EventKind::AssetWhitelistRemoved { asset } => {
                self.on_asset_whitelist_removed(meta, *asset)
            }
            EventKind::UnderlyingAssetAdded { asset, token_type } => {
                self.on_underlying_asset_added(meta, source, *asset, *token_type)
            }
            EventKind::UnderlyingAssetRemoved { asset } => {
                self.on_underlying_asset_removed(meta, *asset)
            }
            EventKind::AdminAddressSet { address } => {
                self.on_factory_address_set(meta, source, FactoryField::Admin, *address)
            }
            EventKind::TreasuryAddressSet { address } => {
                self.on_factory_address_set(meta, source, FactoryField::Treasury, *address)
            }
            EventKind::GovernanceAddressSet { address } => {
                self.on_factory_address_set(meta, source, FactoryField::Governance, *address)
            }
            EventKind::AssetHandlerSet { address } => {
                self.on_factory_address_set(meta, source, FactoryField::AssetHandler, *address)
            }
            EventKind::VaultStorageVersionSet { version } => {
                self.on_storage_version_set(source, *version)
            }
            EventKind::FactoryOwnershipTransferred {
                previous_owner,
                new_owner,
            } => self.on_factory_ownership_transferred(meta, source, *previous_owner, *new_owner),
            EventKind::FactoryPaused { account } => {
                self.on_factory_pause(meta, source, *account, true)
            }
            EventKind::FactoryUnpaused { account } => {
                self.on_factory_pause(meta, source, *account, false)
            }

            // Vault
            EventKind::StateChanged {
                old_state,
                new_state,
                epoch,
            } => self.on_state_changed(meta, source, *old_state, *new_state, *epoch),
            EventKind::EpochAdvanced {
                old_epoch,
                new_epoch,
                total_assets_returned,
            } => self.on_epoch_advanced(meta, source, *old_epoch, *new_epoch, total_assets_returned),
            EventKind::Deposit {
                sender,
                owner,
                assets,
                shares,
            } => self.on_deposit(meta, source, *sender, *owner, assets, shares),
            EventKind::Withdraw {
                sender,
                receiver,
                owner,
                assets,
                shares,
            } => self.on_withdraw(meta, source, *sender, *receiver, *owner, assets, shares),
            EventKind::ContractCalled {
                target,
                data,
                value,
            } => self.on_contract_called(meta, source, *target, data, value),
            EventKind::AutoRealizationTriggered {
                triggered_by,
                pre_realization_value,
                total_fees_extracted,
            } => self.on_auto_realization(
                meta,
                source,
                *triggered_by,
                pre_realization_value,
                total_fees_extracted,
            ),
            EventKind::AllPositionsLiquidated {
                total_converted_value,
            } => self.on_all_positions_liquidated(meta, source, total_converted_value),
            EventKind::OracleProtectionUpdated {
                harvest_cooldown,
                max_price_deviation_bps,
                emergency_mode,
            } => self.on_oracle_protection_updated(
                source,
                *harvest_cooldown,
                *max_price_deviation_bps,
                *emergency_mode,
            ),
            EventKind::EmergencyOracleModeActivated => self.on_emergency_mode(source),
            EventKind::HarvestBlocked => {
                log::info!("⏸️  Harvest blocked on vault {} ({})", source, meta.record_key());
                Ok(())
            }
            EventKind::Deposited | EventKind::Withdrawn => {
                log::debug!("{} on vault {} (covered by Deposit/Withdraw)", event.kind.name(), source);
                Ok(())
            }
            EventKind::Approval {
                owner,
                spender,
                value,
            } => {
                log::info!("✍️  Share approval on {}: {} -> {} ({})", source, owner, spender, value);
                Ok(())
            }
            EventKind::Paused { account } => self.on_vault_pause(meta, source, *account, true),
            EventKind::Unpaused { account } => self.on_vault_pause(meta, source, *account, false),
            EventKind::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => self.on_vault_ownership_transferred(meta, source, *previous_owner, *new_owner),
            EventKind::Transfer { from, to, value } => {
                self.on_share_transfer(meta, source, *from, *to, value)
            }
            EventKind::YieldHarvested {
                asset,
                amount,
                management_fee,
                performance_fee,
                protocol_fee,
            } => self.on_yield_harvested(
                meta,
                source,
                *asset,
                amount,
                management_fee,
                performance_fee,
                protocol_fee,
            ),

            // Asset guard
            EventKind::Erc20Approval {
                vault,
                token,
                spender,
                amount,
            } => self.on_erc20_approval(meta, *vault, *token, *spender, amount),
            EventKind::Erc721Approval {
                vault,
                token,
                spender,
                token_id,
            } => self.on_erc721_approval(meta, *vault, *token, *spender, token_id),
            EventKind::WrapNativeToken {
                vault,
                token,
                amount,
            } => self.on_native_wrap(meta, *vault, *token, amount, true),
            EventKind::UnwrapNativeToken {
                vault,
                token,
                amount,
            } => self.on_native_wrap(meta, *vault, *token, amount, false),
            EventKind::Initialized { version } => {
                log::info!("🛡️  Guard {} initialized (version {})", source, version);
                Ok(())
            }

            // Platform guard
            EventKind::PlatformActivity {
                vault,
                action,
                amount,
            } => self.on_platform_activity(meta, *vault, *action, amount.as_ref()),
            EventKind::TransactionClassified {
                vault,
                code,
                amount,
            } => self.on_transaction_classified(meta, *vault, *code, amount.as_ref()),

            // Governance
            EventKind::AssetGuardSet {
                asset_type,
                guard_address,
            } => self.on_asset_guard_set(meta, *asset_type, *guard_address),
            EventKind::ContractGuardSet {
                ext_contract,
                guard_address,
            } => self.on_contract_guard_set(meta, *ext_contract, *guard_address),
        }
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Current protocol ledger
    pub fn ledger(&self) -> IndexerResult<ProtocolMetrics> {
        Ok(ledger::load(self.store.as_ref())?)
    }

    /// Load the vault an event refers to, or log and count the miss
    pub(crate) fn load_vault(&mut self, id: &Address, event: &str) -> IndexerResult<Option<Vault>> {
        let vault = self.store.load::<Vault>(&id.to_string())?;
        if vault.is_none() {
            self.diagnostics.missing_aggregates += 1;
            log::error!("❌ {} references unknown vault {}, skipping vault update", event, id);
        }
        Ok(vault)
    }

    /// Write an audit record, counting key collisions
    pub(crate) fn append<R: Record>(&mut self, record: &R) -> IndexerResult<()> {
        if self.store.insert_audit(record)? {
            self.diagnostics.duplicate_audit_keys += 1;
        }
        Ok(())
    }

    /// Valuation refresh with an explicit "before" state
    pub(crate) fn revalue_from(
        &mut self,
        vault: &mut Vault,
        before: ValuationSnapshot,
        context: ValuationContext,
    ) -> IndexerResult<()> {
        let valuation = ValuationEngine::new(self.reader.as_ref());
        valuation.refresh_from(
            self.store.as_mut(),
            &mut self.diagnostics,
            vault,
            before,
            &context,
        )?;
        Ok(())
    }

    pub(crate) fn revalue(&mut self, vault: &mut Vault, context: ValuationContext) -> IndexerResult<()> {
        let before = ValuationSnapshot::of(vault);
        self.revalue_from(vault, before, context)
    }

    pub(crate) fn record_daily_flow(
        &mut self,
        vault: &mut Vault,
        sample: &FlowSample,
        meta: &EventMeta,
    ) -> IndexerResult<()> {
        let valuation = ValuationEngine::new(self.reader.as_ref());
        daily::record_flow(
            self.store.as_mut(),
            &valuation,
            &mut self.diagnostics,
            vault,
            sample,
            meta,
        )?;
        Ok(())
    }
}
