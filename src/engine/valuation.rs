//! Valuation engine
//!
//! Replaces a vault's locally accumulated holdings/shares with authoritative
//! reads, recomputes unit price and AUM, and emits one `ValueChange` per
//! observed transition. AUM deltas are forwarded to the protocol ledger so
//! TVL never needs a scan.
//!
//! Read failures are not errors: the field keeps its last-known (or locally
//! accumulated) value, and the next successful refresh records the
//! correction as an ordinary transition.

use crate::amount::{unit_price, Amount};
use crate::diagnostics::Diagnostics;
use crate::engine::ledger;
use crate::error::StoreResult;
use crate::ids::{Address, EventMeta};
use crate::reader::{AuthoritativeReader, ReadField};
use crate::schema::stats::PROTOCOL_CONSTANTS_KEY;
use crate::schema::{ChangeType, ProtocolConstants, ValueChange, Vault};
use crate::store::{EntityStore, StoreExt};

/// Valuation-relevant fields of a vault at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationSnapshot {
    pub total_assets: Amount,
    pub total_supply: Amount,
    pub share_price: Amount,
    pub aum: Amount,
    pub usd_value: Option<Amount>,
}

impl ValuationSnapshot {
    pub fn of(vault: &Vault) -> Self {
        Self {
            total_assets: vault.total_assets.clone(),
            total_supply: vault.total_supply.clone(),
            share_price: vault.share_price.clone(),
            aum: vault.aum.clone(),
            usd_value: vault.usd_value.clone(),
        }
    }
}

/// Why a refresh happened and where its `ValueChange` is keyed
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationContext {
    pub change_type: ChangeType,
    pub trigger_event: &'static str,
    pub meta: EventMeta,
    /// Key suffix; distinct roles let one event emit several value changes
    pub role: &'static str,
}

impl ValuationContext {
    pub fn new(change_type: ChangeType, trigger_event: &'static str, meta: EventMeta) -> Self {
        Self {
            change_type,
            trigger_event,
            meta,
            role: "value",
        }
    }

    pub fn with_role(mut self, role: &'static str) -> Self {
        self.role = role;
        self
    }
}

/// Floor locally accumulated holdings and supply at zero
///
/// Without authoritative reads, a withdrawal larger than the indexed
/// deposits drives the local figures negative.
fn clamp_negative(diagnostics: &mut Diagnostics, vault: &mut Vault) {
    if vault.total_assets.is_negative() {
        log::warn!(
            "⚠️  Vault {} holdings went negative ({}), clamping to zero",
            vault.id,
            vault.total_assets
        );
        vault.total_assets = Amount::zero();
        diagnostics.negative_clamps += 1;
    }
    if vault.total_supply.is_negative() {
        log::warn!(
            "⚠️  Vault {} share supply went negative ({}), clamping to zero",
            vault.id,
            vault.total_supply
        );
        vault.total_supply = Amount::zero();
        diagnostics.negative_clamps += 1;
    }
}

pub struct ValuationEngine<'a> {
    reader: &'a dyn AuthoritativeReader,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(reader: &'a dyn AuthoritativeReader) -> Self {
        Self { reader }
    }

    /// Refresh using the vault's current fields as the "before" state
    pub fn refresh(
        &self,
        store: &mut dyn EntityStore,
        diagnostics: &mut Diagnostics,
        vault: &mut Vault,
        context: &ValuationContext,
    ) -> StoreResult<Option<ValueChange>> {
        let before = ValuationSnapshot::of(vault);
        self.refresh_from(store, diagnostics, vault, before, context)
    }

    /// Refresh against an explicit "before" state
    ///
    /// Flow handlers snapshot the vault before applying their local deltas
    /// so the emitted transition spans the whole event, not just the part
    /// the reads corrected. The vault is mutated in place; persisting it is
    /// the caller's job.
    pub fn refresh_from(
        &self,
        store: &mut dyn EntityStore,
        diagnostics: &mut Diagnostics,
        vault: &mut Vault,
        before: ValuationSnapshot,
        context: &ValuationContext,
    ) -> StoreResult<Option<ValueChange>> {
        if let Some(assets) = self.read(diagnostics, &vault.id, ReadField::TotalAssets) {
            vault.total_assets = assets;
        }
        if let Some(supply) = self.read(diagnostics, &vault.id, ReadField::TotalSupply) {
            vault.total_supply = supply;
        }
        clamp_negative(diagnostics, vault);

        match self.read(diagnostics, &vault.id, ReadField::UsdValue) {
            Some(usd) => {
                vault.aum = usd.clone();
                vault.usd_value = Some(usd);
            }
            None => {
                diagnostics.usd_fallbacks += 1;
                log::warn!(
                    "⚠️  USD value unavailable for vault {}, AUM falls back to holdings ({})",
                    vault.id,
                    vault.total_assets
                );
                vault.aum = vault.total_assets.clone();
                vault.usd_value = None;
            }
        }

        vault.share_price = unit_price(&vault.total_assets, &vault.total_supply);

        self.populate_fees(store, diagnostics, vault)?;

        vault.last_value_update = context.meta.block_time;
        vault.value_update_count += 1;

        let after = ValuationSnapshot::of(vault);
        if after == before {
            return Ok(None);
        }

        ledger::apply_aum_delta(store, &before.aum, &after.aum, context.meta.block_time)?;

        let change = ValueChange {
            id: context.meta.role_key(context.role),
            vault: vault.id,
            old_total_assets: before.total_assets,
            new_total_assets: after.total_assets,
            old_total_supply: before.total_supply,
            new_total_supply: after.total_supply,
            old_share_price: before.share_price,
            new_share_price: after.share_price,
            old_aum: before.aum,
            new_aum: after.aum,
            old_usd_value: before.usd_value,
            new_usd_value: after.usd_value,
            change_type: context.change_type,
            trigger_event: context.trigger_event.to_string(),
            meta: context.meta,
        };

        if store.insert_audit(&change)? {
            diagnostics.duplicate_audit_keys += 1;
        }
        diagnostics.value_changes += 1;

        log::debug!(
            "Vault {} value change ({:?}): aum {} -> {}, price {} -> {}",
            vault.id,
            change.change_type,
            change.old_aum,
            change.new_aum,
            change.old_share_price,
            change.new_share_price
        );

        Ok(Some(change))
    }

    /// Fill fee parameters that are still at their zero default
    fn populate_fees(
        &self,
        store: &mut dyn EntityStore,
        diagnostics: &mut Diagnostics,
        vault: &mut Vault,
    ) -> StoreResult<()> {
        if vault.management_fee.is_zero() {
            if let Some(fee) = self.read_quiet(diagnostics, &vault.id, ReadField::ManagementFee) {
                vault.management_fee = fee;
            }
        }
        if vault.performance_fee.is_zero() {
            if let Some(fee) = self.read_quiet(diagnostics, &vault.id, ReadField::PerformanceFee) {
                vault.performance_fee = fee;
            }
        }

        let mut constants = store
            .get_or_create(PROTOCOL_CONSTANTS_KEY, ProtocolConstants::empty)?
            .record;
        if constants.is_complete() {
            return Ok(());
        }

        let mut changed = false;
        let slots = [
            (&mut constants.protocol_fee, ReadField::ProtocolFee),
            (&mut constants.max_management_fee, ReadField::MaxManagementFee),
            (&mut constants.max_performance_fee, ReadField::MaxPerformanceFee),
        ];
        for (slot, field) in slots {
            if slot.is_zero() {
                if let Some(value) = self.read_quiet(diagnostics, &vault.id, field) {
                    if !value.is_zero() {
                        *slot = value;
                        changed = true;
                    }
                }
            }
        }

        if changed {
            store.upsert(&constants)?;
        }
        Ok(())
    }

    fn read(
        &self,
        diagnostics: &mut Diagnostics,
        vault: &Address,
        field: ReadField,
    ) -> Option<Amount> {
        match self.reader.read(vault, field) {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics.failed_reads += 1;
                log::warn!("⚠️  Read {:?} failed for vault {}: {}", field, vault, e);
                None
            }
        }
    }

    /// Same as `read`, but for optional parameters that are retried on
    /// every refresh until they resolve
    fn read_quiet(
        &self,
        diagnostics: &mut Diagnostics,
        vault: &Address,
        field: ReadField,
    ) -> Option<Amount> {
        match self.reader.read(vault, field) {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics.failed_reads += 1;
                log::debug!("Read {:?} failed for vault {}: {}", field, vault, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TxHash;
    use crate::reader::{SnapshotReader, UnavailableReader};
    use crate::schema::NewVault;
    use crate::store::MemoryStore;

    fn meta(log_index: u32) -> EventMeta {
        EventMeta {
            tx_hash: TxHash([3u8; 32]),
            log_index,
            block_number: 50,
            block_time: 1_700_000_000 + log_index as i64,
        }
    }

    fn make_vault(id: Address) -> Vault {
        Vault::create(
            NewVault {
                id,
                manager: Address([0xee; 20]),
                underlying_asset: Address([0xaa; 20]),
                name: "Test".to_string(),
                symbol: "TST".to_string(),
                max_capacity: Amount::from(1_000_000u64),
            },
            &meta(0),
        )
    }

    #[test]
    fn test_reads_replace_local_holdings() {
        let id = Address([1u8; 20]);
        let reader = SnapshotReader::new();
        reader.set(id, ReadField::TotalAssets, Amount::from(200u64));
        reader.set(id, ReadField::TotalSupply, Amount::from(100u64));
        reader.set(id, ReadField::UsdValue, Amount::from(400u64));

        let mut store = MemoryStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut vault = make_vault(id);

        let change = ValuationEngine::new(&reader)
            .refresh(
                &mut store,
                &mut diagnostics,
                &mut vault,
                &ValuationContext::new(ChangeType::ManualSync, "Test", meta(1)),
            )
            .unwrap()
            .unwrap();

        assert_eq!(vault.share_price.to_string(), "2000000000000000000");
        assert_eq!(vault.aum, Amount::from(400u64));
        assert_eq!(change.old_aum, Amount::zero());
        assert_eq!(change.new_usd_value, Some(Amount::from(400u64)));
        assert_eq!(change.id, meta(1).role_key("value"));
        assert_eq!(ledger::load(&store).unwrap().total_value_locked, Amount::from(400u64));
        assert_eq!(diagnostics.usd_fallbacks, 0);
    }

    #[test]
    fn test_unavailable_source_falls_back_to_holdings() {
        let mut store = MemoryStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut vault = make_vault(Address([2u8; 20]));
        let before = ValuationSnapshot::of(&vault);
        vault.total_assets = Amount::from(100u64);
        vault.total_supply = Amount::from(100u64);

        let change = ValuationEngine::new(&UnavailableReader)
            .refresh_from(
                &mut store,
                &mut diagnostics,
                &mut vault,
                before,
                &ValuationContext::new(ChangeType::Deposit, "Deposit", meta(2)),
            )
            .unwrap()
            .unwrap();

        assert_eq!(vault.aum, Amount::from(100u64));
        assert_eq!(vault.usd_value, None);
        assert_eq!(vault.share_price, Amount::scale());
        assert_eq!(change.old_total_assets, Amount::zero());
        assert_eq!(change.new_total_assets, Amount::from(100u64));
        assert_eq!(diagnostics.usd_fallbacks, 1);
        assert!(diagnostics.failed_reads >= 3);
    }

    #[test]
    fn test_negative_local_holdings_are_clamped() {
        // Test: 100 assets / 200 shares in, then 150 assets out without reads
        let mut store = MemoryStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut vault = make_vault(Address([6u8; 20]));
        vault.total_assets = &Amount::from(100u64) - &Amount::from(150u64);
        vault.total_supply = Amount::from(100u64);

        ValuationEngine::new(&UnavailableReader)
            .refresh(
                &mut store,
                &mut diagnostics,
                &mut vault,
                &ValuationContext::new(ChangeType::Withdraw, "Withdraw", meta(4)),
            )
            .unwrap();

        assert!(vault.total_assets.is_zero());
        assert!(vault.share_price.is_zero());
        assert!(vault.aum.is_zero());
        assert_eq!(diagnostics.negative_clamps, 1);
        assert!(!ledger::load(&store).unwrap().total_value_locked.is_negative());
    }

    #[test]
    fn test_unchanged_valuation_emits_nothing() {
        let mut store = MemoryStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut vault = make_vault(Address([4u8; 20]));
        let engine = ValuationEngine::new(&UnavailableReader);
        let context = ValuationContext::new(ChangeType::ManualSync, "Test", meta(3));

        assert!(engine.refresh(&mut store, &mut diagnostics, &mut vault, &context).unwrap().is_none());
        assert_eq!(vault.value_update_count, 1);
        assert_eq!(diagnostics.value_changes, 0);
    }

    #[test]
    fn test_fees_are_read_once() {
        let id = Address([5u8; 20]);
        let reader = SnapshotReader::new();
        reader.set(id, ReadField::ManagementFee, Amount::from(200u64));
        reader.set(id, ReadField::ProtocolFee, Amount::from(50u64));

        let mut store = MemoryStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut vault = make_vault(id);
        let engine = ValuationEngine::new(&reader);
        let context = ValuationContext::new(ChangeType::ManualSync, "Test", meta(4));

        engine.refresh(&mut store, &mut diagnostics, &mut vault, &context).unwrap();
        assert_eq!(vault.management_fee, Amount::from(200u64));

        // Test: Later source changes do not overwrite a populated fee
        reader.set(id, ReadField::ManagementFee, Amount::from(999u64));
        reader.set(id, ReadField::ProtocolFee, Amount::from(999u64));
        engine.refresh(&mut store, &mut diagnostics, &mut vault, &context).unwrap();

        assert_eq!(vault.management_fee, Amount::from(200u64));
        let constants: ProtocolConstants = store.load(PROTOCOL_CONSTANTS_KEY).unwrap().unwrap();
        assert_eq!(constants.protocol_fee, Amount::from(50u64));
        assert!(constants.max_management_fee.is_zero());
    }
}
