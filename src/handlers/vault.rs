//! Vault contract events
//!
//! `source` is always the emitting vault. Handlers that mutate the vault
//! skip (and count) events for vaults never created; handlers that only
//! append audit records still append them.

use crate::amount::Amount;
use crate::engine::daily::FlowSample;
use crate::engine::ledger;
use crate::engine::valuation::{ValuationContext, ValuationSnapshot};
use crate::engine::IndexerEngine;
use crate::error::IndexerResult;
use crate::ids::{position_key, Address, EventMeta};
use crate::lifecycle::VaultState;
use crate::schema::{
    AllPositionsLiquidation, AutoRealization, ChangeType, ContractCall, Deposit, EpochChange,
    ExternalTokenTransfer, Harvest, OwnershipTransfer, PauseChange, Participant, Position,
    StateChange, TransactionType, TransferType, Vault, Withdrawal,
};
use crate::store::StoreExt;

/// Participant and position touched by a flow, with creation flags
struct Holder {
    participant: Participant,
    position: Position,
    new_participant: bool,
    new_position: bool,
}

impl IndexerEngine {
    /// Get-or-create the participant and its position in `vault`
    ///
    /// Counters for newly seen participants/positions are bumped here so
    /// creation and counting cannot drift apart.
    fn load_holder(&mut self, vault: &Address, owner: &Address, at: i64) -> IndexerResult<Holder> {
        let participant = self
            .store
            .get_or_create(&owner.to_string(), || Participant::empty(*owner))?;
        let position = self
            .store
            .get_or_create(&position_key(vault, owner), || Position::empty(*vault, *owner))?;

        let mut holder = Holder {
            participant: participant.record,
            position: position.record,
            new_participant: participant.created,
            new_position: position.created,
        };

        if holder.new_participant {
            ledger::register_participant(self.store.as_mut(), at)?;
            log::info!("👤 New participant {}", owner);
        }
        if holder.new_position {
            holder.participant.vault_count += 1;
        }
        Ok(holder)
    }

    fn save_holder(&mut self, holder: &Holder) -> IndexerResult<()> {
        self.store.upsert(&holder.participant)?;
        self.store.upsert(&holder.position)?;
        Ok(())
    }

    pub(crate) fn on_state_changed(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        old_code: u8,
        new_code: u8,
        epoch: u64,
    ) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "StateChanged")? else {
            return Ok(());
        };

        let old_state = VaultState::from_code(old_code);
        let new_state = VaultState::from_code(new_code);
        if !VaultState::is_canonical_transition(old_state, new_state) {
            log::warn!(
                "⚠️  Vault {} reports unusual transition {} ({}) -> {} ({})",
                vault_id,
                old_state.as_str(),
                old_code,
                new_state.as_str(),
                new_code
            );
        }
        log::info!(
            "🔄 Vault {} state {} -> {} (epoch {})",
            vault_id,
            old_state.as_str(),
            new_state.as_str(),
            epoch
        );

        vault.current_epoch = epoch;
        vault.state = new_state;
        self.store.upsert(&vault)?;

        self.append(&StateChange {
            id: meta.record_key(),
            vault: vault_id,
            epoch,
            old_state: old_state.as_str().to_string(),
            new_state: new_state.as_str().to_string(),
            old_code: Some(old_code),
            new_code: Some(new_code),
            meta: *meta,
        })
    }

    pub(crate) fn on_epoch_advanced(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        old_epoch: u64,
        new_epoch: u64,
        total_assets_returned: &Amount,
    ) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "EpochAdvanced")? else {
            return Ok(());
        };
        log::info!("📅 Vault {} epoch {} -> {}", vault_id, old_epoch, new_epoch);

        let before = ValuationSnapshot::of(&vault);
        vault.current_epoch = new_epoch;
        vault.total_assets = total_assets_returned.clone();
        self.revalue_from(
            &mut vault,
            before,
            ValuationContext::new(ChangeType::EpochChange, "EpochAdvanced", *meta),
        )?;
        self.store.upsert(&vault)?;

        self.append(&EpochChange {
            id: meta.record_key(),
            vault: vault_id,
            old_epoch,
            new_epoch,
            total_assets_returned: total_assets_returned.clone(),
            meta: *meta,
        })
    }

    pub(crate) fn on_deposit(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        sender: Address,
        owner: Address,
        assets: &Amount,
        shares: &Amount,
    ) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "Deposit")? else {
            return Ok(());
        };
        log::info!(
            "💰 Deposit into {} by {}: {} assets / {} shares",
            vault_id,
            owner,
            assets,
            shares
        );

        let mut holder = self.load_holder(&vault_id, &owner, meta.block_time)?;
        holder.participant.record_deposit(assets, meta.block_time);
        holder.position.total_deposited += assets;
        holder.position.credit(shares, meta.block_time);
        self.save_holder(&holder)?;

        let before = ValuationSnapshot::of(&vault);
        vault.total_assets += assets;
        vault.total_supply += shares;
        self.revalue_from(
            &mut vault,
            before,
            ValuationContext::new(ChangeType::Deposit, "Deposit", *meta),
        )?;

        self.append(&Deposit {
            id: meta.record_key(),
            vault: vault_id,
            participant: owner,
            sender,
            assets: assets.clone(),
            shares: shares.clone(),
            meta: *meta,
        })?;

        ledger::record_flow(self.store.as_mut(), assets, &Amount::zero(), meta.block_time)?;
        let sample = FlowSample {
            new_vault_participant: holder.new_position,
            new_protocol_participant: holder.new_participant,
            ..FlowSample::deposit(assets.clone())
        };
        self.record_daily_flow(&mut vault, &sample, meta)?;

        self.store.upsert(&vault)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn on_withdraw(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        sender: Address,
        receiver: Address,
        owner: Address,
        assets: &Amount,
        shares: &Amount,
    ) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "Withdraw")? else {
            return Ok(());
        };
        log::info!(
            "💸 Withdraw from {} by {}: {} assets / {} shares",
            vault_id,
            owner,
            assets,
            shares
        );

        let mut holder = self.load_holder(&vault_id, &owner, meta.block_time)?;
        if holder.new_position {
            log::warn!(
                "⚠️  Withdrawal by {} from {} without a recorded position",
                owner,
                vault_id
            );
        }
        holder.participant.record_withdrawal(assets, meta.block_time);
        holder.position.total_withdrawn += assets;
        holder.position.debit(shares, meta.block_time);
        self.save_holder(&holder)?;

        let before = ValuationSnapshot::of(&vault);
        vault.total_assets -= assets;
        vault.total_supply -= shares;
        self.revalue_from(
            &mut vault,
            before,
            ValuationContext::new(ChangeType::Withdraw, "Withdraw", *meta),
        )?;

        self.append(&Withdrawal {
            id: meta.record_key(),
            vault: vault_id,
            participant: owner,
            sender,
            receiver,
            assets: assets.clone(),
            shares: shares.clone(),
            meta: *meta,
        })?;

        ledger::record_flow(self.store.as_mut(), &Amount::zero(), assets, meta.block_time)?;
        let sample = FlowSample {
            new_vault_participant: holder.new_position,
            new_protocol_participant: holder.new_participant,
            ..FlowSample::withdrawal(assets.clone())
        };
        self.record_daily_flow(&mut vault, &sample, meta)?;

        self.store.upsert(&vault)?;
        Ok(())
    }

    /// Generic call; recorded unclassified until a guard event claims it
    pub(crate) fn on_contract_called(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        target: Address,
        data: &str,
        value: &Amount,
    ) -> IndexerResult<()> {
        log::info!("📞 Vault {} called {}", vault_id, target);

        if let Some(mut vault) = self.load_vault(&vault_id, "ContractCalled")? {
            vault.last_contract_call = meta.block_time;
            self.revalue(
                &mut vault,
                ValuationContext::new(ChangeType::ContractCall, "ContractCalled", *meta),
            )?;
            self.store.upsert(&vault)?;
        }

        let data = if data.is_empty() {
            "0x".to_string()
        } else if data.starts_with("0x") {
            data.to_string()
        } else {
            format!("0x{}", data)
        };

        self.append(&ContractCall {
            id: meta.record_key(),
            vault: vault_id,
            target,
            data,
            value: value.clone(),
            transaction_type: TransactionType::Unclassified,
            meta: *meta,
        })
    }

    pub(crate) fn on_auto_realization(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        triggered_by: Address,
        pre_realization_value: &Amount,
        total_fees_extracted: &Amount,
    ) -> IndexerResult<()> {
        log::info!(
            "🏦 Auto-realization on {} (fees extracted: {})",
            vault_id,
            total_fees_extracted
        );

        if let Some(mut vault) = self.load_vault(&vault_id, "AutoRealizationTriggered")? {
            self.revalue(
                &mut vault,
                ValuationContext::new(
                    ChangeType::AutoRealization,
                    "AutoRealizationTriggered",
                    *meta,
                ),
            )?;
            self.store.upsert(&vault)?;
        }

        self.append(&AutoRealization {
            id: meta.record_key(),
            vault: vault_id,
            triggered_by,
            pre_realization_value: pre_realization_value.clone(),
            total_fees_extracted: total_fees_extracted.clone(),
            meta: *meta,
        })
    }

    /// Direct path into LIQUIDATED, bypassing the state-transition event
    pub(crate) fn on_all_positions_liquidated(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        total_converted_value: &Amount,
    ) -> IndexerResult<()> {
        if let Some(mut vault) = self.load_vault(&vault_id, "AllPositionsLiquidated")? {
            let old_state = vault.state;
            log::info!("🧯 Vault {} liquidated all positions ({})", vault_id, total_converted_value);

            vault.state = VaultState::Liquidated;
            self.store.upsert(&vault)?;

            self.append(&StateChange {
                id: meta.record_key(),
                vault: vault_id,
                epoch: vault.current_epoch,
                old_state: old_state.as_str().to_string(),
                new_state: VaultState::Liquidated.as_str().to_string(),
                old_code: None,
                new_code: None,
                meta: *meta,
            })?;
        }

        self.append(&AllPositionsLiquidation {
            id: meta.record_key(),
            vault: vault_id,
            total_converted_value: total_converted_value.clone(),
            meta: *meta,
        })
    }

    pub(crate) fn on_oracle_protection_updated(
        &mut self,
        vault_id: Address,
        harvest_cooldown: u64,
        max_price_deviation_bps: u64,
        emergency_mode: bool,
    ) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "OracleProtectionUpdated")? else {
            return Ok(());
        };
        vault.harvest_cooldown = harvest_cooldown;
        vault.max_price_deviation_bps = max_price_deviation_bps;
        vault.emergency_mode = emergency_mode;
        self.store.upsert(&vault)?;
        Ok(())
    }

    pub(crate) fn on_emergency_mode(&mut self, vault_id: Address) -> IndexerResult<()> {
        let Some(mut vault) = self.load_vault(&vault_id, "EmergencyOracleModeActivated")? else {
            return Ok(());
        };
        log::warn!("🚨 Emergency oracle mode activated on vault {}", vault_id);
        vault.emergency_mode = true;
        self.store.upsert(&vault)?;
        Ok(())
    }

    pub(crate) fn on_vault_pause(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        account: Address,
        paused: bool,
    ) -> IndexerResult<()> {
        if let Some(mut vault) = self.load_vault(&vault_id, if paused { "Paused" } else { "Unpaused" })? {
            vault.is_paused = paused;
            self.store.upsert(&vault)?;
        }
        self.append(&PauseChange {
            id: meta.record_key(),
            contract: vault_id,
            account,
            paused,
            meta: *meta,
        })
    }

    pub(crate) fn on_vault_ownership_transferred(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        previous_owner: Address,
        new_owner: Address,
    ) -> IndexerResult<()> {
        if let Some(mut vault) = self.load_vault(&vault_id, "OwnershipTransferred")? {
            vault.manager = new_owner;
            self.store.upsert(&vault)?;
        }
        self.append(&OwnershipTransfer {
            id: meta.record_key(),
            contract: vault_id,
            previous_owner,
            new_owner,
            meta: *meta,
        })
    }

    /// Share token transfer
    ///
    /// Mints and burns only trigger a valuation refresh (the paired
    /// deposit/withdraw event moves the position). Peer transfers move
    /// shares between positions.
    pub(crate) fn on_share_transfer(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        from: Address,
        to: Address,
        value: &Amount,
    ) -> IndexerResult<()> {
        if from.is_zero() || to.is_zero() {
            if let Some(mut vault) = self.store.load::<Vault>(&vault_id.to_string())? {
                self.revalue(
                    &mut vault,
                    ValuationContext::new(ChangeType::Transfer, "Transfer", *meta),
                )?;
                self.store.upsert(&vault)?;
            }
            return Ok(());
        }

        if self.load_vault(&vault_id, "Transfer")?.is_none() {
            return Ok(());
        }
        log::info!("🔁 Share transfer on {}: {} -> {} ({})", vault_id, from, to, value);

        let mut sender = self
            .store
            .get_or_create(&position_key(&vault_id, &from), || Position::empty(vault_id, from))?
            .record;
        sender.debit(value, meta.block_time);
        self.store.upsert(&sender)?;

        let mut receiver = self
            .store
            .get_or_create(&position_key(&vault_id, &to), || Position::empty(vault_id, to))?
            .record;
        receiver.credit(value, meta.block_time);
        self.store.upsert(&receiver)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn on_yield_harvested(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        asset: Address,
        amount: &Amount,
        management_fee: &Amount,
        performance_fee: &Amount,
        protocol_fee: &Amount,
    ) -> IndexerResult<()> {
        log::info!("🌾 Yield harvested on {}: {} of {}", vault_id, amount, asset);

        if let Some(mut vault) = self.load_vault(&vault_id, "YieldHarvested")? {
            self.revalue(
                &mut vault,
                ValuationContext::new(ChangeType::YieldHarvest, "YieldHarvested", *meta),
            )?;
            self.store.upsert(&vault)?;
        }

        self.append(&Harvest {
            id: meta.record_key(),
            vault: vault_id,
            asset,
            amount: amount.clone(),
            management_fee: management_fee.clone(),
            performance_fee: performance_fee.clone(),
            protocol_fee: protocol_fee.clone(),
            meta: *meta,
        })?;

        self.append(&ExternalTokenTransfer {
            id: meta.role_key(TransferType::YieldHarvest.role()),
            vault: vault_id,
            token: asset,
            transfer_type: TransferType::YieldHarvest,
            amount: amount.clone(),
            destination: vault_id,
            meta: *meta,
        })
    }
}
