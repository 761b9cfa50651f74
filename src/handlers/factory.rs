//! Factory events: vault creation, asset registry, factory configuration

use crate::amount::Amount;
use crate::engine::ledger;
use crate::engine::IndexerEngine;
use crate::error::IndexerResult;
use crate::ids::{Address, EventMeta};
use crate::schema::{
    FactoryConfigChange, FactoryField, NewVault, OwnershipTransfer, PauseChange, UnderlyingAsset,
    Vault, VaultCreated, VaultFactory, VaultUpgraded, WhitelistedAsset,
};
use crate::store::StoreExt;

impl IndexerEngine {
    fn load_factory(&self, id: Address) -> IndexerResult<VaultFactory> {
        Ok(self
            .store
            .get_or_create(&id.to_string(), || VaultFactory::empty(id))?
            .record)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn on_vault_created(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        vault_id: Address,
        manager: Address,
        underlying_asset: Address,
        name: &str,
        symbol: &str,
        max_capacity: &Amount,
    ) -> IndexerResult<()> {
        if self.store.load::<Vault>(&vault_id.to_string())?.is_some() {
            log::warn!(
                "⚠️  VaultCreated for existing vault {} ({}), keeping current state",
                vault_id,
                meta.record_key()
            );
            return Ok(());
        }

        log::info!("✅ Vault created: {} ({} / {}) by {}", vault_id, name, symbol, manager);

        let mut factory = self.load_factory(factory_id)?;
        factory.total_vaults += 1;
        self.store.upsert(&factory)?;

        let vault = Vault::create(
            NewVault {
                id: vault_id,
                manager,
                underlying_asset,
                name: name.to_string(),
                symbol: symbol.to_string(),
                max_capacity: max_capacity.clone(),
            },
            meta,
        );
        self.store.upsert(&vault)?;
        ledger::register_vault(self.store.as_mut(), meta.block_time)?;

        self.append(&VaultCreated {
            id: meta.record_key(),
            factory: factory_id,
            vault: vault_id,
            manager,
            underlying_asset,
            name: name.to_string(),
            symbol: symbol.to_string(),
            max_capacity: max_capacity.clone(),
            meta: *meta,
        })
    }

    pub(crate) fn on_vault_upgraded(
        &mut self,
        meta: &EventMeta,
        vault_id: Address,
        new_implementation: Address,
    ) -> IndexerResult<()> {
        log::info!("⬆️  Vault {} upgraded to {}", vault_id, new_implementation);
        self.append(&VaultUpgraded {
            id: meta.record_key(),
            vault: vault_id,
            new_implementation,
            meta: *meta,
        })
    }

    pub(crate) fn on_implementation_updated(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        implementation: Address,
    ) -> IndexerResult<()> {
        self.set_factory_slot(meta, factory_id, FactoryField::Implementation, implementation)
    }

    pub(crate) fn on_factory_address_set(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        field: FactoryField,
        address: Address,
    ) -> IndexerResult<()> {
        self.set_factory_slot(meta, factory_id, field, address)
    }

    fn set_factory_slot(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        field: FactoryField,
        address: Address,
    ) -> IndexerResult<()> {
        log::info!("🔧 Factory {} {:?} set to {}", factory_id, field, address);

        let mut factory = self.load_factory(factory_id)?;
        let slot = match field {
            FactoryField::Admin => &mut factory.admin,
            FactoryField::Treasury => &mut factory.treasury,
            FactoryField::Governance => &mut factory.governance,
            FactoryField::AssetHandler => &mut factory.asset_handler,
            FactoryField::Implementation => &mut factory.implementation,
        };
        *slot = Some(address);
        self.store.upsert(&factory)?;

        self.append(&FactoryConfigChange {
            id: meta.record_key(),
            factory: factory_id,
            field,
            address,
            meta: *meta,
        })
    }

    pub(crate) fn on_storage_version_set(
        &mut self,
        factory_id: Address,
        version: u64,
    ) -> IndexerResult<()> {
        let mut factory = self.load_factory(factory_id)?;
        factory.storage_version = version;
        self.store.upsert(&factory)?;
        Ok(())
    }

    pub(crate) fn on_asset_whitelisted(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        asset: Address,
        token_type: u16,
        allowed: bool,
    ) -> IndexerResult<()> {
        log::info!("📋 Asset {} whitelisted (type {}, allowed: {})", asset, token_type, allowed);

        let mut entry = self
            .store
            .get_or_create(&asset.to_string(), || WhitelistedAsset {
                id: asset,
                factory: factory_id,
                token_type,
                allowed,
                added_at: meta.block_time,
                added_block: meta.block_number,
                removed_at: None,
            })?
            .record;
        entry.token_type = token_type;
        entry.allowed = allowed;
        if !allowed {
            entry.removed_at = Some(meta.block_time);
        }
        self.store.upsert(&entry)?;
        Ok(())
    }

    pub(crate) fn on_asset_whitelist_removed(
        &mut self,
        meta: &EventMeta,
        asset: Address,
    ) -> IndexerResult<()> {
        let Some(mut entry) = self.store.load::<WhitelistedAsset>(&asset.to_string())? else {
            log::warn!("⚠️  Whitelist removal for unknown asset {}", asset);
            return Ok(());
        };
        entry.allowed = false;
        entry.removed_at = Some(meta.block_time);
        self.store.upsert(&entry)?;
        Ok(())
    }

    /// (Re-)registration always starts from a fresh active record
    pub(crate) fn on_underlying_asset_added(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        asset: Address,
        token_type: u16,
    ) -> IndexerResult<()> {
        log::info!("📋 Underlying asset {} added (type {})", asset, token_type);
        self.store.upsert(&UnderlyingAsset {
            id: asset,
            factory: factory_id,
            token_type,
            is_active: true,
            added_at: meta.block_time,
            added_block: meta.block_number,
            removed_at: None,
        })?;
        Ok(())
    }

    pub(crate) fn on_underlying_asset_removed(
        &mut self,
        meta: &EventMeta,
        asset: Address,
    ) -> IndexerResult<()> {
        let Some(mut entry) = self.store.load::<UnderlyingAsset>(&asset.to_string())? else {
            log::warn!("⚠️  Removal of unknown underlying asset {}", asset);
            return Ok(());
        };
        entry.is_active = false;
        entry.removed_at = Some(meta.block_time);
        self.store.upsert(&entry)?;
        Ok(())
    }

    pub(crate) fn on_factory_ownership_transferred(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        previous_owner: Address,
        new_owner: Address,
    ) -> IndexerResult<()> {
        log::info!("🔑 Factory {} ownership {} -> {}", factory_id, previous_owner, new_owner);
        self.append(&OwnershipTransfer {
            id: meta.record_key(),
            contract: factory_id,
            previous_owner,
            new_owner,
            meta: *meta,
        })
    }

    pub(crate) fn on_factory_pause(
        &mut self,
        meta: &EventMeta,
        factory_id: Address,
        account: Address,
        paused: bool,
    ) -> IndexerResult<()> {
        log::info!("⏯️  Factory {} paused: {} (by {})", factory_id, paused, account);

        let mut factory = self.load_factory(factory_id)?;
        factory.is_paused = paused;
        self.store.upsert(&factory)?;

        self.append(&PauseChange {
            id: meta.record_key(),
            contract: factory_id,
            account,
            paused,
            meta: *meta,
        })
    }
}
