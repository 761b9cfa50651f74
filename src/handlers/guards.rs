//! Guard and governance events
//!
//! Asset guards report token-level side effects of a vault call (approvals,
//! native wraps); each is recorded as a call of its own plus an external
//! transfer. Platform guards only classify a call that the vault already
//! reported, which goes through the correlation index.

use crate::amount::Amount;
use crate::engine::correlation::{Classification, CorrelationOutcome};
use crate::engine::IndexerEngine;
use crate::error::IndexerResult;
use crate::events::PlatformAction;
use crate::ids::{Address, EventMeta};
use crate::schema::{
    ContractCall, ExternalTokenTransfer, GuardKind, GuardRegistration, TransactionType,
    TransferType,
};
use crate::store::StoreExt;

impl PlatformAction {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            PlatformAction::ExchangeFrom | PlatformAction::ExchangeTo => TransactionType::Exchange,
            PlatformAction::AddLiquidity => TransactionType::AddLiquidity,
            PlatformAction::RemoveLiquidity => TransactionType::RemoveLiquidity,
            PlatformAction::UnwrapNativeToken => TransactionType::UnwrapNativeToken,
            PlatformAction::VertexDeposit => TransactionType::Stake,
            PlatformAction::VertexSlowMode => TransactionType::NotUsed,
        }
    }
}

impl IndexerEngine {
    /// Call record plus external transfer for one asset-guard event
    #[allow(clippy::too_many_arguments)]
    fn record_guarded_transfer(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        token: Address,
        call_value: &Amount,
        transfer_type: TransferType,
        amount: &Amount,
        destination: Address,
    ) -> IndexerResult<()> {
        self.append(&ContractCall {
            id: meta.record_key(),
            vault,
            target: token,
            data: "0x".to_string(),
            value: call_value.clone(),
            transaction_type: TransactionType::Unclassified,
            meta: *meta,
        })?;

        self.append(&ExternalTokenTransfer {
            id: meta.role_key(transfer_type.role()),
            vault,
            token,
            transfer_type,
            amount: amount.clone(),
            destination,
            meta: *meta,
        })
    }

    pub(crate) fn on_erc20_approval(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        token: Address,
        spender: Address,
        amount: &Amount,
    ) -> IndexerResult<()> {
        log::info!("🛡️  ERC20 approval: vault {} token {} spender {}", vault, token, spender);
        // The allowance is not a value transfer; the call itself carries none.
        self.record_guarded_transfer(
            meta,
            vault,
            token,
            &Amount::zero(),
            TransferType::Erc20Approval,
            amount,
            spender,
        )
    }

    pub(crate) fn on_erc721_approval(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        token: Address,
        spender: Address,
        token_id: &Amount,
    ) -> IndexerResult<()> {
        log::info!(
            "🛡️  ERC721 approval: vault {} token {} #{} spender {}",
            vault,
            token,
            token_id,
            spender
        );
        self.record_guarded_transfer(
            meta,
            vault,
            token,
            token_id,
            TransferType::Erc721Approval,
            token_id,
            spender,
        )
    }

    /// Wrapped and unwrapped tokens both stay in the vault
    pub(crate) fn on_native_wrap(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        token: Address,
        amount: &Amount,
        wrap: bool,
    ) -> IndexerResult<()> {
        let transfer_type = if wrap {
            TransferType::WrapNativeToken
        } else {
            TransferType::UnwrapNativeToken
        };
        log::info!("🛡️  {:?}: vault {} token {} amount {}", transfer_type, vault, token, amount);
        self.record_guarded_transfer(meta, vault, token, amount, transfer_type, amount, vault)
    }

    pub(crate) fn on_platform_activity(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        action: PlatformAction,
        amount: Option<&Amount>,
    ) -> IndexerResult<()> {
        log::info!("🛡️  Platform activity {:?} for vault {}", action, vault);
        self.classify_call(
            meta,
            Classification {
                transaction_type: action.transaction_type(),
                magnitude: amount.cloned(),
            },
        )
    }

    pub(crate) fn on_transaction_classified(
        &mut self,
        meta: &EventMeta,
        vault: Address,
        code: u16,
        amount: Option<&Amount>,
    ) -> IndexerResult<()> {
        let transaction_type = TransactionType::from_code(code);
        if let TransactionType::Unknown(code) = transaction_type {
            log::warn!("⚠️  Unknown transaction type code {} for vault {}", code, vault);
        }
        self.classify_call(
            meta,
            Classification {
                transaction_type,
                magnitude: amount.cloned(),
            },
        )
    }

    fn classify_call(
        &mut self,
        meta: &EventMeta,
        classification: Classification,
    ) -> IndexerResult<()> {
        let outcome = self.correlation.classify(
            self.store.as_mut(),
            &mut self.diagnostics,
            &meta.tx_hash,
            &classification,
        )?;
        if let CorrelationOutcome::Matched { call_key, .. } = outcome {
            log::info!(
                "🔗 Call {} classified as {:?}",
                call_key,
                classification.transaction_type
            );
        }
        Ok(())
    }

    pub(crate) fn on_asset_guard_set(
        &mut self,
        meta: &EventMeta,
        asset_type: u16,
        guard: Address,
    ) -> IndexerResult<()> {
        self.register_guard(meta, GuardKind::Asset, asset_type.to_string(), guard)
    }

    pub(crate) fn on_contract_guard_set(
        &mut self,
        meta: &EventMeta,
        ext_contract: Address,
        guard: Address,
    ) -> IndexerResult<()> {
        self.register_guard(meta, GuardKind::Contract, ext_contract.to_string(), guard)
    }

    /// Latest guard per subject; a zero guard address is kept as a removal
    fn register_guard(
        &mut self,
        meta: &EventMeta,
        kind: GuardKind,
        subject: String,
        guard: Address,
    ) -> IndexerResult<()> {
        if guard.is_zero() {
            log::info!("🛡️  {:?} guard cleared for {}", kind, subject);
        } else {
            log::info!("🛡️  {:?} guard for {} set to {}", kind, subject, guard);
        }

        let registration = GuardRegistration {
            id: GuardRegistration::key_for(kind, &subject),
            kind,
            subject,
            guard,
            meta: *meta,
        };
        self.store.upsert(&registration)?;
        Ok(())
    }
}
