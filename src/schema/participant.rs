//! Participant and per-vault position aggregates

use crate::amount::Amount;
use crate::ids::{position_key, Address};
use crate::store::Record;
use serde::{Deserialize, Serialize};

/// A principal interacting with any vault. Created lazily on first deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Address,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    /// Number of vaults this participant has held a position in
    pub vault_count: u64,
    pub first_deposit_at: i64,
    pub last_activity_at: i64,
}

impl Participant {
    pub fn empty(id: Address) -> Self {
        Self {
            id,
            total_deposited: Amount::zero(),
            total_withdrawn: Amount::zero(),
            vault_count: 0,
            first_deposit_at: 0,
            last_activity_at: 0,
        }
    }

    pub fn record_deposit(&mut self, assets: &Amount, at: i64) {
        self.total_deposited += assets;
        self.last_activity_at = at;
        if self.first_deposit_at == 0 {
            self.first_deposit_at = at;
        }
    }

    pub fn record_withdrawal(&mut self, assets: &Amount, at: i64) {
        self.total_withdrawn += assets;
        self.last_activity_at = at;
    }
}

impl Record for Participant {
    const TABLE: &'static str = "participant";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Participant × vault position
///
/// Never deleted; `is_active` tracks `shares > 0` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub vault: Address,
    pub participant: Address,
    pub shares: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub is_active: bool,
    pub first_deposit_at: i64,
    pub last_activity_at: i64,
}

impl Position {
    pub fn empty(vault: Address, participant: Address) -> Self {
        Self {
            id: position_key(&vault, &participant),
            vault,
            participant,
            shares: Amount::zero(),
            total_deposited: Amount::zero(),
            total_withdrawn: Amount::zero(),
            is_active: false,
            first_deposit_at: 0,
            last_activity_at: 0,
        }
    }

    /// Shares credited (deposit or incoming transfer)
    pub fn credit(&mut self, shares: &Amount, at: i64) {
        self.shares += shares;
        self.last_activity_at = at;
        if self.first_deposit_at == 0 {
            self.first_deposit_at = at;
        }
        self.refresh_active();
    }

    /// Shares debited (withdrawal or outgoing transfer)
    pub fn debit(&mut self, shares: &Amount, at: i64) {
        self.shares -= shares;
        self.last_activity_at = at;
        self.refresh_active();
    }

    fn refresh_active(&mut self) {
        self.is_active = self.shares.is_positive();
    }
}

impl Record for Position {
    const TABLE: &'static str = "position";

    fn key(&self) -> String {
        self.id.clone()
    }
}
