//! Vault lifecycle states
//!
//! ```text
//! FUNDRAISING → ACTIVE → LOCKED → LIQUIDATED
//!      └──────────┴────────┴──→ CLOSED
//! ```
//!
//! Transitions are taken verbatim from state-transition events. The indexer
//! never infers or vetoes a transition; `is_canonical_transition` exists only
//! so unusual transitions show up in the logs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultState {
    Fundraising,
    Active,
    Locked,
    Liquidated,
    Closed,
    /// Code not known to this indexer (forward-compatible source)
    Unknown,
}

impl VaultState {
    /// Decode an on-chain state code; unrecognized codes map to `Unknown`
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => VaultState::Fundraising,
            1 => VaultState::Active,
            2 => VaultState::Locked,
            3 => VaultState::Liquidated,
            4 => VaultState::Closed,
            _ => VaultState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VaultState::Fundraising => "FUNDRAISING",
            VaultState::Active => "ACTIVE",
            VaultState::Locked => "LOCKED",
            VaultState::Liquidated => "LIQUIDATED",
            VaultState::Closed => "CLOSED",
            VaultState::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VaultState::Liquidated | VaultState::Closed)
    }

    pub fn is_canonical_transition(from: VaultState, to: VaultState) -> bool {
        use VaultState::*;
        match (from, to) {
            (Fundraising, Active) | (Active, Locked) | (Locked, Liquidated) => true,
            (_, Liquidated) if !from.is_terminal() => true,
            (_, Closed) if !from.is_terminal() => true,
            _ => false,
        }
    }
}

impl Default for VaultState {
    fn default() -> Self {
        VaultState::Fundraising
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(VaultState::from_code(0), VaultState::Fundraising);
        assert_eq!(VaultState::from_code(3), VaultState::Liquidated);
        assert_eq!(VaultState::from_code(4).as_str(), "CLOSED");
    }

    #[test]
    fn test_unknown_code_is_tolerated() {
        let state = VaultState::from_code(42);
        assert_eq!(state, VaultState::Unknown);
        assert_eq!(state.as_str(), "UNKNOWN");
    }

    #[test]
    fn test_canonical_transitions() {
        use VaultState::*;
        assert!(VaultState::is_canonical_transition(Fundraising, Active));
        assert!(VaultState::is_canonical_transition(Active, Closed));
        assert!(VaultState::is_canonical_transition(Fundraising, Liquidated));
        assert!(!VaultState::is_canonical_transition(Closed, Active));
        assert!(!VaultState::is_canonical_transition(Liquidated, Closed));
        assert!(!VaultState::is_canonical_transition(Active, Fundraising));
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&VaultState::Fundraising).unwrap();
        assert_eq!(json, "\"FUNDRAISING\"");
    }
}
