//! # Typed Identities
//!
//! Every caller, owner, oracle, and custody account in Meridian is an
//! [`Identity`]: an opaque value compared by exact equality only. There is
//! deliberately no string-based authorization anywhere in the workspace —
//! if two identities compare equal they are the same principal, and that is
//! the whole authorization model.
//!
//! Identities come in two kinds. [`IdentityKind::Account`] is an external
//! principal (a person, a service, a wallet). [`IdentityKind::Contract`] is
//! an engine-held custody account: it can hold balances but it never signs
//! anything, so operations that require an external counterparty (e.g. a
//! payroll worker) must reject contract identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an identity belongs to an external principal or to an
/// engine-held contract account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    /// An external principal capable of initiating operations.
    Account,
    /// An engine-held custody account. Holds value, never calls.
    Contract,
}

/// An authenticated principal reference.
///
/// Globally unique within a deployment and compared by exact equality.
/// The inner name is opaque to the engines — they never parse it, slice it,
/// or compare it to anything other than another [`Identity`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    kind: IdentityKind,
    name: String,
}

impl Identity {
    /// Creates an external account identity.
    pub fn account(name: impl Into<String>) -> Self {
        Self {
            kind: IdentityKind::Account,
            name: name.into(),
        }
    }

    /// Creates a contract (custody) identity.
    pub fn contract(name: impl Into<String>) -> Self {
        Self {
            kind: IdentityKind::Contract,
            name: name.into(),
        }
    }

    /// Returns the identity kind.
    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Returns the opaque name. Display purposes only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` if this is an external account identity.
    pub fn is_account(&self) -> bool {
        self.kind == IdentityKind::Account
    }

    /// `true` if this is an engine-held contract identity.
    pub fn is_contract(&self) -> bool {
        self.kind == IdentityKind::Contract
    }

    /// A well-formed identity has a non-empty name. Engines reject empty
    /// identities at their input boundary.
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IdentityKind::Account => write!(f, "acct:{}", self.name),
            IdentityKind::Contract => write!(f, "ct:{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_same_kind_and_name() {
        assert_eq!(Identity::account("alice"), Identity::account("alice"));
        assert_ne!(Identity::account("alice"), Identity::account("bob"));
        assert_ne!(Identity::account("vault"), Identity::contract("vault"));
    }

    #[test]
    fn kind_predicates() {
        let alice = Identity::account("alice");
        let vault = Identity::contract("vault");
        assert!(alice.is_account());
        assert!(!alice.is_contract());
        assert!(vault.is_contract());
        assert!(!vault.is_account());
    }

    #[test]
    fn empty_name_is_not_well_formed() {
        assert!(!Identity::account("").is_well_formed());
        assert!(Identity::account("alice").is_well_formed());
    }

    #[test]
    fn display_is_kind_prefixed() {
        assert_eq!(Identity::account("alice").to_string(), "acct:alice");
        assert_eq!(Identity::contract("vault").to_string(), "ct:vault");
    }

    #[test]
    fn identity_serialization_roundtrip() {
        let id = Identity::account("alice");
        let json = serde_json::to_string(&id).expect("serialize");
        let recovered: Identity = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, recovered);
    }
}
