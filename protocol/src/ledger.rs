//! # Asset Transfer Seam
//!
//! The settlement engines never mutate balances directly: every movement of
//! value goes through [`AssetLedger`] (a single backing asset) or
//! [`TokenLedger`] (an external token picked by [`TokenRef`]). Both traits
//! demand synchronous, atomic, non-reentrant transfers — a transfer either
//! fully happens or returns [`TransferError`] with nothing moved, and it
//! completes before the invoking operation returns.
//!
//! [`InMemoryAssetLedger`] and [`InMemoryTokenLedger`] are the reference
//! implementations: plain balance maps with overflow- and
//! insufficiency-checked arithmetic. They back the engines in tests and in
//! single-process deployments.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Why an asset movement was refused. The calling engine aborts the whole
/// operation with no state change when it sees one of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The debited party does not hold enough of the asset.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance of the debited party.
        available: u64,
        /// Amount the transfer asked for.
        requested: u64,
    },

    /// Crediting the recipient would overflow `u64`.
    #[error("balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// Recipient balance before the failed credit.
        current: u64,
        /// Amount that caused the overflow.
        credit: u64,
    },
}

/// Reference to an external token ledger, opaque to the engines.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRef(String);

impl TokenRef {
    /// Wraps a token reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the raw reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single-asset balance ledger. Used by the collateral engine for its
/// backing asset.
pub trait AssetLedger {
    /// Current balance of `who`. Unknown identities hold zero.
    fn balance_of(&self, who: &Identity) -> u64;

    /// Moves `amount` from `from` to `to`, atomically.
    fn transfer(&mut self, amount: u64, from: &Identity, to: &Identity)
        -> Result<(), TransferError>;
}

/// A multi-token balance ledger. Used by the escrow engine, whose records
/// each name the external token their salary is denominated in.
pub trait TokenLedger {
    /// Current balance of `who` in `token`. Unknown pairs hold zero.
    fn balance_of(&self, token: &TokenRef, who: &Identity) -> u64;

    /// Moves `amount` of `token` from `from` to `to`, atomically.
    fn transfer(
        &mut self,
        token: &TokenRef,
        amount: u64,
        from: &Identity,
        to: &Identity,
    ) -> Result<(), TransferError>;
}

/// In-memory single-asset ledger.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAssetLedger {
    balances: HashMap<Identity, u64>,
}

impl InMemoryAssetLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `who` out of thin air. Host-side seeding only —
    /// the engines themselves never mint backing assets.
    pub fn credit(&mut self, who: &Identity, amount: u64) -> Result<u64, TransferError> {
        let balance = self.balances.entry(who.clone()).or_insert(0);
        let updated = balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow {
                current: *balance,
                credit: amount,
            })?;
        *balance = updated;
        Ok(updated)
    }
}

impl AssetLedger for InMemoryAssetLedger {
    fn balance_of(&self, who: &Identity) -> u64 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        amount: u64,
        from: &Identity,
        to: &Identity,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(to);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow {
                current: to_balance,
                credit: amount,
            })?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// In-memory multi-token ledger.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: HashMap<TokenRef, HashMap<Identity, u64>>,
}

impl InMemoryTokenLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of `token` to `who`. Host-side seeding only.
    pub fn credit(
        &mut self,
        token: &TokenRef,
        who: &Identity,
        amount: u64,
    ) -> Result<u64, TransferError> {
        let balance = self
            .balances
            .entry(token.clone())
            .or_default()
            .entry(who.clone())
            .or_insert(0);
        let updated = balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow {
                current: *balance,
                credit: amount,
            })?;
        *balance = updated;
        Ok(updated)
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, token: &TokenRef, who: &Identity) -> u64 {
        self.balances
            .get(token)
            .and_then(|b| b.get(who))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        token: &TokenRef,
        amount: u64,
        from: &Identity,
        to: &Identity,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(token, to);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow {
                current: to_balance,
                credit: amount,
            })?;

        let token_balances = self.balances.entry(token.clone()).or_default();
        token_balances.insert(from.clone(), available - amount);
        token_balances.insert(to.clone(), credited);
        Ok(())
    }
}
