//! # Collateralized Stable Token Contract
//!
//! Not a discrete state machine — a continuously maintained accounting
//! invariant over two coupled balances per identity: deposited collateral
//! and issued stable value. Two checks govern every mutation:
//!
//! - **Collateralization**: while an identity holds stable value, its
//!   collateral must cover `stable × peg_price × min_ratio / 100` at the
//!   [`PEG_SCALE`] fixed point.
//! - **Reserve backing**: after every mint, total stable supply must not
//!   exceed total collateral.
//!
//! The peg price is a single process-wide value, mutated only by the
//! oracle identity and bounded to `[MIN_PEG_PRICE, MAX_PEG_PRICE]`.
//!
//! Two semantics are pinned deliberately (see the tests that name them):
//! `withdraw_collateral` evaluates the collateralization check against the
//! **current** balances, not the post-withdrawal hypothetical, and
//! `mint_stable` sizes required collateral against the **cumulative**
//! post-mint stable balance, not the increment.

use meridian_protocol::config::{
    COLLATERAL_RATIO_FLOOR, DEFAULT_MIN_COLLATERAL_RATIO, DEFAULT_PEG_PRICE, MAX_PEG_PRICE,
    MIN_PEG_PRICE, PEG_SCALE,
};
use meridian_protocol::env::TxEnv;
use meridian_protocol::identity::Identity;
use meridian_protocol::ledger::{AssetLedger, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during collateral engine operations.
#[derive(Debug, Error)]
pub enum CollateralError {
    /// The amount must be positive.
    #[error("invalid amount: must be positive")]
    InvalidAmount,

    /// The caller holds less collateral than requested.
    #[error("insufficient collateral: available {available}, requested {requested}")]
    InsufficientCollateral {
        /// The caller's collateral balance.
        available: u64,
        /// The requested amount.
        requested: u64,
    },

    /// The debited party holds less stable value than requested.
    #[error("insufficient stable balance: available {available}, requested {requested}")]
    InsufficientStable {
        /// The debited party's stable balance.
        available: u64,
        /// The requested amount.
        requested: u64,
    },

    /// The collateralization invariant would be (or already is) violated.
    #[error("undercollateralized: required {required}, available {available}")]
    Undercollateralized {
        /// Collateral the invariant demands (saturated at `u64::MAX`).
        required: u64,
        /// Collateral actually held.
        available: u64,
    },

    /// The mint would push total stable supply past total collateral.
    #[error("reserve exceeded: supply would be {total_stable}, collateral is {total_collateral}")]
    ReserveExceeded {
        /// Post-mint total stable supply.
        total_stable: u64,
        /// Current total collateral.
        total_collateral: u64,
    },

    /// The resulting peg price is zero or outside the configured bounds.
    #[error("peg price out of bounds: {price} outside [{min}, {max}]")]
    PriceOutOfBounds {
        /// The rejected price.
        price: u64,
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// The collateralization ratio must stay strictly above the floor.
    #[error("invalid ratio: {ratio} must exceed {COLLATERAL_RATIO_FLOOR}")]
    InvalidRatio {
        /// The rejected ratio.
        ratio: u64,
    },

    /// The caller lacks the role this operation requires.
    #[error("unauthorized caller")]
    Unauthorized,

    /// The underlying backing-asset movement failed; nothing changed.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// A balance or total would overflow `u64`.
    #[error("supply overflow")]
    SupplyOverflow,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-identity coupled balances. Created implicitly on first deposit or
/// mint, never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPosition {
    /// Backing-asset units deposited by this identity.
    pub collateral: u64,
    /// Stable units issued to this identity.
    pub stable: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The collateralized stable token engine.
///
/// Collateral flows through the supplied backing-asset ledger between the
/// caller and the engine-held reserve identity; stable balances are
/// conserved-supply accounting internal to the engine.
pub struct CollateralEngine<L: AssetLedger> {
    positions: HashMap<Identity, CollateralPosition>,
    total_collateral: u64,
    total_stable_supply: u64,
    peg_price: u64,
    min_collateral_ratio: u64,
    oracle: Identity,
    admin: Identity,
    reserve: Identity,
    backing: L,
}

impl<L: AssetLedger> CollateralEngine<L> {
    /// Creates an engine at peg parity with the default ratio. `admin` may
    /// set the ratio; `oracle` may move the peg.
    pub fn new(admin: Identity, oracle: Identity, backing: L) -> Self {
        Self {
            positions: HashMap::new(),
            total_collateral: 0,
            total_stable_supply: 0,
            peg_price: DEFAULT_PEG_PRICE,
            min_collateral_ratio: DEFAULT_MIN_COLLATERAL_RATIO,
            oracle,
            admin,
            reserve: Identity::contract("meridian-collateral-reserve"),
            backing,
        }
    }

    /// Moves `amount` of the backing asset from the caller into the
    /// reserve and credits the caller's collateral balance.
    ///
    /// # Errors
    ///
    /// [`CollateralError::TransferFailed`] when the caller's backing
    /// balance is insufficient; [`CollateralError::SupplyOverflow`].
    pub fn deposit_collateral(&mut self, env: &TxEnv, amount: u64) -> Result<(), CollateralError> {
        let current = self.position_of(env.caller()).collateral;
        let new_balance = current
            .checked_add(amount)
            .ok_or(CollateralError::SupplyOverflow)?;
        let new_total = self
            .total_collateral
            .checked_add(amount)
            .ok_or(CollateralError::SupplyOverflow)?;

        self.backing.transfer(amount, env.caller(), &self.reserve)?;

        self.positions
            .entry(env.caller().clone())
            .or_default()
            .collateral = new_balance;
        self.total_collateral = new_total;

        debug!(caller = %env.caller(), amount, total = new_total, "collateral deposited");
        Ok(())
    }

    /// Returns `amount` of the backing asset from the reserve to the
    /// caller and debits the caller's collateral balance.
    ///
    /// The collateralization check runs against the caller's **current**
    /// balances, not the post-withdrawal hypothetical: it blocks further
    /// withdrawal only once a position is already undercollateralized
    /// (e.g. after a peg move). Preserved deliberately; pinned by test.
    ///
    /// # Errors
    ///
    /// [`CollateralError::InsufficientCollateral`],
    /// [`CollateralError::Undercollateralized`],
    /// [`CollateralError::TransferFailed`].
    pub fn withdraw_collateral(&mut self, env: &TxEnv, amount: u64) -> Result<(), CollateralError> {
        let position = self.position_of(env.caller());
        if position.collateral < amount {
            return Err(CollateralError::InsufficientCollateral {
                available: position.collateral,
                requested: amount,
            });
        }
        if position.stable > 0 {
            let required = required_collateral(
                position.stable,
                self.peg_price,
                self.min_collateral_ratio,
            );
            if u128::from(position.collateral) < required {
                return Err(CollateralError::Undercollateralized {
                    required: saturate(required),
                    available: position.collateral,
                });
            }
        }

        self.backing.transfer(amount, &self.reserve, env.caller())?;

        self.positions
            .entry(env.caller().clone())
            .or_default()
            .collateral -= amount;
        self.total_collateral = self.total_collateral.saturating_sub(amount);

        debug!(caller = %env.caller(), amount, "collateral withdrawn");
        Ok(())
    }

    /// Issues `amount` of stable value to the caller.
    ///
    /// Required collateral is sized against the **cumulative** post-mint
    /// stable balance: `(stable + amount) × peg / PEG_SCALE × ratio / 100`.
    /// After the caller-level check, the reserve-backing check requires
    /// the post-mint total supply to stay within total collateral.
    ///
    /// # Errors
    ///
    /// [`CollateralError::InvalidAmount`],
    /// [`CollateralError::Undercollateralized`],
    /// [`CollateralError::ReserveExceeded`],
    /// [`CollateralError::SupplyOverflow`].
    pub fn mint_stable(&mut self, env: &TxEnv, amount: u64) -> Result<(), CollateralError> {
        if amount == 0 {
            return Err(CollateralError::InvalidAmount);
        }
        let position = self.position_of(env.caller());
        let stable_after = position
            .stable
            .checked_add(amount)
            .ok_or(CollateralError::SupplyOverflow)?;
        let required =
            required_collateral(stable_after, self.peg_price, self.min_collateral_ratio);
        if u128::from(position.collateral) < required {
            return Err(CollateralError::Undercollateralized {
                required: saturate(required),
                available: position.collateral,
            });
        }
        let total_after = self
            .total_stable_supply
            .checked_add(amount)
            .ok_or(CollateralError::SupplyOverflow)?;
        if total_after > self.total_collateral {
            return Err(CollateralError::ReserveExceeded {
                total_stable: total_after,
                total_collateral: self.total_collateral,
            });
        }

        self.positions
            .entry(env.caller().clone())
            .or_default()
            .stable = stable_after;
        self.total_stable_supply = total_after;

        info!(caller = %env.caller(), amount, supply = total_after, "stable minted");
        Ok(())
    }

    /// Destroys `amount` of the caller's stable value.
    ///
    /// # Errors
    ///
    /// [`CollateralError::InsufficientStable`].
    pub fn burn_stable(&mut self, env: &TxEnv, amount: u64) -> Result<(), CollateralError> {
        let position = self.position_of(env.caller());
        if position.stable < amount {
            return Err(CollateralError::InsufficientStable {
                available: position.stable,
                requested: amount,
            });
        }

        self.positions
            .entry(env.caller().clone())
            .or_default()
            .stable -= amount;
        self.total_stable_supply = self.total_stable_supply.saturating_sub(amount);

        info!(caller = %env.caller(), amount, supply = self.total_stable_supply, "stable burned");
        Ok(())
    }

    /// Moves stable value between two identities. Leaves total supply
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`CollateralError::InvalidAmount`],
    /// [`CollateralError::InsufficientStable`],
    /// [`CollateralError::SupplyOverflow`].
    pub fn transfer(
        &mut self,
        env: &TxEnv,
        amount: u64,
        from: &Identity,
        to: &Identity,
    ) -> Result<(), CollateralError> {
        if amount == 0 {
            return Err(CollateralError::InvalidAmount);
        }
        let from_stable = self.position_of(from).stable;
        if from_stable < amount {
            return Err(CollateralError::InsufficientStable {
                available: from_stable,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_stable = self
            .position_of(to)
            .stable
            .checked_add(amount)
            .ok_or(CollateralError::SupplyOverflow)?;

        self.positions.entry(from.clone()).or_default().stable = from_stable - amount;
        self.positions.entry(to.clone()).or_default().stable = to_stable;

        debug!(caller = %env.caller(), amount, %from, %to, "stable transferred");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Peg management
    // -----------------------------------------------------------------------

    /// Replaces the peg price. Oracle-gated, bounded.
    ///
    /// # Errors
    ///
    /// [`CollateralError::Unauthorized`],
    /// [`CollateralError::PriceOutOfBounds`].
    pub fn update_peg_price(&mut self, env: &TxEnv, price: u64) -> Result<(), CollateralError> {
        if env.caller() != &self.oracle {
            return Err(CollateralError::Unauthorized);
        }
        if !(MIN_PEG_PRICE..=MAX_PEG_PRICE).contains(&price) {
            return Err(CollateralError::PriceOutOfBounds {
                price,
                min: MIN_PEG_PRICE,
                max: MAX_PEG_PRICE,
            });
        }
        info!(price, "peg price updated");
        self.peg_price = price;
        Ok(())
    }

    /// Nudges the peg price by a signed delta. Oracle-gated; the resulting
    /// price must stay within bounds.
    ///
    /// # Errors
    ///
    /// [`CollateralError::Unauthorized`],
    /// [`CollateralError::PriceOutOfBounds`].
    pub fn adjust_peg_reserves(&mut self, env: &TxEnv, delta: i64) -> Result<(), CollateralError> {
        if env.caller() != &self.oracle {
            return Err(CollateralError::Unauthorized);
        }
        let adjusted = self.peg_price.saturating_add_signed(delta);
        if !(MIN_PEG_PRICE..=MAX_PEG_PRICE).contains(&adjusted) {
            return Err(CollateralError::PriceOutOfBounds {
                price: adjusted,
                min: MIN_PEG_PRICE,
                max: MAX_PEG_PRICE,
            });
        }
        info!(delta, price = adjusted, "peg price adjusted");
        self.peg_price = adjusted;
        Ok(())
    }

    /// Replaces the minimum collateralization ratio. Admin-gated; must
    /// stay strictly above [`COLLATERAL_RATIO_FLOOR`].
    ///
    /// # Errors
    ///
    /// [`CollateralError::Unauthorized`], [`CollateralError::InvalidRatio`].
    pub fn set_min_collateral_ratio(
        &mut self,
        env: &TxEnv,
        ratio: u64,
    ) -> Result<(), CollateralError> {
        if env.caller() != &self.admin {
            return Err(CollateralError::Unauthorized);
        }
        if ratio <= COLLATERAL_RATIO_FLOOR {
            return Err(CollateralError::InvalidRatio { ratio });
        }
        info!(ratio, "minimum collateral ratio updated");
        self.min_collateral_ratio = ratio;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Collateral balance of `who`.
    pub fn collateral_of(&self, who: &Identity) -> u64 {
        self.position_of(who).collateral
    }

    /// Stable balance of `who`.
    pub fn stable_of(&self, who: &Identity) -> u64 {
        self.position_of(who).stable
    }

    /// Process-wide collateral total.
    pub fn total_collateral(&self) -> u64 {
        self.total_collateral
    }

    /// Process-wide stable supply.
    pub fn total_stable_supply(&self) -> u64 {
        self.total_stable_supply
    }

    /// Current peg price at the [`PEG_SCALE`] fixed point.
    pub fn peg_price(&self) -> u64 {
        self.peg_price
    }

    /// Current minimum collateralization ratio, as a percentage.
    pub fn min_collateral_ratio(&self) -> u64 {
        self.min_collateral_ratio
    }

    /// The engine-held reserve identity collateral sits under.
    pub fn reserve(&self) -> &Identity {
        &self.reserve
    }

    /// Read access to the backing-asset ledger.
    pub fn backing(&self) -> &L {
        &self.backing
    }

    /// Mutable access to the backing-asset ledger, for host-side seeding.
    pub fn backing_mut(&mut self) -> &mut L {
        &mut self.backing
    }

    fn position_of(&self, who: &Identity) -> CollateralPosition {
        self.positions.get(who).copied().unwrap_or_default()
    }
}

/// Collateral the invariant demands for a given stable balance:
/// `stable × peg / PEG_SCALE × ratio / 100`, evaluated in `u128` so the
/// intermediate product cannot overflow.
fn required_collateral(stable: u64, peg_price: u64, ratio: u64) -> u128 {
    u128::from(stable) * u128::from(peg_price) / u128::from(PEG_SCALE) * u128::from(ratio) / 100
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
