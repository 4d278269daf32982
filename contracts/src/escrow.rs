//! # Payroll Escrow Contract
//!
//! A lock-release-refund machine for salary custody between an employer and
//! a worker. The lifecycle is:
//!
//! 1. **Lock** — the employer escrows the full salary for a pay period.
//!    The debit transfer happens before the record is written, so the
//!    index entry and the custodied funds appear together or not at all.
//! 2. **Release** — at or after the period end, either party presents the
//!    byte-exact work proof and the salary goes to the worker.
//! 3. **Refund** — strictly after the period end, the employer reclaims
//!    an unreleased salary.
//!
//! Exactly one of release/refund ever fires per escrow, so the locked
//! amount reaches exactly one of worker or employer, exactly once — value
//! is conserved, never created or destroyed by this engine.
//!
//! Note the timing asymmetry: release is allowed exactly at the period end
//! (`height >= period_end`), refund only once it has fully elapsed
//! (`height > period_end`). The worker's claim wins the boundary block.

use meridian_protocol::config::DEFAULT_MAX_ESCROWS;
use meridian_protocol::crypto::{HashLengthError, ProofHash};
use meridian_protocol::env::TxEnv;
use meridian_protocol::identity::Identity;
use meridian_protocol::ledger::{TokenLedger, TokenRef, TransferError};
use meridian_protocol::store::{LedgerStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during payroll escrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// The escrow ledger holds its maximum number of records.
    #[error("escrow ledger at capacity: {capacity} records")]
    CapacityExceeded {
        /// The configured ceiling.
        capacity: usize,
    },

    /// The proof hash was not exactly 32 bytes.
    #[error(transparent)]
    InvalidHashLength(#[from] HashLengthError),

    /// The worker is not a well-formed external account identity distinct
    /// from the caller. Covers empty names, contract identities, and
    /// employer-equals-worker.
    #[error("invalid worker identity")]
    InvalidWorker,

    /// The salary amount must be positive.
    #[error("invalid amount: must be positive")]
    InvalidAmount,

    /// The pay period bounds are malformed.
    #[error("invalid pay period: start {start}, end {end}")]
    InvalidPeriod {
        /// The rejected period start.
        start: u64,
        /// The rejected period end.
        end: u64,
    },

    /// An escrow already exists for this (employer, worker) pair.
    #[error("escrow already exists for this employer/worker pair")]
    EscrowExists,

    /// No escrow is stored under this id.
    #[error("escrow not found: id {0}")]
    NotFound(u64),

    /// The presented proof does not byte-match the stored proof hash.
    #[error("proof does not match stored proof hash")]
    ProofMismatch,

    /// The escrow is not in the lifecycle state this operation requires.
    #[error("invalid state: escrow is {current}, expected {expected}")]
    InvalidState {
        /// The escrow's current status.
        current: String,
        /// The status required for this operation.
        expected: String,
    },

    /// The pay-period guard is not yet satisfied.
    #[error("pay period not elapsed: current height {current}, period end {period_end}")]
    PeriodNotElapsed {
        /// The current logical height.
        current: u64,
        /// The escrow's period end.
        period_end: u64,
    },

    /// The caller lacks the role or relationship this operation requires.
    #[error("unauthorized caller")]
    Unauthorized,

    /// The underlying token movement failed; nothing was recorded.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle status of an escrow. Initial state is `Locked` — an escrow
/// only exists once the salary is custodied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Salary custodied, awaiting release or refund.
    Locked,
    /// Salary paid out to the worker.
    Released,
    /// Salary returned to the employer.
    Refunded,
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscrowStatus::Locked => write!(f, "Locked"),
            EscrowStatus::Released => write!(f, "Released"),
            EscrowStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

/// A salary escrow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Dense id assigned at creation, never reused.
    pub id: u64,
    /// The principal who locked the salary.
    pub employer: Identity,
    /// The external account the salary is owed to.
    pub worker: Identity,
    /// Positive salary amount, immutable after creation.
    pub salary_amount: u64,
    /// Pay period start height. Positive.
    pub period_start: u64,
    /// Pay period end height. Strictly after the start.
    pub period_end: u64,
    /// The external token the salary is denominated in.
    pub token: TokenRef,
    /// 32-byte work-proof commitment checked byte-exact at release.
    pub proof_hash: ProofHash,
    /// Current lifecycle status.
    pub status: EscrowStatus,
    /// Height of the most recent transition.
    pub last_update_height: u64,
    /// Who the funds went to, once released.
    pub released_to: Option<Identity>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The payroll escrow engine — owns the escrow ledger and moves salaries
/// through the supplied token ledger.
pub struct EscrowEngine<L: TokenLedger> {
    store: LedgerStore<(Identity, Identity), Escrow>,
    ledger: L,
    custody: Identity,
    admin: Identity,
}

impl<L: TokenLedger> EscrowEngine<L> {
    /// Creates an engine with the default escrow capacity. `admin` is the
    /// single identity allowed to change the admin and the capacity.
    pub fn new(admin: Identity, ledger: L) -> Self {
        Self {
            store: LedgerStore::new(DEFAULT_MAX_ESCROWS),
            ledger,
            custody: Identity::contract("meridian-payroll-escrow"),
            admin,
        }
    }

    /// Escrows `amount` of `token` from the caller for `worker` and returns
    /// the new escrow id.
    ///
    /// All record preconditions — capacity, proof shape, worker identity,
    /// amount, period bounds, pair uniqueness — are checked before the
    /// debit transfer, so the transfer and the record are atomic: both
    /// succeed or neither is observable.
    ///
    /// # Errors
    ///
    /// [`EscrowError::CapacityExceeded`], [`EscrowError::InvalidHashLength`],
    /// [`EscrowError::InvalidWorker`], [`EscrowError::InvalidAmount`],
    /// [`EscrowError::InvalidPeriod`], [`EscrowError::EscrowExists`],
    /// [`EscrowError::TransferFailed`].
    #[allow(clippy::too_many_arguments)]
    pub fn lock_salary(
        &mut self,
        env: &TxEnv,
        worker: Identity,
        amount: u64,
        period_start: u64,
        period_end: u64,
        token: TokenRef,
        proof_hash: &[u8],
    ) -> Result<u64, EscrowError> {
        if !self.store.has_capacity() {
            return Err(EscrowError::CapacityExceeded {
                capacity: self.store.capacity(),
            });
        }
        let proof = ProofHash::from_slice(proof_hash)?;
        if !worker.is_account() || !worker.is_well_formed() || &worker == env.caller() {
            return Err(EscrowError::InvalidWorker);
        }
        if amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }
        if period_start == 0 || period_end <= period_start {
            return Err(EscrowError::InvalidPeriod {
                start: period_start,
                end: period_end,
            });
        }
        let key = (env.caller().clone(), worker.clone());
        if self.store.contains_key(&key) {
            return Err(EscrowError::EscrowExists);
        }

        // Every create precondition now holds, so the debit can safely
        // precede the record write.
        self.ledger
            .transfer(&token, amount, env.caller(), &self.custody)?;

        let escrow = Escrow {
            id: self.store.next_id(),
            employer: env.caller().clone(),
            worker,
            salary_amount: amount,
            period_start,
            period_end,
            token,
            proof_hash: proof,
            status: EscrowStatus::Locked,
            last_update_height: env.height(),
            released_to: None,
        };
        let id = self.store.create(key, escrow).map_err(|e| match e {
            StoreError::DuplicateKey => EscrowError::EscrowExists,
            StoreError::CapacityExceeded { capacity } => {
                EscrowError::CapacityExceeded { capacity }
            }
        })?;

        info!(escrow_id = id, amount, period_end, "salary locked");
        Ok(id)
    }

    /// Pays the escrowed salary to the worker: `Locked → Released`.
    ///
    /// Allowed at or after the period end, for either party, with the
    /// byte-exact work proof.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFound`], [`EscrowError::ProofMismatch`],
    /// [`EscrowError::InvalidState`], [`EscrowError::PeriodNotElapsed`],
    /// [`EscrowError::Unauthorized`], [`EscrowError::TransferFailed`].
    pub fn release_to_worker(
        &mut self,
        env: &TxEnv,
        id: u64,
        proof_hash: &[u8],
    ) -> Result<(), EscrowError> {
        let escrow = self.store.get(id).ok_or(EscrowError::NotFound(id))?;
        if escrow.proof_hash.as_bytes().as_slice() != proof_hash {
            return Err(EscrowError::ProofMismatch);
        }
        if escrow.status != EscrowStatus::Locked {
            return Err(EscrowError::InvalidState {
                current: escrow.status.to_string(),
                expected: EscrowStatus::Locked.to_string(),
            });
        }
        if env.height() < escrow.period_end {
            return Err(EscrowError::PeriodNotElapsed {
                current: env.height(),
                period_end: escrow.period_end,
            });
        }
        if env.caller() != &escrow.employer && env.caller() != &escrow.worker {
            return Err(EscrowError::Unauthorized);
        }

        let worker = escrow.worker.clone();
        let token = escrow.token.clone();
        let amount = escrow.salary_amount;
        self.ledger.transfer(&token, amount, &self.custody, &worker)?;

        let height = env.height();
        self.store
            .update(id, |e| {
                e.status = EscrowStatus::Released;
                e.released_to = Some(worker);
                e.last_update_height = height;
            })
            .ok_or(EscrowError::NotFound(id))?;

        info!(escrow_id = id, amount, height, "salary released to worker");
        Ok(())
    }

    /// Returns the escrowed salary to the employer: `Locked → Refunded`.
    ///
    /// Employer-only, and only strictly after the period end — the worker
    /// keeps an exclusive claim through the boundary block.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFound`], [`EscrowError::Unauthorized`],
    /// [`EscrowError::InvalidState`], [`EscrowError::PeriodNotElapsed`],
    /// [`EscrowError::TransferFailed`].
    pub fn claim_refund(&mut self, env: &TxEnv, id: u64) -> Result<(), EscrowError> {
        let escrow = self.store.get(id).ok_or(EscrowError::NotFound(id))?;
        if env.caller() != &escrow.employer {
            return Err(EscrowError::Unauthorized);
        }
        if escrow.status != EscrowStatus::Locked {
            return Err(EscrowError::InvalidState {
                current: escrow.status.to_string(),
                expected: EscrowStatus::Locked.to_string(),
            });
        }
        if env.height() <= escrow.period_end {
            return Err(EscrowError::PeriodNotElapsed {
                current: env.height(),
                period_end: escrow.period_end,
            });
        }

        let employer = escrow.employer.clone();
        let token = escrow.token.clone();
        let amount = escrow.salary_amount;
        self.ledger
            .transfer(&token, amount, &self.custody, &employer)?;

        let height = env.height();
        self.store
            .update(id, |e| {
                e.status = EscrowStatus::Refunded;
                e.last_update_height = height;
            })
            .ok_or(EscrowError::NotFound(id))?;

        info!(escrow_id = id, amount, height, "salary refunded to employer");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Hands the admin role to another identity. Admin-gated.
    pub fn set_admin(&mut self, env: &TxEnv, new_admin: Identity) -> Result<(), EscrowError> {
        if env.caller() != &self.admin {
            return Err(EscrowError::Unauthorized);
        }
        info!(admin = %new_admin, "escrow admin changed");
        self.admin = new_admin;
        Ok(())
    }

    /// Replaces the escrow capacity ceiling. Admin-gated. Existing records
    /// are unaffected; only future locks see the new ceiling.
    pub fn set_max_escrows(&mut self, env: &TxEnv, max: usize) -> Result<(), EscrowError> {
        if env.caller() != &self.admin {
            return Err(EscrowError::Unauthorized);
        }
        debug!(max, "escrow capacity changed");
        self.store.set_capacity(max);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Returns the escrow stored under `id`.
    pub fn get_escrow(&self, id: u64) -> Result<&Escrow, EscrowError> {
        self.store.get(id).ok_or(EscrowError::NotFound(id))
    }

    /// Resolves an (employer, worker) pair to its escrow id, if indexed.
    pub fn find_by_pair(&self, employer: &Identity, worker: &Identity) -> Option<u64> {
        self.store
            .get_by_key(&(employer.clone(), worker.clone()))
    }

    /// Number of escrows ever created.
    pub fn escrow_count(&self) -> usize {
        self.store.len()
    }

    /// The current capacity ceiling.
    pub fn max_escrows(&self) -> usize {
        self.store.capacity()
    }

    /// The current admin identity.
    pub fn admin(&self) -> &Identity {
        &self.admin
    }

    /// The engine-held custody identity salaries sit under while locked.
    pub fn custody(&self) -> &Identity {
        &self.custody
    }

    /// Read access to the underlying token ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the underlying token ledger, for host-side
    /// balance seeding.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
