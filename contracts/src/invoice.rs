//! # Invoice Bridge Contract
//!
//! A lock-settle-refund machine for cross-system payment invoices. The
//! lifecycle is:
//!
//! 1. **Generate** — the sender commits to an amount and a 32-byte invoice
//!    hash, opening a `Pending` invoice with a timeout height.
//! 2. **Lock** — the sender custodies the funds. The engine records an
//!    opaque lock receipt derived from `(invoice_id, height)`.
//! 3. **Settle** — the configured oracle presents the preimage of the
//!    invoice hash once the off-ledger payment has cleared. Possession of
//!    the preimage is the unlock condition; nothing else settles an invoice.
//! 4. **Refund** — after the timeout height the sender reclaims: `Refunded`
//!    if funds were custodied (a lock receipt exists), `Expired` if they
//!    never moved.
//!
//! The custodial lock in step 2 is one-way and non-retryable: once the
//! other preconditions pass it is treated as succeeded, and no rollback
//! path exists for an underlying custody failure.

use meridian_protocol::config::{
    DEFAULT_INVOICE_TIMEOUT, LOCK_RECEIPT_CONTEXT, MAX_INVOICES, MAX_INVOICE_TIMEOUT,
};
use meridian_protocol::crypto::{domain_hash, HashLengthError, ProofHash};
use meridian_protocol::env::TxEnv;
use meridian_protocol::identity::Identity;
use meridian_protocol::store::{LedgerStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during invoice bridge operations.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// The bridge is administratively paused; no new invoices.
    #[error("bridge is paused")]
    BridgePaused,

    /// The invoice amount must be positive.
    #[error("invalid amount: must be positive")]
    InvalidAmount,

    /// The invoice hash was not exactly 32 bytes.
    #[error(transparent)]
    InvalidHashLength(#[from] HashLengthError),

    /// The resolved timeout window is zero or above the ceiling.
    #[error("invalid timeout: {timeout} outside (0, {max}]")]
    InvalidTimeout {
        /// The rejected window.
        timeout: u64,
        /// The configured ceiling.
        max: u64,
    },

    /// An invoice with this hash already exists.
    #[error("duplicate invoice hash")]
    DuplicateHash,

    /// The invoice ledger holds its maximum number of records.
    #[error("invoice ledger at capacity: {capacity} records")]
    CapacityExceeded {
        /// The configured ceiling.
        capacity: usize,
    },

    /// No invoice is stored under this id.
    #[error("invoice not found: id {0}")]
    NotFound(u64),

    /// The locked amount must equal the recorded invoice amount exactly.
    #[error("amount mismatch: invoice records {expected}, caller supplied {provided}")]
    AmountMismatch {
        /// The immutable amount fixed at creation.
        expected: u64,
        /// What the caller tried to lock.
        provided: u64,
    },

    /// The invoice is not in the lifecycle state this operation requires.
    ///
    /// One generic code covers every state-machine violation — settling a
    /// pending invoice, locking twice, refunding a settled one. The payload
    /// names the specific mismatch so the code stays debuggable.
    #[error("invalid state: invoice is {current}, expected {expected}")]
    InvalidState {
        /// The invoice's current status.
        current: String,
        /// The status required for this operation.
        expected: String,
    },

    /// The caller lacks the role or relationship this operation requires.
    #[error("unauthorized caller")]
    Unauthorized,

    /// The timeout height has not been reached yet.
    #[error("timeout not reached: current height {current}, timeout height {timeout}")]
    TimeoutNotReached {
        /// The current logical height.
        current: u64,
        /// The invoice's timeout height.
        timeout: u64,
    },

    /// Settlement requires an oracle and none is configured.
    #[error("no oracle configured")]
    OracleNotSet,

    /// The presented preimage does not hash to the stored invoice hash.
    #[error("preimage does not match invoice hash")]
    PreimageMismatch,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle status of an invoice.
///
/// Exactly two paths exist: `Pending → Locked → Settled`, or
/// `{Pending, Locked} → {Expired, Refunded}` via the timeout. The three
/// terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Created, funds not yet custodied.
    Pending,
    /// Funds custodied, awaiting the settlement preimage.
    Locked,
    /// The oracle presented the preimage; the swap completed.
    Settled,
    /// Timed out after funds were custodied; funds must be returned.
    Refunded,
    /// Timed out before any funds moved.
    Expired,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "Pending"),
            InvoiceStatus::Locked => write!(f, "Locked"),
            InvoiceStatus::Settled => write!(f, "Settled"),
            InvoiceStatus::Refunded => write!(f, "Refunded"),
            InvoiceStatus::Expired => write!(f, "Expired"),
        }
    }
}

/// A cross-system payment invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Dense id assigned at creation, never reused.
    pub id: u64,
    /// The hash-lock a settlement preimage must match. Globally unique.
    pub invoice_hash: ProofHash,
    /// Positive amount, immutable after creation.
    pub amount: u64,
    /// Who gets paid on the far side.
    pub recipient: Identity,
    /// The creator; the only identity that may lock or refund.
    pub sender: Identity,
    /// Creation height plus the resolved timeout window.
    pub timeout_height: u64,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Height of the most recent transition.
    pub last_update_height: u64,
    /// Opaque custody-transfer receipt, present once locked.
    pub lock_receipt: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The invoice bridge — owns the invoice ledger and its state machine.
pub struct InvoiceEngine {
    store: LedgerStore<ProofHash, Invoice>,
    authority: Identity,
    oracle: Option<Identity>,
    paused: bool,
}

impl InvoiceEngine {
    /// Creates an unpaused bridge with no oracle configured. `authority`
    /// is the single identity allowed to set the oracle and pause state.
    pub fn new(authority: Identity) -> Self {
        Self {
            store: LedgerStore::new(MAX_INVOICES),
            authority,
            oracle: None,
            paused: false,
        }
    }

    /// Creates a `Pending` invoice owned by the caller and returns its id.
    ///
    /// The timeout window defaults to [`DEFAULT_INVOICE_TIMEOUT`] when not
    /// supplied; either way it must land in `(0, MAX_INVOICE_TIMEOUT]`.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::BridgePaused`], [`InvoiceError::InvalidAmount`],
    /// [`InvoiceError::InvalidHashLength`], [`InvoiceError::InvalidTimeout`],
    /// [`InvoiceError::DuplicateHash`], [`InvoiceError::CapacityExceeded`].
    pub fn generate_invoice(
        &mut self,
        env: &TxEnv,
        amount: u64,
        invoice_hash: &[u8],
        recipient: Identity,
        timeout: Option<u64>,
    ) -> Result<u64, InvoiceError> {
        if self.paused {
            warn!(caller = %env.caller(), "invoice rejected: bridge paused");
            return Err(InvoiceError::BridgePaused);
        }
        if amount == 0 {
            return Err(InvoiceError::InvalidAmount);
        }
        let hash = ProofHash::from_slice(invoice_hash)?;
        let window = timeout.unwrap_or(DEFAULT_INVOICE_TIMEOUT);
        if window == 0 || window > MAX_INVOICE_TIMEOUT {
            return Err(InvoiceError::InvalidTimeout {
                timeout: window,
                max: MAX_INVOICE_TIMEOUT,
            });
        }

        let invoice = Invoice {
            id: self.store.next_id(),
            invoice_hash: hash,
            amount,
            recipient,
            sender: env.caller().clone(),
            timeout_height: env.height() + window,
            status: InvoiceStatus::Pending,
            last_update_height: env.height(),
            lock_receipt: None,
        };
        let id = self.store.create(hash, invoice).map_err(|e| match e {
            StoreError::DuplicateKey => InvoiceError::DuplicateHash,
            StoreError::CapacityExceeded { capacity } => {
                InvoiceError::CapacityExceeded { capacity }
            }
        })?;

        info!(
            invoice_id = id,
            amount,
            timeout_height = env.height() + window,
            "invoice generated"
        );
        Ok(id)
    }

    /// Custodies the invoice amount and transitions `Pending → Locked`.
    ///
    /// `amount` must restate the recorded invoice amount exactly; only the
    /// sender may lock. Returns the deterministic lock receipt derived from
    /// `(invoice_id, current_height)`. The underlying custodial lock is
    /// one-way: once the preconditions pass there is no rollback path.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::NotFound`], [`InvoiceError::AmountMismatch`],
    /// [`InvoiceError::InvalidState`], [`InvoiceError::Unauthorized`].
    pub fn lock_for_invoice(
        &mut self,
        env: &TxEnv,
        invoice_id: u64,
        amount: u64,
    ) -> Result<[u8; 32], InvoiceError> {
        let invoice = self
            .store
            .get(invoice_id)
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        if amount != invoice.amount {
            return Err(InvoiceError::AmountMismatch {
                expected: invoice.amount,
                provided: amount,
            });
        }
        if invoice.status != InvoiceStatus::Pending {
            return Err(InvoiceError::InvalidState {
                current: invoice.status.to_string(),
                expected: InvoiceStatus::Pending.to_string(),
            });
        }
        if env.caller() != &invoice.sender {
            return Err(InvoiceError::Unauthorized);
        }

        let receipt = lock_receipt(invoice_id, env.height());
        let height = env.height();
        self.store
            .update(invoice_id, |inv| {
                inv.status = InvoiceStatus::Locked;
                inv.lock_receipt = Some(receipt);
                inv.last_update_height = height;
            })
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        info!(invoice_id, height, "invoice locked");
        Ok(receipt)
    }

    /// Completes the swap: `Locked → Settled`.
    ///
    /// Only the configured oracle may settle, and only with the exact
    /// preimage of the stored invoice hash — possession of the preimage is
    /// the proof that the off-ledger payment cleared.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::NotFound`], [`InvoiceError::PreimageMismatch`],
    /// [`InvoiceError::InvalidState`], [`InvoiceError::OracleNotSet`],
    /// [`InvoiceError::Unauthorized`].
    pub fn settle_invoice(
        &mut self,
        env: &TxEnv,
        invoice_id: u64,
        preimage: &[u8],
    ) -> Result<(), InvoiceError> {
        let invoice = self
            .store
            .get(invoice_id)
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        if ProofHash::sha256(preimage) != invoice.invoice_hash {
            return Err(InvoiceError::PreimageMismatch);
        }
        if invoice.status != InvoiceStatus::Locked {
            return Err(InvoiceError::InvalidState {
                current: invoice.status.to_string(),
                expected: InvoiceStatus::Locked.to_string(),
            });
        }
        let oracle = self.oracle.as_ref().ok_or(InvoiceError::OracleNotSet)?;
        if env.caller() != oracle {
            return Err(InvoiceError::Unauthorized);
        }

        let height = env.height();
        self.store
            .update(invoice_id, |inv| {
                inv.status = InvoiceStatus::Settled;
                inv.last_update_height = height;
            })
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        info!(invoice_id, height, "invoice settled");
        Ok(())
    }

    /// Reclaims a timed-out invoice for the sender.
    ///
    /// Transitions to `Refunded` when a lock receipt exists (funds were
    /// custodied and must be returned) and `Expired` otherwise (no funds
    /// ever moved). Returns the terminal status reached.
    ///
    /// # Errors
    ///
    /// [`InvoiceError::NotFound`], [`InvoiceError::InvalidState`],
    /// [`InvoiceError::TimeoutNotReached`], [`InvoiceError::Unauthorized`].
    pub fn refund_invoice(
        &mut self,
        env: &TxEnv,
        invoice_id: u64,
    ) -> Result<InvoiceStatus, InvoiceError> {
        let invoice = self
            .store
            .get(invoice_id)
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        if !matches!(
            invoice.status,
            InvoiceStatus::Pending | InvoiceStatus::Locked
        ) {
            return Err(InvoiceError::InvalidState {
                current: invoice.status.to_string(),
                expected: "Pending or Locked".into(),
            });
        }
        if env.height() < invoice.timeout_height {
            return Err(InvoiceError::TimeoutNotReached {
                current: env.height(),
                timeout: invoice.timeout_height,
            });
        }
        if env.caller() != &invoice.sender {
            return Err(InvoiceError::Unauthorized);
        }

        let terminal = if invoice.lock_receipt.is_some() {
            InvoiceStatus::Refunded
        } else {
            InvoiceStatus::Expired
        };
        let height = env.height();
        self.store
            .update(invoice_id, |inv| {
                inv.status = terminal;
                inv.last_update_height = height;
            })
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        info!(invoice_id, status = %terminal, height, "invoice refunded");
        Ok(terminal)
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Configures the settlement oracle. Authority-gated.
    pub fn set_oracle(&mut self, env: &TxEnv, oracle: Identity) -> Result<(), InvoiceError> {
        if env.caller() != &self.authority {
            return Err(InvoiceError::Unauthorized);
        }
        info!(oracle = %oracle, "bridge oracle configured");
        self.oracle = Some(oracle);
        Ok(())
    }

    /// Pauses or unpauses invoice generation. Authority-gated. Pausing
    /// blocks only `generate_invoice`; in-flight invoices keep moving.
    pub fn set_paused(&mut self, env: &TxEnv, paused: bool) -> Result<(), InvoiceError> {
        if env.caller() != &self.authority {
            return Err(InvoiceError::Unauthorized);
        }
        info!(paused, "bridge pause state changed");
        self.paused = paused;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Returns the invoice stored under `id`.
    pub fn get_invoice(&self, id: u64) -> Result<&Invoice, InvoiceError> {
        self.store.get(id).ok_or(InvoiceError::NotFound(id))
    }

    /// Resolves an invoice hash to its id, if indexed.
    pub fn find_by_hash(&self, hash: &ProofHash) -> Option<u64> {
        self.store.get_by_key(hash)
    }

    /// Number of invoices ever created.
    pub fn invoice_count(&self) -> usize {
        self.store.len()
    }

    /// `true` while invoice generation is administratively blocked.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The configured settlement oracle, if any.
    pub fn oracle(&self) -> Option<&Identity> {
        self.oracle.as_ref()
    }
}

/// Derives the opaque custody-transfer receipt for a lock, deterministic
/// in `(invoice_id, height)`.
fn lock_receipt(invoice_id: u64, height: u64) -> [u8; 32] {
    let mut data = [0u8; 16];
    data[..8].copy_from_slice(&invoice_id.to_be_bytes());
    data[8..].copy_from_slice(&height.to_be_bytes());
    domain_hash(LOCK_RECEIPT_CONTEXT, &data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
