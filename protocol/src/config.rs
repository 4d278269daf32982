//! # Protocol Configuration & Constants
//!
//! Every magic number in Meridian lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.
//!
//! All timing values are expressed in logical height units (blocks of the
//! external counter), never seconds.

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Length of every proof target and receipt in bytes. SHA-256 and BLAKE3
/// both produce 32-byte digests; nothing shorter is accepted anywhere.
pub const HASH_LENGTH: usize = 32;

/// Domain-separation context for invoice lock receipts.
pub const LOCK_RECEIPT_CONTEXT: &str = "meridian-invoice-lock-receipt";

// ---------------------------------------------------------------------------
// Invoice Bridge
// ---------------------------------------------------------------------------

/// Default invoice timeout window when the creator does not supply one.
/// Roughly one day at a 10-minute block cadence.
pub const DEFAULT_INVOICE_TIMEOUT: u64 = 144;

/// Hard ceiling on a caller-supplied timeout window. Roughly one week.
pub const MAX_INVOICE_TIMEOUT: u64 = 1_008;

/// Capacity ceiling of the invoice ledger.
pub const MAX_INVOICES: usize = 10_000;

// ---------------------------------------------------------------------------
// Payroll Escrow
// ---------------------------------------------------------------------------

/// Default capacity ceiling of the escrow ledger. Adjustable at runtime by
/// the escrow admin.
pub const DEFAULT_MAX_ESCROWS: usize = 1_000;

// ---------------------------------------------------------------------------
// Collateralized Stable Token
// ---------------------------------------------------------------------------

/// Fixed-point scale of the peg price. A peg price of `PEG_SCALE` means one
/// stable unit is worth exactly one backing-asset unit.
pub const PEG_SCALE: u64 = 1_000_000;

/// Initial peg price: parity with the backing asset.
pub const DEFAULT_PEG_PRICE: u64 = PEG_SCALE;

/// Lowest peg price the oracle may set (0.10 in peg-scale units).
pub const MIN_PEG_PRICE: u64 = 100_000;

/// Highest peg price the oracle may set (10.00 in peg-scale units).
pub const MAX_PEG_PRICE: u64 = 10_000_000;

/// Initial minimum collateralization ratio, as a percentage. 150 means
/// every stable unit must be backed by 1.5x its peg value in collateral.
pub const DEFAULT_MIN_COLLATERAL_RATIO: u64 = 150;

/// Floor for the admin-settable collateralization ratio. 100 would be
/// exactly fully collateralized; the admin must stay strictly above it.
pub const COLLATERAL_RATIO_FLOOR: u64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peg_bounds_bracket_the_default() {
        assert!(MIN_PEG_PRICE < DEFAULT_PEG_PRICE);
        assert!(DEFAULT_PEG_PRICE < MAX_PEG_PRICE);
        assert_eq!(DEFAULT_PEG_PRICE, PEG_SCALE);
    }

    #[test]
    fn default_ratio_clears_the_floor() {
        assert!(DEFAULT_MIN_COLLATERAL_RATIO > COLLATERAL_RATIO_FLOOR);
    }

    #[test]
    fn default_timeout_within_ceiling() {
        assert!(DEFAULT_INVOICE_TIMEOUT > 0);
        assert!(DEFAULT_INVOICE_TIMEOUT <= MAX_INVOICE_TIMEOUT);
    }
}
