// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # Meridian Settlement Contracts
//!
//! Three interlocking financial ledgers, each a strict lifecycle state
//! machine over uniquely keyed value-bearing records:
//!
//! - **Invoice Bridge** — lock → settle/refund machine for cross-system
//!   payment invoices. Settlement is hash-locked: only the preimage of the
//!   committed invoice hash, presented by the configured oracle, completes
//!   a swap.
//! - **Payroll Escrow** — lock → release/refund machine for salary custody.
//!   Value is conserved: exactly the locked amount reaches exactly one of
//!   worker or employer, exactly once.
//! - **Collateralized Stable Token** — mint/burn accounting under a
//!   continuously maintained collateralization invariant and a
//!   reserve-backing check, with an oracle-managed peg price.
//!
//! ## Design Principles
//!
//! 1. Every precondition is checked before the first write. A rejected
//!    operation has zero side effects; there is no compensating rollback
//!    because nothing needs compensating.
//! 2. All monetary operations use checked arithmetic — wrapping arithmetic
//!    and money do not mix.
//! 3. State transitions are explicit enum variants, not boolean flags, and
//!    each fires at most once per record.
//! 4. Authorization is an [`Identity`](meridian_protocol::identity::Identity)
//!    equality check, never a string comparison.
//! 5. Every public record type is serializable (serde) for wire transport
//!    and persistent storage.

pub mod collateral;
pub mod escrow;
pub mod invoice;
