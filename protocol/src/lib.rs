// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # Meridian Protocol — Foundation Library
//!
//! The shared substrate under every Meridian settlement ledger. The contracts
//! crate builds three independent lifecycle engines (invoice bridge, payroll
//! escrow, collateralized stable token) on top of exactly five primitives,
//! all of which live here:
//!
//! - **identity** — Typed, opaque caller identities. Authorization is an
//!   equality check between [`identity::Identity`] values, never a string
//!   comparison.
//! - **env** — The per-operation environment: who is calling, and what the
//!   logical height counter reads. Engines receive it by reference and hold
//!   no ambient state of their own.
//! - **store** — A generic keyed-record store with dense auto-incrementing
//!   ids, a secondary uniqueness index, and a hard capacity ceiling. All
//!   three engines use it identically.
//! - **ledger** — The asset-transfer seam. Engines move value through the
//!   [`ledger::AssetLedger`] / [`ledger::TokenLedger`] traits and never
//!   touch balances directly.
//! - **crypto** — SHA-256 for externally verifiable hash locks, BLAKE3 with
//!   domain separation for internally derived receipts.
//!
//! ## Design Philosophy
//!
//! 1. Every externally invoked operation is a single atomic unit of work:
//!    all preconditions are checked before the first write, so a rejected
//!    operation has zero side effects and needs no rollback.
//! 2. All monetary arithmetic is checked. Wrapping arithmetic and money do
//!    not mix.
//! 3. Timing logic uses the externally advanced height counter only. There
//!    is no wall clock anywhere in this workspace.

pub mod config;
pub mod crypto;
pub mod env;
pub mod identity;
pub mod ledger;
pub mod store;
