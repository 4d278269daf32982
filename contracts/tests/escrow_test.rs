//! Integration tests for the payroll escrow contract.
//!
//! These tests exercise full escrow lifecycles through a real token ledger,
//! asserting value conservation end to end: every unit the employer locks
//! lands with exactly one of worker or employer, exactly once.

use meridian_contracts::escrow::{EscrowEngine, EscrowError, EscrowStatus};
use meridian_protocol::crypto::sha256;
use meridian_protocol::env::TxEnv;
use meridian_protocol::identity::Identity;
use meridian_protocol::ledger::{InMemoryTokenLedger, TokenLedger, TokenRef};

fn employer() -> Identity {
    Identity::account("acme-corp")
}

fn worker() -> Identity {
    Identity::account("jordan")
}

fn usd() -> TokenRef {
    TokenRef::new("token-usd")
}

fn proof() -> [u8; 32] {
    sha256(b"timesheet-2026-08")
}

fn env(caller: &Identity, height: u64) -> TxEnv {
    TxEnv::new(caller.clone(), height)
}

/// Helper: engine with the employer pre-funded in USD.
fn engine(balance: u64) -> EscrowEngine<InMemoryTokenLedger> {
    let mut ledger = InMemoryTokenLedger::new();
    ledger.credit(&usd(), &employer(), balance).unwrap();
    EscrowEngine::new(Identity::account("payroll-admin"), ledger)
}

// ---------------------------------------------------------------------------
// Lifecycle Tests
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_release_path() {
    let mut payroll = engine(10_000);

    // 1. Lock a month's salary.
    let id = payroll
        .lock_salary(&env(&employer(), 90), worker(), 4_000, 100, 200, usd(), &proof())
        .unwrap();
    assert_eq!(payroll.ledger().balance_of(&usd(), &employer()), 6_000);
    assert_eq!(payroll.ledger().balance_of(&usd(), payroll.custody()), 4_000);

    // 2. At the period end the worker presents the proof and is paid.
    payroll.release_to_worker(&env(&worker(), 200), id, &proof()).unwrap();
    assert_eq!(payroll.ledger().balance_of(&usd(), &worker()), 4_000);
    assert_eq!(payroll.ledger().balance_of(&usd(), payroll.custody()), 0);

    let escrow = payroll.get_escrow(id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    assert_eq!(escrow.released_to, Some(worker()));
    assert_eq!(escrow.last_update_height, 200);
}

#[test]
fn full_lifecycle_refund_path() {
    let mut payroll = engine(10_000);
    let id = payroll
        .lock_salary(&env(&employer(), 90), worker(), 4_000, 100, 200, usd(), &proof())
        .unwrap();

    // The period fully elapses with no release; the employer reclaims.
    payroll.claim_refund(&env(&employer(), 201), id).unwrap();
    assert_eq!(payroll.ledger().balance_of(&usd(), &employer()), 10_000);
    assert_eq!(payroll.ledger().balance_of(&usd(), &worker()), 0);
    assert_eq!(payroll.get_escrow(id).unwrap().status, EscrowStatus::Refunded);
}

#[test]
fn value_is_conserved_exactly_once() {
    let mut payroll = engine(5_000);
    let id = payroll
        .lock_salary(&env(&employer(), 0), worker(), 5_000, 1, 100, usd(), &proof())
        .unwrap();
    payroll.release_to_worker(&env(&worker(), 100), id, &proof()).unwrap();

    // Released is terminal: neither path can move the money again.
    assert!(matches!(
        payroll.release_to_worker(&env(&worker(), 101), id, &proof()),
        Err(EscrowError::InvalidState { .. })
    ));
    assert!(matches!(
        payroll.claim_refund(&env(&employer(), 101), id),
        Err(EscrowError::InvalidState { .. })
    ));
    assert_eq!(payroll.ledger().balance_of(&usd(), &worker()), 5_000);
    assert_eq!(payroll.ledger().balance_of(&usd(), &employer()), 0);
    assert_eq!(payroll.ledger().balance_of(&usd(), payroll.custody()), 0);
}

#[test]
fn one_employer_pays_several_workers() {
    let mut payroll = engine(9_000);
    let workers = ["jordan", "casey", "riley"].map(Identity::account);

    let mut ids = Vec::new();
    for w in &workers {
        let id = payroll
            .lock_salary(&env(&employer(), 0), w.clone(), 3_000, 1, 100, usd(), &proof())
            .unwrap();
        ids.push(id);
    }
    assert_eq!(payroll.escrow_count(), 3);
    assert_eq!(payroll.ledger().balance_of(&usd(), payroll.custody()), 9_000);

    for (id, w) in ids.iter().zip(&workers) {
        payroll.release_to_worker(&env(w, 100), *id, &proof()).unwrap();
        assert_eq!(payroll.ledger().balance_of(&usd(), w), 3_000);
    }
    assert_eq!(payroll.ledger().balance_of(&usd(), payroll.custody()), 0);
}

// ---------------------------------------------------------------------------
// Error Cases
// ---------------------------------------------------------------------------

#[test]
fn duplicate_lock_for_same_pair_rejected() {
    let mut payroll = engine(10_000);
    payroll
        .lock_salary(&env(&employer(), 0), worker(), 4_000, 100, 200, usd(), &proof())
        .unwrap();

    // Second lockSalary for the identical pair must fail, even with
    // different terms, and must not move any money.
    let result = payroll.lock_salary(
        &env(&employer(), 1),
        worker(),
        1_000,
        300,
        400,
        usd(),
        &sha256(b"other-proof"),
    );
    assert!(matches!(result, Err(EscrowError::EscrowExists)));
    assert_eq!(payroll.ledger().balance_of(&usd(), &employer()), 6_000);
    assert_eq!(payroll.escrow_count(), 1);
}

#[test]
fn underfunded_lock_leaves_no_trace() {
    let mut payroll = engine(1_000);
    let result = payroll.lock_salary(
        &env(&employer(), 0),
        worker(),
        2_000,
        100,
        200,
        usd(),
        &proof(),
    );
    assert!(matches!(result, Err(EscrowError::TransferFailed(_))));
    assert_eq!(payroll.escrow_count(), 0);
    assert!(payroll.find_by_pair(&employer(), &worker()).is_none());
    assert_eq!(payroll.ledger().balance_of(&usd(), &employer()), 1_000);

    // The pair is still free for a correctly sized lock.
    payroll
        .lock_salary(&env(&employer(), 1), worker(), 1_000, 100, 200, usd(), &proof())
        .unwrap();
}

#[test]
fn release_and_refund_disagree_at_the_boundary() {
    let mut payroll = engine(2_000);
    let id = payroll
        .lock_salary(&env(&employer(), 0), worker(), 2_000, 100, 200, usd(), &proof())
        .unwrap();

    // At exactly the period end only the release side is open.
    assert!(matches!(
        payroll.claim_refund(&env(&employer(), 200), id),
        Err(EscrowError::PeriodNotElapsed { current: 200, period_end: 200 })
    ));
    payroll.release_to_worker(&env(&worker(), 200), id, &proof()).unwrap();
}

#[test]
fn wrong_proof_never_releases() {
    let mut payroll = engine(2_000);
    let id = payroll
        .lock_salary(&env(&employer(), 0), worker(), 2_000, 100, 200, usd(), &proof())
        .unwrap();

    assert!(matches!(
        payroll.release_to_worker(&env(&worker(), 200), id, &sha256(b"forged")),
        Err(EscrowError::ProofMismatch)
    ));
    // A truncated proof mismatches byte-for-byte too.
    assert!(matches!(
        payroll.release_to_worker(&env(&worker(), 200), id, &proof()[..31]),
        Err(EscrowError::ProofMismatch)
    ));
    assert_eq!(payroll.get_escrow(id).unwrap().status, EscrowStatus::Locked);
}

#[test]
fn capacity_ceiling_blocks_new_locks_only() {
    let mut payroll = engine(10_000);
    let admin = Identity::account("payroll-admin");
    let id = payroll
        .lock_salary(&env(&employer(), 0), worker(), 2_000, 100, 200, usd(), &proof())
        .unwrap();

    // Lower the ceiling below the live count: existing records survive,
    // new locks are refused.
    payroll.set_max_escrows(&env(&admin, 1), 1).unwrap();
    let result = payroll.lock_salary(
        &env(&employer(), 1),
        Identity::account("casey"),
        2_000,
        100,
        200,
        usd(),
        &proof(),
    );
    assert!(matches!(result, Err(EscrowError::CapacityExceeded { capacity: 1 })));

    payroll.release_to_worker(&env(&worker(), 200), id, &proof()).unwrap();
}
