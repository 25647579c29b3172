//! End-to-end lifecycle and property tests over the public ledger surface.

use chrono::{Duration, TimeZone, Utc};
use coop_credit_ledger::{
    AccountId, AssetLedger, AuthContext, BatchId, BatchRegistration, Cooperative, Event,
    InMemoryAssetLedger, Ledger, LedgerConfig, LedgerError, LoanRequest, LoanStatus, Money, Rate,
    Role, SafeTimeProvider, StagedLoanRequest, StagedProjectParams, TimeSource,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    ledger: Ledger<InMemoryAssetLedger>,
    time: SafeTimeProvider,
    admin: AuthContext,
    manager: AuthContext,
    verifier: AuthContext,
    treasury: AuthContext,
    coop: AuthContext,
}

fn harness(treasury_funds: i64, coop_funds: i64) -> Harness {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    ));
    let admin = AuthContext::new("admin");
    let manager = AuthContext::new("manager");
    let verifier = AuthContext::new("verifier");
    let treasury = AuthContext::new("treasury");
    let coop = AuthContext::new("kawa-coop");

    let mut assets = InMemoryAssetLedger::new();
    assets.credit(&treasury.caller, Money::from_major(treasury_funds));
    assets.credit(&coop.caller, Money::from_major(coop_funds));

    let mut ledger = Ledger::new(
        LedgerConfig::default(),
        admin.caller.clone(),
        treasury.caller.clone(),
        assets,
    )
    .unwrap();
    ledger.grant_role(&admin, &manager.caller, Role::Manager).unwrap();
    ledger.grant_role(&admin, &verifier.caller, Role::Verifier).unwrap();

    Harness {
        ledger,
        time,
        admin,
        manager,
        verifier,
        treasury,
        coop,
    }
}

fn cooperative(payment_address: &AccountId) -> Cooperative {
    Cooperative {
        name: "Kawa Growers".to_string(),
        location: "Sidama".to_string(),
        payment_address: payment_address.clone(),
        farmer_count: 240,
    }
}

fn register(h: &mut Harness, quantity: u64) -> BatchId {
    let now = h.time.now();
    let registration = BatchRegistration {
        production_date: now - Duration::days(10),
        expiry_date: now + Duration::days(365),
        quantity,
        unit_price: Money::from_major(5),
        associated_value: Money::from_major(30_000),
        packaging: "60kg jute".to_string(),
        certifications: "fairtrade".to_string(),
        cooperative: cooperative(&h.coop.caller),
    };
    h.ledger.register_batch(&h.manager, registration, &h.time).unwrap()
}

fn loan_request(coop: &AccountId, batches: Vec<BatchId>) -> LoanRequest {
    LoanRequest {
        counterparty: coop.clone(),
        amount: Money::from_major(25_000),
        rate: Rate::from_bps(800),
        duration_secs: 180 * 86_400,
        batches,
        purpose: "export pre-finance".to_string(),
        name: "Kawa Growers".to_string(),
        location: "Sidama".to_string(),
    }
}

fn staged_request(coop: &AccountId, now: chrono::DateTime<Utc>, amount: i64) -> StagedLoanRequest {
    StagedLoanRequest {
        counterparty: coop.clone(),
        amount: Money::from_major(amount),
        rate: Rate::from_bps(1_200),
        duration_secs: 3 * 365 * 86_400,
        project: StagedProjectParams {
            name: "Hillside avocado".to_string(),
            expected_yield: 40_000,
            harvest_date: now + Duration::days(900),
            total_stages: 4,
        },
        cooperative: cooperative(coop),
        purpose: "orchard establishment".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn inventory_loan_full_lifecycle() {
    let mut h = harness(100_000, 5_000);
    let batch = register(&mut h, 6_000);
    h.ledger
        .verify_batch(&h.verifier, batch, 5_900, "ipfs://inspection-1", &h.time)
        .unwrap();
    h.ledger.issue_shares(&h.manager, batch, 1_000, &h.time).unwrap();

    let loan = h
        .ledger
        .create_loan(&h.manager, loan_request(&h.coop.caller, vec![batch]), &h.time)
        .unwrap();
    assert_eq!(h.ledger.loan(loan).unwrap().status, LoanStatus::Pending);

    h.ledger.disburse(&h.manager, loan, &h.time).unwrap();
    assert_eq!(h.ledger.treasury_balance(), Money::from_major(75_000));

    h.time.test_control().unwrap().advance(Duration::days(180));
    let owed = h.ledger.outstanding_balance(loan, &h.time).unwrap();
    assert_eq!(owed.round_dp(2).as_decimal(), dec!(25986.30));

    // overpayment is clamped to what is owed
    let receipt = h
        .ledger
        .repay(&h.coop, loan, Money::from_major(30_000), &h.time)
        .unwrap();
    assert_eq!(receipt.applied, owed);
    assert_eq!(receipt.status, LoanStatus::Repaid);
    assert_eq!(receipt.remaining, Money::ZERO);

    assert_eq!(h.ledger.treasury_balance(), Money::from_major(75_000) + owed);
    assert_eq!(h.ledger.engine().loan_for_batch(batch), None);

    let kinds: Vec<&str> = h
        .ledger
        .events()
        .iter()
        .filter_map(|r| match r.event {
            Event::LoanCreated { .. } => Some("created"),
            Event::LoanDisbursed { .. } => Some("disbursed"),
            Event::RepaymentReceived { .. } => Some("repayment"),
            Event::LoanRepaid { .. } => Some("repaid"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["created", "disbursed", "repayment", "repaid"]);
}

#[test]
fn greenfield_loan_pays_out_per_stage() {
    let mut h = harness(100_000, 0);
    let now = h.time.now();
    let loan = h
        .ledger
        .create_staged_loan(&h.manager, staged_request(&h.coop.caller, now, 40_000), &h.time)
        .unwrap();
    let unit = h.ledger.loan(loan).unwrap().batches[0];
    assert!(!h.ledger.registry().is_active(unit));

    let stage = h
        .ledger
        .disburse_stage(&h.manager, loan, Money::from_major(10_000), "photo://clearing", &h.time)
        .unwrap();
    assert_eq!(stage, 1);
    assert_eq!(h.ledger.loan(loan).unwrap().status, LoanStatus::Active);

    h.time.test_control().unwrap().advance(Duration::days(90));
    h.ledger
        .disburse_stage(&h.manager, loan, Money::from_major(15_000), "photo://planting", &h.time)
        .unwrap();

    let err = h
        .ledger
        .disburse_stage(&h.manager, loan, Money::from_major(15_001), "photo://irrigation", &h.time)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ExceedsApprovedAmount { .. }));
    assert_eq!(h.ledger.project(unit).unwrap().completed_stages, 2);
    assert_eq!(h.ledger.assets().balance_of(&h.coop.caller), Money::from_major(25_000));
}

#[test]
fn default_then_liquidation_keeps_collateral_reserved() {
    let mut h = harness(100_000, 0);
    let batch = register(&mut h, 6_000);
    let loan = h
        .ledger
        .create_loan(&h.manager, loan_request(&h.coop.caller, vec![batch]), &h.time)
        .unwrap();
    h.ledger.disburse(&h.manager, loan, &h.time).unwrap();

    assert!(matches!(
        h.ledger.mark_defaulted(&h.manager, loan, &h.time),
        Err(LedgerError::PrematureDefault { .. })
    ));

    h.time.test_control().unwrap().advance(Duration::days(181));
    assert!(h.ledger.mark_defaulted(&h.manager, loan, &h.time).unwrap());

    let released = h.ledger.liquidate(&h.treasury, loan, &h.time).unwrap();
    assert_eq!(released, vec![batch]);
    assert_eq!(h.ledger.loan(loan).unwrap().status, LoanStatus::Liquidated);
    assert_eq!(h.ledger.engine().loan_for_batch(batch), Some(loan));

    let again = h
        .ledger
        .create_loan(&h.manager, loan_request(&h.coop.caller, vec![batch]), &h.time)
        .unwrap_err();
    assert!(matches!(again, LedgerError::InvalidCollateral { .. }));
}

#[test]
fn paused_ledger_rejects_writes_until_resumed() {
    let mut h = harness(50_000, 0);
    let batch = register(&mut h, 1_000);
    let loan = h
        .ledger
        .create_loan(&h.manager, loan_request(&h.coop.caller, vec![batch]), &h.time)
        .unwrap();

    h.ledger.pause(&h.admin, &h.time).unwrap();
    assert_eq!(h.ledger.disburse(&h.manager, loan, &h.time), Err(LedgerError::Paused));
    assert_eq!(h.ledger.loan_view(loan, &h.time).unwrap().status, LoanStatus::Pending);

    h.ledger.unpause(&h.admin, &h.time).unwrap();
    assert!(h.ledger.disburse(&h.manager, loan, &h.time).is_ok());
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Stage(i64),
    Repay(i64),
    Advance(i64),
}

fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            (1i64..20_000).prop_map(Op::Stage),
            (1i64..30_000).prop_map(Op::Repay),
            (1i64..200).prop_map(Op::Advance),
        ],
        0..24,
    )
}

proptest! {
    /// any sequence of stage payouts, repayments and time steps keeps the
    /// staged cap, the repayment clamp and the asset supply intact
    #[test]
    fn staged_loan_invariants_hold(approved in 1_000i64..60_000, ops in op_strategy()) {
        let mut h = harness(1_000_000, 20_000);
        let supply = h.ledger.assets().total_supply();
        let now = h.time.now();
        let loan = h
            .ledger
            .create_staged_loan(&h.manager, staged_request(&h.coop.caller, now, approved), &h.time)
            .unwrap();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                Op::Stage(amount) => {
                    let _ = h.ledger.disburse_stage(
                        &h.manager,
                        loan,
                        Money::from_major(amount),
                        &format!("evidence://{}", i),
                        &h.time,
                    );
                }
                Op::Repay(amount) => {
                    let _ = h.ledger.repay(&h.coop, loan, Money::from_major(amount), &h.time);
                }
                Op::Advance(days) => {
                    h.time.test_control().unwrap().advance(Duration::days(days));
                }
            }

            let record = h.ledger.loan(loan).unwrap();
            let model = h.ledger.engine().interest_model();
            prop_assert!(record.disbursed <= record.amount);
            prop_assert!(record.repaid <= record.total_owed(model, h.time.now()));
            prop_assert_eq!(h.ledger.assets().total_supply(), supply);
        }
    }

    /// a batch never backs more than one loan at a time
    #[test]
    fn batches_are_never_double_linked(
        requests in proptest::collection::vec(
            proptest::collection::vec(1u64..7, 1..4),
            1..10,
        )
    ) {
        let mut h = harness(1_000_000, 0);
        for _ in 0..6 {
            register(&mut h, 2_000);
        }

        for batches in requests {
            let ids = batches.into_iter().map(BatchId).collect();
            let _ = h
                .ledger
                .create_loan(&h.manager, loan_request(&h.coop.caller, ids), &h.time);
        }

        let mut owners: HashMap<BatchId, usize> = HashMap::new();
        for loan in h.ledger.loans_for(&h.coop.caller) {
            for batch in &loan.batches {
                *owners.entry(*batch).or_default() += 1;
            }
        }
        prop_assert!(owners.values().all(|count| *count == 1));
        for (batch, _) in owners {
            prop_assert!(h.ledger.engine().loan_for_batch(batch).is_some());
        }
    }
}
