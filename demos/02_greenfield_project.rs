/// greenfield project - staged payouts against milestone evidence
use coop_credit_ledger::chrono::{Duration, Utc};
use coop_credit_ledger::{
    AccountId, AuthContext, Cooperative, InMemoryAssetLedger, Ledger, LedgerConfig, Money, Rate,
    Role, SafeTimeProvider, StagedLoanRequest, StagedProjectParams, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coop_credit_ledger=info".into()),
        )
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
    let control = time.test_control().unwrap();
    let admin = AuthContext::new("admin");
    let manager = AuthContext::new("manager");
    let treasury = AccountId::new("treasury");
    let coop = AccountId::new("hillside");

    let mut assets = InMemoryAssetLedger::new();
    assets.credit(&treasury, Money::from_major(250_000));

    let mut ledger = Ledger::new(LedgerConfig::default(), admin.caller.clone(), treasury, assets)?;
    ledger.grant_role(&admin, &manager.caller, Role::Manager)?;

    let loan = ledger.create_staged_loan(
        &manager,
        StagedLoanRequest {
            counterparty: coop.clone(),
            amount: Money::from_major(120_000),
            rate: Rate::from_bps(1_200),
            duration_secs: 4 * 365 * 86_400,
            project: StagedProjectParams {
                name: "Hillside avocado".to_string(),
                expected_yield: 80_000,
                harvest_date: time.now() + Duration::days(1_000),
                total_stages: 3,
            },
            cooperative: Cooperative {
                name: "Hillside Growers".to_string(),
                location: "Murang'a".to_string(),
                payment_address: coop.clone(),
                farmer_count: 52,
            },
            purpose: "orchard establishment".to_string(),
        },
        &time,
    )?;

    let milestones = [
        (Money::from_major(40_000), "evidence://land-clearing"),
        (Money::from_major(50_000), "evidence://seedlings-planted"),
        (Money::from_major(30_000), "evidence://irrigation-installed"),
    ];
    for (amount, evidence) in milestones {
        let stage = ledger.disburse_stage(&manager, loan, amount, evidence, &time)?;
        println!("stage {} paid {}", stage, amount);
        control.advance(Duration::days(120));
    }

    // the approval is exhausted
    if let Err(e) = ledger.disburse_stage(&manager, loan, Money::from_major(1), "evidence://extra", &time) {
        println!("rejected: {}", e);
    }

    println!("interest so far: {}", ledger.interest_owed(loan, &time)?.round_dp(2));
    println!("{}", ledger.loan_view(loan, &time)?.to_json_pretty()?);
    Ok(())
}
