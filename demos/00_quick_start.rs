/// quick start - finance one verified coffee batch end to end
use coop_credit_ledger::chrono::{Duration, Utc};
use coop_credit_ledger::{
    AccountId, AuthContext, BatchRegistration, Cooperative, InMemoryAssetLedger, Ledger,
    LedgerConfig, LoanRequest, Money, Rate, Role, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coop_credit_ledger=info".into()),
        )
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
    let admin = AuthContext::new("admin");
    let manager = AuthContext::new("manager");
    let coop = AuthContext::new("kawa-coop");
    let treasury = AccountId::new("treasury");

    let mut assets = InMemoryAssetLedger::new();
    assets.credit(&treasury, Money::from_major(100_000));
    assets.credit(&coop.caller, Money::from_major(2_000));

    let mut ledger = Ledger::new(LedgerConfig::default(), admin.caller.clone(), treasury, assets)?;
    ledger.grant_role(&admin, &manager.caller, Role::Manager)?;

    // register a batch of green coffee
    let batch = ledger.register_batch(
        &manager,
        BatchRegistration {
            production_date: time.now() - Duration::days(7),
            expiry_date: time.now() + Duration::days(365),
            quantity: 6_000,
            unit_price: Money::from_major(5),
            associated_value: Money::from_major(30_000),
            packaging: "60kg jute".to_string(),
            certifications: "fairtrade".to_string(),
            cooperative: Cooperative {
                name: "Kawa Growers".to_string(),
                location: "Sidama".to_string(),
                payment_address: coop.caller.clone(),
                farmer_count: 240,
            },
        },
        &time,
    )?;

    // $25,000 at 8% for 180 days against it
    let loan = ledger.create_loan(
        &manager,
        LoanRequest {
            counterparty: coop.caller.clone(),
            amount: Money::from_major(25_000),
            rate: Rate::from_bps(800),
            duration_secs: 180 * 86_400,
            batches: vec![batch],
            purpose: "export pre-finance".to_string(),
            name: "Kawa Growers".to_string(),
            location: "Sidama".to_string(),
        },
        &time,
    )?;
    ledger.disburse(&manager, loan, &time)?;

    // jump to maturity and settle
    time.test_control().unwrap().advance(Duration::days(180));
    println!("owed at maturity: {}", ledger.outstanding_balance(loan, &time)?.round_dp(2));

    let receipt = ledger.repay(&coop, loan, Money::from_major(27_000), &time)?;
    println!("applied {} of {}", receipt.applied.round_dp(2), receipt.requested);

    println!("{}", ledger.loan_view(loan, &time)?.to_json_pretty()?);
    Ok(())
}
