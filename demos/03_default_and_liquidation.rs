/// default and liquidation - a missed maturity, then the emergency path
use coop_credit_ledger::chrono::{Duration, Utc};
use coop_credit_ledger::{
    AccountId, AuthContext, BatchRegistration, Cooperative, Event, InMemoryAssetLedger, Ledger,
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
    let control = time.test_control().unwrap();
    let admin = AuthContext::new("admin");
    let manager = AuthContext::new("manager");
    let treasury = AuthContext::new("treasury");
    let coop = AuthContext::new("river-coop");

    let mut assets = InMemoryAssetLedger::new();
    assets.credit(&treasury.caller, Money::from_major(60_000));

    let mut ledger = Ledger::new(
        LedgerConfig::default(),
        admin.caller.clone(),
        treasury.caller.clone(),
        assets,
    )?;
    ledger.grant_role(&admin, &manager.caller, Role::Manager)?;

    let batch = ledger.register_batch(
        &manager,
        BatchRegistration {
            production_date: time.now() - Duration::days(3),
            expiry_date: time.now() + Duration::days(400),
            quantity: 8_000,
            unit_price: Money::from_major(2),
            associated_value: Money::from_major(16_000),
            packaging: "50kg sacks".to_string(),
            certifications: String::new(),
            cooperative: Cooperative {
                name: "River Rice".to_string(),
                location: "Mwea".to_string(),
                payment_address: coop.caller.clone(),
                farmer_count: 130,
            },
        },
        &time,
    )?;
    let loan = ledger.create_loan(
        &manager,
        LoanRequest {
            counterparty: coop.caller.clone(),
            amount: Money::from_major(12_000),
            rate: Rate::from_bps(1_000),
            duration_secs: 90 * 86_400,
            batches: vec![batch],
            purpose: "milling".to_string(),
            name: "River Rice".to_string(),
            location: "Mwea".to_string(),
        },
        &time,
    )?;
    ledger.disburse(&manager, loan, &time)?;

    ledger.repay(&coop, loan, Money::from_major(2_000), &time)?;

    control.advance(Duration::days(91));
    ledger.mark_defaulted(&manager, loan, &time)?;
    let seized = ledger.liquidate(&treasury, loan, &time)?;
    println!("liquidated, collateral seized: {:?}", seized);
    println!("{:#?}", ledger.stats());

    // incident response: halt, then move the remaining float out
    let vault = AccountId::new("cold-vault");
    ledger.pause(&admin, &time)?;
    let float = ledger.treasury_balance();
    ledger.emergency_withdraw(&admin, &vault, float, &time)?;
    println!("moved {} to {}", float, vault);

    for record in ledger.events() {
        if let Event::LoanLiquidated { .. } | Event::EmergencyWithdrawal { .. } = record.event {
            println!("#{} {:?}", record.sequence, record.event);
        }
    }
    Ok(())
}
