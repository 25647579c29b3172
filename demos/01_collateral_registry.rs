/// collateral registry - verification, shares, inventory and expiry
use coop_credit_ledger::chrono::{Duration, Utc};
use coop_credit_ledger::{
    AccountId, AuthContext, BatchRegistration, Cooperative, InMemoryAssetLedger, Ledger,
    LedgerConfig, Money, Role, SafeTimeProvider, TimeSource,
};

fn registration(time: &SafeTimeProvider, quantity: u64, days_to_expiry: i64) -> BatchRegistration {
    BatchRegistration {
        production_date: time.now() - Duration::days(1),
        expiry_date: time.now() + Duration::days(days_to_expiry),
        quantity,
        unit_price: Money::from_major(3),
        associated_value: Money::from_major(3).times(quantity),
        packaging: "crates".to_string(),
        certifications: String::new(),
        cooperative: Cooperative {
            name: "Lakeside Maize".to_string(),
            location: "Jinja".to_string(),
            payment_address: AccountId::new("lakeside"),
            farmer_count: 85,
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coop_credit_ledger=debug".into()),
        )
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
    let admin = AuthContext::new("admin");
    let manager = AuthContext::new("manager");
    let verifier = AuthContext::new("inspector");

    let mut ledger = Ledger::new(
        LedgerConfig::default(),
        admin.caller.clone(),
        AccountId::new("treasury"),
        InMemoryAssetLedger::new(),
    )?;
    ledger.grant_role(&admin, &manager.caller, Role::Manager)?;
    ledger.grant_role(&admin, &verifier.caller, Role::Verifier)?;

    let first = ledger.register_batch(&manager, registration(&time, 1_000, 30), &time)?;
    let second = ledger.register_batch(&manager, registration(&time, 400, 200), &time)?;
    let third = ledger.register_batch(&manager, registration(&time, 2_500, 200), &time)?;
    println!("active: {:?}", ledger.active_batches());

    ledger.verify_batch(&verifier, second, 400, "ipfs://inspection-2", &time)?;
    ledger.issue_shares(&manager, second, 400, &time)?;

    // selling the whole batch drops it from the active set
    ledger.retire_shares(&manager, second, 400, &time)?;
    println!("after sell-through: {:?}", ledger.active_batches());

    ledger.adjust_inventory(&manager, third, 2_300, &time)?;

    time.test_control().unwrap().advance(Duration::days(31));
    ledger.mark_expired(&manager, first, &time)?;
    println!("after expiry: {:?}", ledger.active_batches());
    println!(
        "active inventory value: {}",
        ledger.registry().active_inventory_value()
    );

    println!("{}", ledger.batch_view(third)?.to_json_pretty()?);
    Ok(())
}
