/// json state - config round trip, loan view and repayment schedule
use escrow_loan_rs::{
    Address, InMemoryCustody, InMemoryStore, LedgerConfig, LoanDesk, LoanTerms, Money, Rate,
    SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // escrow-based penalties at 2% per day, loaded back from json
    let config = LedgerConfig::escrow_rate_penalty(Rate::from_bps(200))?;
    let json = config.to_json_pretty()?;
    println!("config:\n{}", json);
    let config = LedgerConfig::from_json(&json)?;

    let time = SafeTimeProvider::new(TimeSource::System);
    let mut desk = LoanDesk::new(config, InMemoryStore::new(), InMemoryCustody::new())?;

    let lender = Address::new("0xlender");
    let borrower = Address::new("0xborrower");

    let principal = desk.custody_mut().mint(Money::new(5_000));
    let loan_id = desk.originate(
        &lender,
        LoanTerms::new("solar array", Money::new(8_000), 9, 6),
        principal,
        &time,
    )?;
    let collateral = desk.custody_mut().mint(Money::new(6_000));
    let borrower_id = desk.accept(loan_id, collateral, &borrower)?;
    desk.update_credit_score(borrower_id, 540, &lender)?;

    println!("loan:\n{}", desk.view(loan_id, &time)?.to_json_pretty()?);
    println!("schedule:\n{}", serde_json::to_string_pretty(&desk.schedule(loan_id)?)?);

    for event in desk.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
