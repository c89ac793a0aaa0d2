/// overdue penalties - advance a test clock past the due date and claim
use escrow_loan_rs::chrono::{Duration, TimeZone, Utc};
use escrow_loan_rs::{
    Address, InMemoryCustody, InMemoryStore, LedgerConfig, LoanDesk, LoanTerms, Money,
    SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

    let lender = Address::new("0xlender");
    let borrower = Address::new("0xborrower");

    for (label, config) in [
        ("standard", LedgerConfig::standard()),
        ("hardened", LedgerConfig::hardened()),
    ] {
        let mut desk = LoanDesk::new(config, InMemoryStore::new(), InMemoryCustody::new())?;

        let principal = desk.custody_mut().mint(Money::new(1_000));
        let loan_id = desk.originate(
            &lender,
            LoanTerms::new("espresso machine", Money::new(1_000), 10, 10),
            principal,
            &time,
        )?;
        let collateral = desk.custody_mut().mint(Money::new(1_000));
        let borrower_id = desk.accept(loan_id, collateral, &borrower)?;

        // ten 30-day months plus 15 days
        control.advance(Duration::days(315));

        for attempt in 1..=2 {
            match desk.claim_overdue(borrower_id, &lender, &time) {
                Ok(claim) => println!(
                    "[{}] claim {}: {} days overdue, penalty {}",
                    label, attempt, claim.assessment.overdue_days, claim.transferred
                ),
                Err(e) => println!("[{}] claim {} rejected: {}", label, attempt, e),
            }
        }
        println!("[{}] lender received {}", label, desk.custody().wallet(&lender));
    }

    Ok(())
}
