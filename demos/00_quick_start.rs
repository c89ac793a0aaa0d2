/// quick start - originate, accept and repay a loan
use escrow_loan_rs::{
    Address, InMemoryCustody, InMemoryStore, LedgerConfig, LoanDesk, LoanTerms, Money,
    SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let time = SafeTimeProvider::new(TimeSource::System);
    let mut desk = LoanDesk::new(LedgerConfig::standard(), InMemoryStore::new(), InMemoryCustody::new())?;

    let lender = Address::new("0xlender");
    let borrower = Address::new("0xborrower");

    // lender funds a 1,200 loan at 12% over 12 months against a 2,000 asset
    let principal = desk.custody_mut().mint(Money::new(1_200));
    let loan_id = desk.originate(
        &lender,
        LoanTerms::new("used hatchback", Money::new(2_000), 12, 12),
        principal,
        &time,
    )?;
    println!("monthly payment: {}", desk.monthly_payment(loan_id)?);

    // borrower posts collateral and receives the principal
    let collateral = desk.custody_mut().mint(Money::new(1_200));
    let borrower_id = desk.accept(loan_id, collateral, &borrower)?;

    // one installment from escrow
    let receipt = desk.make_payment(borrower_id, Money::new(101), &borrower, &time)?;
    println!("remaining obligation: {}", receipt.remaining_obligation);

    println!("{}", desk.view(loan_id, &time)?.to_json_pretty()?);

    Ok(())
}
