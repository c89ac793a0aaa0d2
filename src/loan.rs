/// loan records and their lifecycle transitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize, Entity, Operation};
use crate::config::MAX_MONTH_LENGTH_DAYS;
use crate::custody::{refund, Balance, Coin, ValueTransfer};
use crate::errors::{LedgerError, Result};
use crate::escrow::Borrower;
use crate::events::{EventStore, LedgerEvent};
use crate::lender::Lender;
use crate::money::{Money, Rate};
use crate::payments::amortization::monthly_payment;
use crate::time::{months_to_ms, to_datetime, Clock};
use crate::types::{Address, BorrowerId, LoanId, LoanStatus, Timestamp};

/// longest term a loan may be originated with, in months
pub const MAX_TERM_MONTHS: u32 = 1_200;

/// financial terms supplied at origination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub asset_description: String,
    pub asset_value: Money,
    /// annual rate in whole percent
    pub interest_rate: u64,
    /// months
    pub term_length: u32,
}

impl LoanTerms {
    pub fn new(
        asset_description: impl Into<String>,
        asset_value: Money,
        interest_rate: u64,
        term_length: u32,
    ) -> Self {
        Self {
            asset_description: asset_description.into(),
            asset_value,
            interest_rate,
            term_length,
        }
    }

    fn validate(&self, principal: Money) -> Result<()> {
        if self.interest_rate == 0 {
            return Err(LedgerError::InvalidInterestRate {
                rate: self.interest_rate,
            });
        }
        if self.term_length == 0 || self.term_length > MAX_TERM_MONTHS {
            return Err(LedgerError::InvalidTermLength {
                months: self.term_length,
            });
        }
        if principal > self.asset_value {
            return Err(LedgerError::PrincipalExceedsAssetValue {
                principal,
                asset_value: self.asset_value,
            });
        }
        Ok(())
    }
}

/// one collateral-backed credit agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub(crate) id: LoanId,
    pub(crate) borrower: Option<BorrowerId>,
    pub(crate) lender: Address,
    pub(crate) asset_description: String,
    pub(crate) asset_value: Money,
    /// undisbursed principal held by the loan
    pub(crate) principal_balance: Balance,
    pub(crate) interest_rate: u64,
    pub(crate) term_length: u32,
    pub(crate) monthly_payment: Money,
    pub(crate) term_start: Timestamp,
    pub(crate) term_end: Option<Timestamp>,
    pub(crate) paid_off: bool,

    // repayment tracking
    pub(crate) total_repaid: Money,
    pub(crate) total_penalties: Money,
    pub(crate) payment_count: u32,
    pub(crate) last_payment_at: Option<Timestamp>,
    pub(crate) last_claimed_through: Option<Timestamp>,
}

impl Loan {
    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn borrower(&self) -> Option<BorrowerId> {
        self.borrower
    }

    pub fn lender(&self) -> &Address {
        &self.lender
    }

    pub fn asset_description(&self) -> &str {
        &self.asset_description
    }

    pub fn asset_value(&self) -> Money {
        self.asset_value
    }

    pub fn principal_balance(&self) -> Money {
        self.principal_balance.value()
    }

    pub fn interest_rate(&self) -> u64 {
        self.interest_rate
    }

    pub fn annual_rate(&self) -> Rate {
        Rate::from_percentage(self.interest_rate)
    }

    pub fn term_length(&self) -> u32 {
        self.term_length
    }

    pub fn monthly_payment(&self) -> Money {
        self.monthly_payment
    }

    pub fn term_start(&self) -> Timestamp {
        self.term_start
    }

    pub fn term_end(&self) -> Option<Timestamp> {
        self.term_end
    }

    pub fn term_start_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.term_start)
    }

    pub fn term_end_at(&self) -> Option<DateTime<Utc>> {
        self.term_end.and_then(to_datetime)
    }

    pub fn is_paid_off(&self) -> bool {
        self.paid_off
    }

    pub fn total_repaid(&self) -> Money {
        self.total_repaid
    }

    pub fn total_penalties(&self) -> Money {
        self.total_penalties
    }

    pub fn payment_count(&self) -> u32 {
        self.payment_count
    }

    pub fn last_payment_at(&self) -> Option<Timestamp> {
        self.last_payment_at
    }

    pub fn last_claimed_through(&self) -> Option<Timestamp> {
        self.last_claimed_through
    }

    /// end of term: `term_start + term_length` months
    pub fn due_date(&self, month_length_days: u32) -> Result<Timestamp> {
        months_to_ms(self.term_length, month_length_days)
            .and_then(|span| self.term_start.checked_add(span))
            .ok_or_else(|| LedgerError::overflow("due date"))
    }

    pub fn status(&self, now: Timestamp, month_length_days: u32) -> LoanStatus {
        if self.paid_off {
            return LoanStatus::PaidOff;
        }
        if self.borrower.is_none() {
            return LoanStatus::Originated;
        }
        match self.due_date(month_length_days) {
            Ok(due) if now > due => LoanStatus::Overdue,
            _ => LoanStatus::Active,
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.paid_off {
            return Err(LedgerError::LoanAlreadyPaidOff);
        }
        Ok(())
    }

    /// the borrower must be the one bound to this loan
    pub(crate) fn ensure_borrower(&self, borrower: &Borrower) -> Result<()> {
        if borrower.loan() != self.id {
            return Err(LedgerError::LoanMismatch {
                expected: self.id,
                found: borrower.loan(),
            });
        }
        match self.borrower {
            None => Err(LedgerError::NoBorrower),
            Some(id) if id == borrower.id() => Ok(()),
            Some(_) => Err(LedgerError::NotBorrower {
                caller: borrower.owner().clone(),
            }),
        }
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// create a loan funded by `principal` together with the lender's position
pub fn originate<V: ValueTransfer + ?Sized>(
    lender_identity: &Address,
    terms: LoanTerms,
    principal: Coin,
    clock: &impl Clock,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<(Lender, Loan)> {
    let amount = principal.value();
    let now = clock.now_ms();

    let payment = match terms
        .validate(amount)
        .and_then(|_| ensure_due_date_representable(now, terms.term_length))
        .and_then(|_| monthly_payment(amount, terms.interest_rate, terms.term_length))
    {
        Ok(payment) => payment,
        Err(e) => return refund(custody, principal, lender_identity, e),
    };

    let mut principal_balance = Balance::zero();
    custody.deposit(&mut principal_balance, principal)?;

    let loan = Loan {
        id: Uuid::new_v4(),
        borrower: None,
        lender: lender_identity.clone(),
        asset_description: terms.asset_description,
        asset_value: terms.asset_value,
        principal_balance,
        interest_rate: terms.interest_rate,
        term_length: terms.term_length,
        monthly_payment: payment,
        term_start: now,
        term_end: None,
        paid_off: false,
        total_repaid: Money::ZERO,
        total_penalties: Money::ZERO,
        payment_count: 0,
        last_payment_at: None,
        last_claimed_through: None,
    };
    let lender = Lender::new(loan.id, lender_identity.clone(), amount);

    info!(loan_id = %loan.id, lender = %lender_identity, principal = %amount, monthly_payment = %payment, "loan originated");
    events.emit(LedgerEvent::LoanOriginated {
        loan_id: loan.id,
        lender_id: lender.id(),
        lender: lender_identity.clone(),
        principal: amount,
        monthly_payment: payment,
        timestamp: now,
    });

    Ok((lender, loan))
}

/// the due date must fit a timestamp under the longest permitted month
fn ensure_due_date_representable(term_start: Timestamp, term_length: u32) -> Result<()> {
    months_to_ms(term_length, MAX_MONTH_LENGTH_DAYS)
        .and_then(|span| term_start.checked_add(span))
        .map(|_| ())
        .ok_or(LedgerError::InvalidTermLength {
            months: term_length,
        })
}

/// lender adds principal before a borrower has accepted
pub fn top_up<V: ValueTransfer + ?Sized>(
    loan: &mut Loan,
    lender: &mut Lender,
    coin: Coin,
    caller: &Address,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<Money> {
    let amount = coin.value();

    let new_principal = match check_top_up(loan, lender, amount, caller) {
        Ok(total) => total,
        Err(e) => return refund(custody, coin, caller, e),
    };
    let contributed = match lender.contributed_value().checked_add(amount) {
        Some(total) => total,
        None => return refund(custody, coin, caller, LedgerError::overflow("contributed value")),
    };

    custody.deposit(&mut loan.principal_balance, coin)?;
    lender.contributed_value = contributed;

    info!(loan_id = %loan.id, amount = %amount, principal = %new_principal, "principal topped up");
    events.emit(LedgerEvent::PrincipalToppedUp {
        loan_id: loan.id,
        amount,
        new_principal,
    });

    Ok(new_principal)
}

fn check_top_up(loan: &Loan, lender: &Lender, amount: Money, caller: &Address) -> Result<Money> {
    authorize(Operation::TopUp, caller, Entity::Loan(loan))?;
    lender.ensure_position(loan)?;
    loan.ensure_open()?;
    if loan.borrower.is_some() {
        return Err(LedgerError::TopUpAfterAcceptance);
    }
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    let total = loan
        .principal_balance()
        .checked_add(amount)
        .ok_or_else(|| LedgerError::overflow("principal"))?;
    if total > loan.asset_value {
        return Err(LedgerError::PrincipalExceedsAssetValue {
            principal: total,
            asset_value: loan.asset_value,
        });
    }
    Ok(total)
}

/// take on the loan: post collateral, receive the full principal
pub fn accept<V: ValueTransfer + ?Sized>(
    loan: &mut Loan,
    collateral: Coin,
    caller: &Address,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<Borrower> {
    let collateral_value = collateral.value();
    let principal = loan.principal_balance();

    let check = loan.ensure_open().and_then(|_| {
        if loan.borrower.is_some() {
            return Err(LedgerError::BorrowerAlreadyAssigned);
        }
        if collateral_value < principal {
            return Err(LedgerError::InsufficientCollateral {
                collateral: collateral_value,
                principal,
            });
        }
        Ok(())
    });
    if let Err(e) = check {
        return refund(custody, collateral, caller, e);
    }

    let mut borrower = Borrower::open(loan.id, caller.clone(), collateral_value);
    custody.deposit(&mut borrower.escrow_balance, collateral)?;

    let disbursed = match custody.withdraw(&mut loan.principal_balance, principal) {
        Ok(coin) => coin,
        Err(e) => {
            let collateral = borrower.escrow_balance.withdraw_all();
            return refund(custody, collateral, caller, e);
        }
    };
    custody.transfer(disbursed, caller);
    loan.borrower = Some(borrower.id());

    info!(loan_id = %loan.id, borrower_id = %borrower.id(), collateral = %collateral_value, disbursed = %principal, "loan accepted");
    events.emit(LedgerEvent::LoanAccepted {
        loan_id: loan.id,
        borrower_id: borrower.id(),
        borrower: caller.clone(),
        collateral: collateral_value,
    });
    events.emit(LedgerEvent::PrincipalDisbursed {
        loan_id: loan.id,
        recipient: caller.clone(),
        amount: principal,
    });

    Ok(borrower)
}

/// explicit payoff by the borrower
pub fn close(
    loan: &mut Loan,
    borrower: &mut Borrower,
    caller: &Address,
    clock: &impl Clock,
    events: &mut EventStore,
) -> Result<Timestamp> {
    authorize(Operation::Close, caller, Entity::Borrower(borrower))?;
    loan.ensure_borrower(borrower)?;
    loan.ensure_open()?;

    let now = clock.now_ms();
    mark_paid_off(loan, borrower, now, events);
    Ok(now)
}

/// flip the loan to paid off; callers have already validated
pub(crate) fn mark_paid_off(
    loan: &mut Loan,
    borrower: &mut Borrower,
    now: Timestamp,
    events: &mut EventStore,
) {
    loan.paid_off = true;
    loan.term_end = Some(now);
    borrower.active = false;

    info!(loan_id = %loan.id, borrower_id = %borrower.id(), "loan paid off");
    events.emit(LedgerEvent::LoanPaidOff {
        loan_id: loan.id,
        borrower_id: borrower.id(),
        timestamp: now,
    });
}
