pub mod amortization;
pub mod penalty;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::{authorize, Entity, Operation};
use crate::config::{LedgerConfig, OverdueClaimPolicy};
use crate::custody::ValueTransfer;
use crate::errors::{LedgerError, Result};
use crate::escrow::Borrower;
use crate::events::{EventStore, LedgerEvent};
use crate::loan::{mark_paid_off, Loan};
use crate::money::Money;
use crate::time::Clock;
use crate::types::{Address, Timestamp};

pub use amortization::{monthly_payment, AmortizationSchedule, ScheduledPayment};
pub use penalty::{OverdueAssessment, PenaltyEngine};

/// outcome of a repayment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub amount: Money,
    pub remaining_obligation: Money,
    pub paid_off: bool,
    pub timestamp: Timestamp,
}

/// outcome of an overdue claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueClaim {
    pub assessment: OverdueAssessment,
    pub transferred: Money,
}

/// moves escrow funds to the lender for repayments and overdue penalties
#[derive(Debug, Clone)]
pub struct PaymentEngine {
    config: LedgerConfig,
    penalties: PenaltyEngine,
}

impl PaymentEngine {
    pub fn new(config: LedgerConfig) -> Self {
        let penalties = PenaltyEngine::new(config.penalty_formula);
        Self { config, penalties }
    }

    /// repay `amount` from escrow; reaching a zero obligation closes the loan
    pub fn make_payment<V: ValueTransfer + ?Sized>(
        &self,
        borrower: &mut Borrower,
        loan: &mut Loan,
        amount: Money,
        caller: &Address,
        clock: &impl Clock,
        custody: &mut V,
        events: &mut EventStore,
    ) -> Result<PaymentReceipt> {
        authorize(Operation::MakePayment, caller, Entity::Borrower(borrower))?;
        loan.ensure_borrower(borrower)?;
        loan.ensure_open()?;
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        let remaining = borrower
            .outstanding_obligation
            .checked_sub(amount)
            .ok_or(LedgerError::PaymentExceedsObligation {
                outstanding: borrower.outstanding_obligation,
                requested: amount,
            })?;
        if amount > borrower.escrow_balance() {
            return Err(LedgerError::InsufficientFunds {
                available: borrower.escrow_balance(),
                requested: amount,
            });
        }
        let total_repaid = loan
            .total_repaid
            .checked_add(amount)
            .ok_or_else(|| LedgerError::overflow("total repaid"))?;

        let now = clock.now_ms();
        let coin = custody.withdraw(&mut borrower.escrow_balance, amount)?;
        custody.transfer(coin, &loan.lender);

        borrower.outstanding_obligation = remaining;
        loan.total_repaid = total_repaid;
        loan.payment_count = loan.payment_count.saturating_add(1);
        loan.last_payment_at = Some(now);

        info!(loan_id = %loan.id(), borrower_id = %borrower.id(), amount = %amount, remaining = %remaining, "payment received");
        events.emit(LedgerEvent::PaymentReceived {
            loan_id: loan.id(),
            borrower_id: borrower.id(),
            amount,
            remaining_obligation: remaining,
            timestamp: now,
        });

        let paid_off = remaining.is_zero();
        if paid_off {
            mark_paid_off(loan, borrower, now, events);
        }

        Ok(PaymentReceipt {
            amount,
            remaining_obligation: remaining,
            paid_off,
            timestamp: now,
        })
    }

    /// lender collects the penalty for the current overdue window
    pub fn claim_overdue<V: ValueTransfer + ?Sized>(
        &self,
        borrower: &mut Borrower,
        loan: &mut Loan,
        caller: &Address,
        clock: &impl Clock,
        custody: &mut V,
        events: &mut EventStore,
    ) -> Result<OverdueClaim> {
        authorize(Operation::ClaimOverdue, caller, Entity::Loan(loan))?;
        loan.ensure_borrower(borrower)?;
        loan.ensure_open()?;

        let now = clock.now_ms();
        let due_date = loan.due_date(self.config.month_length_days)?;
        if now <= due_date {
            debug!(loan_id = %loan.id(), due_date, now, "overdue claim before due date");
            return Err(LedgerError::LoanNotDue { due_date, now });
        }

        let window_start = match (self.config.overdue_claims, loan.last_claimed_through) {
            (OverdueClaimPolicy::OncePerWindow, Some(claimed)) => claimed,
            _ => due_date,
        };
        let assessment = self.penalties.assess(
            loan.monthly_payment(),
            borrower.escrow_balance(),
            due_date,
            window_start,
            now,
        )?;

        if self.config.overdue_claims == OverdueClaimPolicy::OncePerWindow
            && assessment.overdue_days == 0
            && loan.last_claimed_through.is_some()
        {
            return Err(LedgerError::PenaltyAlreadyClaimed {
                claimed_through: assessment.window_start,
            });
        }

        let penalty = assessment.penalty;
        if penalty > borrower.escrow_balance() {
            return Err(LedgerError::InsufficientFunds {
                available: borrower.escrow_balance(),
                requested: penalty,
            });
        }
        let total_penalties = loan
            .total_penalties
            .checked_add(penalty)
            .ok_or_else(|| LedgerError::overflow("total penalties"))?;

        if penalty.is_positive() {
            let coin = custody.withdraw(&mut borrower.escrow_balance, penalty)?;
            custody.transfer(coin, &loan.lender);
        }
        loan.total_penalties = total_penalties;
        loan.last_claimed_through = Some(assessment.claimed_through);

        info!(
            loan_id = %loan.id(),
            borrower_id = %borrower.id(),
            overdue_days = assessment.overdue_days,
            penalty = %penalty,
            "overdue penalty claimed"
        );
        if penalty.is_positive() {
            events.emit(LedgerEvent::OverduePenaltyClaimed {
                loan_id: loan.id(),
                borrower_id: borrower.id(),
                penalty,
                overdue_days: assessment.overdue_days,
                timestamp: now,
            });
        }

        Ok(OverdueClaim {
            assessment,
            transferred: penalty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::InMemoryCustody;
    use crate::errors::ErrorKind;
    use crate::loan::{accept, originate, LoanTerms};
    use crate::time::MS_PER_DAY;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    struct Fixture {
        time: SafeTimeProvider,
        custody: InMemoryCustody,
        events: EventStore,
        loan: Loan,
        borrower: Borrower,
    }

    fn lender() -> Address {
        Address::new("lender")
    }

    fn owner() -> Address {
        Address::new("owner")
    }

    /// principal 1000, 10% over 10 months, collateral 1000
    fn fixture() -> Fixture {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let mut custody = InMemoryCustody::new();
        let mut events = EventStore::new();

        let principal = custody.mint(Money::new(1_000));
        let (_, mut loan) = originate(
            &lender(),
            LoanTerms::new("scooter", Money::new(1_500), 10, 10),
            principal,
            &time,
            &mut custody,
            &mut events,
        )
        .unwrap();
        let collateral = custody.mint(Money::new(1_000));
        let borrower = accept(&mut loan, collateral, &owner(), &mut custody, &mut events).unwrap();
        events.clear();

        Fixture {
            time,
            custody,
            events,
            loan,
            borrower,
        }
    }

    #[test]
    fn test_payment_moves_escrow_to_lender() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());

        let receipt = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::new(100),
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();

        assert_eq!(receipt.remaining_obligation, Money::new(900));
        assert!(!receipt.paid_off);
        assert_eq!(f.borrower.escrow_balance(), Money::new(900));
        assert_eq!(f.custody.wallet(&lender()), Money::new(100));
        assert_eq!(f.loan.total_repaid(), Money::new(100));
        assert_eq!(f.loan.payment_count(), 1);
    }

    #[test]
    fn test_final_payment_closes_loan() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());

        let receipt = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::new(1_000),
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();

        assert!(receipt.paid_off);
        assert!(f.loan.is_paid_off());
        assert_eq!(f.loan.term_end(), Some(f.time.now_ms()));
        assert!(!f.borrower.is_active());
        assert!(matches!(
            f.events.events().last(),
            Some(LedgerEvent::LoanPaidOff { .. })
        ));
    }

    #[test]
    fn test_overpayment_rejected_without_change() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        let coin = f.custody.mint(Money::new(500));
        crate::escrow::deposit(&mut f.borrower, coin, &owner(), &mut f.custody, &mut f.events)
            .unwrap();
        let before = (f.borrower.clone(), f.loan.clone());

        let err = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::new(1_001),
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::PaymentExceedsObligation {
                outstanding: Money::new(1_000),
                requested: Money::new(1_001),
            }
        );
        assert_eq!((f.borrower, f.loan), before);
    }

    #[test]
    fn test_payment_validation() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());

        let err = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::ZERO,
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::new(10),
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_payment_after_payoff_is_state_error() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        crate::loan::close(&mut f.loan, &mut f.borrower, &owner(), &f.time, &mut f.events)
            .unwrap();

        let err = engine
            .make_payment(
                &mut f.borrower,
                &mut f.loan,
                Money::new(100),
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::LoanAlreadyPaidOff);
        assert_eq!(f.borrower.outstanding_obligation(), Money::new(1_000));
    }

    #[test]
    fn test_claim_before_due_date_fails() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        let control = f.time.test_control().unwrap();
        let due = f.loan.due_date(30).unwrap();

        // exactly at the due date is not yet overdue
        control.advance(chrono::Duration::milliseconds(due - f.time.now_ms()));
        assert_eq!(f.time.now_ms(), due);

        let err = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::LoanNotDue { due_date: due, now: due });
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(f.borrower.escrow_balance(), Money::new(1_000));
        assert_eq!(f.custody.wallet(&lender()), Money::ZERO);
    }

    #[test]
    fn test_claim_overdue_penalty() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        let control = f.time.test_control().unwrap();

        // 300 days of term plus 15 days and change
        control.advance(chrono::Duration::days(315) + chrono::Duration::hours(5));

        let claim = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();

        assert_eq!(claim.assessment.overdue_days, 15);
        assert_eq!(claim.transferred, Money::new(50));
        assert_eq!(f.borrower.escrow_balance(), Money::new(950));
        // penalties do not reduce the obligation
        assert_eq!(f.borrower.outstanding_obligation(), Money::new(1_000));
        assert_eq!(f.loan.total_penalties(), Money::new(50));
        assert_eq!(f.custody.wallet(&lender()), Money::new(50));
    }

    #[test]
    fn test_repeated_claims_are_not_deduplicated() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        let control = f.time.test_control().unwrap();
        control.advance(chrono::Duration::days(310));

        for _ in 0..2 {
            let claim = engine
                .claim_overdue(
                    &mut f.borrower,
                    &mut f.loan,
                    &lender(),
                    &f.time,
                    &mut f.custody,
                    &mut f.events,
                )
                .unwrap();
            assert_eq!(claim.transferred, Money::new(33));
        }
        assert_eq!(f.custody.wallet(&lender()), Money::new(66));
    }

    #[test]
    fn test_once_per_window_policy() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::hardened());
        let control = f.time.test_control().unwrap();
        control.advance(chrono::Duration::days(310));

        let first = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();
        assert_eq!(first.transferred, Money::new(33));

        let err = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::PenaltyAlreadyClaimed { .. }));

        // three more days accrue only those three days
        control.advance(chrono::Duration::days(3));
        let second = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();
        assert_eq!(second.assessment.overdue_days, 3);
        assert_eq!(second.transferred, Money::new(10));
    }

    #[test]
    fn test_claim_requires_lender_and_funds() {
        let mut f = fixture();
        let engine = PaymentEngine::new(LedgerConfig::standard());
        let control = f.time.test_control().unwrap();
        control.advance(chrono::Duration::days(300) + chrono::Duration::milliseconds(1));

        let err = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &owner(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        // drain escrow down to 1 unit, then go far past due
        crate::escrow::withdraw(&mut f.borrower, Money::new(999), &owner(), &mut f.custody, &mut f.events)
            .unwrap();
        control.advance(chrono::Duration::days(60));

        let err = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                available: Money::new(1),
                requested: Money::new(200),
            }
        );
        assert_eq!(f.loan.total_penalties(), Money::ZERO);
    }

    #[test]
    fn test_escrow_rate_formula() {
        let mut f = fixture();
        let config = LedgerConfig::escrow_rate_penalty(crate::money::Rate::from_percentage(2)).unwrap();
        let engine = PaymentEngine::new(config);
        let control = f.time.test_control().unwrap();
        control.advance(chrono::Duration::milliseconds(300 * MS_PER_DAY + 2 * MS_PER_DAY));

        let claim = engine
            .claim_overdue(
                &mut f.borrower,
                &mut f.loan,
                &lender(),
                &f.time,
                &mut f.custody,
                &mut f.events,
            )
            .unwrap();
        // 2% of 1000 for 2 days
        assert_eq!(claim.transferred, Money::new(40));
    }
}
