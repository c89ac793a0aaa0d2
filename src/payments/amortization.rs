use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::loan::MAX_TERM_MONTHS;
use crate::money::Money;
use crate::time::months_to_ms;
use crate::types::{LoanId, Timestamp};

/// flat monthly installment for a loan
///
/// `principal * (100 + interest_rate / 12) / (100 * term_length)`, where every
/// division truncates. Intermediates are widened so large principals do not
/// overflow before the final division.
pub fn monthly_payment(principal: Money, interest_rate: u64, term_length: u32) -> Result<Money> {
    if interest_rate == 0 {
        return Err(LedgerError::InvalidInterestRate { rate: interest_rate });
    }
    if term_length == 0 {
        return Err(LedgerError::InvalidTermLength { months: term_length });
    }

    let factor = 100u128 + (interest_rate / 12) as u128;
    let numerator = (principal.units() as u128)
        .checked_mul(factor)
        .ok_or_else(|| LedgerError::overflow("monthly payment"))?;
    let payment = numerator / (100u128 * term_length as u128);

    u64::try_from(payment)
        .map(Money::new)
        .map_err(|_| LedgerError::overflow("monthly payment"))
}

/// scheduled installment in a nominal repayment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub payment_number: u32,
    pub due_at: Timestamp,
    pub payment_amount: Money,
    pub cumulative_paid: Money,
    pub remaining_due: Money,
}

/// nominal schedule: `term_length` equal installments one month apart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub loan_id: LoanId,
    pub monthly_payment: Money,
    pub term_length: u32,
    pub term_start: Timestamp,
    pub payments: Vec<ScheduledPayment>,
    pub total_repayable: Money,
}

impl AmortizationSchedule {
    pub fn project(
        loan_id: LoanId,
        monthly_payment: Money,
        term_length: u32,
        term_start: Timestamp,
        month_length_days: u32,
    ) -> Result<Self> {
        if term_length > MAX_TERM_MONTHS {
            return Err(LedgerError::InvalidTermLength {
                months: term_length,
            });
        }
        // the final installment bounds every earlier due date
        months_to_ms(term_length, month_length_days)
            .and_then(|span| term_start.checked_add(span))
            .ok_or_else(|| LedgerError::overflow("schedule due date"))?;
        let total_repayable = total_repayable(monthly_payment, term_length)?;

        let mut payments = Vec::new();
        let mut cumulative_paid = Money::ZERO;

        for i in 1..=term_length {
            let due_at = months_to_ms(i, month_length_days)
                .and_then(|offset| term_start.checked_add(offset))
                .ok_or_else(|| LedgerError::overflow("schedule due date"))?;
            cumulative_paid = cumulative_paid
                .checked_add(monthly_payment)
                .ok_or_else(|| LedgerError::overflow("schedule total"))?;

            payments.push(ScheduledPayment {
                payment_number: i,
                due_at,
                payment_amount: monthly_payment,
                cumulative_paid,
                remaining_due: total_repayable.checked_sub(cumulative_paid).unwrap_or(Money::ZERO),
            });
        }

        Ok(Self {
            loan_id,
            monthly_payment,
            term_length,
            term_start,
            payments,
            total_repayable,
        })
    }

    /// get payment for specific period
    pub fn get_payment(&self, payment_number: u32) -> Option<&ScheduledPayment> {
        payment_number
            .checked_sub(1)
            .and_then(|idx| self.payments.get(idx as usize))
    }

    /// first installment due after `now`
    pub fn next_due(&self, now: Timestamp) -> Option<&ScheduledPayment> {
        self.payments.iter().find(|p| p.due_at > now)
    }
}

/// sum of all installments over the term
pub fn total_repayable(monthly_payment: Money, term_length: u32) -> Result<Money> {
    monthly_payment
        .checked_mul(term_length as u64)
        .ok_or_else(|| LedgerError::overflow("total repayable"))
}
