use serde::{Deserialize, Serialize};

use crate::config::PenaltyFormula;
use crate::errors::{LedgerError, Result};
use crate::money::Money;
use crate::time::{whole_days_between, MS_PER_DAY};
use crate::types::Timestamp;

/// engine for calculating overdue penalties
#[derive(Debug, Clone, Copy)]
pub struct PenaltyEngine {
    pub formula: PenaltyFormula,
}

impl PenaltyEngine {
    pub fn new(formula: PenaltyFormula) -> Self {
        Self { formula }
    }

    /// penalty for `overdue_days` whole days
    pub fn penalty(
        &self,
        monthly_payment: Money,
        escrow_balance: Money,
        overdue_days: u64,
    ) -> Result<Money> {
        let amount = match self.formula {
            PenaltyFormula::MonthlyPaymentPerDay { days_per_month } => {
                if days_per_month == 0 {
                    return Err(LedgerError::InvalidConfiguration {
                        message: "days_per_month must be positive".to_string(),
                    });
                }
                (monthly_payment.units() as u128)
                    .checked_mul(overdue_days as u128)
                    .map(|n| n / days_per_month as u128)
            }
            PenaltyFormula::EscrowRatePerDay { daily_rate_bps } => {
                (escrow_balance.units() as u128)
                    .checked_mul(daily_rate_bps as u128)
                    .and_then(|n| n.checked_mul(overdue_days as u128))
                    .map(|n| n / 10_000)
            }
        };

        amount
            .and_then(|n| u64::try_from(n).ok())
            .map(Money::new)
            .ok_or_else(|| LedgerError::overflow("overdue penalty"))
    }

    /// assess the window `[window_start, now)` against a loan due at `due_date`
    pub fn assess(
        &self,
        monthly_payment: Money,
        escrow_balance: Money,
        due_date: Timestamp,
        window_start: Timestamp,
        now: Timestamp,
    ) -> Result<OverdueAssessment> {
        let start = window_start.max(due_date);
        let overdue_days = whole_days_between(start, now);
        let penalty = self.penalty(monthly_payment, escrow_balance, overdue_days)?;

        let claimed_through = (overdue_days as i64)
            .checked_mul(MS_PER_DAY)
            .and_then(|span| start.checked_add(span))
            .ok_or_else(|| LedgerError::overflow("claimed-through timestamp"))?;

        Ok(OverdueAssessment {
            due_date,
            window_start: start,
            overdue_days,
            penalty,
            claimed_through,
        })
    }
}

/// overdue penalty calculation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAssessment {
    pub due_date: Timestamp,
    pub window_start: Timestamp,
    pub overdue_days: u64,
    pub penalty: Money,
    /// end of the last whole day covered by this assessment
    pub claimed_through: Timestamp,
}
