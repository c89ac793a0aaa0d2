/// serializable snapshots of a loan and its positions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escrow::Borrower;
use crate::lender::Lender;
use crate::loan::Loan;
use crate::money::{Money, Rate};
use crate::payments::amortization::total_repayable;
use crate::time::{to_datetime, whole_days_between};
use crate::types::{Address, CreditTier, LoanId, LoanStatus, Timestamp};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub status: LoanStatus,
    pub asset_description: String,
    pub asset_value: Money,
    pub terms: TermsView,
    pub lender: LenderView,
    pub borrower: Option<BorrowerView>,
    pub repayment: RepaymentView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub interest_rate: Rate,
    pub term_length: u32,
    pub monthly_payment: Money,
    pub total_repayable: Option<Money>,
    pub undisbursed_principal: Money,
    pub term_start: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub term_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LenderView {
    pub address: Address,
    pub contributed_value: Money,
    pub recovery_rate: Option<Rate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowerView {
    pub owner: Address,
    pub escrow_balance: Money,
    pub outstanding_obligation: Money,
    pub active: bool,
    pub credit_score: u32,
    pub credit_tier: CreditTier,
    pub collateral_coverage: Option<Rate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentView {
    pub total_repaid: Money,
    pub total_penalties: Money,
    pub payment_count: u32,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub days_past_due: u64,
}

impl LoanView {
    pub fn build(
        loan: &Loan,
        lender: &Lender,
        borrower: Option<&Borrower>,
        now: Timestamp,
        month_length_days: u32,
    ) -> Self {
        let due_date = loan.due_date(month_length_days).ok();
        let days_past_due = match due_date {
            Some(due) if !loan.is_paid_off() && loan.borrower().is_some() => {
                whole_days_between(due, now)
            }
            _ => 0,
        };

        LoanView {
            id: loan.id(),
            status: loan.status(now, month_length_days),
            asset_description: loan.asset_description().to_string(),
            asset_value: loan.asset_value(),
            terms: TermsView {
                interest_rate: loan.annual_rate(),
                term_length: loan.term_length(),
                monthly_payment: loan.monthly_payment(),
                total_repayable: total_repayable(loan.monthly_payment(), loan.term_length()).ok(),
                undisbursed_principal: loan.principal_balance(),
                term_start: loan.term_start_at(),
                due_date: due_date.and_then(to_datetime),
                term_end: loan.term_end_at(),
            },
            lender: LenderView {
                address: lender.address().clone(),
                contributed_value: lender.contributed_value(),
                recovery_rate: lender.recovery_rate(loan),
            },
            borrower: borrower.map(|b| BorrowerView {
                owner: b.owner().clone(),
                escrow_balance: b.escrow_balance(),
                outstanding_obligation: b.outstanding_obligation(),
                active: b.is_active(),
                credit_score: b.credit_score(),
                credit_tier: b.credit_tier(),
                collateral_coverage: b.collateral_coverage(),
            }),
            repayment: RepaymentView {
                total_repaid: loan.total_repaid(),
                total_penalties: loan.total_penalties(),
                payment_count: loan.payment_count(),
                last_payment_at: loan.last_payment_at().and_then(to_datetime),
                days_past_due,
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
