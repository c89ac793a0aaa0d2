use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::money::{Money, Rate};
use crate::types::{Address, LenderId, LoanId};

/// the originating party's claim on exactly one loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lender {
    pub(crate) id: LenderId,
    pub(crate) loan: LoanId,
    pub(crate) address: Address,
    pub(crate) contributed_value: Money,
}

impl Lender {
    pub(crate) fn new(loan: LoanId, address: Address, contributed_value: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan,
            address,
            contributed_value,
        }
    }

    pub fn id(&self) -> LenderId {
        self.id
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn contributed_value(&self) -> Money {
        self.contributed_value
    }

    /// share of the contribution already returned through repayments and penalties
    pub fn recovery_rate(&self, loan: &Loan) -> Option<Rate> {
        let recovered = loan.total_repaid().checked_add(loan.total_penalties())?;
        recovered.ratio_to(self.contributed_value)
    }

    /// this position must be the lender side of `loan`
    pub(crate) fn ensure_position(&self, loan: &Loan) -> Result<()> {
        if self.loan != loan.id() {
            return Err(LedgerError::LoanMismatch {
                expected: loan.id(),
                found: self.loan,
            });
        }
        if &self.address != loan.lender() {
            return Err(LedgerError::NotLender {
                caller: self.address.clone(),
            });
        }
        Ok(())
    }
}
