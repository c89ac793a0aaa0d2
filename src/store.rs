use std::collections::HashMap;

use crate::errors::{LedgerError, Result};
use crate::escrow::Borrower;
use crate::lender::Lender;
use crate::loan::Loan;
use crate::types::{BorrowerId, LenderId, LoanId};

/// keyed storage for loans and the positions bound to them
///
/// Getters hand out owned copies; changes only land through the `save_*`
/// methods.
pub trait LoanStore {
    fn loan(&self, id: LoanId) -> Result<Loan>;
    fn borrower(&self, id: BorrowerId) -> Result<Borrower>;
    fn lender(&self, id: LenderId) -> Result<Lender>;

    /// the lender position created alongside `loan`
    fn lender_for_loan(&self, loan: LoanId) -> Result<Lender>;

    fn save_loan(&mut self, loan: Loan);
    fn save_borrower(&mut self, borrower: Borrower);
    fn save_lender(&mut self, lender: Lender);
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    loans: HashMap<LoanId, Loan>,
    borrowers: HashMap<BorrowerId, Borrower>,
    lenders: HashMap<LenderId, Lender>,
    lender_index: HashMap<LoanId, LenderId>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }
}

impl LoanStore for InMemoryStore {
    fn loan(&self, id: LoanId) -> Result<Loan> {
        self.loans
            .get(&id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { id })
    }

    fn borrower(&self, id: BorrowerId) -> Result<Borrower> {
        self.borrowers
            .get(&id)
            .cloned()
            .ok_or(LedgerError::BorrowerNotFound { id })
    }

    fn lender(&self, id: LenderId) -> Result<Lender> {
        self.lenders
            .get(&id)
            .cloned()
            .ok_or(LedgerError::LenderNotFound { id })
    }

    fn lender_for_loan(&self, loan: LoanId) -> Result<Lender> {
        let id = self
            .lender_index
            .get(&loan)
            .copied()
            .ok_or(LedgerError::LoanNotFound { id: loan })?;
        self.lender(id)
    }

    fn save_loan(&mut self, loan: Loan) {
        self.loans.insert(loan.id(), loan);
    }

    fn save_borrower(&mut self, borrower: Borrower) {
        self.borrowers.insert(borrower.id(), borrower);
    }

    fn save_lender(&mut self, lender: Lender) {
        self.lender_index.insert(lender.loan(), lender.id());
        self.lenders.insert(lender.id(), lender);
    }
}
