use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Address, BorrowerId, LenderId, LoanId, Timestamp};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // lifecycle events
    LoanOriginated {
        loan_id: LoanId,
        lender_id: LenderId,
        lender: Address,
        principal: Money,
        monthly_payment: Money,
        timestamp: Timestamp,
    },
    PrincipalToppedUp {
        loan_id: LoanId,
        amount: Money,
        new_principal: Money,
    },
    LoanAccepted {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        borrower: Address,
        collateral: Money,
    },
    PrincipalDisbursed {
        loan_id: LoanId,
        recipient: Address,
        amount: Money,
    },
    LoanPaidOff {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        timestamp: Timestamp,
    },

    // escrow events
    EscrowDeposited {
        borrower_id: BorrowerId,
        amount: Money,
        new_balance: Money,
    },
    EscrowWithdrawn {
        borrower_id: BorrowerId,
        amount: Money,
        new_balance: Money,
    },

    // payment events
    PaymentReceived {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        amount: Money,
        remaining_obligation: Money,
        timestamp: Timestamp,
    },
    OverduePenaltyClaimed {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        penalty: Money,
        overdue_days: u64,
        timestamp: Timestamp,
    },

    // credit events
    CreditScoreUpdated {
        borrower_id: BorrowerId,
        old_score: u32,
        new_score: u32,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
