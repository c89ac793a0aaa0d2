use tracing::debug;

use crate::errors::{LedgerError, Result};
use crate::escrow::Borrower;
use crate::loan::Loan;
use crate::types::Address;

/// caller-facing operations that require a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TopUp,
    ClaimOverdue,
    Close,
    MakePayment,
    DepositEscrow,
    WithdrawEscrow,
    ReleaseCollateral,
    UpdateCreditScore,
}

/// the party an operation must be performed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// the loan's lender
    Lender,
    /// the owner of the borrower account
    AccountOwner,
    /// the loan's lender, acting on a borrower other than themselves
    CreditAssessor,
}

impl Operation {
    pub fn required_role(&self) -> Role {
        match self {
            Operation::TopUp | Operation::ClaimOverdue => Role::Lender,
            Operation::Close
            | Operation::MakePayment
            | Operation::DepositEscrow
            | Operation::WithdrawEscrow
            | Operation::ReleaseCollateral => Role::AccountOwner,
            Operation::UpdateCreditScore => Role::CreditAssessor,
        }
    }
}

/// the record a capability is checked against
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Loan(&'a Loan),
    Borrower(&'a Borrower),
    Position {
        loan: &'a Loan,
        borrower: &'a Borrower,
    },
}

impl<'a> Entity<'a> {
    fn loan(&self) -> Option<&'a Loan> {
        match *self {
            Entity::Loan(loan) | Entity::Position { loan, .. } => Some(loan),
            Entity::Borrower(_) => None,
        }
    }

    fn borrower(&self) -> Option<&'a Borrower> {
        match *self {
            Entity::Borrower(borrower) | Entity::Position { borrower, .. } => Some(borrower),
            Entity::Loan(_) => None,
        }
    }
}

/// deny unless `caller` holds the role `operation` requires on `entity`
///
/// An entity that cannot prove the role (e.g. a bare borrower for a lender
/// operation) is denied.
pub fn authorize(operation: Operation, caller: &Address, entity: Entity<'_>) -> Result<()> {
    let outcome = match operation.required_role() {
        Role::Lender => require_lender(caller, entity.loan()),
        Role::AccountOwner => require_owner(caller, entity.borrower()),
        Role::CreditAssessor => match entity.borrower() {
            Some(borrower) if borrower.owner() == caller => Err(LedgerError::SelfScoring),
            Some(_) => require_lender(caller, entity.loan()),
            None => Err(LedgerError::NotLender {
                caller: caller.clone(),
            }),
        },
    };

    if let Err(e) = &outcome {
        debug!(?operation, caller = %caller, error = %e, "authorization denied");
    }
    outcome
}

fn require_lender(caller: &Address, loan: Option<&Loan>) -> Result<()> {
    match loan {
        Some(loan) if loan.lender() == caller => Ok(()),
        _ => Err(LedgerError::NotLender {
            caller: caller.clone(),
        }),
    }
}

fn require_owner(caller: &Address, borrower: Option<&Borrower>) -> Result<()> {
    match borrower {
        Some(borrower) if borrower.owner() == caller => Ok(()),
        _ => Err(LedgerError::NotBorrower {
            caller: caller.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::InMemoryCustody;
    use crate::events::EventStore;
    use crate::loan::{accept, originate, LoanTerms};
    use crate::money::Money;

    fn fixture() -> (Loan, Borrower) {
        let mut custody = InMemoryCustody::new();
        let mut events = EventStore::new();
        let coin = custody.mint(Money::new(500));
        let (_, mut loan) = originate(
            &Address::new("lender"),
            LoanTerms::new("phone", Money::new(600), 12, 6),
            coin,
            &0i64,
            &mut custody,
            &mut events,
        )
        .unwrap();
        let collateral = custody.mint(Money::new(500));
        let borrower =
            accept(&mut loan, collateral, &Address::new("borrower"), &mut custody, &mut events)
                .unwrap();
        (loan, borrower)
    }

    #[test]
    fn test_lender_operations() {
        let (loan, _) = fixture();
        let lender = Address::new("lender");
        let borrower = Address::new("borrower");

        assert!(authorize(Operation::ClaimOverdue, &lender, Entity::Loan(&loan)).is_ok());
        assert_eq!(
            authorize(Operation::TopUp, &borrower, Entity::Loan(&loan)),
            Err(LedgerError::NotLender { caller: borrower })
        );
    }

    #[test]
    fn test_owner_operations() {
        let (_, account) = fixture();
        let owner = Address::new("borrower");
        let lender = Address::new("lender");

        for op in [
            Operation::MakePayment,
            Operation::DepositEscrow,
            Operation::WithdrawEscrow,
            Operation::Close,
        ] {
            assert!(authorize(op, &owner, Entity::Borrower(&account)).is_ok());
            assert!(authorize(op, &lender, Entity::Borrower(&account)).is_err());
        }
    }

    #[test]
    fn test_entity_without_capability_is_denied() {
        let (loan, account) = fixture();
        let lender = Address::new("lender");

        // a lender operation cannot be proven from a bare borrower record
        assert!(authorize(Operation::ClaimOverdue, &lender, Entity::Borrower(&account)).is_err());
        assert!(authorize(Operation::DepositEscrow, &lender, Entity::Loan(&loan)).is_err());
    }

    #[test]
    fn test_credit_assessor() {
        let (loan, account) = fixture();
        let position = Entity::Position {
            loan: &loan,
            borrower: &account,
        };

        assert!(authorize(Operation::UpdateCreditScore, &Address::new("lender"), position).is_ok());
        assert_eq!(
            authorize(Operation::UpdateCreditScore, &Address::new("borrower"), position),
            Err(LedgerError::SelfScoring)
        );
        assert!(matches!(
            authorize(Operation::UpdateCreditScore, &Address::new("third"), position),
            Err(LedgerError::NotLender { .. })
        ));
    }
}
