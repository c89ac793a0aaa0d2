use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize, Entity, Operation};
use crate::custody::{refund, Balance, Coin, ValueTransfer};
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::loan::Loan;
use crate::money::{Money, Rate};
use crate::types::{Address, BorrowerId, CreditTier, LoanId};

/// the accepting party's position on exactly one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub(crate) id: BorrowerId,
    pub(crate) loan: LoanId,
    pub(crate) owner: Address,
    pub(crate) escrow_balance: Balance,
    pub(crate) outstanding_obligation: Money,
    pub(crate) active: bool,
    pub(crate) credit_score: u32,
}

impl Borrower {
    pub(crate) fn open(loan: LoanId, owner: Address, obligation: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan,
            owner,
            escrow_balance: Balance::zero(),
            outstanding_obligation: obligation,
            active: true,
            credit_score: 0,
        }
    }

    pub fn id(&self) -> BorrowerId {
        self.id
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn escrow_balance(&self) -> Money {
        self.escrow_balance.value()
    }

    pub fn outstanding_obligation(&self) -> Money {
        self.outstanding_obligation
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn credit_score(&self) -> u32 {
        self.credit_score
    }

    pub fn credit_tier(&self) -> CreditTier {
        CreditTier::from_score(self.credit_score)
    }

    /// escrow relative to what is still owed; None once nothing is owed
    pub fn collateral_coverage(&self) -> Option<Rate> {
        self.escrow_balance().ratio_to(self.outstanding_obligation)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// owner merges a coin into escrow
pub fn deposit<V: ValueTransfer + ?Sized>(
    borrower: &mut Borrower,
    coin: Coin,
    caller: &Address,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<Money> {
    let amount = coin.value();

    let check = authorize(Operation::DepositEscrow, caller, Entity::Borrower(borrower)).and_then(
        |_| {
            borrower
                .escrow_balance()
                .checked_add(amount)
                .ok_or_else(|| LedgerError::overflow("escrow balance"))
        },
    );
    if let Err(e) = check {
        return refund(custody, coin, caller, e);
    }

    let new_balance = custody.deposit(&mut borrower.escrow_balance, coin)?;

    info!(borrower_id = %borrower.id, amount = %amount, balance = %new_balance, "escrow deposit");
    events.emit(LedgerEvent::EscrowDeposited {
        borrower_id: borrower.id,
        amount,
        new_balance,
    });

    Ok(new_balance)
}

/// owner takes funds out of escrow while strictly less than the obligation
pub fn withdraw<V: ValueTransfer + ?Sized>(
    borrower: &mut Borrower,
    amount: Money,
    caller: &Address,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<Coin> {
    authorize(Operation::WithdrawEscrow, caller, Entity::Borrower(borrower))?;
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    if amount >= borrower.outstanding_obligation {
        return Err(LedgerError::WithdrawalExceedsObligation {
            outstanding: borrower.outstanding_obligation,
            requested: amount,
        });
    }
    if amount > borrower.escrow_balance() {
        return Err(LedgerError::InsufficientFunds {
            available: borrower.escrow_balance(),
            requested: amount,
        });
    }

    let coin = custody.withdraw(&mut borrower.escrow_balance, amount)?;
    let new_balance = borrower.escrow_balance();

    info!(borrower_id = %borrower.id, amount = %amount, balance = %new_balance, "escrow withdrawal");
    events.emit(LedgerEvent::EscrowWithdrawn {
        borrower_id: borrower.id,
        amount,
        new_balance,
    });

    Ok(coin)
}

/// owner recovers whatever escrow remains once the loan is closed and repaid
pub fn release_collateral<V: ValueTransfer + ?Sized>(
    borrower: &mut Borrower,
    caller: &Address,
    custody: &mut V,
    events: &mut EventStore,
) -> Result<Coin> {
    authorize(Operation::ReleaseCollateral, caller, Entity::Borrower(borrower))?;
    if borrower.active {
        return Err(LedgerError::LoanStillOpen);
    }
    if !borrower.outstanding_obligation.is_zero() {
        return Err(LedgerError::ObligationOutstanding {
            outstanding: borrower.outstanding_obligation,
        });
    }

    let amount = borrower.escrow_balance();
    let coin = custody.withdraw(&mut borrower.escrow_balance, amount)?;

    info!(borrower_id = %borrower.id, amount = %amount, "collateral released");
    events.emit(LedgerEvent::EscrowWithdrawn {
        borrower_id: borrower.id,
        amount,
        new_balance: Money::ZERO,
    });

    Ok(coin)
}

/// lender records a new credit score for the borrower
pub fn update_credit_score(
    borrower: &mut Borrower,
    loan: &Loan,
    score: u32,
    caller: &Address,
    events: &mut EventStore,
) -> Result<CreditTier> {
    authorize(
        Operation::UpdateCreditScore,
        caller,
        Entity::Position { loan, borrower },
    )?;
    loan.ensure_borrower(borrower)?;

    let old_score = borrower.credit_score;
    borrower.credit_score = score;

    info!(borrower_id = %borrower.id, old_score, new_score = score, "credit score updated");
    events.emit(LedgerEvent::CreditScoreUpdated {
        borrower_id: borrower.id,
        old_score,
        new_score: score,
    });

    Ok(borrower.credit_tier())
}
