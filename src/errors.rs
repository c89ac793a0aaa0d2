use thiserror::Error;
use uuid::Uuid;

use crate::money::Money;
use crate::types::{Address, LoanId, Timestamp};

/// broad category of a ledger failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// caller is not the designated lender or borrower
    Authorization,
    /// malformed request parameters
    Validation,
    /// operation invalid for the current lifecycle state
    State,
    /// requested transfer exceeds the available balance
    InsufficientFunds,
    /// record missing from the keyed store
    NotFound,
    /// money arithmetic overflow
    Calculation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller {caller} is not the lender of this loan")]
    NotLender {
        caller: Address,
    },

    #[error("caller {caller} does not own this borrower account")]
    NotBorrower {
        caller: Address,
    },

    #[error("a borrower may not update their own credit score")]
    SelfScoring,

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: u64,
    },

    #[error("invalid term length: {months} months")]
    InvalidTermLength {
        months: u32,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("principal {principal} exceeds declared asset value {asset_value}")]
    PrincipalExceedsAssetValue {
        principal: Money,
        asset_value: Money,
    },

    #[error("principal can only be topped up before acceptance")]
    TopUpAfterAcceptance,

    #[error("payment of {requested} exceeds outstanding obligation {outstanding}")]
    PaymentExceedsObligation {
        outstanding: Money,
        requested: Money,
    },

    #[error("record belongs to loan {found}, expected {expected}")]
    LoanMismatch {
        expected: LoanId,
        found: LoanId,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan already paid off")]
    LoanAlreadyPaidOff,

    #[error("loan not due: due at {due_date}, now {now}")]
    LoanNotDue {
        due_date: Timestamp,
        now: Timestamp,
    },

    #[error("loan already has a borrower")]
    BorrowerAlreadyAssigned,

    #[error("loan has no borrower")]
    NoBorrower,

    #[error("loan is still open")]
    LoanStillOpen,

    #[error("overdue penalty already claimed through {claimed_through}")]
    PenaltyAlreadyClaimed {
        claimed_through: Timestamp,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },

    #[error("collateral {collateral} does not cover principal {principal}")]
    InsufficientCollateral {
        collateral: Money,
        principal: Money,
    },

    #[error("withdrawal of {requested} must stay below outstanding obligation {outstanding}")]
    WithdrawalExceedsObligation {
        outstanding: Money,
        requested: Money,
    },

    #[error("obligation of {outstanding} is still outstanding")]
    ObligationOutstanding {
        outstanding: Money,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("borrower not found: {id}")]
    BorrowerNotFound {
        id: Uuid,
    },

    #[error("lender not found: {id}")]
    LenderNotFound {
        id: Uuid,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            NotLender { .. } | NotBorrower { .. } | SelfScoring => ErrorKind::Authorization,
            InvalidInterestRate { .. }
            | InvalidTermLength { .. }
            | InvalidAmount { .. }
            | PrincipalExceedsAssetValue { .. }
            | TopUpAfterAcceptance
            | PaymentExceedsObligation { .. }
            | LoanMismatch { .. }
            | InvalidConfiguration { .. } => ErrorKind::Validation,
            LoanAlreadyPaidOff
            | LoanNotDue { .. }
            | BorrowerAlreadyAssigned
            | NoBorrower
            | LoanStillOpen
            | PenaltyAlreadyClaimed { .. } => ErrorKind::State,
            InsufficientFunds { .. }
            | InsufficientCollateral { .. }
            | WithdrawalExceedsObligation { .. }
            | ObligationOutstanding { .. } => ErrorKind::InsufficientFunds,
            LoanNotFound { .. } | BorrowerNotFound { .. } | LenderNotFound { .. } => {
                ErrorKind::NotFound
            }
            CalculationError { .. } => ErrorKind::Calculation,
        }
    }

    pub(crate) fn overflow(what: &str) -> Self {
        LedgerError::CalculationError {
            message: format!("{} overflowed", what),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
