pub mod access;
pub mod config;
pub mod custody;
pub mod desk;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod lender;
pub mod loan;
pub mod money;
pub mod payments;
pub mod store;
pub mod time;
pub mod types;
pub mod views;

// re-export key types
pub use access::{authorize, Entity, Operation, Role};
pub use config::{LedgerConfig, OverdueClaimPolicy, PenaltyFormula};
pub use custody::{Balance, Coin, InMemoryCustody, TransferRecord, ValueTransfer};
pub use desk::LoanDesk;
pub use errors::{ErrorKind, LedgerError, Result};
pub use escrow::Borrower;
pub use events::{EventStore, LedgerEvent};
pub use lender::Lender;
pub use loan::{Loan, LoanTerms};
pub use money::{Money, Rate};
pub use payments::{
    AmortizationSchedule, OverdueAssessment, OverdueClaim, PaymentEngine, PaymentReceipt,
    PenaltyEngine, ScheduledPayment,
};
pub use store::{InMemoryStore, LoanStore};
pub use time::{Clock, MS_PER_DAY};
pub use types::{Address, BorrowerId, CreditTier, LenderId, LoanId, LoanStatus, Timestamp};
pub use views::LoanView;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
