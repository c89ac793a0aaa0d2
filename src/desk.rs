/// id-keyed facade over the ledger
use tracing::debug;

use crate::config::LedgerConfig;
use crate::custody::{refund, Coin, ValueTransfer};
use crate::errors::Result;
use crate::escrow::{self, Borrower};
use crate::events::{EventStore, LedgerEvent};
use crate::loan::{self, Loan, LoanTerms};
use crate::money::Money;
use crate::payments::{AmortizationSchedule, OverdueClaim, PaymentEngine, PaymentReceipt};
use crate::store::LoanStore;
use crate::time::Clock;
use crate::types::{Address, BorrowerId, CreditTier, LoanId, Timestamp};
use crate::views::LoanView;

/// loan desk tying config, storage, custody and the event log together
pub struct LoanDesk<S: LoanStore, V: ValueTransfer> {
    config: LedgerConfig,
    store: S,
    custody: V,
    events: EventStore,
    payments: PaymentEngine,
}

impl<S: LoanStore, V: ValueTransfer> LoanDesk<S, V> {
    pub fn new(config: LedgerConfig, store: S, custody: V) -> Result<Self> {
        config.validate()?;
        let payments = PaymentEngine::new(config.clone());
        Ok(Self {
            config,
            store,
            custody,
            events: EventStore::new(),
            payments,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn custody(&self) -> &V {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut V {
        &mut self.custody
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        self.events.take_events()
    }

    // --- lifecycle ---

    /// originate a loan funded by `principal`
    pub fn originate(
        &mut self,
        lender: &Address,
        terms: LoanTerms,
        principal: Coin,
        clock: &impl Clock,
    ) -> Result<LoanId> {
        let (position, loan) = loan::originate(
            lender,
            terms,
            principal,
            clock,
            &mut self.custody,
            &mut self.events,
        )?;
        let id = loan.id();
        self.store.save_loan(loan);
        self.store.save_lender(position);
        Ok(id)
    }

    pub fn top_up(&mut self, loan_id: LoanId, coin: Coin, caller: &Address) -> Result<Money> {
        let (mut loan, mut lender) = match self
            .store
            .loan(loan_id)
            .and_then(|loan| Ok((loan, self.store.lender_for_loan(loan_id)?)))
        {
            Ok(records) => records,
            Err(e) => return refund(&mut self.custody, coin, caller, e),
        };

        let principal = loan::top_up(
            &mut loan,
            &mut lender,
            coin,
            caller,
            &mut self.custody,
            &mut self.events,
        )?;
        self.store.save_loan(loan);
        self.store.save_lender(lender);
        Ok(principal)
    }

    /// accept a loan, returning the new borrower id
    pub fn accept(
        &mut self,
        loan_id: LoanId,
        collateral: Coin,
        caller: &Address,
    ) -> Result<BorrowerId> {
        let mut loan = match self.store.loan(loan_id) {
            Ok(loan) => loan,
            Err(e) => return refund(&mut self.custody, collateral, caller, e),
        };

        let borrower = loan::accept(
            &mut loan,
            collateral,
            caller,
            &mut self.custody,
            &mut self.events,
        )?;
        let id = borrower.id();
        self.store.save_loan(loan);
        self.store.save_borrower(borrower);
        Ok(id)
    }

    pub fn close(
        &mut self,
        borrower_id: BorrowerId,
        caller: &Address,
        clock: &impl Clock,
    ) -> Result<Timestamp> {
        let (mut borrower, mut loan) = self.position(borrower_id)?;
        let closed_at = loan::close(&mut loan, &mut borrower, caller, clock, &mut self.events)?;
        self.commit(borrower, loan);
        Ok(closed_at)
    }

    // --- payments ---

    pub fn make_payment(
        &mut self,
        borrower_id: BorrowerId,
        amount: Money,
        caller: &Address,
        clock: &impl Clock,
    ) -> Result<PaymentReceipt> {
        let (mut borrower, mut loan) = self.position(borrower_id)?;
        let receipt = self.payments.make_payment(
            &mut borrower,
            &mut loan,
            amount,
            caller,
            clock,
            &mut self.custody,
            &mut self.events,
        )?;
        self.commit(borrower, loan);
        Ok(receipt)
    }

    pub fn claim_overdue(
        &mut self,
        borrower_id: BorrowerId,
        caller: &Address,
        clock: &impl Clock,
    ) -> Result<OverdueClaim> {
        let (mut borrower, mut loan) = self.position(borrower_id)?;
        let claim = self.payments.claim_overdue(
            &mut borrower,
            &mut loan,
            caller,
            clock,
            &mut self.custody,
            &mut self.events,
        )?;
        self.commit(borrower, loan);
        Ok(claim)
    }

    // --- escrow ---

    pub fn deposit_escrow(
        &mut self,
        borrower_id: BorrowerId,
        coin: Coin,
        caller: &Address,
    ) -> Result<Money> {
        let mut borrower = match self.store.borrower(borrower_id) {
            Ok(borrower) => borrower,
            Err(e) => return refund(&mut self.custody, coin, caller, e),
        };
        let balance = escrow::deposit(&mut borrower, coin, caller, &mut self.custody, &mut self.events)?;
        self.store.save_borrower(borrower);
        Ok(balance)
    }

    pub fn withdraw_escrow(
        &mut self,
        borrower_id: BorrowerId,
        amount: Money,
        caller: &Address,
    ) -> Result<Coin> {
        let mut borrower = self.store.borrower(borrower_id)?;
        let coin = escrow::withdraw(&mut borrower, amount, caller, &mut self.custody, &mut self.events)?;
        self.store.save_borrower(borrower);
        Ok(coin)
    }

    pub fn release_collateral(&mut self, borrower_id: BorrowerId, caller: &Address) -> Result<Coin> {
        let mut borrower = self.store.borrower(borrower_id)?;
        let coin =
            escrow::release_collateral(&mut borrower, caller, &mut self.custody, &mut self.events)?;
        self.store.save_borrower(borrower);
        Ok(coin)
    }

    pub fn update_credit_score(
        &mut self,
        borrower_id: BorrowerId,
        score: u32,
        caller: &Address,
    ) -> Result<CreditTier> {
        let (mut borrower, loan) = self.position(borrower_id)?;
        let tier = escrow::update_credit_score(&mut borrower, &loan, score, caller, &mut self.events)?;
        self.store.save_borrower(borrower);
        Ok(tier)
    }

    // --- read accessors ---

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store.loan(loan_id)
    }

    pub fn borrower(&self, borrower_id: BorrowerId) -> Result<Borrower> {
        self.store.borrower(borrower_id)
    }

    pub fn principal_balance(&self, loan_id: LoanId) -> Result<Money> {
        Ok(self.store.loan(loan_id)?.principal_balance())
    }

    pub fn monthly_payment(&self, loan_id: LoanId) -> Result<Money> {
        Ok(self.store.loan(loan_id)?.monthly_payment())
    }

    pub fn term_start(&self, loan_id: LoanId) -> Result<Timestamp> {
        Ok(self.store.loan(loan_id)?.term_start())
    }

    pub fn term_end(&self, loan_id: LoanId) -> Result<Option<Timestamp>> {
        Ok(self.store.loan(loan_id)?.term_end())
    }

    pub fn is_paid_off(&self, loan_id: LoanId) -> Result<bool> {
        Ok(self.store.loan(loan_id)?.is_paid_off())
    }

    pub fn lender_address(&self, loan_id: LoanId) -> Result<Address> {
        Ok(self.store.loan(loan_id)?.lender().clone())
    }

    /// owner of the accepting borrower account, if any
    pub fn borrower_address(&self, loan_id: LoanId) -> Result<Option<Address>> {
        match self.store.loan(loan_id)?.borrower() {
            Some(id) => Ok(Some(self.store.borrower(id)?.owner().clone())),
            None => Ok(None),
        }
    }

    pub fn view(&self, loan_id: LoanId, clock: &impl Clock) -> Result<LoanView> {
        let loan = self.store.loan(loan_id)?;
        let lender = self.store.lender_for_loan(loan_id)?;
        let borrower = match loan.borrower() {
            Some(id) => Some(self.store.borrower(id)?),
            None => None,
        };
        Ok(LoanView::build(
            &loan,
            &lender,
            borrower.as_ref(),
            clock.now_ms(),
            self.config.month_length_days,
        ))
    }

    pub fn schedule(&self, loan_id: LoanId) -> Result<AmortizationSchedule> {
        let loan = self.store.loan(loan_id)?;
        AmortizationSchedule::project(
            loan.id(),
            loan.monthly_payment(),
            loan.term_length(),
            loan.term_start(),
            self.config.month_length_days,
        )
    }

    // --- internals ---

    /// borrower and the loan it is bound to
    fn position(&self, borrower_id: BorrowerId) -> Result<(Borrower, Loan)> {
        let borrower = self.store.borrower(borrower_id)?;
        let loan = self.store.loan(borrower.loan()).map_err(|e| {
            debug!(borrower_id = %borrower_id, error = %e, "borrower references a missing loan");
            e
        })?;
        Ok((borrower, loan))
    }

    fn commit(&mut self, borrower: Borrower, loan: Loan) {
        self.store.save_borrower(borrower);
        self.store.save_loan(loan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::InMemoryCustody;
    use crate::errors::{ErrorKind, LedgerError};
    use crate::store::InMemoryStore;
    use uuid::Uuid;

    fn desk() -> LoanDesk<InMemoryStore, InMemoryCustody> {
        LoanDesk::new(LedgerConfig::standard(), InMemoryStore::new(), InMemoryCustody::new())
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LedgerConfig {
            month_length_days: 0,
            ..LedgerConfig::standard()
        };
        let result = LoanDesk::new(config, InMemoryStore::new(), InMemoryCustody::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_loan_refunds_collateral() {
        let mut desk = desk();
        let caller = Address::new("owner");
        let coin = desk.custody_mut().mint(Money::new(700));

        let id = Uuid::new_v4();
        let err = desk.accept(id, coin, &caller).unwrap_err();

        assert_eq!(err, LedgerError::LoanNotFound { id });
        assert_eq!(desk.custody().wallet(&caller), Money::new(700));
    }

    #[test]
    fn test_failed_operation_leaves_store_untouched() {
        let mut desk = desk();
        let lender = Address::new("lender");
        let owner = Address::new("owner");

        let coin = desk.custody_mut().mint(Money::new(1_000));
        let loan_id = desk
            .originate(&lender, LoanTerms::new("car", Money::new(1_000), 10, 10), coin, &0i64)
            .unwrap();
        let collateral = desk.custody_mut().mint(Money::new(1_000));
        let borrower_id = desk.accept(loan_id, collateral, &owner).unwrap();
        let before = (desk.loan(loan_id).unwrap(), desk.borrower(borrower_id).unwrap());

        let err = desk.make_payment(borrower_id, Money::new(5_000), &owner, &0i64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            (desk.loan(loan_id).unwrap(), desk.borrower(borrower_id).unwrap()),
            before
        );
    }

    #[test]
    fn test_accessors() {
        let mut desk = desk();
        let lender = Address::new("lender");
        let owner = Address::new("owner");

        let coin = desk.custody_mut().mint(Money::new(1_200));
        let loan_id = desk
            .originate(&lender, LoanTerms::new("roof", Money::new(2_000), 12, 12), coin, &42i64)
            .unwrap();

        assert_eq!(desk.principal_balance(loan_id).unwrap(), Money::new(1_200));
        assert_eq!(desk.monthly_payment(loan_id).unwrap(), Money::new(101));
        assert_eq!(desk.term_start(loan_id).unwrap(), 42);
        assert_eq!(desk.term_end(loan_id).unwrap(), None);
        assert_eq!(desk.lender_address(loan_id).unwrap(), lender);
        assert_eq!(desk.borrower_address(loan_id).unwrap(), None);

        let collateral = desk.custody_mut().mint(Money::new(1_200));
        desk.accept(loan_id, collateral, &owner).unwrap();
        assert_eq!(desk.borrower_address(loan_id).unwrap(), Some(owner));
        assert_eq!(desk.principal_balance(loan_id).unwrap(), Money::ZERO);
        assert_eq!(desk.schedule(loan_id).unwrap().payments.len(), 12);
    }
}
