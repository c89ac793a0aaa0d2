use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{LedgerError, Result};
use crate::money::Money;
use crate::types::Address;

/// a transferable unit of value issued by the custody service
///
/// Coins are not `Clone`; value moves by consuming them.
#[derive(Debug, PartialEq, Eq)]
pub struct Coin {
    value: Money,
}

impl Coin {
    /// issue a coin; only custody implementations should call this
    pub fn new(value: Money) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Money {
        self.value
    }
}

/// value held inside a ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Balance {
    value: Money,
}

impl Balance {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Money {
        self.value
    }

    /// merge a coin into this balance
    pub fn join(&mut self, coin: Coin) -> Result<Money> {
        self.value = self
            .value
            .checked_add(coin.value)
            .ok_or_else(|| LedgerError::overflow("balance"))?;
        Ok(self.value)
    }

    /// take `amount` out of this balance as a coin
    pub fn split(&mut self, amount: Money) -> Result<Coin> {
        let remaining = self
            .value
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                available: self.value,
                requested: amount,
            })?;
        self.value = remaining;
        Ok(Coin::new(amount))
    }

    /// take everything
    pub fn withdraw_all(&mut self) -> Coin {
        let value = std::mem::take(&mut self.value);
        Coin::new(value)
    }
}

/// the money-movement primitives the ledger relies on
pub trait ValueTransfer {
    /// merge `coin` into `balance`, returning the new balance value
    fn deposit(&mut self, balance: &mut Balance, coin: Coin) -> Result<Money>;

    /// split `amount` out of `balance`
    fn withdraw(&mut self, balance: &mut Balance, amount: Money) -> Result<Coin>;

    /// hand `coin` over to `recipient`
    fn transfer(&mut self, coin: Coin, recipient: &Address);
}

/// hand a coin back to its sender and fail with `err`
pub fn refund<T, V: ValueTransfer + ?Sized>(
    custody: &mut V,
    coin: Coin,
    owner: &Address,
    err: LedgerError,
) -> Result<T> {
    debug!(owner = %owner, amount = %coin.value(), error = %err, "refunding rejected coin");
    custody.transfer(coin, owner);
    Err(err)
}

/// a completed transfer to an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub recipient: Address,
    pub amount: Money,
}

/// in-process custody: mints coins and keeps per-address wallets
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    wallets: HashMap<Address, Money>,
    transfers: Vec<TransferRecord>,
    minted: Money,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// issue a fresh coin
    ///
    /// The minted total is a running statistic and caps at `u64::MAX`.
    pub fn mint(&mut self, amount: Money) -> Coin {
        if self.minted.checked_add(amount).is_none() {
            debug!(minted = %self.minted, amount = %amount, "minted total saturated");
        }
        self.minted = self.minted.saturating_add(amount);
        Coin::new(amount)
    }

    /// total value received by `owner`
    pub fn wallet(&self, owner: &Address) -> Money {
        self.wallets.get(owner).copied().unwrap_or(Money::ZERO)
    }

    /// take a coin out of an owner's wallet
    pub fn take(&mut self, owner: &Address, amount: Money) -> Result<Coin> {
        let available = self.wallet(owner);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                available,
                requested: amount,
            })?;
        self.wallets.insert(owner.clone(), remaining);
        Ok(Coin::new(amount))
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    pub fn total_minted(&self) -> Money {
        self.minted
    }
}

impl ValueTransfer for InMemoryCustody {
    fn deposit(&mut self, balance: &mut Balance, coin: Coin) -> Result<Money> {
        balance.join(coin)
    }

    fn withdraw(&mut self, balance: &mut Balance, amount: Money) -> Result<Coin> {
        balance.split(amount)
    }

    /// wallet balances cap at `u64::MAX`; the transfer log keeps every amount
    fn transfer(&mut self, coin: Coin, recipient: &Address) {
        let amount = coin.value();
        let wallet = self.wallets.entry(recipient.clone()).or_insert(Money::ZERO);
        if wallet.checked_add(amount).is_none() {
            debug!(recipient = %recipient, wallet = %wallet, amount = %amount, "wallet balance saturated");
        }
        *wallet = wallet.saturating_add(amount);
        debug!(recipient = %recipient, amount = %amount, "custody transfer");
        self.transfers.push(TransferRecord {
            recipient: recipient.clone(),
            amount,
        });
    }
}
