use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::money::Rate;

/// longest month a configuration may use when converting terms to time
pub const MAX_MONTH_LENGTH_DAYS: u32 = 31;

/// how an overdue penalty is derived from the overdue window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyFormula {
    /// `monthly_payment * overdue_days / days_per_month`
    MonthlyPaymentPerDay { days_per_month: u32 },
    /// `escrow_balance * daily_rate_bps / 10_000 * overdue_days`
    EscrowRatePerDay { daily_rate_bps: u32 },
}

impl Default for PenaltyFormula {
    fn default() -> Self {
        PenaltyFormula::MonthlyPaymentPerDay { days_per_month: 30 }
    }
}

/// whether the same overdue window may be claimed more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverdueClaimPolicy {
    /// every claim re-derives the penalty from the full overdue window
    #[default]
    Repeatable,
    /// claims only cover whole days not yet claimed
    OncePerWindow,
}

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub penalty_formula: PenaltyFormula,
    pub overdue_claims: OverdueClaimPolicy,
    /// days per term month when converting term length to a due date
    pub month_length_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl LedgerConfig {
    /// payment-based penalty, repeatable claims, 30-day months
    pub fn standard() -> Self {
        Self {
            penalty_formula: PenaltyFormula::default(),
            overdue_claims: OverdueClaimPolicy::Repeatable,
            month_length_days: 30,
        }
    }

    /// standard terms with each overdue day claimable once
    pub fn hardened() -> Self {
        Self {
            overdue_claims: OverdueClaimPolicy::OncePerWindow,
            ..Self::standard()
        }
    }

    /// escrow-based penalty at `daily_rate` per overdue day
    pub fn escrow_rate_penalty(daily_rate: Rate) -> Result<Self> {
        let bps = daily_rate.as_bps();
        if bps.fract() != rust_decimal::Decimal::ZERO {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("penalty rate {} is not a whole number of basis points", daily_rate),
            });
        }
        let daily_rate_bps = bps.to_u32().ok_or_else(|| LedgerError::InvalidConfiguration {
            message: format!("penalty rate {} out of range", daily_rate),
        })?;
        let config = Self {
            penalty_formula: PenaltyFormula::EscrowRatePerDay { daily_rate_bps },
            ..Self::standard()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.month_length_days == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "month_length_days must be positive".to_string(),
            });
        }
        if self.month_length_days > MAX_MONTH_LENGTH_DAYS {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "month_length_days {} exceeds {}",
                    self.month_length_days, MAX_MONTH_LENGTH_DAYS
                ),
            });
        }
        match self.penalty_formula {
            PenaltyFormula::MonthlyPaymentPerDay { days_per_month: 0 } => {
                Err(LedgerError::InvalidConfiguration {
                    message: "days_per_month must be positive".to_string(),
                })
            }
            PenaltyFormula::EscrowRatePerDay { daily_rate_bps: 0 } => {
                Err(LedgerError::InvalidConfiguration {
                    message: "daily_rate_bps must be positive".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// load and validate from json
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
