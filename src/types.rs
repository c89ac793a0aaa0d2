use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a borrower position
pub type BorrowerId = Uuid;

/// unique identifier for a lender position
pub type LenderId = Uuid;

/// milliseconds since the unix epoch
pub type Timestamp = i64;

/// opaque caller identity supplied by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(identity: impl Into<String>) -> Self {
        Address(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

/// lifecycle position of a loan, derived from its fields and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// funded by the lender, no borrower yet
    Originated,
    /// accepted and within term
    Active,
    /// past the due date and not paid off
    Overdue,
    /// closed
    PaidOff,
}

/// borrower credit tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreditTier {
    Tier0,
    Tier1,
    Tier2,
    Tier3,
}

impl CreditTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=200 => CreditTier::Tier0,
            201..=500 => CreditTier::Tier1,
            501..=800 => CreditTier::Tier2,
            _ => CreditTier::Tier3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_tier_boundaries() {
        assert_eq!(CreditTier::from_score(0), CreditTier::Tier0);
        assert_eq!(CreditTier::from_score(200), CreditTier::Tier0);
        assert_eq!(CreditTier::from_score(201), CreditTier::Tier1);
        assert_eq!(CreditTier::from_score(800), CreditTier::Tier2);
        assert_eq!(CreditTier::from_score(801), CreditTier::Tier3);
    }

    #[test]
    fn test_address_serializes_as_plain_string() {
        let addr = Address::new("0xlender");
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"0xlender\"");
        assert_eq!(addr.to_string(), "0xlender");
    }
}
