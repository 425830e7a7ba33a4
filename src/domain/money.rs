//! Money types
//!
//! Domain primitives for VND amounts. VND has no minor unit, so every value is a
//! whole number of dong. Amounts are validated at construction time, ensuring
//! invalid values cannot exist in the system.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum allowed amount or balance (1 trillion VND)
const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amount represents a validated, strictly positive sum of dong.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum value is 1 trillion VND
///
/// # Example
/// ```
/// use shopfront::domain::Amount;
///
/// let amount = Amount::new(50_000).unwrap();
/// assert_eq!(amount.value(), 50_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating or combining money values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance cannot be negative (got {0})")]
    Negative(i64),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `MoneyError::NotPositive` if value <= 0
    /// - `MoneyError::Overflow` if value > 1 trillion
    pub fn new(value: i64) -> Result<Self, MoneyError> {
        if value <= 0 {
            return Err(MoneyError::NotPositive(value));
        }
        if value > MAX_AMOUNT {
            return Err(MoneyError::Overflow);
        }
        Ok(Self(value))
    }

    /// Create an Amount from a decimal, rounding half away from zero to whole dong.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let whole = rounded.to_i64().ok_or(MoneyError::Overflow)?;
        Self::new(whole)
    }

    /// Get the underlying value in dong.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Get the value as a Decimal for percentage arithmetic.
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Add another amount, failing on overflow.
    pub fn try_add(&self, other: &Amount) -> Result<Amount, MoneyError> {
        let sum = self.0.checked_add(other.0).ok_or(MoneyError::Overflow)?;
        Amount::new(sum)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} VND", self.0)
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| MoneyError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance represents an account balance (zero or positive).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: i64) -> Result<Self, MoneyError> {
        if value < 0 {
            return Err(MoneyError::Negative(value));
        }
        if value > MAX_AMOUNT {
            return Err(MoneyError::Overflow);
        }
        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if balance covers the given amount
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, MoneyError> {
        let new_value = self.0.checked_add(amount.value()).ok_or(MoneyError::Overflow)?;
        Balance::new(new_value)
    }

    /// Subtract amount from balance. Never clamps: an overdraft is an error.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, MoneyError> {
        Balance::new(self.0 - amount.value())
    }
}

impl TryFrom<i64> for Balance {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Balance::new(value)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} VND", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
