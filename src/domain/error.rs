//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::MoneyError;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/infrastructure layer. None of them leave
/// state mutated: every check runs before the commit.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Balance does not cover the purchase price
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Product has no stock left
    #[error("Product is out of stock: {0}")]
    OutOfStock(String),

    /// Product exists but is not on sale
    #[error("Product is not available: {0}")]
    ProductUnavailable(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    /// User account is locked by an administrator
    #[error("User account is disabled")]
    UserInactive,

    #[error("Promo code not found: {0}")]
    PromoNotFound(String),

    #[error("Promo code already exists: {0}")]
    PromoAlreadyExists(String),

    #[error("Withdrawal request not found: {0}")]
    WithdrawalNotFound(String),

    #[error("Withdrawal request already settled: {0}")]
    WithdrawalAlreadySettled(String),

    /// Top-up card failed the provider format check
    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Input failed a shape or range check
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: i64, available: i64) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a missing-resource error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound(_)
                | Self::UserNotFound(_)
                | Self::PromoNotFound(_)
                | Self::WithdrawalNotFound(_)
        )
    }

    /// Check if this is a uniqueness or state conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::PromoAlreadyExists(_)
                | Self::UsernameTaken(_)
                | Self::EmailTaken(_)
                | Self::WithdrawalAlreadySettled(_)
        )
    }
}
