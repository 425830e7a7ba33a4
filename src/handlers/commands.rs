//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::{CardProvider, Role, TransactionStatus, WithdrawMethod};

/// Command to buy one unit of a product with the buyer's balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCommand {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

impl PurchaseCommand {
    pub fn new(user_id: Uuid, product_id: Uuid) -> Self {
        Self {
            user_id,
            product_id,
        }
    }
}

/// Command to redeem a top-up card into the user's balance.
///
/// Carries the raw PIN, so it is neither serialized nor printed.
#[derive(Clone)]
pub struct TopUpCommand {
    pub user_id: Uuid,
    pub provider: CardProvider,
    pub card_value: i64,
    pub serial: String,
    pub pin: String,
    pub promo_code: Option<String>,
}

impl TopUpCommand {
    pub fn new(
        user_id: Uuid,
        provider: CardProvider,
        card_value: i64,
        serial: String,
        pin: String,
    ) -> Self {
        Self {
            user_id,
            provider,
            card_value,
            serial,
            pin,
            promo_code: None,
        }
    }

    pub fn with_promo_code(mut self, promo_code: String) -> Self {
        self.promo_code = Some(promo_code);
        self
    }
}

impl fmt::Debug for TopUpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopUpCommand")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("card_value", &self.card_value)
            .field("pin", &"[REDACTED]")
            .field("promo_code", &self.promo_code)
            .finish()
    }
}

/// Result of a successful purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub balance: i64,
    pub remaining_stock: u32,
}

/// Result of a card redemption. A declined card is a result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpResult {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
    pub card_value: i64,
    /// Amount added to the balance (0 when declined)
    pub credited: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_applied: Option<String>,
    pub balance: i64,
}

/// Owner change to another user's role or active flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserCommand {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateUserCommand {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none()
    }
}

/// Owner payout request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub amount: i64,
    pub method: WithdrawMethod,
    pub account_info: String,
    pub account_name: String,
}

/// Figures shown on the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Sum of all successful transactions
    pub total_income: i64,
    /// Successful product sales
    pub total_sales: u64,
    pub total_users: u64,
    pub pending_transactions: u64,
    pub total_topups: i64,
}
