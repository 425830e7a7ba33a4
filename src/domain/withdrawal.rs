//! Owner payout requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, DomainError, TransactionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawMethod {
    Bank,
    Momo,
    Zalopay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub amount: Amount,
    pub method: WithdrawMethod,
    /// Bank account number or wallet phone number
    pub account_info: String,
    pub account_name: String,
    pub status: TransactionStatus,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    pub fn create(
        amount: i64,
        method: WithdrawMethod,
        account_info: &str,
        account_name: &str,
        requested_by: Uuid,
    ) -> Result<Self, DomainError> {
        let account_info = account_info.trim();
        let account_name = account_name.trim();
        if account_info.is_empty() || account_name.is_empty() {
            return Err(DomainError::validation(
                "account info and account name are required",
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            amount: Amount::new(amount)?,
            method,
            account_info: account_info.to_string(),
            account_name: account_name.to_string(),
            status: TransactionStatus::Pending,
            requested_by,
            created_at: Utc::now(),
            settled_at: None,
        })
    }

    /// Mark a pending request as paid out or rejected. Settles once.
    pub fn settle(&self, outcome: TransactionStatus) -> Result<Self, DomainError> {
        if self.status != TransactionStatus::Pending {
            return Err(DomainError::WithdrawalAlreadySettled(self.id.to_string()));
        }
        if outcome == TransactionStatus::Pending {
            return Err(DomainError::validation("settlement must be success or failed"));
        }
        Ok(Self {
            status: outcome,
            settled_at: Some(Utc::now()),
            ..self.clone()
        })
    }
}
