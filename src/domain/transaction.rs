//! Ledger transactions
//!
//! Every monetary action appends exactly one record. Records are never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Amount, CardProvider, DomainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// What the transaction was for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Topup {
        provider: CardProvider,
        /// Face value of the card before any promo
        card_value: Amount,
        masked_serial: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        promo_code: Option<String>,
    },
    Product {
        product_id: Uuid,
        product_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: TransactionKind,
    /// Balance effect: credited for top-ups, debited for purchases
    pub amount: Amount,
    pub user_id: Uuid,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        amount: Amount,
        user_id: Uuid,
        status: TransactionStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            user_id,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn is_topup(&self) -> bool {
        matches!(self.kind, TransactionKind::Topup { .. })
    }

    pub fn is_product_sale(&self) -> bool {
        matches!(self.kind, TransactionKind::Product { .. })
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_flat_with_type_tag() {
        let tx = Transaction::new(
            TransactionKind::Product {
                product_id: Uuid::nil(),
                product_name: "Roblox VIP".to_string(),
            },
            Amount::new(50_000).unwrap(),
            Uuid::nil(),
            TransactionStatus::Success,
        );

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["product_name"], "Roblox VIP");
        assert_eq!(json["amount"], 50_000);
        assert_eq!(json["status"], "success");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_topup_omits_missing_promo() {
        let tx = Transaction::new(
            TransactionKind::Topup {
                provider: CardProvider::Viettel,
                card_value: Amount::new(10_000).unwrap(),
                masked_serial: "*******4567".to_string(),
                promo_code: None,
            },
            Amount::new(10_000).unwrap(),
            Uuid::nil(),
            TransactionStatus::Failed,
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "topup");
        assert!(json.get("promo_code").is_none());
        assert!(tx.is_topup());
        assert!(!tx.is_success());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("pending".parse::<TransactionStatus>().unwrap(), TransactionStatus::Pending);
        assert!("done".parse::<TransactionStatus>().is_err());
    }
}
