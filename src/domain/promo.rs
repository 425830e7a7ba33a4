//! Promo codes
//!
//! A promo code boosts the value credited by a top-up card. Codes are stored
//! upper-case and matched case-insensitively.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, DomainError};

/// Usage cap applied when the admin leaves it blank
pub const DEFAULT_MAX_USAGE: u32 = 100;

/// Largest percentage bonus accepted
const MAX_PERCENTAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (1..=100) or a fixed number of dong
    pub value: i64,
    pub used_count: u32,
    pub max_usage: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when adding a promo code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(default)]
    pub max_usage: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Normalize user input to the stored key form.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromoCode {
    pub fn create(input: NewPromoCode) -> Result<Self, DomainError> {
        let code = normalize_code(&input.code);
        if code.is_empty() || code.len() > 32 {
            return Err(DomainError::validation("promo code must be 1-32 characters"));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(DomainError::validation(
                "promo code may only contain letters, digits, '-' and '_'",
            ));
        }

        match input.discount_type {
            DiscountType::Percentage if !(1..=MAX_PERCENTAGE).contains(&input.value) => {
                return Err(DomainError::validation(format!(
                    "percentage must be between 1 and {MAX_PERCENTAGE}"
                )));
            }
            DiscountType::Fixed => {
                Amount::new(input.value)?;
            }
            _ => {}
        }

        let max_usage = input.max_usage.filter(|m| *m > 0).unwrap_or(DEFAULT_MAX_USAGE);

        Ok(Self {
            code,
            discount_type: input.discount_type,
            value: input.value,
            used_count: 0,
            max_usage,
            expires_at: input.expires_at,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_usage
    }

    /// Active, not expired and under its usage cap.
    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && !self.is_exhausted()
    }

    /// Value credited for a card of face value `base` with this promo applied.
    pub fn boosted_amount(&self, base: &Amount) -> Result<Amount, DomainError> {
        let amount = match self.discount_type {
            DiscountType::Percentage => {
                let factor = Decimal::ONE + Decimal::from(self.value) / Decimal::ONE_HUNDRED;
                Amount::from_decimal(base.as_decimal() * factor)?
            }
            DiscountType::Fixed => base.try_add(&Amount::new(self.value)?)?,
        };
        Ok(amount)
    }

    /// Return a copy with one more use recorded.
    pub fn with_use_recorded(&self) -> Self {
        Self {
            used_count: self.used_count + 1,
            ..self.clone()
        }
    }

    pub fn toggled(&self) -> Self {
        Self {
            is_active: !self.is_active,
            ..self.clone()
        }
    }
}

/// Outcome of looking up an optional promo code for a top-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoQuote {
    pub amount: Amount,
    /// The promo as it should be persisted, when one applied
    pub applied: Option<PromoCode>,
}

/// Compute the credited amount for `base`. Validity is checked before any
/// arithmetic; an absent or inapplicable promo yields `base` unchanged.
pub fn quote(
    base: Amount,
    promo: Option<&PromoCode>,
    now: DateTime<Utc>,
) -> Result<PromoQuote, DomainError> {
    match promo {
        Some(promo) if promo.is_applicable(now) => Ok(PromoQuote {
            amount: promo.boosted_amount(&base)?,
            applied: Some(promo.with_use_recorded()),
        }),
        _ => Ok(PromoQuote {
            amount: base,
            applied: None,
        }),
    }
}
