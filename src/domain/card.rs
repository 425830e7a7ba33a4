//! Top-up cards
//!
//! Prepaid mobile cards that are converted into account balance. Each provider
//! prints serials and PINs of fixed digit lengths.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Amount, DomainError};

/// Face values printed on cards, in dong
pub const DENOMINATIONS: [i64; 6] = [10_000, 20_000, 50_000, 100_000, 200_000, 500_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardProvider {
    Viettel,
    Vinaphone,
    Mobifone,
    Vietnamobile,
}

impl CardProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardProvider::Viettel => "viettel",
            CardProvider::Vinaphone => "vinaphone",
            CardProvider::Mobifone => "mobifone",
            CardProvider::Vietnamobile => "vietnamobile",
        }
    }

    fn serial_len_ok(&self, len: usize) -> bool {
        match self {
            CardProvider::Viettel => len == 11 || len == 14,
            CardProvider::Vinaphone => len == 14,
            CardProvider::Mobifone => len == 15,
            CardProvider::Vietnamobile => (11..=16).contains(&len),
        }
    }

    fn pin_len_ok(&self, len: usize) -> bool {
        match self {
            CardProvider::Viettel => len == 13 || len == 15,
            CardProvider::Vinaphone => len == 14,
            CardProvider::Mobifone => len == 12,
            CardProvider::Vietnamobile => len == 12,
        }
    }
}

impl fmt::Display for CardProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card that passed the provider's format check.
///
/// Deliberately not `Serialize`: the PIN must never reach storage or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TopUpCard {
    provider: CardProvider,
    value: Amount,
    serial: String,
    pin: String,
}

impl TopUpCard {
    /// Validate raw card input. Whitespace inside the serial and PIN is ignored.
    pub fn parse(
        provider: CardProvider,
        value: i64,
        serial: &str,
        pin: &str,
    ) -> Result<Self, DomainError> {
        if !DENOMINATIONS.contains(&value) {
            return Err(DomainError::InvalidCard(format!(
                "unsupported card value {value}"
            )));
        }

        let serial = strip_whitespace(serial);
        let pin = strip_whitespace(pin);

        if !is_digits(&serial) || !provider.serial_len_ok(serial.len()) {
            return Err(DomainError::InvalidCard(format!(
                "serial does not match {provider} format"
            )));
        }
        if !is_digits(&pin) || !provider.pin_len_ok(pin.len()) {
            return Err(DomainError::InvalidCard(format!(
                "PIN does not match {provider} format"
            )));
        }

        Ok(Self {
            provider,
            value: Amount::new(value)?,
            serial,
            pin,
        })
    }

    pub fn provider(&self) -> CardProvider {
        self.provider
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// Serial with all but the last four digits hidden.
    pub fn masked_serial(&self) -> String {
        let visible = self.serial.len().saturating_sub(4);
        format!("{}{}", "*".repeat(visible), &self.serial[visible..])
    }
}

impl fmt::Debug for TopUpCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopUpCard")
            .field("provider", &self.provider)
            .field("value", &self.value)
            .field("serial", &self.masked_serial())
            .field("pin", &"[REDACTED]")
            .finish()
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
