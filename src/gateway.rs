//! Card verification gateway.
//!
//! Stands in for the carrier's card-checking service: answers after a fixed
//! delay, declining any card whose PIN ends in `0`.

use serde::Serialize;
use std::time::Duration;

use crate::domain::TopUpCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Declined,
}

#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn verify(&self, card: &TopUpCard) -> Verdict {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let verdict = if card.pin().ends_with('0') {
            Verdict::Declined
        } else {
            Verdict::Approved
        };

        tracing::debug!(
            provider = %card.provider(),
            serial = %card.masked_serial(),
            verdict = ?verdict,
            "Card verified"
        );
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CardProvider;

    fn card(pin: &str) -> TopUpCard {
        TopUpCard::parse(CardProvider::Mobifone, 100_000, "123456789012345", pin).unwrap()
    }

    #[tokio::test]
    async fn test_verdict_from_last_pin_digit() {
        let gateway = SimulatedGateway::new(Duration::ZERO);
        assert_eq!(gateway.verify(&card("123456789011")).await, Verdict::Approved);
        assert_eq!(gateway.verify(&card("123456789010")).await, Verdict::Declined);
    }

    #[tokio::test]
    async fn test_waits_for_delay() {
        let gateway = SimulatedGateway::new(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        gateway.verify(&card("123456789011")).await;
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
