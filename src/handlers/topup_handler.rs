//! Top-up Handler
//!
//! Redeems a prepaid card into account balance, applying a promo code when
//! one is supplied and still valid.

use chrono::Utc;

use crate::domain::promo::{normalize_code, quote};
use crate::domain::{
    DomainError, OperationContext, PromoCode, TopUpCard, Transaction, TransactionKind,
    TransactionStatus, User,
};
use crate::error::AppError;
use crate::gateway::{SimulatedGateway, Verdict};
use crate::store::{Store, Versioned, WriteOp};

use super::retry::retry_on_conflict;
use super::{TopUpCommand, TopUpResult};

/// Handler for card redemption
pub struct TopUpHandler {
    store: Store,
    gateway: SimulatedGateway,
}

impl TopUpHandler {
    pub fn new(store: Store, gateway: SimulatedGateway) -> Self {
        Self { store, gateway }
    }

    /// Execute the top-up command
    pub async fn execute(
        &self,
        command: TopUpCommand,
        context: &OperationContext,
    ) -> Result<TopUpResult, AppError> {
        let user = self.load_user(&command).await?;
        user.record.ensure_active()?;

        // Malformed input never reaches the gateway
        let card = TopUpCard::parse(
            command.provider,
            command.card_value,
            &command.serial,
            &command.pin,
        )?;

        match self.gateway.verify(&card).await {
            Verdict::Declined => {
                self.record_uncredited(&card, &user.record, TransactionStatus::Failed, None, context)
                    .await
            }
            Verdict::Approved => {
                let outcome =
                    retry_on_conflict("topup", || self.try_credit(&command, &card)).await;
                self.settle_approved(outcome, &command, &card, &user.record, context)
                    .await
            }
        }
    }

    /// An approved card has been consumed. If the credit could not be
    /// committed it is parked as a pending ledger entry for reconciliation.
    pub(crate) async fn settle_approved(
        &self,
        outcome: Result<TopUpResult, AppError>,
        command: &TopUpCommand,
        card: &TopUpCard,
        user: &User,
        context: &OperationContext,
    ) -> Result<TopUpResult, AppError> {
        match outcome {
            Ok(result) => {
                tracing::info!(
                    user_id = %command.user_id,
                    transaction_id = %result.transaction_id,
                    card_value = result.card_value,
                    credited = result.credited,
                    promo = ?result.promo_applied,
                    correlation_id = ?context.correlation_id,
                    "Top-up credited"
                );
                Ok(result)
            }
            Err(AppError::VersionConflict) => {
                tracing::error!(
                    user_id = %command.user_id,
                    serial = %card.masked_serial(),
                    correlation_id = ?context.correlation_id,
                    "Approved top-up could not be credited, recording as pending"
                );
                let promo = command.promo_code.as_deref().map(normalize_code);
                self.record_uncredited(card, user, TransactionStatus::Pending, promo, context)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn load_user(&self, command: &TopUpCommand) -> Result<Versioned<User>, AppError> {
        Ok(self
            .store
            .get::<User>(&command.user_id.to_string())
            .await?
            .ok_or_else(|| DomainError::UserNotFound(command.user_id.to_string()))?)
    }

    /// Ledger entry for a card that added nothing to the balance: failed
    /// when declined, pending when approved but not yet credited.
    async fn record_uncredited(
        &self,
        card: &TopUpCard,
        user: &User,
        status: TransactionStatus,
        promo_code: Option<String>,
        context: &OperationContext,
    ) -> Result<TopUpResult, AppError> {
        let transaction = Transaction::new(
            TransactionKind::Topup {
                provider: card.provider(),
                card_value: card.value(),
                masked_serial: card.masked_serial(),
                promo_code: promo_code.filter(|c| !c.is_empty()),
            },
            card.value(),
            user.id,
            status,
        );
        self.store.insert(&transaction).await?;

        if status == TransactionStatus::Failed {
            tracing::warn!(
                user_id = %user.id,
                transaction_id = %transaction.id,
                provider = %card.provider(),
                serial = %card.masked_serial(),
                correlation_id = ?context.correlation_id,
                "Top-up card declined"
            );
        }

        Ok(TopUpResult {
            transaction_id: transaction.id,
            status,
            card_value: card.value().value(),
            credited: 0,
            promo_applied: None,
            balance: user.balance.value(),
        })
    }

    async fn try_credit(
        &self,
        command: &TopUpCommand,
        card: &TopUpCard,
    ) -> Result<TopUpResult, AppError> {
        let user = self.load_user(command).await?;

        let promo = match command.promo_code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => self.store.get::<PromoCode>(&code).await?,
            _ => None,
        };

        let quote = quote(card.value(), promo.as_ref().map(|p| &p.record), Utc::now())?;
        if quote.applied.is_none() {
            if let Some(code) = command.promo_code.as_deref().filter(|c| !c.trim().is_empty()) {
                tracing::debug!(promo = %code, "Promo code not applicable, crediting face value");
            }
        }

        let updated_user = user.record.credited(&quote.amount)?;
        let transaction = Transaction::new(
            TransactionKind::Topup {
                provider: card.provider(),
                card_value: card.value(),
                masked_serial: card.masked_serial(),
                promo_code: quote.applied.as_ref().map(|p| p.code.clone()),
            },
            quote.amount,
            updated_user.id,
            TransactionStatus::Success,
        );

        let mut ops = vec![WriteOp::upsert(&updated_user, user.version)?];
        if let (Some(applied), Some(stored)) = (&quote.applied, &promo) {
            ops.push(WriteOp::upsert(applied, stored.version)?);
        }
        ops.push(WriteOp::insert(&transaction)?);

        self.store.commit(ops).await?;

        Ok(TopUpResult {
            transaction_id: transaction.id,
            status: TransactionStatus::Success,
            card_value: card.value().value(),
            credited: quote.amount.value(),
            promo_applied: quote.applied.map(|p| p.code),
            balance: updated_user.balance.value(),
        })
    }
}
