//! Purchase Handler
//!
//! Buys one unit of a product with the buyer's balance.

use crate::domain::{
    DomainError, OperationContext, Product, Transaction, TransactionKind, TransactionStatus, User,
};
use crate::error::AppError;
use crate::store::{Store, WriteOp};

use super::retry::retry_on_conflict;
use super::{PurchaseCommand, PurchaseResult};

/// Handler for product purchases
pub struct PurchaseHandler {
    store: Store,
}

impl PurchaseHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Execute the purchase command
    ///
    /// Balance, stock and ledger change in one commit, or not at all.
    pub async fn execute(
        &self,
        command: PurchaseCommand,
        context: &OperationContext,
    ) -> Result<PurchaseResult, AppError> {
        let result = retry_on_conflict("purchase", || self.try_execute(&command)).await?;

        tracing::info!(
            user_id = %command.user_id,
            product_id = %command.product_id,
            transaction_id = %result.transaction_id,
            price = result.price,
            correlation_id = ?context.correlation_id,
            "Product purchased"
        );

        Ok(result)
    }

    async fn try_execute(&self, command: &PurchaseCommand) -> Result<PurchaseResult, AppError> {
        let buyer = self
            .store
            .get::<User>(&command.user_id.to_string())
            .await?
            .ok_or_else(|| DomainError::UserNotFound(command.user_id.to_string()))?;
        buyer.record.ensure_active()?;

        let product = self
            .store
            .get::<Product>(&command.product_id.to_string())
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(command.product_id.to_string()))?;
        product.record.ensure_purchasable()?;

        let price = product.record.price;
        let updated_buyer = buyer.record.debited(&price)?;
        let updated_product = product.record.with_one_sold()?;

        let transaction = Transaction::new(
            TransactionKind::Product {
                product_id: updated_product.id,
                product_name: updated_product.name.clone(),
            },
            price,
            updated_buyer.id,
            TransactionStatus::Success,
        );

        self.store
            .commit(vec![
                WriteOp::upsert(&updated_buyer, buyer.version)?,
                WriteOp::upsert(&updated_product, product.version)?,
                WriteOp::insert(&transaction)?,
            ])
            .await?;

        Ok(PurchaseResult {
            transaction_id: transaction.id,
            product_id: updated_product.id,
            product_name: updated_product.name,
            price: price.value(),
            balance: updated_buyer.balance.value(),
            remaining_stock: updated_product.stock,
        })
    }
}
