//! Read-side queries for shoppers.

use uuid::Uuid;

use crate::domain::{DomainError, Product, ProductStatus, Transaction};
use crate::error::AppResult;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct QueryHandler {
    store: Store,
}

impl QueryHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Products on sale, oldest listing first
    pub async fn list_active_products(&self) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .store
            .list::<Product>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|p| p.status == ProductStatus::Active)
            .collect();
        products.sort_by_key(|p| p.created_at);
        Ok(products)
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        Ok(self
            .store
            .get::<Product>(&product_id.to_string())
            .await?
            .map(|v| v.record)
            .filter(|p| p.status == ProductStatus::Active)
            .ok_or_else(|| DomainError::ProductNotFound(product_id.to_string()))?)
    }

    /// A user's own ledger entries, newest first
    pub async fn user_transactions(&self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .store
            .list::<Transaction>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|tx| tx.user_id == user_id)
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }
}
