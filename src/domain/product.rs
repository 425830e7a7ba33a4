//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, DomainError};

/// Image used when a product is created without one
pub const PLACEHOLDER_IMAGE: &str =
    "https://via.placeholder.com/300x200/6c5ce7/ffffff?text=Roblox+Account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vip,
    Premium,
    Limited,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A sellable item. `stock` only ever goes down through a successful purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub original_price: Amount,
    pub image: String,
    pub category: Category,
    pub stock: u32,
    pub status: ProductStatus,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when adding a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    pub category: Category,
    pub stock: u32,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl Product {
    /// Build a product from admin input. The list price defaults to 120% of the
    /// sale price and the image to a placeholder.
    pub fn create(input: NewProduct) -> Result<Self, DomainError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("product name is required"));
        }

        let price = Amount::new(input.price)?;
        let original_price = match input.original_price {
            Some(value) => Amount::new(value)?,
            None => Amount::from_decimal(price.as_decimal() * Decimal::new(12, 1))?,
        };

        let image = input
            .image
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            price,
            original_price,
            image,
            category: input.category,
            stock: input.stock,
            status: ProductStatus::Active,
            features: clean_features(input.features),
            created_at: Utc::now(),
        })
    }

    /// Apply a partial update, validating any new prices.
    pub fn apply_changes(&self, changes: ProductChanges) -> Result<Self, DomainError> {
        let mut next = self.clone();
        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("product name is required"));
            }
            next.name = name;
        }
        if let Some(description) = changes.description {
            next.description = description;
        }
        if let Some(price) = changes.price {
            next.price = Amount::new(price)?;
        }
        if let Some(original_price) = changes.original_price {
            next.original_price = Amount::new(original_price)?;
        }
        if let Some(image) = changes.image {
            next.image = image;
        }
        if let Some(category) = changes.category {
            next.category = category;
        }
        if let Some(stock) = changes.stock {
            next.stock = stock;
        }
        if let Some(status) = changes.status {
            next.status = status;
        }
        if let Some(features) = changes.features {
            next.features = clean_features(features);
        }
        Ok(next)
    }

    /// Check purchase preconditions that depend on the product alone.
    pub fn ensure_purchasable(&self) -> Result<(), DomainError> {
        if self.status != ProductStatus::Active {
            return Err(DomainError::ProductUnavailable(self.id.to_string()));
        }
        if self.stock == 0 {
            return Err(DomainError::OutOfStock(self.id.to_string()));
        }
        Ok(())
    }

    /// Return a copy with one unit removed from stock.
    pub fn with_one_sold(&self) -> Result<Self, DomainError> {
        let stock = self
            .stock
            .checked_sub(1)
            .ok_or_else(|| DomainError::OutOfStock(self.id.to_string()))?;
        Ok(Self {
            stock,
            ..self.clone()
        })
    }
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}
