//! First-start seeding.
//!
//! An empty store gets an owner account (when a password is configured) and
//! the launch catalog.

use crate::auth::password::validate_password;
use crate::domain::{Category, NewProduct, Product, Role, User};
use crate::error::AppResult;
use crate::state::AppState;
use crate::store::Store;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub owner_created: bool,
    pub products_created: usize,
}

pub fn default_catalog() -> Vec<NewProduct> {
    vec![NewProduct {
        name: "Roblox Premium VIP".to_string(),
        description: "Tài khoản Roblox Premium với nhiều item độc quyền".to_string(),
        price: 250_000,
        original_price: Some(300_000),
        image: Some(
            "https://via.placeholder.com/300x200/6c5ce7/ffffff?text=Roblox+VIP".to_string(),
        ),
        category: Category::Vip,
        stock: 5,
        features: vec![
            "Hơn 1000 Robux".to_string(),
            "10+ Limited Items".to_string(),
            "Avatar độc quyền".to_string(),
            "Full gamepasses".to_string(),
        ],
    }]
}

/// Seed whatever collections are still empty
pub async fn seed_if_empty(state: &AppState) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    if state.store.list::<User>().await?.is_empty() {
        report.owner_created = seed_owner(state).await?;
    }

    if state.store.list::<Product>().await?.is_empty() {
        report.products_created = seed_catalog(&state.store).await?;
    }

    Ok(report)
}

async fn seed_owner(state: &AppState) -> AppResult<bool> {
    let config = &state.config;
    let Some(password) = config.seed_owner_password.clone() else {
        tracing::warn!("SEED_OWNER_PASSWORD not set; no owner account was created");
        return Ok(false);
    };
    validate_password(&password)?;

    let password_hash = state.auth.hash(password).await?;
    let owner = state
        .auth
        .create_user(
            &config.seed_owner_username,
            &config.seed_owner_email,
            password_hash,
            Role::Owner,
        )
        .await?;

    tracing::info!(user_id = %owner.id, username = %owner.username, "Seeded owner account");
    Ok(true)
}

async fn seed_catalog(store: &Store) -> AppResult<usize> {
    let mut created = 0;
    for input in default_catalog() {
        let product = Product::create(input)?;
        store.insert(&product).await?;
        created += 1;
    }
    tracing::info!(products = created, "Seeded default catalog");
    Ok(created)
}
