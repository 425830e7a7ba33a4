//! shopfront Library
//!
//! Storefront backend: catalog purchases and card top-ups against a versioned
//! store, plus a role-gated admin console with a hash-chained security log.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod gateway;
pub mod handlers;
pub mod jobs;
pub mod seed;
pub mod state;
pub mod store;

pub use api::build_router;
pub use config::{Config, StorageBackend};
pub use domain::{Amount, Balance, DomainError, MoneyError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};
pub use state::AppState;
pub use store::{Store, StoreError};
