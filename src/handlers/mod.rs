//! Command Handlers module
//!
//! Handlers that orchestrate business operations over the store.
//! Each one re-reads its inputs and commits its writes as a single batch.

mod admin_handler;
mod commands;
mod purchase_handler;
mod query_handler;
mod retry;
mod topup_handler;

#[cfg(test)]
mod tests;

pub use admin_handler::AdminHandler;
pub use commands::*;
pub use purchase_handler::PurchaseHandler;
pub use query_handler::QueryHandler;
pub use retry::{retry_on_conflict, MAX_RETRIES};
pub use topup_handler::TopUpHandler;
