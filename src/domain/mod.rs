//! Domain module
//!
//! Core domain types and business rules. Nothing here touches storage.

pub mod card;
pub mod context;
pub mod error;
pub mod money;
pub mod product;
pub mod promo;
pub mod session;
pub mod transaction;
pub mod user;
pub mod withdrawal;

pub use card::{CardProvider, TopUpCard, DENOMINATIONS};
pub use context::OperationContext;
pub use error::DomainError;
pub use money::{Amount, Balance, MoneyError};
pub use product::{Category, NewProduct, Product, ProductChanges, ProductStatus};
pub use promo::{DiscountType, NewPromoCode, PromoCode, PromoQuote};
pub use session::Session;
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use user::{Role, User, UserProfile};
pub use withdrawal::{WithdrawMethod, WithdrawalRequest};
