//! Collection bindings for domain records.

use crate::domain::{Product, PromoCode, Session, Transaction, User, WithdrawalRequest};

use super::Entity;

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for PromoCode {
    const COLLECTION: &'static str = "promo_codes";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Entity for Transaction {
    const COLLECTION: &'static str = "transactions";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for WithdrawalRequest {
    const COLLECTION: &'static str = "withdrawals";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Sessions are looked up by the digest of the bearer token.
impl Entity for Session {
    const COLLECTION: &'static str = "sessions";

    fn key(&self) -> String {
        self.token_hash.clone()
    }
}
