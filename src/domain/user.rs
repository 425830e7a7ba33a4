//! User records and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Amount, Balance, DomainError};

/// Role of a user. Every permission check in the crate goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    /// Collaborator ("cộng tác viên"): catalog access only.
    Ctv,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Ctv => "ctv",
            Role::User => "user",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Quản trị viên",
            Role::Ctv => "Cộng tác viên",
            Role::User => "Người dùng",
        }
    }

    pub fn has_admin_access(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Ctv)
    }

    pub fn can_manage_products(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Ctv)
    }

    pub fn can_manage_promo_codes(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_withdraw(&self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_read_security_log(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "ctv" => Ok(Role::Ctv),
            "user" => Ok(Role::User),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A registered account holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the password itself
    pub password_hash: String,
    pub role: Role,
    pub balance: Balance,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role,
            balance: Balance::zero(),
            is_active: true,
            registered_at: Utc::now(),
        }
    }

    /// Login identifiers match the username exactly or the email case-insensitively.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.username == identifier || self.email.eq_ignore_ascii_case(identifier)
    }

    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::UserInactive);
        }
        Ok(())
    }

    /// Return a copy with `amount` added to the balance.
    pub fn credited(&self, amount: &Amount) -> Result<User, DomainError> {
        let mut next = self.clone();
        next.balance = self.balance.credit(amount)?;
        Ok(next)
    }

    /// Return a copy with `amount` removed from the balance.
    pub fn debited(&self, amount: &Amount) -> Result<User, DomainError> {
        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_balance(
                amount.value(),
                self.balance.value(),
            ));
        }
        let mut next = self.clone();
        next.balance = self.balance.debit(amount)?;
        Ok(next)
    }
}

/// Public projection of a user, without the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub role_name: String,
    pub balance: i64,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            role_name: user.role.display_name().to_string(),
            balance: user.balance.value(),
            is_active: user.is_active,
            registered_at: user.registered_at,
        }
    }
}
