//! Password and credential-shape rules.

use bcrypt::{hash, verify};
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::DomainError;
use crate::error::{AppError, AppResult};

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]{3,32}$").expect("static pattern compiles"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern compiles"))
}

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if !username_regex().is_match(username) {
        return Err(DomainError::validation(
            "username must be 3-32 characters of letters, digits, '_' or '.'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if email.len() > 254 || !email_regex().is_match(email) {
        return Err(DomainError::validation("email address is not valid"));
    }
    Ok(())
}

/// Password strength: 8-128 characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    let length = password.chars().count();
    if !(8..=128).contains(&length) {
        return Err(DomainError::validation(
            "password must be between 8 and 128 characters",
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(DomainError::validation(
            "password must contain letters and digits",
        ));
    }

    Ok(())
}

pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}
