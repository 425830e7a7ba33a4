//! Security Log
//!
//! Tamper-evident log of security-relevant actions. Each entry carries the
//! hash of its predecessor, so editing or removing an entry breaks the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::store::{Entity, Store, StoreError};

/// Hash that precedes the first entry
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Stored security log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityLogEntry {
    pub id: Uuid,
    pub sequence: i64,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub detail: Option<String>,
    pub correlation_id: Option<Uuid>,
    pub client_ip: Option<IpAddr>,
    pub previous_hash: String,
    pub current_hash: String,
    pub created_at: DateTime<Utc>,
}

impl SecurityLogEntry {
    fn compute_hash(&self) -> String {
        let hash_input = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.id,
            self.sequence,
            self.action,
            self.user_id.map(|u| u.to_string()).unwrap_or_default(),
            self.resource_type.as_deref().unwrap_or_default(),
            self.resource_id.as_deref().unwrap_or_default(),
            self.detail.as_deref().unwrap_or_default(),
            self.correlation_id.map(|c| c.to_string()).unwrap_or_default(),
            self.client_ip.map(|ip| ip.to_string()).unwrap_or_default(),
            self.created_at.to_rfc3339(),
            self.previous_hash
        );
        sha256_hex(&hash_input)
    }
}

impl Entity for SecurityLogEntry {
    const COLLECTION: &'static str = "security_logs";

    /// Zero-padded so key order is sequence order
    fn key(&self) -> String {
        format!("{:020}", self.sequence)
    }
}

/// Security log action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegistered,
    LoginSucceeded,
    LoginFailed,
    LoginLocked,
    Logout,
    CsrfRejected,
    PermissionDenied,
    UserUpdated,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    PromoCreated,
    PromoToggled,
    PromoDeleted,
    WithdrawalCreated,
    WithdrawalSettled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user.registered",
            AuditAction::LoginSucceeded => "auth.login_succeeded",
            AuditAction::LoginFailed => "auth.login_failed",
            AuditAction::LoginLocked => "auth.login_locked",
            AuditAction::Logout => "auth.logout",
            AuditAction::CsrfRejected => "auth.csrf_rejected",
            AuditAction::PermissionDenied => "auth.permission_denied",
            AuditAction::UserUpdated => "user.updated",
            AuditAction::ProductCreated => "product.created",
            AuditAction::ProductUpdated => "product.updated",
            AuditAction::ProductDeleted => "product.deleted",
            AuditAction::PromoCreated => "promo.created",
            AuditAction::PromoToggled => "promo.toggled",
            AuditAction::PromoDeleted => "promo.deleted",
            AuditAction::WithdrawalCreated => "withdrawal.created",
            AuditAction::WithdrawalSettled => "withdrawal.settled",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder for creating security log entries
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    action: AuditAction,
    user_id: Option<Uuid>,
    resource_type: Option<String>,
    resource_id: Option<String>,
    detail: Option<String>,
}

impl AuditLogBuilder {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            user_id: None,
            resource_type: None,
            resource_id: None,
            detail: None,
        }
    }

    /// Subject of the entry, when it differs from the requesting user
    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone)]
struct ChainHead {
    sequence: i64,
    hash: String,
}

/// Security log service
#[derive(Debug, Clone)]
pub struct SecurityLog {
    store: Store,
    /// Loaded lazily from the store; `None` until the first write
    head: Arc<Mutex<Option<ChainHead>>>,
}

impl SecurityLog {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            head: Arc::new(Mutex::new(None)),
        }
    }

    /// Append an entry to the chain
    pub async fn log(
        &self,
        builder: AuditLogBuilder,
        context: &OperationContext,
    ) -> Result<SecurityLogEntry, StoreError> {
        const MAX_RETRIES: u32 = 3;

        let mut head = self.head.lock().await;

        for attempt in 0..MAX_RETRIES {
            let current = match head.as_ref() {
                Some(current) => current.clone(),
                None => self.load_head().await?,
            };

            let mut entry = SecurityLogEntry {
                id: Uuid::new_v4(),
                sequence: current.sequence + 1,
                action: builder.action.as_str().to_string(),
                user_id: builder.user_id.or(context.request_user_id),
                resource_type: builder.resource_type.clone(),
                resource_id: builder.resource_id.clone(),
                detail: builder.detail.clone(),
                correlation_id: context.correlation_id,
                client_ip: context.client_ip,
                previous_hash: current.hash.clone(),
                current_hash: String::new(),
                created_at: Utc::now(),
            };
            entry.current_hash = entry.compute_hash();

            match self.store.insert(&entry).await {
                Ok(()) => {
                    *head = Some(ChainHead {
                        sequence: entry.sequence,
                        hash: entry.current_hash.clone(),
                    });
                    tracing::debug!(
                        sequence = entry.sequence,
                        action = %entry.action,
                        "Security log entry created"
                    );
                    return Ok(entry);
                }
                // Another writer extended the chain; reload the head
                Err(e) if e.is_concurrency_conflict() && attempt < MAX_RETRIES - 1 => {
                    tracing::warn!(
                        "Security log head moved, retrying (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    *head = None;
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::ConcurrencyConflict {
            collection: SecurityLogEntry::COLLECTION,
            key: "head".to_string(),
            expected: 0,
            actual: 0,
        })
    }

    /// Append an entry; a failure is reported but never fails the caller
    pub async fn record(&self, builder: AuditLogBuilder, context: &OperationContext) {
        let action = builder.action;
        if let Err(e) = self.log(builder, context).await {
            tracing::error!(action = %action, error = %e, "Failed to write security log entry");
        }
    }

    async fn load_head(&self) -> Result<ChainHead, StoreError> {
        let entries = self.store.list::<SecurityLogEntry>().await?;
        Ok(entries
            .last()
            .map(|last| ChainHead {
                sequence: last.record.sequence,
                hash: last.record.current_hash.clone(),
            })
            .unwrap_or(ChainHead {
                sequence: 0,
                hash: GENESIS_HASH.to_string(),
            }))
    }

    /// Most recent entries, newest first
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<SecurityLogEntry>, StoreError> {
        let entries = self.store.list::<SecurityLogEntry>().await?;
        Ok(entries
            .into_iter()
            .rev()
            .take(limit)
            .map(|v| v.record)
            .collect())
    }

    /// Verify the integrity of the hash chain
    pub async fn verify_chain(&self) -> Result<ChainVerificationResult, StoreError> {
        let entries = self.store.list::<SecurityLogEntry>().await?;
        Ok(verify_entries(entries.iter().map(|v| &v.record)))
    }
}

fn verify_entries<'a>(
    entries: impl Iterator<Item = &'a SecurityLogEntry>,
) -> ChainVerificationResult {
    let mut previous_hash = GENESIS_HASH.to_string();
    let mut checked = 0u64;

    for entry in entries {
        checked += 1;

        // Verify chain linkage
        if entry.previous_hash != previous_hash {
            return ChainVerificationResult::invalid(
                checked,
                entry,
                previous_hash,
                entry.previous_hash.clone(),
            );
        }

        let calculated = entry.compute_hash();
        if calculated != entry.current_hash {
            return ChainVerificationResult::invalid(
                checked,
                entry,
                calculated,
                entry.current_hash.clone(),
            );
        }

        previous_hash = entry.current_hash.clone();
    }

    ChainVerificationResult {
        is_valid: true,
        entries_checked: checked,
        first_invalid_sequence: None,
        expected_hash: None,
        actual_hash: None,
    }
}

/// Result of hash chain verification
#[derive(Debug, Clone, Serialize)]
pub struct ChainVerificationResult {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_sequence: Option<i64>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

impl ChainVerificationResult {
    fn invalid(checked: u64, entry: &SecurityLogEntry, expected: String, actual: String) -> Self {
        Self {
            is_valid: false,
            entries_checked: checked,
            first_invalid_sequence: Some(entry.sequence),
            expected_hash: Some(expected),
            actual_hash: Some(actual),
        }
    }
}

/// Calculate SHA-256 hash and return as hex string
pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
