//! Authentication
//!
//! Registration, login sessions and anti-forgery tokens. Passwords are stored
//! as bcrypt hashes; bearer and anti-forgery tokens as SHA-256 digests.

pub mod guard;
pub mod password;
pub mod token;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder, SecurityLog};
use crate::config::Config;
use crate::domain::{DomainError, OperationContext, Role, Session, User};
use crate::error::{AppError, AppResult};
use crate::store::{Entity, Store, Versioned, WriteOp};

pub use guard::LoginGuard;

/// Sessions are only rewritten for activity after this many seconds
const TOUCH_INTERVAL_SECS: i64 = 60;

/// Uniqueness index entry mapping a username or email to its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHandle {
    pub handle: String,
    pub user_id: Uuid,
}

impl UserHandle {
    pub fn username(username: &str, user_id: Uuid) -> Self {
        Self {
            handle: username_handle(username),
            user_id,
        }
    }

    pub fn email(email: &str, user_id: Uuid) -> Self {
        Self {
            handle: email_handle(email),
            user_id,
        }
    }
}

impl Entity for UserHandle {
    const COLLECTION: &'static str = "user_handles";

    fn key(&self) -> String {
        self.handle.clone()
    }
}

fn username_handle(username: &str) -> String {
    format!("username:{}", username)
}

fn email_handle(email: &str) -> String {
    format!("email:{}", email.to_lowercase())
}

/// Failures count against the account when the identifier resolves to one
fn lock_key(identifier: &str, user: Option<&User>) -> String {
    match user {
        Some(user) => format!("user:{}", user.id),
        None => format!("login:{}", identifier),
    }
}

/// Registration form
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Successful login. The raw tokens are only ever returned here.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session: Session,
    pub token: String,
    pub csrf_token: String,
}

/// A request resolved to a live session
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session: Session,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    store: Store,
    audit: SecurityLog,
    guard: Arc<LoginGuard>,
    session_ttl: chrono::Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Store, audit: SecurityLog, config: &Config) -> Self {
        Self {
            store,
            audit,
            guard: Arc::new(LoginGuard::new(
                config.login_max_attempts,
                config.login_lockout(),
            )),
            session_ttl: config.session_ttl(),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub fn guard(&self) -> &LoginGuard {
        &self.guard
    }

    /// Hash a password off the async runtime
    pub async fn hash(&self, password: String) -> AppResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
    }

    async fn verify(&self, password: String, hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))?
    }

    /// Create a user together with its username and email index entries.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
        role: Role,
    ) -> AppResult<User> {
        let user = User::new(
            username.to_string(),
            email.to_string(),
            password_hash,
            role,
        );

        let ops = vec![
            WriteOp::insert(&user)?,
            WriteOp::insert(&UserHandle::username(username, user.id))?,
            WriteOp::insert(&UserHandle::email(email, user.id))?,
        ];

        match self.store.commit(ops).await {
            Ok(()) => Ok(user),
            // An index entry already exists; report which one
            Err(e) if e.is_concurrency_conflict() => {
                if self.handle_taken(&username_handle(username)).await? {
                    Err(DomainError::UsernameTaken(username.to_string()).into())
                } else {
                    Err(DomainError::EmailTaken(email.to_string()).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_taken(&self, handle: &str) -> AppResult<bool> {
        Ok(self.store.get::<UserHandle>(handle).await?.is_some())
    }

    pub async fn register(
        &self,
        input: Registration,
        context: &OperationContext,
    ) -> AppResult<User> {
        let username = input.username.trim();
        let email = input.email.trim();

        password::validate_username(username)?;
        password::validate_email(email)?;
        password::validate_password(&input.password)?;
        if input.password != input.confirm_password {
            return Err(DomainError::validation("passwords do not match").into());
        }

        if self.handle_taken(&username_handle(username)).await? {
            return Err(DomainError::UsernameTaken(username.to_string()).into());
        }
        if self.handle_taken(&email_handle(email)).await? {
            return Err(DomainError::EmailTaken(email.to_string()).into());
        }

        let password_hash = self.hash(input.password).await?;
        let user = self
            .create_user(username, email, password_hash, Role::User)
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::UserRegistered)
                    .user(user.id)
                    .resource("user", user.id),
                context,
            )
            .await;

        Ok(user)
    }

    /// Resolve a login identifier (username or email) to a user
    pub async fn find_user(&self, identifier: &str) -> AppResult<Option<Versioned<User>>> {
        for handle in [username_handle(identifier), email_handle(identifier)] {
            if let Some(entry) = self.store.get::<UserHandle>(&handle).await? {
                let user = self.store.get::<User>(&entry.record.user_id.to_string()).await?;
                if let Some(user) = user.filter(|u| u.record.matches_identifier(identifier)) {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        context: &OperationContext,
    ) -> AppResult<LoginOutcome> {
        let identifier = identifier.trim();
        let now = Utc::now();

        let user = self.find_user(identifier).await?.map(|v| v.record);
        let lock_key = lock_key(identifier, user.as_ref());

        if let Err(retry_after_secs) = self.guard.check(&lock_key, now) {
            return Err(AppError::LoginLocked { retry_after_secs });
        }

        let verified = match &user {
            Some(user) => {
                self.verify(password.to_string(), user.password_hash.clone())
                    .await?
            }
            None => false,
        };

        let user = match user {
            Some(user) if verified => user,
            other => {
                self.on_login_failure(identifier, &lock_key, other.map(|u| u.id), context)
                    .await;
                return Err(AppError::InvalidCredentials);
            }
        };

        user.ensure_active()?;
        self.guard.record_success(&lock_key);

        let token = token::generate_token();
        let csrf_token = token::generate_token();
        let session = Session::start(
            user.id,
            token::hash_token(&token),
            token::hash_token(&csrf_token),
            self.session_ttl,
        );
        self.store.insert(&session).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "User logged in");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::LoginSucceeded)
                    .user(user.id)
                    .resource("session", session.id),
                context,
            )
            .await;

        Ok(LoginOutcome {
            user,
            session,
            token,
            csrf_token,
        })
    }

    async fn on_login_failure(
        &self,
        identifier: &str,
        lock_key: &str,
        user_id: Option<Uuid>,
        context: &OperationContext,
    ) {
        let locked_until = self.guard.record_failure(lock_key, Utc::now());

        let mut entry = AuditLogBuilder::new(AuditAction::LoginFailed).detail(identifier);
        if let Some(user_id) = user_id {
            entry = entry.user(user_id);
        }
        self.audit.record(entry, context).await;

        if let Some(until) = locked_until {
            tracing::warn!(identifier = %identifier, until = %until, "Login locked after repeated failures");
            self.audit
                .record(
                    AuditLogBuilder::new(AuditAction::LoginLocked)
                        .detail(format!("{} locked until {}", identifier, until.to_rfc3339())),
                    context,
                )
                .await;
        }
    }

    /// Resolve a bearer token to a live session and an active user
    pub async fn authenticate(&self, token: &str) -> AppResult<Authenticated> {
        let now = Utc::now();
        let session = self
            .store
            .get::<Session>(&token::hash_token(token))
            .await?
            .filter(|s| s.record.is_live(now))
            .ok_or(AppError::Unauthenticated)?;

        let user = self
            .store
            .get::<User>(&session.record.user_id.to_string())
            .await?
            .map(|v| v.record)
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthenticated)?;

        let session = self.touch(session, now).await;

        Ok(Authenticated { user, session })
    }

    /// Slide the idle expiry forward. Losing the race to a concurrent request
    /// is harmless: that request already moved it.
    async fn touch(&self, session: Versioned<Session>, now: chrono::DateTime<Utc>) -> Session {
        if (now - session.record.last_activity).num_seconds() < TOUCH_INTERVAL_SECS {
            return session.record;
        }

        let touched = Session {
            last_activity: now,
            expires_at: now + self.session_ttl,
            ..session.record.clone()
        };
        match self.store.upsert(&touched, session.version).await {
            Ok(_) => touched,
            Err(e) => {
                tracing::debug!(session_id = %touched.id, error = %e, "Session touch skipped");
                session.record
            }
        }
    }

    /// Compare a presented anti-forgery token against the session's
    pub fn verify_csrf(&self, session: &Session, presented: Option<&str>) -> bool {
        presented.is_some_and(|token| token::hash_token(token) == session.csrf_hash)
    }

    pub async fn logout(&self, session: &Session, context: &OperationContext) -> AppResult<()> {
        if let Some(current) = self.store.get::<Session>(&session.key()).await? {
            self.store
                .upsert(&current.record.ended(), current.version)
                .await?;
        }

        tracing::info!(session_id = %session.id, "User logged out");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::Logout).resource("session", session.id),
                context,
            )
            .await;
        Ok(())
    }

    /// Delete sessions that can no longer authenticate
    pub async fn purge_sessions(&self) -> AppResult<usize> {
        let now = Utc::now();
        let mut purged = 0;
        for session in self.store.list::<Session>().await? {
            if session.record.is_live(now) {
                continue;
            }
            match self
                .store
                .delete::<Session>(&session.record.key(), session.version)
                .await
            {
                Ok(()) => purged += 1,
                Err(e) if e.is_concurrency_conflict() => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.guard.prune(now);
        Ok(purged)
    }
}
