//! Admin Handler
//!
//! Role-gated management of the catalog, promo codes, users, payouts and
//! the security log. Every operation takes the acting user and checks the
//! capability through `Role` before touching the store.

use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder, ChainVerificationResult, SecurityLog, SecurityLogEntry};
use crate::domain::promo::normalize_code;
use crate::domain::{
    DomainError, NewProduct, NewPromoCode, OperationContext, Product, ProductChanges, PromoCode,
    Role, Transaction, TransactionStatus, User, UserProfile, WithdrawalRequest,
};
use crate::error::{AppError, AppResult};
use crate::store::Store;

use super::retry::retry_on_conflict;
use super::{DashboardStats, UpdateUserCommand, WithdrawCommand};

/// Handler for admin console operations
#[derive(Debug, Clone)]
pub struct AdminHandler {
    store: Store,
    audit: SecurityLog,
}

impl AdminHandler {
    pub fn new(store: Store, audit: SecurityLog) -> Self {
        Self { store, audit }
    }

    async fn require(
        &self,
        actor: &User,
        allowed: fn(&Role) -> bool,
        capability: &str,
        context: &OperationContext,
    ) -> AppResult<()> {
        if actor.is_active && allowed(&actor.role) {
            return Ok(());
        }

        tracing::warn!(
            user_id = %actor.id,
            role = %actor.role,
            capability,
            "Permission denied"
        );
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::PermissionDenied)
                    .user(actor.id)
                    .detail(capability),
                context,
            )
            .await;
        Err(AppError::PermissionDenied)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    pub async fn dashboard(
        &self,
        actor: &User,
        context: &OperationContext,
    ) -> AppResult<DashboardStats> {
        self.require(actor, Role::has_admin_access, "dashboard", context)
            .await?;

        let transactions = self.store.list::<Transaction>().await?;
        let total_users = self.store.list::<User>().await?.len() as u64;

        let mut stats = DashboardStats {
            total_income: 0,
            total_sales: 0,
            total_users,
            pending_transactions: 0,
            total_topups: 0,
        };
        for tx in transactions.iter().map(|v| &v.record) {
            match tx.status {
                TransactionStatus::Success => {
                    stats.total_income += tx.amount.value();
                    if tx.is_product_sale() {
                        stats.total_sales += 1;
                    } else {
                        stats.total_topups += tx.amount.value();
                    }
                }
                TransactionStatus::Pending => stats.pending_transactions += 1,
                TransactionStatus::Failed => {}
            }
        }

        Ok(stats)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn list_products(
        &self,
        actor: &User,
        context: &OperationContext,
    ) -> AppResult<Vec<Product>> {
        self.require(actor, Role::can_manage_products, "products.list", context)
            .await?;

        let mut products: Vec<Product> = self
            .store
            .list::<Product>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .collect();
        products.sort_by_key(|p| p.created_at);
        Ok(products)
    }

    pub async fn create_product(
        &self,
        actor: &User,
        input: NewProduct,
        context: &OperationContext,
    ) -> AppResult<Product> {
        self.require(actor, Role::can_manage_products, "products.create", context)
            .await?;

        let product = Product::create(input)?;
        self.store.insert(&product).await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::ProductCreated).resource("product", product.id),
                context,
            )
            .await;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &User,
        product_id: Uuid,
        changes: ProductChanges,
        context: &OperationContext,
    ) -> AppResult<Product> {
        self.require(actor, Role::can_manage_products, "products.update", context)
            .await?;

        let product = retry_on_conflict("update_product", || async {
            let current = self
                .store
                .get::<Product>(&product_id.to_string())
                .await?
                .ok_or_else(|| DomainError::ProductNotFound(product_id.to_string()))?;
            let updated = current.record.apply_changes(changes.clone())?;
            self.store.upsert(&updated, current.version).await?;
            Ok(updated)
        })
        .await?;

        tracing::info!(product_id = %product.id, "Product updated");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::ProductUpdated).resource("product", product.id),
                context,
            )
            .await;
        Ok(product)
    }

    pub async fn delete_product(
        &self,
        actor: &User,
        product_id: Uuid,
        context: &OperationContext,
    ) -> AppResult<()> {
        self.require(actor, Role::can_manage_products, "products.delete", context)
            .await?;

        let key = product_id.to_string();
        retry_on_conflict("delete_product", || async {
            let current = self
                .store
                .get::<Product>(&key)
                .await?
                .ok_or_else(|| DomainError::ProductNotFound(key.clone()))?;
            self.store.delete::<Product>(&key, current.version).await?;
            Ok(())
        })
        .await?;

        tracing::info!(product_id = %product_id, "Product deleted");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::ProductDeleted).resource("product", product_id),
                context,
            )
            .await;
        Ok(())
    }

    // =========================================================================
    // Promo codes
    // =========================================================================

    pub async fn list_promo_codes(
        &self,
        actor: &User,
        context: &OperationContext,
    ) -> AppResult<Vec<PromoCode>> {
        self.require(actor, Role::can_manage_promo_codes, "promo_codes.list", context)
            .await?;

        Ok(self
            .store
            .list::<PromoCode>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .collect())
    }

    pub async fn create_promo_code(
        &self,
        actor: &User,
        input: NewPromoCode,
        context: &OperationContext,
    ) -> AppResult<PromoCode> {
        self.require(actor, Role::can_manage_promo_codes, "promo_codes.create", context)
            .await?;

        let promo = PromoCode::create(input)?;
        match self.store.insert(&promo).await {
            Ok(()) => {}
            Err(e) if e.is_concurrency_conflict() => {
                return Err(DomainError::PromoAlreadyExists(promo.code).into());
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(code = %promo.code, "Promo code created");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::PromoCreated).resource("promo_code", &promo.code),
                context,
            )
            .await;
        Ok(promo)
    }

    pub async fn toggle_promo_code(
        &self,
        actor: &User,
        code: &str,
        context: &OperationContext,
    ) -> AppResult<PromoCode> {
        self.require(actor, Role::can_manage_promo_codes, "promo_codes.toggle", context)
            .await?;

        let code = normalize_code(code);
        let promo = retry_on_conflict("toggle_promo_code", || async {
            let current = self
                .store
                .get::<PromoCode>(&code)
                .await?
                .ok_or_else(|| DomainError::PromoNotFound(code.clone()))?;
            let toggled = current.record.toggled();
            self.store.upsert(&toggled, current.version).await?;
            Ok(toggled)
        })
        .await?;

        tracing::info!(code = %promo.code, is_active = promo.is_active, "Promo code toggled");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::PromoToggled)
                    .resource("promo_code", &promo.code)
                    .detail(if promo.is_active { "activated" } else { "deactivated" }),
                context,
            )
            .await;
        Ok(promo)
    }

    pub async fn delete_promo_code(
        &self,
        actor: &User,
        code: &str,
        context: &OperationContext,
    ) -> AppResult<()> {
        self.require(actor, Role::can_manage_promo_codes, "promo_codes.delete", context)
            .await?;

        let code = normalize_code(code);
        retry_on_conflict("delete_promo_code", || async {
            let current = self
                .store
                .get::<PromoCode>(&code)
                .await?
                .ok_or_else(|| DomainError::PromoNotFound(code.clone()))?;
            self.store.delete::<PromoCode>(&code, current.version).await?;
            Ok(())
        })
        .await?;

        tracing::info!(code = %code, "Promo code deleted");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::PromoDeleted).resource("promo_code", &code),
                context,
            )
            .await;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// All ledger entries, newest first, optionally filtered by status
    pub async fn list_transactions(
        &self,
        actor: &User,
        status: Option<TransactionStatus>,
        context: &OperationContext,
    ) -> AppResult<Vec<Transaction>> {
        self.require(actor, Role::has_admin_access, "transactions.list", context)
            .await?;

        let mut transactions: Vec<Transaction> = self
            .store
            .list::<Transaction>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|tx| status.map_or(true, |s| tx.status == s))
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn list_users(
        &self,
        actor: &User,
        role: Option<Role>,
        context: &OperationContext,
    ) -> AppResult<Vec<UserProfile>> {
        self.require(actor, Role::has_admin_access, "users.list", context)
            .await?;

        let mut users: Vec<User> = self
            .store
            .list::<User>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect();
        users.sort_by_key(|u| u.registered_at);
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// Change another user's role or active flag. Owners cannot demote or
    /// lock themselves out.
    pub async fn update_user(
        &self,
        actor: &User,
        user_id: Uuid,
        command: UpdateUserCommand,
        context: &OperationContext,
    ) -> AppResult<UserProfile> {
        self.require(actor, Role::can_manage_users, "users.update", context)
            .await?;

        if command.is_empty() {
            return Err(AppError::InvalidRequest("no changes supplied".to_string()));
        }
        if user_id == actor.id {
            let demotes = command.role.is_some_and(|r| r != actor.role);
            let deactivates = command.is_active == Some(false);
            if demotes || deactivates {
                return Err(AppError::Forbidden(
                    "cannot change your own role or lock your own account".to_string(),
                ));
            }
        }

        let updated = retry_on_conflict("update_user", || async {
            let current = self
                .store
                .get::<User>(&user_id.to_string())
                .await?
                .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))?;
            let mut updated = current.record.clone();
            if let Some(role) = command.role {
                updated.role = role;
            }
            if let Some(is_active) = command.is_active {
                updated.is_active = is_active;
            }
            self.store.upsert(&updated, current.version).await?;
            Ok(updated)
        })
        .await?;

        tracing::info!(
            user_id = %updated.id,
            role = %updated.role,
            is_active = updated.is_active,
            "User updated"
        );
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::UserUpdated)
                    .resource("user", updated.id)
                    .detail(format!("role={} active={}", updated.role, updated.is_active)),
                context,
            )
            .await;
        Ok(UserProfile::from(&updated))
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    pub async fn create_withdrawal(
        &self,
        actor: &User,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<WithdrawalRequest> {
        self.require(actor, Role::can_withdraw, "withdrawals.create", context)
            .await?;

        let request = WithdrawalRequest::create(
            command.amount,
            command.method,
            &command.account_info,
            &command.account_name,
            actor.id,
        )?;
        self.store.insert(&request).await?;

        tracing::info!(
            withdrawal_id = %request.id,
            amount = request.amount.value(),
            "Withdrawal requested"
        );
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::WithdrawalCreated)
                    .resource("withdrawal", request.id)
                    .detail(format!("amount={}", request.amount.value())),
                context,
            )
            .await;
        Ok(request)
    }

    /// Payout history, newest first
    pub async fn list_withdrawals(
        &self,
        actor: &User,
        context: &OperationContext,
    ) -> AppResult<Vec<WithdrawalRequest>> {
        self.require(actor, Role::can_withdraw, "withdrawals.list", context)
            .await?;

        let mut requests: Vec<WithdrawalRequest> = self
            .store
            .list::<WithdrawalRequest>()
            .await?
            .into_iter()
            .map(|v| v.record)
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    pub async fn settle_withdrawal(
        &self,
        actor: &User,
        withdrawal_id: Uuid,
        outcome: TransactionStatus,
        context: &OperationContext,
    ) -> AppResult<WithdrawalRequest> {
        self.require(actor, Role::can_withdraw, "withdrawals.settle", context)
            .await?;

        let settled = retry_on_conflict("settle_withdrawal", || async {
            let current = self
                .store
                .get::<WithdrawalRequest>(&withdrawal_id.to_string())
                .await?
                .ok_or_else(|| DomainError::WithdrawalNotFound(withdrawal_id.to_string()))?;
            let settled = current.record.settle(outcome)?;
            self.store.upsert(&settled, current.version).await?;
            Ok(settled)
        })
        .await?;

        tracing::info!(withdrawal_id = %settled.id, status = %settled.status, "Withdrawal settled");
        self.audit
            .record(
                AuditLogBuilder::new(AuditAction::WithdrawalSettled)
                    .resource("withdrawal", settled.id)
                    .detail(settled.status.as_str()),
                context,
            )
            .await;
        Ok(settled)
    }

    // =========================================================================
    // Security log
    // =========================================================================

    pub async fn security_logs(
        &self,
        actor: &User,
        limit: usize,
        context: &OperationContext,
    ) -> AppResult<Vec<SecurityLogEntry>> {
        self.require(actor, Role::can_read_security_log, "security_logs.list", context)
            .await?;
        Ok(self.audit.get_recent(limit).await?)
    }

    pub async fn verify_security_log(
        &self,
        actor: &User,
        context: &OperationContext,
    ) -> AppResult<ChainVerificationResult> {
        self.require(actor, Role::can_read_security_log, "security_logs.verify", context)
            .await?;

        let result = self.audit.verify_chain().await?;
        if !result.is_valid {
            tracing::error!(
                first_invalid_sequence = ?result.first_invalid_sequence,
                "Security log hash chain is broken"
            );
        }
        Ok(result)
    }
}
