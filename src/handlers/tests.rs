//! Scenario tests for the command handlers, run against the in-memory store.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::audit::AuditAction;
use crate::config::Config;
use crate::domain::{
    Amount, CardProvider, Category, DiscountType, DomainError, NewProduct, NewPromoCode,
    OperationContext, Product, ProductStatus, PromoCode, Role, TopUpCard, Transaction,
    TransactionKind, TransactionStatus, User, WithdrawMethod,
};
use crate::error::AppError;
use crate::handlers::{PurchaseCommand, TopUpCommand, UpdateUserCommand, WithdrawCommand};
use crate::state::AppState;
use crate::store::Store;

const SERIAL: &str = "10000000001";
const APPROVED_PIN: &str = "1234567890123";
const DECLINED_PIN: &str = "1234567890120";

fn state() -> AppState {
    let config = Config {
        bcrypt_cost: 4,
        gateway_delay_ms: 0,
        ..Config::default()
    };
    AppState::new(config, Store::in_memory())
}

fn ctx() -> OperationContext {
    OperationContext::new().with_correlation_id(Uuid::new_v4())
}

async fn user_with(state: &AppState, name: &str, role: Role, balance: i64) -> User {
    let mut user = User::new(
        name.to_string(),
        format!("{}@example.com", name),
        String::new(),
        role,
    );
    if balance > 0 {
        user = user.credited(&Amount::new(balance).unwrap()).unwrap();
    }
    state.store.insert(&user).await.unwrap();
    user
}

async fn product_with(state: &AppState, price: i64, stock: u32) -> Product {
    let product = Product::create(NewProduct {
        name: "Roblox Premium VIP".to_string(),
        description: String::new(),
        price,
        original_price: None,
        image: None,
        category: Category::Vip,
        stock,
        features: Vec::new(),
    })
    .unwrap();
    state.store.insert(&product).await.unwrap();
    product
}

async fn promo_with(state: &AppState, code: &str, used: u32, max: u32, expired: bool) {
    let mut promo = PromoCode::create(NewPromoCode {
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        value: 10,
        max_usage: Some(max),
        expires_at: None,
    })
    .unwrap();
    promo.used_count = used;
    if expired {
        promo.expires_at = Some(Utc::now() - Duration::days(1));
    }
    state.store.insert(&promo).await.unwrap();
}

async fn balance_of(state: &AppState, user_id: Uuid) -> i64 {
    state
        .store
        .get::<User>(&user_id.to_string())
        .await
        .unwrap()
        .unwrap()
        .record
        .balance
        .value()
}

async fn stock_of(state: &AppState, product_id: Uuid) -> u32 {
    state
        .store
        .get::<Product>(&product_id.to_string())
        .await
        .unwrap()
        .unwrap()
        .record
        .stock
}

async fn promo_uses(state: &AppState, code: &str) -> u32 {
    state
        .store
        .get::<PromoCode>(code)
        .await
        .unwrap()
        .unwrap()
        .record
        .used_count
}

async fn ledger(state: &AppState) -> Vec<Transaction> {
    state
        .store
        .list::<Transaction>()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.record)
        .collect()
}

fn topup(user_id: Uuid, value: i64, pin: &str) -> TopUpCommand {
    TopUpCommand::new(
        user_id,
        CardProvider::Viettel,
        value,
        SERIAL.to_string(),
        pin.to_string(),
    )
}

// =========================================================================
// Purchases
// =========================================================================

#[tokio::test]
async fn test_purchase_debits_balance_and_stock() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 100_000).await;
    let product = product_with(&state, 50_000, 5).await;

    let result = state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, product.id), &ctx())
        .await
        .unwrap();

    assert_eq!(result.balance, 50_000);
    assert_eq!(result.remaining_stock, 4);
    assert_eq!(balance_of(&state, buyer.id).await, 50_000);
    assert_eq!(stock_of(&state, product.id).await, 4);

    let ledger = ledger(&state).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].id, result.transaction_id);
    assert_eq!(ledger[0].status, TransactionStatus::Success);
    assert_eq!(ledger[0].amount.value(), 50_000);
    assert!(matches!(
        ledger[0].kind,
        TransactionKind::Product { product_id, .. } if product_id == product.id
    ));
}

#[tokio::test]
async fn test_purchase_out_of_stock_changes_nothing() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 100_000).await;
    let product = product_with(&state, 50_000, 0).await;

    let err = state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, product.id), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::OutOfStock(_))));
    assert_eq!(balance_of(&state, buyer.id).await, 100_000);
    assert!(ledger(&state).await.is_empty());
}

#[tokio::test]
async fn test_purchase_insufficient_balance_changes_nothing() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 10_000).await;
    let product = product_with(&state, 50_000, 5).await;

    let err = state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, product.id), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Domain(DomainError::InsufficientBalance {
            required: 50_000,
            available: 10_000
        })
    ));
    assert_eq!(balance_of(&state, buyer.id).await, 10_000);
    assert_eq!(stock_of(&state, product.id).await, 5);
    assert!(ledger(&state).await.is_empty());
}

#[tokio::test]
async fn test_purchase_unknown_product() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 100_000).await;

    let err = state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, Uuid::new_v4()), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::ProductNotFound(_))));
}

#[tokio::test]
async fn test_purchase_inactive_product_changes_nothing() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 100_000).await;
    let mut product = Product::create(NewProduct {
        name: "Retired Bundle".to_string(),
        description: String::new(),
        price: 20_000,
        original_price: None,
        image: None,
        category: Category::Standard,
        stock: 5,
        features: Vec::new(),
    })
    .unwrap();
    product.status = ProductStatus::Inactive;
    state.store.insert(&product).await.unwrap();

    let err = state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, product.id), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::ProductUnavailable(_))));
    assert_eq!(balance_of(&state, buyer.id).await, 100_000);
    assert_eq!(stock_of(&state, product.id).await, 5);
    assert!(ledger(&state).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_purchases_never_oversell() {
    let state = state();
    let product = product_with(&state, 10_000, 3).await;

    let mut buyers = Vec::new();
    for i in 0..10 {
        buyers.push(user_with(&state, &format!("buyer{}", i), Role::User, 10_000).await);
    }

    let mut tasks = Vec::new();
    for buyer in &buyers {
        let handler = state.purchases();
        let command = PurchaseCommand::new(buyer.id, product.id);
        tasks.push(tokio::spawn(async move {
            handler.execute(command, &OperationContext::new()).await
        }));
    }

    let mut sold = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => sold += 1,
            Err(AppError::Domain(DomainError::OutOfStock(_))) | Err(AppError::VersionConflict) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert!(sold <= 3);
    assert_eq!(stock_of(&state, product.id).await, 3 - sold);
    assert_eq!(ledger(&state).await.len() as u32, sold);

    let mut spent = 0;
    for buyer in &buyers {
        spent += 10_000 - balance_of(&state, buyer.id).await;
    }
    assert_eq!(spent, 10_000 * sold as i64);
}

#[tokio::test]
async fn test_concurrent_purchases_by_one_buyer_never_overdraw() {
    let state = state();
    let buyer = user_with(&state, "buyer", Role::User, 50_000).await;
    let product = product_with(&state, 50_000, 5).await;

    let first = state.purchases();
    let second = state.purchases();
    let command = PurchaseCommand::new(buyer.id, product.id);
    let (c1, c2) = (OperationContext::new(), OperationContext::new());
    let (a, b) = tokio::join!(
        first.execute(command.clone(), &c1),
        second.execute(command, &c2),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(AppError::Domain(DomainError::InsufficientBalance { .. }))
    )));
    assert_eq!(balance_of(&state, buyer.id).await, 0);
    assert_eq!(stock_of(&state, product.id).await, 4);
}

// =========================================================================
// Top-ups
// =========================================================================

#[tokio::test]
async fn test_topup_with_percentage_promo() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;
    promo_with(&state, "WELCOME10", 0, 100, false).await;

    let result = state
        .topups()
        .execute(
            topup(user.id, 100_000, APPROVED_PIN).with_promo_code("welcome10".to_string()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, TransactionStatus::Success);
    assert_eq!(result.credited, 110_000);
    assert_eq!(result.promo_applied.as_deref(), Some("WELCOME10"));
    assert_eq!(balance_of(&state, user.id).await, 110_000);
    assert_eq!(promo_uses(&state, "WELCOME10").await, 1);

    let ledger = ledger(&state).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount.value(), 110_000);
    match &ledger[0].kind {
        TransactionKind::Topup {
            masked_serial,
            promo_code,
            ..
        } => {
            assert_eq!(masked_serial, "*******0001");
            assert_eq!(promo_code.as_deref(), Some("WELCOME10"));
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[tokio::test]
async fn test_topup_with_exhausted_promo_credits_face_value() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;
    promo_with(&state, "FULL", 5, 5, false).await;

    let result = state
        .topups()
        .execute(
            topup(user.id, 100_000, APPROVED_PIN).with_promo_code("FULL".to_string()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.credited, 100_000);
    assert!(result.promo_applied.is_none());
    assert_eq!(promo_uses(&state, "FULL").await, 5);
}

#[tokio::test]
async fn test_topup_with_expired_promo_credits_face_value() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;
    promo_with(&state, "OLD", 0, 100, true).await;

    let result = state
        .topups()
        .execute(
            topup(user.id, 50_000, APPROVED_PIN).with_promo_code("OLD".to_string()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.credited, 50_000);
    assert!(result.promo_applied.is_none());
    assert_eq!(promo_uses(&state, "OLD").await, 0);
}

#[tokio::test]
async fn test_topup_with_unknown_promo_credits_face_value() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;

    let result = state
        .topups()
        .execute(
            topup(user.id, 20_000, APPROVED_PIN).with_promo_code("NOPE".to_string()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.credited, 20_000);
    assert!(result.promo_applied.is_none());
}

#[tokio::test]
async fn test_declined_card_records_failed_transaction_only() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 5_000).await;
    promo_with(&state, "WELCOME10", 0, 100, false).await;

    let result = state
        .topups()
        .execute(
            topup(user.id, 100_000, DECLINED_PIN).with_promo_code("WELCOME10".to_string()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, TransactionStatus::Failed);
    assert_eq!(result.credited, 0);
    assert_eq!(result.balance, 5_000);
    assert_eq!(balance_of(&state, user.id).await, 5_000);
    assert_eq!(promo_uses(&state, "WELCOME10").await, 0);

    let ledger = ledger(&state).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].status, TransactionStatus::Failed);
    assert_eq!(ledger[0].amount.value(), 100_000);
}

#[tokio::test]
async fn test_invalid_card_mutates_nothing() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;

    let bad_value = state
        .topups()
        .execute(topup(user.id, 30_000, APPROVED_PIN), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(bad_value, AppError::Domain(DomainError::InvalidCard(_))));

    let bad_pin = state
        .topups()
        .execute(topup(user.id, 10_000, "12ab"), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(bad_pin, AppError::Domain(DomainError::InvalidCard(_))));

    assert_eq!(balance_of(&state, user.id).await, 0);
    assert!(ledger(&state).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_redemptions_respect_promo_cap() {
    let state = state();
    promo_with(&state, "ONCE", 0, 1, false).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let user = user_with(&state, &format!("buyer{}", i), Role::User, 0).await;
        let handler = state.topups();
        let command = topup(user.id, 100_000, APPROVED_PIN).with_promo_code("ONCE".to_string());
        tasks.push(tokio::spawn(async move {
            handler.execute(command, &OperationContext::new()).await
        }));
    }

    let mut discounted = 0;
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        if result.promo_applied.is_some() {
            discounted += 1;
            assert_eq!(result.credited, 110_000);
        }
    }

    assert_eq!(discounted, 1);
    assert_eq!(promo_uses(&state, "ONCE").await, 1);
    assert_eq!(ledger(&state).await.len(), 20);
}

#[tokio::test]
async fn test_approved_card_lost_to_conflicts_is_kept_pending() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 5_000).await;
    let command = topup(user.id, 100_000, APPROVED_PIN).with_promo_code("welcome10".to_string());
    let card = TopUpCard::parse(CardProvider::Viettel, 100_000, SERIAL, APPROVED_PIN).unwrap();

    let result = state
        .topups()
        .settle_approved(Err(AppError::VersionConflict), &command, &card, &user, &ctx())
        .await
        .unwrap();

    assert_eq!(result.status, TransactionStatus::Pending);
    assert_eq!(result.credited, 0);
    assert_eq!(balance_of(&state, user.id).await, 5_000);

    let ledger = ledger(&state).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].id, result.transaction_id);
    assert_eq!(ledger[0].status, TransactionStatus::Pending);
    assert_eq!(ledger[0].amount.value(), 100_000);
    assert!(matches!(
        &ledger[0].kind,
        TransactionKind::Topup { masked_serial, promo_code: Some(code), .. }
            if masked_serial == "*******0001" && code == "WELCOME10"
    ));
}

#[tokio::test]
async fn test_approved_card_other_errors_propagate() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;
    let command = topup(user.id, 50_000, APPROVED_PIN);
    let card = TopUpCard::parse(CardProvider::Viettel, 50_000, SERIAL, APPROVED_PIN).unwrap();

    let err = state
        .topups()
        .settle_approved(
            Err(AppError::Internal("down".into())),
            &command,
            &card,
            &user,
            &ctx(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(ledger(&state).await.is_empty());
}

#[tokio::test]
async fn test_inactive_user_cannot_top_up() {
    let state = state();
    let mut user = User::new(
        "ghost".to_string(),
        "ghost@example.com".to_string(),
        String::new(),
        Role::User,
    );
    user.is_active = false;
    state.store.insert(&user).await.unwrap();

    let err = state
        .topups()
        .execute(topup(user.id, 10_000, APPROVED_PIN), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::UserInactive)));
}

// =========================================================================
// Admin console
// =========================================================================

#[tokio::test]
async fn test_dashboard_totals() {
    let state = state();
    let owner = user_with(&state, "owner", Role::Owner, 0).await;
    let buyer = user_with(&state, "buyer", Role::User, 0).await;
    let product = product_with(&state, 50_000, 5).await;

    state
        .topups()
        .execute(topup(buyer.id, 100_000, APPROVED_PIN), &ctx())
        .await
        .unwrap();
    state
        .topups()
        .execute(topup(buyer.id, 50_000, DECLINED_PIN), &ctx())
        .await
        .unwrap();
    state
        .purchases()
        .execute(PurchaseCommand::new(buyer.id, product.id), &ctx())
        .await
        .unwrap();

    let stats = state.admin().dashboard(&owner, &ctx()).await.unwrap();
    assert_eq!(stats.total_income, 150_000);
    assert_eq!(stats.total_sales, 1);
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.pending_transactions, 0);
    assert_eq!(stats.total_topups, 100_000);
}

#[tokio::test]
async fn test_plain_user_is_denied_and_audited() {
    let state = state();
    let user = user_with(&state, "buyer", Role::User, 0).await;

    let err = state.admin().dashboard(&user, &ctx()).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let entries = state.audit.get_recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::PermissionDenied.as_str());
    assert_eq!(entries[0].user_id, Some(user.id));
}

#[tokio::test]
async fn test_ctv_manages_products_but_not_promo_codes() {
    let state = state();
    let ctv = user_with(&state, "helper", Role::Ctv, 0).await;

    let product = state
        .admin()
        .create_product(
            &ctv,
            NewProduct {
                name: "Starter Pack".to_string(),
                description: String::new(),
                price: 100_000,
                original_price: None,
                image: None,
                category: Category::Standard,
                stock: 2,
                features: Vec::new(),
            },
            &ctx(),
        )
        .await
        .unwrap();
    assert_eq!(product.original_price.value(), 120_000);

    let err = state
        .admin()
        .create_promo_code(
            &ctv,
            NewPromoCode {
                code: "SALE".to_string(),
                discount_type: DiscountType::Fixed,
                value: 5_000,
                max_usage: None,
                expires_at: None,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let listed = state.admin().list_users(&ctv, None, &ctx()).await;
    assert!(listed.is_ok(), "ctv has console access");

    let err = state
        .admin()
        .security_logs(&ctv, 10, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
}

#[tokio::test]
async fn test_promo_code_lifecycle() {
    let state = state();
    let admin = user_with(&state, "admin", Role::Admin, 0).await;
    let input = || NewPromoCode {
        code: "summer".to_string(),
        discount_type: DiscountType::Percentage,
        value: 15,
        max_usage: None,
        expires_at: None,
    };

    let promo = state
        .admin()
        .create_promo_code(&admin, input(), &ctx())
        .await
        .unwrap();
    assert_eq!(promo.code, "SUMMER");
    assert_eq!(promo.max_usage, 100);

    let dup = state
        .admin()
        .create_promo_code(&admin, input(), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(dup, AppError::Domain(DomainError::PromoAlreadyExists(_))));

    let toggled = state
        .admin()
        .toggle_promo_code(&admin, "summer", &ctx())
        .await
        .unwrap();
    assert!(!toggled.is_active);

    state
        .admin()
        .delete_promo_code(&admin, "SUMMER", &ctx())
        .await
        .unwrap();
    assert!(state
        .admin()
        .list_promo_codes(&admin, &ctx())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_inactive_promo_does_not_apply() {
    let state = state();
    let admin = user_with(&state, "admin", Role::Admin, 0).await;
    let user = user_with(&state, "buyer", Role::User, 0).await;
    promo_with(&state, "PAUSED", 0, 100, false).await;
    state
        .admin()
        .toggle_promo_code(&admin, "PAUSED", &ctx())
        .await
        .unwrap();

    let result = state
        .topups()
        .execute(
            topup(user.id, 100_000, APPROVED_PIN).with_promo_code("PAUSED".to_string()),
            &ctx(),
        )
        .await
        .unwrap();
    assert_eq!(result.credited, 100_000);
}

#[tokio::test]
async fn test_list_transactions_filters_by_status() {
    let state = state();
    let admin = user_with(&state, "admin", Role::Admin, 0).await;
    let buyer = user_with(&state, "buyer", Role::User, 0).await;

    state
        .topups()
        .execute(topup(buyer.id, 10_000, APPROVED_PIN), &ctx())
        .await
        .unwrap();
    state
        .topups()
        .execute(topup(buyer.id, 10_000, DECLINED_PIN), &ctx())
        .await
        .unwrap();

    let failed = state
        .admin()
        .list_transactions(&admin, Some(TransactionStatus::Failed), &ctx())
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, TransactionStatus::Failed);

    let all = state
        .admin()
        .list_transactions(&admin, None, &ctx())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_owner_updates_users_but_not_themself() {
    let state = state();
    let owner = user_with(&state, "owner", Role::Owner, 0).await;
    let user = user_with(&state, "buyer", Role::User, 0).await;

    let promoted = state
        .admin()
        .update_user(
            &owner,
            user.id,
            UpdateUserCommand {
                role: Some(Role::Ctv),
                is_active: None,
            },
            &ctx(),
        )
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Ctv);

    let demote_self = state
        .admin()
        .update_user(
            &owner,
            owner.id,
            UpdateUserCommand {
                role: Some(Role::Admin),
                is_active: None,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(demote_self, AppError::Forbidden(_)));

    let lock_self = state
        .admin()
        .update_user(
            &owner,
            owner.id,
            UpdateUserCommand {
                role: None,
                is_active: Some(false),
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(lock_self, AppError::Forbidden(_)));

    let helpers = state
        .admin()
        .list_users(&owner, Some(Role::Ctv), &ctx())
        .await
        .unwrap();
    assert_eq!(helpers.len(), 1);
    assert_eq!(helpers[0].id, user.id);
}

#[tokio::test]
async fn test_admin_cannot_update_users() {
    let state = state();
    let admin = user_with(&state, "admin", Role::Admin, 0).await;
    let user = user_with(&state, "buyer", Role::User, 0).await;

    let err = state
        .admin()
        .update_user(
            &admin,
            user.id,
            UpdateUserCommand {
                role: Some(Role::Admin),
                is_active: None,
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
}

#[tokio::test]
async fn test_withdrawal_settles_once() {
    let state = state();
    let owner = user_with(&state, "owner", Role::Owner, 0).await;

    let request = state
        .admin()
        .create_withdrawal(
            &owner,
            WithdrawCommand {
                amount: 500_000,
                method: WithdrawMethod::Bank,
                account_info: "0123456789 VCB".to_string(),
                account_name: "NGUYEN VAN A".to_string(),
            },
            &ctx(),
        )
        .await
        .unwrap();
    assert_eq!(request.status, TransactionStatus::Pending);

    let settled = state
        .admin()
        .settle_withdrawal(&owner, request.id, TransactionStatus::Success, &ctx())
        .await
        .unwrap();
    assert_eq!(settled.status, TransactionStatus::Success);

    let again = state
        .admin()
        .settle_withdrawal(&owner, request.id, TransactionStatus::Failed, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        AppError::Domain(DomainError::WithdrawalAlreadySettled(_))
    ));

    let history = state
        .admin()
        .list_withdrawals(&owner, &ctx())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TransactionStatus::Success);
}

#[tokio::test]
async fn test_admin_cannot_withdraw() {
    let state = state();
    let admin = user_with(&state, "admin", Role::Admin, 0).await;

    let err = state
        .admin()
        .create_withdrawal(
            &admin,
            WithdrawCommand {
                amount: 1_000,
                method: WithdrawMethod::Momo,
                account_info: "0900000000".to_string(),
                account_name: "A".to_string(),
            },
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
}

#[tokio::test]
async fn test_security_log_chain_verifies_after_admin_activity() {
    let state = state();
    let owner = user_with(&state, "owner", Role::Owner, 0).await;
    let product = product_with(&state, 10_000, 1).await;

    state
        .admin()
        .delete_product(&owner, product.id, &ctx())
        .await
        .unwrap();
    state
        .admin()
        .create_promo_code(
            &owner,
            NewPromoCode {
                code: "VIP".to_string(),
                discount_type: DiscountType::Fixed,
                value: 10_000,
                max_usage: Some(1),
                expires_at: None,
            },
            &ctx(),
        )
        .await
        .unwrap();

    let entries = state
        .admin()
        .security_logs(&owner, 10, &ctx())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, AuditAction::PromoCreated.as_str());
    assert_eq!(entries[1].action, AuditAction::ProductDeleted.as_str());

    let result = state
        .admin()
        .verify_security_log(&owner, &ctx())
        .await
        .unwrap();
    assert!(result.is_valid);
    assert_eq!(result.entries_checked, 2);
}
