//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{ChainVerificationResult, SecurityLogEntry};
use crate::auth::Registration;
use crate::domain::{
    CardProvider, NewProduct, NewPromoCode, OperationContext, Product, ProductChanges, PromoCode,
    Role, Transaction, TransactionStatus, UserProfile, WithdrawalRequest,
};
use crate::error::AppError;
use crate::handlers::{
    DashboardStats, PurchaseCommand, PurchaseResult, TopUpCommand, TopUpResult,
    UpdateUserCommand, WithdrawCommand,
};
use crate::state::AppState;

use super::middleware::{auth_middleware, CurrentUser};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub provider: CardProvider,
    pub card_value: i64,
    pub serial: String,
    pub pin: String,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct SecurityLogsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

const MAX_LOG_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub status: TransactionStatus,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router. Everything except registration, login and the
/// public catalog sits behind session authentication.
pub fn create_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/purchases", post(purchase))
        .route("/topups", post(top_up))
        .route("/me/transactions", get(my_transactions))
        .nest("/admin", admin_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/products", get(list_products))
        .route("/products/:product_id", get(get_product))
        .merge(protected)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/products", get(admin_list_products).post(create_product))
        .route(
            "/products/:product_id",
            put(update_product).delete(delete_product),
        )
        .route("/promo-codes", get(list_promo_codes).post(create_promo_code))
        .route("/promo-codes/:code", axum::routing::delete(delete_promo_code))
        .route("/promo-codes/:code/toggle", post(toggle_promo_code))
        .route("/transactions", get(list_transactions))
        .route("/users", get(list_users))
        .route("/users/:user_id", patch(update_user))
        .route("/withdrawals", get(list_withdrawals).post(create_withdrawal))
        .route("/withdrawals/:withdrawal_id/settle", post(settle_withdrawal))
        .route("/security-logs", get(security_logs))
        .route("/security-logs/verify", get(verify_security_log))
}

// =========================================================================
// Authentication
// =========================================================================

async fn register(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let user = state.auth.register(request, &context).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = state
        .auth
        .login(&request.identifier, &request.password, &context)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        csrf_token: outcome.csrf_token,
        expires_at: outcome.session.expires_at,
        user: UserProfile::from(&outcome.user),
    }))
}

async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<StatusCode, AppError> {
    state.auth.logout(&current.session, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(Extension(current): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&current.user))
}

// =========================================================================
// Catalog
// =========================================================================

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.queries().list_active_products().await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.queries().get_product(product_id).await?))
}

// =========================================================================
// Shopping
// =========================================================================

async fn purchase(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResult>), AppError> {
    let command = PurchaseCommand::new(current.user.id, request.product_id);
    let result = state.purchases().execute(command, &context).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// A declined card is answered with 200 and `status: failed`
async fn top_up(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<TopUpResult>), AppError> {
    let mut command = TopUpCommand::new(
        current.user.id,
        request.provider,
        request.card_value,
        request.serial,
        request.pin,
    );
    if let Some(code) = request.promo_code.filter(|c| !c.trim().is_empty()) {
        command = command.with_promo_code(code);
    }

    let result = state.topups().execute(command, &context).await?;
    let status = match result.status {
        TransactionStatus::Success => StatusCode::CREATED,
        TransactionStatus::Pending => StatusCode::ACCEPTED,
        TransactionStatus::Failed => StatusCode::OK,
    };
    Ok((status, Json(result)))
}

async fn my_transactions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(
        state.queries().user_transactions(current.user.id).await?,
    ))
}

// =========================================================================
// Admin console
// =========================================================================

async fn dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.admin().dashboard(&current.user, &context).await?))
}

async fn admin_list_products(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(
        state.admin().list_products(&current.user, &context).await?,
    ))
}

async fn create_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state
        .admin()
        .create_product(&current.user, request, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductChanges>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(
        state
            .admin()
            .update_product(&current.user, product_id, request, &context)
            .await?,
    ))
}

async fn delete_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .admin()
        .delete_product(&current.user, product_id, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_promo_codes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<PromoCode>>, AppError> {
    Ok(Json(
        state
            .admin()
            .list_promo_codes(&current.user, &context)
            .await?,
    ))
}

async fn create_promo_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<NewPromoCode>,
) -> Result<(StatusCode, Json<PromoCode>), AppError> {
    let promo = state
        .admin()
        .create_promo_code(&current.user, request, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

async fn toggle_promo_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(code): Path<String>,
) -> Result<Json<PromoCode>, AppError> {
    Ok(Json(
        state
            .admin()
            .toggle_promo_code(&current.user, &code, &context)
            .await?,
    ))
}

async fn delete_promo_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .admin()
        .delete_promo_code(&current.user, &code, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_transactions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(
        state
            .admin()
            .list_transactions(&current.user, query.status, &context)
            .await?,
    ))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(
        state
            .admin()
            .list_users(&current.user, query.role, &context)
            .await?,
    ))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserCommand>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        state
            .admin()
            .update_user(&current.user, user_id, request, &context)
            .await?,
    ))
}

async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<WithdrawCommand>,
) -> Result<(StatusCode, Json<WithdrawalRequest>), AppError> {
    let withdrawal = state
        .admin()
        .create_withdrawal(&current.user, request, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    Ok(Json(
        state
            .admin()
            .list_withdrawals(&current.user, &context)
            .await?,
    ))
}

async fn settle_withdrawal(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Path(withdrawal_id): Path<Uuid>,
    Json(request): Json<SettleRequest>,
) -> Result<Json<WithdrawalRequest>, AppError> {
    Ok(Json(
        state
            .admin()
            .settle_withdrawal(&current.user, withdrawal_id, request.status, &context)
            .await?,
    ))
}

async fn security_logs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<SecurityLogsQuery>,
) -> Result<Json<Vec<SecurityLogEntry>>, AppError> {
    let limit = query.limit.clamp(1, MAX_LOG_LIMIT);
    Ok(Json(
        state
            .admin()
            .security_logs(&current.user, limit, &context)
            .await?,
    ))
}

async fn verify_security_log(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<ChainVerificationResult>, AppError> {
    Ok(Json(
        state
            .admin()
            .verify_security_log(&current.user, &context)
            .await?,
    ))
}
