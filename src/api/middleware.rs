//! API Middleware
//!
//! Request context, session authentication with anti-forgery checks, and
//! request logging.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder};
use crate::domain::{OperationContext, Session, User};
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the session's anti-forgery token
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Header carrying the request's correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The authenticated caller, inserted by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

// =========================================================================
// Request context
// =========================================================================

/// Attach an [`OperationContext`] carrying the correlation ID and client IP
pub async fn context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut context = OperationContext::new().with_correlation_id(correlation_id);
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        context = context.with_client_ip(addr.ip());
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

// =========================================================================
// Session authentication
// =========================================================================

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Methods that never change state and skip the anti-forgery check
fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Resolve the bearer token to a live session; state-changing requests must
/// also present the session's anti-forgery token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthenticated)?;
    let authed = state.auth.authenticate(&token).await?;

    let mut context = request
        .extensions()
        .get::<OperationContext>()
        .cloned()
        .unwrap_or_default()
        .with_request_user(authed.user.id)
        .with_session(authed.session.id);
    context.ensure_correlation_id();

    if !is_safe_method(request.method()) {
        let presented = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok());

        if !state.auth.verify_csrf(&authed.session, presented) {
            tracing::warn!(
                user_id = %authed.user.id,
                method = %request.method(),
                path = %request.uri().path(),
                "Anti-forgery token mismatch"
            );
            state
                .audit
                .record(
                    AuditLogBuilder::new(AuditAction::CsrfRejected)
                        .detail(format!("{} {}", request.method(), request.uri().path())),
                    &context,
                )
                .await;
            return Err(AppError::CsrfMismatch);
        }
    }

    request.extensions_mut().insert(context);
    request.extensions_mut().insert(CurrentUser {
        user: authed.user,
        session: authed.session,
    });

    Ok(next.run(request).await)
}

// =========================================================================
// Request logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", CSRF_HEADER];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());
    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
