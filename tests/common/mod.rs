//! Common test utilities

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use shopfront::{build_router, seed, AppState, Config, Store};

pub const OWNER_PASSWORD: &str = "owner-pass-1";
pub const USER_PASSWORD: &str = "secret123";

/// Credentials returned by a successful login
#[derive(Debug, Clone)]
pub struct TestSession {
    pub token: String,
    pub csrf_token: String,
    pub user_id: String,
}

/// In-memory state with the owner and launch catalog seeded
pub async fn setup_state() -> AppState {
    let config = Config {
        bcrypt_cost: 4,
        gateway_delay_ms: 0,
        seed_owner_password: Some(OWNER_PASSWORD.to_string()),
        ..Config::default()
    };
    let state = AppState::new(config, Store::in_memory());
    seed::seed_if_empty(&state)
        .await
        .expect("Failed to seed store");
    state
}

pub async fn setup_app() -> (AppState, Router) {
    let state = setup_state().await;
    let app = build_router(state.clone());
    (state, app)
}

/// Send one request and decode the JSON body (`Null` when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    session: Option<&TestSession>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder
            .header("authorization", format!("Bearer {}", session.token))
            .header("x-csrf-token", &session.csrf_token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

pub async fn login(app: &Router, identifier: &str, password: &str) -> TestSession {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "identifier": identifier, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    TestSession {
        token: body["token"].as_str().unwrap().to_string(),
        csrf_token: body["csrf_token"].as_str().unwrap().to_string(),
        user_id: body["user"]["id"].as_str().unwrap().to_string(),
    }
}

pub async fn login_owner(app: &Router) -> TestSession {
    login(app, "owner", OWNER_PASSWORD).await
}

/// Register a shopper and log them in
pub async fn register_user(app: &Router, username: &str) -> TestSession {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": USER_PASSWORD,
            "confirm_password": USER_PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

    login(app, username, USER_PASSWORD).await
}
