use super::*;
use crate::net::error::ErrorKind;
use crate::net::test_support::{client_for, fail, ok};

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::Value;

type Bodies = Arc<Mutex<Vec<Value>>>;

async fn record(State(bodies): State<Bodies>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    bodies.lock().unwrap().push(body);
    ok(Value::Null)
}

async fn reject_token() -> (StatusCode, Json<Value>) {
    fail(StatusCode::BAD_REQUEST, "Reset link has expired")
}

fn router(bodies: &Bodies) -> Router {
    Router::new()
        .route("/api/auth/forgot-password", post(record))
        .route("/api/auth/change-password", put(record))
        .route("/api/auth/reset-password", post(reject_token))
        .with_state(bodies.clone())
}

#[test]
fn matching_passwords_pass() {
    assert!(ensure_passwords_match("hunter22", "hunter22").is_ok());
}

#[test]
fn mismatched_passwords_are_a_validation_error() {
    let err = ensure_passwords_match("hunter22", "hunter23").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), PASSWORDS_DO_NOT_MATCH);
}

#[tokio::test]
async fn forgot_password_posts_email() {
    let bodies = Bodies::default();
    let client = client_for(router(&bodies)).await;

    client.forgot_password("a@example.com").await.unwrap();

    assert_eq!(bodies.lock().unwrap()[0], json!({ "email": "a@example.com" }));
}

#[tokio::test]
async fn change_password_sends_both_fields() {
    let bodies = Bodies::default();
    let client = client_for(router(&bodies)).await;

    client.change_password("old-pass", "new-pass").await.unwrap();

    assert_eq!(
        bodies.lock().unwrap()[0],
        json!({ "currentPassword": "old-pass", "newPassword": "new-pass" })
    );
}

#[tokio::test]
async fn expired_reset_token_surfaces_server_message() {
    let client = client_for(router(&Bodies::default())).await;

    let err = client.reset_password("tok", "new-pass").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "Reset link has expired");
}
