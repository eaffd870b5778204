//! Mock API server helpers shared by the HTTP tests.

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use crate::config::ApiTimeouts;
use crate::net::api::ApiClient;

/// Serve `router` on an ephemeral port and return the API base URL.
pub(crate) async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

pub(crate) async fn client_for(router: Router) -> ApiClient {
    let base = spawn(router).await;
    ApiClient::new(base, ApiTimeouts { request_secs: 5, connect_secs: 2 }).unwrap()
}

pub(crate) fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub(crate) fn user_json(id: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{id}@example.com"),
        "name": null,
        "role": role,
        "isActive": true,
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

pub(crate) fn ok(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

pub(crate) fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "error": { "message": message } })))
}
