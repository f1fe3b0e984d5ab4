#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use scholard::config::Config;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn app(prefix: &str) -> Router {
    let config = Config {
        port: 0,
        data_dir: temp_dir(prefix),
        token_secret: "integration-test-secret".into(),
        token_ttl_secs: 3600,
        admin_username: ADMIN_USERNAME.into(),
        admin_password: ADMIN_PASSWORD.into(),
    };
    scholard::build_app(&config).expect("build app")
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = request_raw(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub async fn request_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

pub async fn request_ok(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Value {
    let (status, value) = request(app, method, uri, token, body).await;
    assert!(
        status.is_success() && value.get("success").and_then(|v| v.as_bool()) == Some(true),
        "{} {} failed with {}: {}",
        method,
        uri,
        status,
        value
    );
    value
}

pub async fn admin_token(app: &Router) -> String {
    let resp = request_ok(
        app,
        "POST",
        "/admin/login",
        None,
        Some(json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD })),
    )
    .await;
    resp["token"].as_str().expect("admin token").to_string()
}

/// Registers a student and returns `(student_id, token)`.
pub async fn register_student(app: &Router, username: &str) -> (String, String) {
    let resp = request_ok(
        app,
        "POST",
        "/students/register",
        None,
        Some(json!({
            "username": username,
            "password": "password1",
            "firstName": "Ana",
            "lastName": "Reyes",
            "course": "BSIT",
            "yearLevel": 2
        })),
    )
    .await;
    (
        resp["student"]["id"].as_str().expect("student id").to_string(),
        resp["token"].as_str().expect("student token").to_string(),
    )
}
