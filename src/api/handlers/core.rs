use axum::http::Uri;
use serde_json::json;

use crate::api::error::{ok, ApiError, ApiResult};

pub async fn health() -> ApiResult {
    Ok(ok(json!({ "version": env!("CARGO_PKG_VERSION") })))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
