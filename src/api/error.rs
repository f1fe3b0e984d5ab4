use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::grade_edit::{GradeEditError, WindowError};

pub type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<GradeEditError> for ApiError {
    fn from(e: GradeEditError) -> Self {
        match e {
            GradeEditError::StudentNotFound => ApiError::NotFound(e.to_string()),
            GradeEditError::AlreadyUpdated => ApiError::Forbidden(e.to_string()),
            GradeEditError::Invalid(msg) => ApiError::BadRequest(msg),
            GradeEditError::UsernameTaken => ApiError::Conflict(e.to_string()),
            GradeEditError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<WindowError> for ApiError {
    fn from(e: WindowError) -> Self {
        match e {
            WindowError::MissingSemester | WindowError::InvalidSemester => {
                ApiError::BadRequest(e.to_string())
            }
            WindowError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(e) => {
                error!("request failed: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = json!({
            "success": false,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Wraps a handler result in the `{ "success": true, ... }` envelope.
pub fn ok(mut result: Value) -> Json<Value> {
    if let Some(obj) = result.as_object_mut() {
        obj.insert("success".into(), Value::Bool(true));
    }
    Json(result)
}

/// Unwraps a JSON body, turning axum's rejection into the API's 400 envelope.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(ApiError::from)
}

pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params.map(|Query(v)| v).map_err(ApiError::from)
}

pub fn path<T>(params: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    params.map(|Path(v)| v).map_err(ApiError::from)
}
