use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::admins;
use crate::api::error::{body, ok, path, ApiError, ApiResult};
use crate::api::extract::AdminUser;
use crate::api::handlers::students::LoginBody;
use crate::api::types::AppState;
use crate::auth::{self, Role};
use crate::ledger;
use crate::students;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let conn = state.db()?;
    let Some(admin) = admins::get_by_username(&conn, req.username.trim())?
        .filter(|a| auth::verify_password(&req.password, &a.password_hash))
    else {
        warn!(username = %req.username, "failed admin login");
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    };
    let token = state.tokens.issue(&admin.id, Role::Admin, &admin.username)?;
    info!(username = %admin.username, "admin logged in");
    Ok(ok(json!({
        "token": token,
        "admin": { "id": admin.id, "username": admin.username },
    })))
}

pub async fn list_students(State(state): State<AppState>, _admin: AdminUser) -> ApiResult {
    let conn = state.db()?;
    let rows = students::list(&conn)?;
    Ok(ok(json!({ "students": rows })))
}

pub async fn get_student(
    State(state): State<AppState>,
    _admin: AdminUser,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = path(id)?;
    let conn = state.db()?;
    let student = students::get_by_id(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Student not found".into()))?;
    let recent_grades = ledger::get_student_recent_grades(&conn, &id)?;
    Ok(ok(json!({ "student": student, "recentGrades": recent_grades })))
}
