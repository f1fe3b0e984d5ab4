use axum::extract::{rejection::PathRejection, Path, State};
use serde_json::json;

use crate::api::error::{ok, path, ApiError, ApiResult};
use crate::api::extract::{AdminUser, StudentUser};
use crate::api::types::AppState;
use crate::ledger;
use crate::students;

pub async fn student_recent_grades(
    State(state): State<AppState>,
    StudentUser(claims): StudentUser,
) -> ApiResult {
    let conn = state.db()?;
    let rows = ledger::get_student_recent_grades(&conn, &claims.sub)?;
    Ok(ok(json!({ "recentGrades": rows })))
}

pub async fn admin_recent_grades(State(state): State<AppState>, _admin: AdminUser) -> ApiResult {
    let conn = state.db()?;
    let rows = ledger::list_recent_grades(&conn)?;
    Ok(ok(json!({ "recentGrades": rows })))
}

pub async fn admin_student_recent_grades(
    State(state): State<AppState>,
    _admin: AdminUser,
    student_id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let student_id = path(student_id)?;
    let conn = state.db()?;
    if students::get_by_id(&conn, &student_id)?.is_none() {
        return Err(ApiError::NotFound("Student not found".into()));
    }
    let rows = ledger::get_student_recent_grades(&conn, &student_id)?;
    Ok(ok(json!({ "studentId": student_id, "recentGrades": rows })))
}
