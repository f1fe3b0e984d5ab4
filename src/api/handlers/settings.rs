use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::error::{body, ok, ApiResult};
use crate::api::extract::AdminUser;
use crate::api::types::AppState;
use crate::grade_edit::{self, GradeEditWindow};

#[derive(Deserialize)]
pub struct AllowGradeEditBody {
    value: bool,
    #[serde(default)]
    semester: Option<String>,
}

fn window_json(window: &GradeEditWindow) -> serde_json::Value {
    json!({
        "value": window.enabled,
        "sessionId": window.session_id,
        "semester": window.semester,
    })
}

pub async fn get_allow_grade_edit(State(state): State<AppState>) -> ApiResult {
    let conn = state.db()?;
    let window = GradeEditWindow::load(&conn)?;
    Ok(ok(window_json(&window)))
}

pub async fn put_allow_grade_edit(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<AllowGradeEditBody>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let conn = state.db()?;
    let window = grade_edit::set_grade_edit(&conn, req.value, req.semester.as_deref())?;
    info!(admin = %admin.username, enabled = window.enabled, "grade edit setting updated");

    let mut resp = window_json(&window);
    resp["message"] = json!(if window.enabled {
        "Grade editing enabled"
    } else {
        "Grade editing disabled"
    });
    Ok(ok(resp))
}
