use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{body, ok, path, ApiError, ApiResult};
use crate::api::extract::AdminUser;
use crate::api::types::AppState;
use crate::scholarships::{self, ScholarshipFields, ScholarshipStatus};

#[derive(Deserialize)]
pub struct ScholarshipBody {
    title: String,
    #[serde(default)]
    description: String,
    amount: f64,
    slots: i64,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    status: Option<ScholarshipStatus>,
}

fn validate(req: ScholarshipBody) -> Result<ScholarshipFields, ApiError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    if title.len() > 200 {
        return Err(ApiError::BadRequest("title length must be <= 200".into()));
    }
    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(ApiError::BadRequest("amount must be >= 0".into()));
    }
    if req.slots < 1 {
        return Err(ApiError::BadRequest("slots must be >= 1".into()));
    }
    let deadline = match req.deadline.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(d) => {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| ApiError::BadRequest("deadline must be YYYY-MM-DD".into()))?;
            Some(d.to_string())
        }
    };
    Ok(ScholarshipFields {
        title: title.to_string(),
        description: req.description.trim().to_string(),
        amount: req.amount,
        slots: req.slots,
        deadline,
        status: req.status.unwrap_or(ScholarshipStatus::Open),
    })
}

pub async fn list_open(State(state): State<AppState>) -> ApiResult {
    let conn = state.db()?;
    let rows = scholarships::list(&conn, true)?;
    Ok(ok(json!({ "scholarships": rows })))
}

pub async fn get_one(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = path(id)?;
    let conn = state.db()?;
    let scholarship = scholarships::get(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Scholarship not found".into()))?;
    Ok(ok(json!({ "scholarship": scholarship })))
}

pub async fn admin_list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult {
    let conn = state.db()?;
    let rows = scholarships::list(&conn, false)?;
    Ok(ok(json!({ "scholarships": rows })))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<ScholarshipBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let fields = validate(body(payload)?)?;
    let conn = state.db()?;
    let id = scholarships::create(&conn, &fields)?;
    let scholarship = scholarships::get(&conn, &id)?
        .ok_or_else(|| anyhow::anyhow!("scholarship {id} vanished after insert"))?;
    info!(admin = %admin.username, scholarship_id = %id, "scholarship created");
    Ok((StatusCode::CREATED, ok(json!({ "scholarship": scholarship }))))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ScholarshipBody>, JsonRejection>,
) -> ApiResult {
    let id = path(id)?;
    let fields = validate(body(payload)?)?;
    let conn = state.db()?;
    if !scholarships::update(&conn, &id, &fields)? {
        return Err(ApiError::NotFound("Scholarship not found".into()));
    }
    let scholarship = scholarships::get(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Scholarship not found".into()))?;
    Ok(ok(json!({ "scholarship": scholarship })))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = path(id)?;
    let conn = state.db()?;
    if scholarships::get(&conn, &id)?.is_none() {
        return Err(ApiError::NotFound("Scholarship not found".into()));
    }
    if scholarships::application_count(&conn, &id)? > 0 {
        return Err(ApiError::Conflict(
            "Scholarship has applications; close it instead".into(),
        ));
    }
    scholarships::delete(&conn, &id)?;
    info!(admin = %admin.username, scholarship_id = %id, "scholarship deleted");
    Ok(ok(json!({ "message": "Scholarship deleted" })))
}
