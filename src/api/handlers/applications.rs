use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{body, ok, path, query, ApiError, ApiResult};
use crate::api::extract::{AdminUser, StudentUser};
use crate::api::types::AppState;
use crate::db;
use crate::scholarships::{self, ApplicationStatus, ScholarshipStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
    scholarship_id: String,
    #[serde(default)]
    essay: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    status: ApplicationStatus,
    #[serde(default)]
    remarks: Option<String>,
}

pub async fn apply(
    State(state): State<AppState>,
    StudentUser(claims): StudentUser,
    payload: Result<Json<ApplyBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = body(payload)?;
    let conn = state.db()?;
    let scholarship = scholarships::get(&conn, req.scholarship_id.trim())?
        .ok_or_else(|| ApiError::NotFound("Scholarship not found".into()))?;
    if scholarship.status != ScholarshipStatus::Open {
        return Err(ApiError::BadRequest(
            "Scholarship is not accepting applications".into(),
        ));
    }
    if let Some(deadline) = scholarship.deadline.as_deref() {
        let today = chrono::Local::now().date_naive();
        if let Ok(deadline) = NaiveDate::parse_from_str(deadline, "%Y-%m-%d") {
            if today > deadline {
                return Err(ApiError::BadRequest(
                    "The application deadline has passed".into(),
                ));
            }
        }
    }

    let essay = req.essay.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let id = match scholarships::apply(&conn, &claims.sub, &scholarship.id, essay) {
        Ok(id) => id,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "You have already applied for this scholarship".into(),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let application = scholarships::get_application(&conn, &id)?
        .ok_or_else(|| anyhow::anyhow!("application {id} vanished after insert"))?;
    info!(student_id = %claims.sub, scholarship_id = %scholarship.id, "application submitted");
    Ok((StatusCode::CREATED, ok(json!({ "application": application }))))
}

pub async fn student_applications(
    State(state): State<AppState>,
    StudentUser(claims): StudentUser,
) -> ApiResult {
    let conn = state.db()?;
    let rows = scholarships::list_applications_for_student(&conn, &claims.sub)?;
    Ok(ok(json!({ "applications": rows })))
}

pub async fn admin_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let q = query(q)?;
    let status = match q.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(ApplicationStatus::parse(s).ok_or_else(|| {
            ApiError::BadRequest("status must be one of: pending, approved, rejected".into())
        })?),
    };
    let conn = state.db()?;
    let rows = scholarships::list_applications(&conn, status)?;
    Ok(ok(json!({ "applications": rows })))
}

pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult {
    let id = path(id)?;
    let req = body(payload)?;
    let conn = state.db()?;
    let tx = conn.unchecked_transaction()?;

    let current = scholarships::get_application(&tx, &id)?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;
    if req.status == ApplicationStatus::Approved && current.status != ApplicationStatus::Approved {
        let scholarship = scholarships::get(&tx, &current.scholarship_id)?
            .ok_or_else(|| ApiError::NotFound("Scholarship not found".into()))?;
        if scholarships::approved_count(&tx, &scholarship.id)? >= scholarship.slots {
            return Err(ApiError::Conflict("No slots remaining for this scholarship".into()));
        }
    }
    let remarks = req.remarks.as_deref().map(str::trim);
    scholarships::set_application_status(&tx, &id, req.status, remarks)?;
    tx.commit()?;

    let application = scholarships::get_application(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;
    info!(
        admin = %admin.username,
        application_id = %id,
        status = req.status.as_str(),
        "application reviewed"
    );
    Ok(ok(json!({ "application": application })))
}
