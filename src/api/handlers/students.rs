use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{body, ok, ApiError, ApiResult};
use crate::api::extract::StudentUser;
use crate::api::types::AppState;
use crate::auth::{self, Role};
use crate::calc::Subject;
use crate::db;
use crate::grade_edit::{self, GradeEditWindow, ProfileUpdate};
use crate::students::{self, NewStudent};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    course: Option<String>,
    #[serde(default)]
    year_level: Option<i64>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    course: Option<String>,
    #[serde(default)]
    year_level: Option<i64>,
    #[serde(default)]
    subjects: Option<Vec<Subject>>,
}

impl ProfileBody {
    /// Validates and hashes a new password; runs before the database lock is taken.
    fn into_update(self) -> Result<ProfileUpdate, ApiError> {
        let password_hash = match self.password.as_deref() {
            Some(password) => {
                students::check_password(password).map_err(ApiError::BadRequest)?;
                Some(auth::hash_password(password))
            }
            None => None,
        };
        Ok(ProfileUpdate {
            username: self.username,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            course: self.course,
            year_level: self.year_level,
            subjects: self.subjects,
        })
    }
}

fn required(value: &str, key: &str) -> Result<String, ApiError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", key)));
    }
    Ok(v.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = body(payload)?;
    let username = students::check_username(&req.username).map_err(ApiError::BadRequest)?;
    students::check_password(&req.password).map_err(ApiError::BadRequest)?;
    if let Some(y) = req.year_level {
        if !(1..=10).contains(&y) {
            return Err(ApiError::BadRequest("yearLevel must be in 1..=10".into()));
        }
    }
    let new = NewStudent {
        username,
        password_hash: auth::hash_password(&req.password),
        first_name: required(&req.first_name, "firstName")?,
        last_name: required(&req.last_name, "lastName")?,
        email: optional(req.email),
        course: optional(req.course),
        year_level: req.year_level,
    };

    let conn = state.db()?;
    let id = match students::insert(&conn, &new) {
        Ok(id) => id,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Username is already taken".into()))
        }
        Err(e) => return Err(e.into()),
    };
    let student = students::get_by_id(&conn, &id)?
        .ok_or_else(|| anyhow::anyhow!("student {id} vanished after insert"))?;
    let token = state.tokens.issue(&student.id, Role::Student, &student.username)?;
    info!(student_id = %student.id, username = %student.username, "student registered");

    Ok((
        StatusCode::CREATED,
        ok(json!({ "token": token, "student": student })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult {
    let req = body(payload)?;
    let conn = state.db()?;
    let student = students::get_by_username(&conn, req.username.trim())?
        .filter(|s| auth::verify_password(&req.password, &s.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".into()))?;
    let token = state.tokens.issue(&student.id, Role::Student, &student.username)?;
    Ok(ok(json!({ "token": token, "student": student })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    StudentUser(claims): StudentUser,
) -> ApiResult {
    let conn = state.db()?;
    let student = students::get_by_id(&conn, &claims.sub)?
        .ok_or_else(|| ApiError::NotFound("Student not found".into()))?;
    Ok(ok(json!({ "student": student })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    StudentUser(claims): StudentUser,
    payload: Result<Json<ProfileBody>, JsonRejection>,
) -> ApiResult {
    let update = body(payload)?.into_update()?;
    let conn = state.db()?;
    let window = GradeEditWindow::load(&conn)?;
    let today = chrono::Local::now().date_naive();
    let updated = grade_edit::update_profile(&conn, &claims.sub, update, &window, today)?;

    let mut resp = json!({
        "message": "Profile updated successfully",
        "student": updated.student,
    });
    if updated.username_changed {
        let token = state
            .tokens
            .issue(&updated.student.id, Role::Student, &updated.student.username)?;
        resp["token"] = json!(token);
    }
    Ok(ok(resp))
}
