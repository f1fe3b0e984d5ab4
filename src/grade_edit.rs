//! Grade-edit window and the profile update that it gates.
//!
//! An administrator opens a window by enabling grade editing for a semester;
//! that mints a fresh session id. Within one session each student may replace
//! their subject list once. Every accepted replacement first archives the
//! previous list in the recent-grades ledger, and the archive insert is the
//! gate: the ledger's unique `(student_id, session_id)` index rejects a second
//! attempt. Snapshot and student update share one transaction.
//!
//! With no session configured the update is unrestricted and the snapshot is
//! stored with an empty session id.

use crate::calc::{self, Subject};
use crate::db;
use crate::ledger::{self, LedgerError, NewRecentGrade};
use crate::students::{self, Student};
use chrono::NaiveDate;
use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

pub const KEY_ALLOW_GRADE_EDIT: &str = "allow_grade_edit";
pub const KEY_GRADE_EDIT_SESSION: &str = "grade_edit_session";
pub const KEY_GRADE_EDIT_SEMESTER: &str = "grade_edit_semester";
/// Last minted session id. Survives disabling so a re-enable never reuses it.
pub const KEY_GRADE_EDIT_LAST_SESSION: &str = "grade_edit_last_session";

/// Snapshot of the three grade-edit settings, read once per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GradeEditWindow {
    pub enabled: bool,
    pub session_id: Option<String>,
    pub semester: Option<String>,
}

impl GradeEditWindow {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let enabled = db::settings_get(conn, KEY_ALLOW_GRADE_EDIT)?
            .map(|v| v == "true")
            .unwrap_or(false);
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(Self {
            enabled,
            session_id: non_empty(db::settings_get(conn, KEY_GRADE_EDIT_SESSION)?),
            semester: non_empty(db::settings_get(conn, KEY_GRADE_EDIT_SEMESTER)?),
        })
    }

    /// Ledger tag for snapshots written in this window; empty on the legacy path.
    pub fn session_tag(&self) -> &str {
        self.session_id.as_deref().unwrap_or("")
    }

    /// Admin-configured semester, else the one `today` falls in.
    pub fn snapshot_semester(&self, today: NaiveDate) -> String {
        match &self.semester {
            Some(s) => s.clone(),
            None => calc::semester_for_date(today),
        }
    }
}

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("semester is required when enabling grade editing")]
    MissingSemester,
    #[error("semester must match YYYY-S1 or YYYY-S2")]
    InvalidSemester,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for WindowError {
    fn from(e: rusqlite::Error) -> Self {
        WindowError::Internal(e.into())
    }
}

/// Opens a new window (fresh session id) or closes the current one.
pub fn set_grade_edit(
    conn: &Connection,
    enable: bool,
    semester: Option<&str>,
) -> Result<GradeEditWindow, WindowError> {
    if !enable {
        let tx = conn.unchecked_transaction()?;
        db::settings_set(&tx, KEY_ALLOW_GRADE_EDIT, "false")?;
        db::settings_set(&tx, KEY_GRADE_EDIT_SESSION, "")?;
        db::settings_set(&tx, KEY_GRADE_EDIT_SEMESTER, "")?;
        tx.commit()?;
        info!("grade editing disabled");
        return Ok(GradeEditWindow::default());
    }

    let semester = match semester.map(str::trim) {
        None | Some("") => return Err(WindowError::MissingSemester),
        Some(s) if !calc::is_valid_semester(s) => return Err(WindowError::InvalidSemester),
        Some(s) => s.to_string(),
    };

    let tx = conn.unchecked_transaction()?;
    let previous = match db::settings_get(&tx, KEY_GRADE_EDIT_LAST_SESSION)? {
        Some(last) => Some(last),
        None => db::settings_get(&tx, KEY_GRADE_EDIT_SESSION)?,
    };
    let session_id = mint_session_id(previous.as_deref(), chrono::Utc::now().timestamp_millis());
    db::settings_set(&tx, KEY_ALLOW_GRADE_EDIT, "true")?;
    db::settings_set(&tx, KEY_GRADE_EDIT_SESSION, &session_id)?;
    db::settings_set(&tx, KEY_GRADE_EDIT_LAST_SESSION, &session_id)?;
    db::settings_set(&tx, KEY_GRADE_EDIT_SEMESTER, &semester)?;
    tx.commit()?;
    info!(session_id = %session_id, semester = %semester, "grade editing enabled");

    Ok(GradeEditWindow {
        enabled: true,
        session_id: Some(session_id),
        semester: Some(semester),
    })
}

/// Millisecond timestamp, bumped past the last minted id so ids never repeat,
/// even across a disable or a backwards clock step.
fn mint_session_id(previous: Option<&str>, now_ms: i64) -> String {
    let floor = previous
        .and_then(|p| p.parse::<i64>().ok())
        .map(|p| p + 1)
        .unwrap_or(i64::MIN);
    now_ms.max(floor).to_string()
}

/// Fields a student may change on their own profile. `None` leaves a field as is.
/// The password arrives already hashed so no key derivation runs under the
/// database lock.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<i64>,
    pub subjects: Option<Vec<Subject>>,
}

#[derive(Debug)]
pub struct ProfileUpdated {
    pub student: Student,
    pub snapshot_id: Option<String>,
    pub username_changed: bool,
}

#[derive(Debug, Error)]
pub enum GradeEditError {
    #[error("Student not found")]
    StudentNotFound,
    #[error("You have already updated grades for the current admin-enabled session")]
    AlreadyUpdated,
    #[error("{0}")]
    Invalid(String),
    #[error("Username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for GradeEditError {
    fn from(e: rusqlite::Error) -> Self {
        GradeEditError::Internal(e.into())
    }
}

/// Applies `update` to the student. When `subjects` is present the previous
/// subject list is archived first and the window's gate applies.
pub fn update_profile(
    conn: &Connection,
    student_id: &str,
    update: ProfileUpdate,
    window: &GradeEditWindow,
    today: NaiveDate,
) -> Result<ProfileUpdated, GradeEditError> {
    if let Some(subjects) = &update.subjects {
        calc::validate_subjects(subjects).map_err(GradeEditError::Invalid)?;
    }

    let tx = conn.unchecked_transaction()?;

    let Some(mut student) = students::get_by_id(&tx, student_id)? else {
        return Err(GradeEditError::StudentNotFound);
    };

    let mut username_changed = false;
    if let Some(username) = update.username.as_deref() {
        let username = students::check_username(username).map_err(GradeEditError::Invalid)?;
        if username != student.username {
            if students::username_taken(&tx, &username, Some(student_id))? {
                return Err(GradeEditError::UsernameTaken);
            }
            student.username = username;
            username_changed = true;
        }
    }
    if let Some(password_hash) = update.password_hash {
        student.password_hash = password_hash;
    }
    apply_text(&mut student.first_name, update.first_name, "firstName")?;
    apply_text(&mut student.last_name, update.last_name, "lastName")?;
    if let Some(email) = update.email {
        student.email = non_empty(email);
    }
    if let Some(course) = update.course {
        student.course = non_empty(course);
    }
    if let Some(year_level) = update.year_level {
        if !(1..=10).contains(&year_level) {
            return Err(GradeEditError::Invalid("yearLevel must be in 1..=10".into()));
        }
        student.year_level = Some(year_level);
    }

    let mut snapshot_id = None;
    if let Some(subjects) = update.subjects {
        let previous = std::mem::replace(&mut student.subjects, subjects);
        let semester = window.snapshot_semester(today);
        let snapshot = NewRecentGrade {
            student_id,
            subjects: &previous,
            semester: &semester,
            average: calc::grade_average(&previous),
            session_id: window.session_tag(),
        };
        match ledger::add_recent_grade(&tx, &snapshot) {
            Ok(id) => snapshot_id = Some(id),
            Err(LedgerError::DuplicateSession(session)) => {
                info!(student_id, session_id = %session, "grade resubmission rejected");
                return Err(GradeEditError::AlreadyUpdated);
            }
            Err(LedgerError::Db(e)) => return Err(e.into()),
            Err(LedgerError::Encode(e)) => return Err(anyhow::Error::from(e).into()),
        }
        if window.session_id.is_none() {
            warn!(student_id, "grades replaced with no grade-edit session configured");
        }
    }

    students::save(&tx, &student)?;
    tx.commit()?;

    Ok(ProfileUpdated {
        student,
        snapshot_id,
        username_changed,
    })
}

fn apply_text(
    field: &mut String,
    value: Option<String>,
    name: &str,
) -> Result<(), GradeEditError> {
    if let Some(v) = value {
        let v = v.trim();
        if v.is_empty() {
            return Err(GradeEditError::Invalid(format!("{} must not be empty", name)));
        }
        *field = v.to_string();
    }
    Ok(())
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
