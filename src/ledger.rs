//! Recent-grades ledger: append-only snapshots of a student's previous
//! subject list, written just before the list is overwritten.

use crate::calc::Subject;
use crate::db;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGrade {
    pub id: String,
    pub student_id: String,
    pub grades: Vec<Subject>,
    pub semester: String,
    pub average: Option<f64>,
    pub session_id: String,
    pub created_at: String,
}

/// Admin listing row: the snapshot plus who it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGradeWithStudent {
    #[serde(flatten)]
    pub grade: RecentGrade,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug)]
pub struct NewRecentGrade<'a> {
    pub student_id: &'a str,
    pub subjects: &'a [Subject],
    pub semester: &'a str,
    pub average: Option<f64>,
    /// Empty when no grade-edit session is configured.
    pub session_id: &'a str,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("a snapshot already exists for this student in session {0}")]
    DuplicateSession(String),
    #[error(transparent)]
    Db(rusqlite::Error),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

const RECENT_GRADE_COLUMNS: &str =
    "rg.id, rg.student_id, rg.grades, rg.semester, rg.average, rg.session_id, rg.create_at";

fn recent_grade_from_row(row: &Row<'_>) -> rusqlite::Result<RecentGrade> {
    let grades_raw: String = row.get(2)?;
    let grades = serde_json::from_str::<Vec<Subject>>(&grades_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(RecentGrade {
        id: row.get(0)?,
        student_id: row.get(1)?,
        grades,
        semester: row.get(3)?,
        average: row.get(4)?,
        session_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Inserts one snapshot. With a non-empty session id the insert doubles as
/// the grade-edit gate: a second snapshot for the same student and session
/// fails with [`LedgerError::DuplicateSession`].
pub fn add_recent_grade(conn: &Connection, new: &NewRecentGrade<'_>) -> Result<String, LedgerError> {
    let id = Uuid::new_v4().to_string();
    let grades = serde_json::to_string(new.subjects)?;
    let result = conn.execute(
        "INSERT INTO recent_grades(id, student_id, grades, semester, average, session_id, create_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            new.student_id,
            grades,
            new.semester,
            new.average,
            new.session_id,
            db::now_ts(),
        ),
    );
    match result {
        Ok(_) => Ok(id),
        Err(e) if db::is_unique_violation(&e) && !new.session_id.is_empty() => {
            Err(LedgerError::DuplicateSession(new.session_id.to_string()))
        }
        Err(e) => Err(LedgerError::Db(e)),
    }
}

pub fn get_by_student_and_session(
    conn: &Connection,
    student_id: &str,
    session_id: &str,
) -> rusqlite::Result<Vec<RecentGrade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECENT_GRADE_COLUMNS} FROM recent_grades rg
         WHERE rg.student_id = ? AND rg.session_id = ?
         ORDER BY rg.create_at DESC, rg.rowid DESC"
    ))?;
    let rows = stmt
        .query_map((student_id, session_id), recent_grade_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_student_recent_grades(
    conn: &Connection,
    student_id: &str,
) -> rusqlite::Result<Vec<RecentGrade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECENT_GRADE_COLUMNS} FROM recent_grades rg
         WHERE rg.student_id = ?
         ORDER BY rg.create_at DESC, rg.rowid DESC"
    ))?;
    let rows = stmt
        .query_map([student_id], recent_grade_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_recent_grades(conn: &Connection) -> rusqlite::Result<Vec<RecentGradeWithStudent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECENT_GRADE_COLUMNS}, s.username, s.first_name, s.last_name
         FROM recent_grades rg
         JOIN students s ON s.id = rg.student_id
         ORDER BY rg.create_at DESC, rg.rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RecentGradeWithStudent {
                grade: recent_grade_from_row(row)?,
                username: row.get(7)?,
                first_name: row.get(8)?,
                last_name: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
