use crate::calc::Subject;
use crate::db;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<i64>,
    pub subjects: Vec<Subject>,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<i64>,
}

const STUDENT_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, course, year_level, subjects, created_at, updated_at";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let subjects_raw: String = row.get(8)?;
    let id: String = row.get(0)?;
    // Hand-edited rows may hold non-array JSON; an unreadable subject list reads as empty.
    let subjects = serde_json::from_str::<Vec<Subject>>(&subjects_raw).unwrap_or_else(|e| {
        warn!(student_id = %id, "unreadable subjects column: {e}");
        Vec::new()
    });
    Ok(Student {
        id,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        course: row.get(6)?,
        year_level: row.get(7)?,
        subjects,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Trimmed username, or the reason it is unacceptable.
pub fn check_username(username: &str) -> Result<String, String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("username is required".into());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!("username length must be <= {MAX_USERNAME_LEN}"));
    }
    Ok(username.to_string())
}

pub fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"),
        [id],
        student_from_row,
    )
    .optional()
}

pub fn get_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE username = ?"),
        [username],
        student_from_row,
    )
    .optional()
}

pub fn username_taken(conn: &Connection, username: &str, except_id: Option<&str>) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE username = ? AND id <> COALESCE(?, '')",
        (username, except_id),
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students ORDER BY last_name, first_name, username"
    ))?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert(conn: &Connection, new: &NewStudent) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, username, password_hash, first_name, last_name, email, course, year_level, subjects, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, '[]', ?)",
        (
            &id,
            &new.username,
            &new.password_hash,
            &new.first_name,
            &new.last_name,
            &new.email,
            &new.course,
            new.year_level,
            db::now_ts(),
        ),
    )?;
    Ok(id)
}

/// Overwrites the stored record with `student`'s profile fields and subjects.
pub fn save(conn: &Connection, student: &Student) -> anyhow::Result<()> {
    let subjects = serde_json::to_string(&student.subjects)?;
    conn.execute(
        "UPDATE students SET
           username = ?,
           password_hash = ?,
           first_name = ?,
           last_name = ?,
           email = ?,
           course = ?,
           year_level = ?,
           subjects = ?,
           updated_at = ?
         WHERE id = ?",
        (
            &student.username,
            &student.password_hash,
            &student.first_name,
            &student.last_name,
            &student.email,
            &student.course,
            student.year_level,
            subjects,
            db::now_ts(),
            &student.id,
        ),
    )?;
    Ok(())
}
