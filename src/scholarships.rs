use crate::db;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScholarshipStatus {
    Open,
    Closed,
}

impl ScholarshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "closed" => Self::Closed,
            _ => Self::Open,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scholarship {
    pub id: String,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub slots: i64,
    pub deadline: Option<String>,
    pub status: ScholarshipStatus,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScholarshipFields {
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub slots: i64,
    pub deadline: Option<String>,
    pub status: ScholarshipStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub student_id: String,
    pub scholarship_id: String,
    pub scholarship_title: String,
    pub student_name: String,
    pub status: ApplicationStatus,
    pub essay: Option<String>,
    pub remarks: Option<String>,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarshipSummary {
    pub scholarship_id: String,
    pub title: String,
    pub slots: i64,
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub remaining_slots: i64,
}

const SCHOLARSHIP_COLUMNS: &str =
    "id, title, description, amount, slots, deadline, status, created_at, updated_at";

fn scholarship_from_row(row: &Row<'_>) -> rusqlite::Result<Scholarship> {
    let status: String = row.get(6)?;
    Ok(Scholarship {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        slots: row.get(4)?,
        deadline: row.get(5)?,
        status: ScholarshipStatus::parse(&status),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn list(conn: &Connection, open_only: bool) -> rusqlite::Result<Vec<Scholarship>> {
    let filter = if open_only { "WHERE status = 'open'" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships {filter} ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], scholarship_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<Scholarship>> {
    conn.query_row(
        &format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE id = ?"),
        [id],
        scholarship_from_row,
    )
    .optional()
}

pub fn create(conn: &Connection, fields: &ScholarshipFields) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO scholarships(id, title, description, amount, slots, deadline, status, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &fields.title,
            &fields.description,
            fields.amount,
            fields.slots,
            &fields.deadline,
            fields.status.as_str(),
            db::now_ts(),
        ),
    )?;
    Ok(id)
}

/// Returns false when no scholarship has that id.
pub fn update(conn: &Connection, id: &str, fields: &ScholarshipFields) -> rusqlite::Result<bool> {
    let n = conn.execute(
        "UPDATE scholarships SET
           title = ?, description = ?, amount = ?, slots = ?, deadline = ?, status = ?, updated_at = ?
         WHERE id = ?",
        (
            &fields.title,
            &fields.description,
            fields.amount,
            fields.slots,
            &fields.deadline,
            fields.status.as_str(),
            db::now_ts(),
            id,
        ),
    )?;
    Ok(n > 0)
}

pub fn application_count(conn: &Connection, scholarship_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM applications WHERE scholarship_id = ?",
        [scholarship_id],
        |r| r.get(0),
    )
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let n = conn.execute("DELETE FROM scholarships WHERE id = ?", [id])?;
    Ok(n > 0)
}

const APPLICATION_SELECT: &str = "SELECT a.id, a.student_id, a.scholarship_id, sc.title,
            s.first_name || ' ' || s.last_name, a.status, a.essay, a.remarks, a.created_at, a.reviewed_at
     FROM applications a
     JOIN scholarships sc ON sc.id = a.scholarship_id
     JOIN students s ON s.id = a.student_id";

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    let status: String = row.get(5)?;
    Ok(Application {
        id: row.get(0)?,
        student_id: row.get(1)?,
        scholarship_id: row.get(2)?,
        scholarship_title: row.get(3)?,
        student_name: row.get(4)?,
        status: ApplicationStatus::parse(&status).unwrap_or(ApplicationStatus::Pending),
        essay: row.get(6)?,
        remarks: row.get(7)?,
        created_at: row.get(8)?,
        reviewed_at: row.get(9)?,
    })
}

/// Inserts a pending application. A repeat application surfaces as a UNIQUE
/// violation; see [`db::is_unique_violation`].
pub fn apply(
    conn: &Connection,
    student_id: &str,
    scholarship_id: &str,
    essay: Option<&str>,
) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO applications(id, student_id, scholarship_id, status, essay, created_at)
         VALUES(?, ?, ?, 'pending', ?, ?)",
        (&id, student_id, scholarship_id, essay, db::now_ts()),
    )?;
    Ok(id)
}

pub fn get_application(conn: &Connection, id: &str) -> rusqlite::Result<Option<Application>> {
    conn.query_row(
        &format!("{APPLICATION_SELECT} WHERE a.id = ?"),
        [id],
        application_from_row,
    )
    .optional()
}

pub fn list_applications_for_student(
    conn: &Connection,
    student_id: &str,
) -> rusqlite::Result<Vec<Application>> {
    let mut stmt = conn.prepare(&format!(
        "{APPLICATION_SELECT} WHERE a.student_id = ? ORDER BY a.created_at DESC, a.rowid DESC"
    ))?;
    let rows = stmt
        .query_map([student_id], application_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_applications(
    conn: &Connection,
    status: Option<ApplicationStatus>,
) -> rusqlite::Result<Vec<Application>> {
    let mut stmt = conn.prepare(&format!(
        "{APPLICATION_SELECT}
         WHERE (?1 IS NULL OR a.status = ?1)
         ORDER BY a.created_at DESC, a.rowid DESC"
    ))?;
    let rows = stmt
        .query_map([status.map(|s| s.as_str())], application_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn approved_count(conn: &Connection, scholarship_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM applications WHERE scholarship_id = ? AND status = 'approved'",
        [scholarship_id],
        |r| r.get(0),
    )
}

pub fn set_application_status(
    conn: &Connection,
    id: &str,
    status: ApplicationStatus,
    remarks: Option<&str>,
) -> rusqlite::Result<bool> {
    let reviewed_at = (status != ApplicationStatus::Pending).then(db::now_ts);
    let n = conn.execute(
        "UPDATE applications SET status = ?, remarks = COALESCE(?, remarks), reviewed_at = ?
         WHERE id = ?",
        (status.as_str(), remarks, reviewed_at, id),
    )?;
    Ok(n > 0)
}

pub fn summary(conn: &Connection) -> rusqlite::Result<Vec<ScholarshipSummary>> {
    let mut stmt = conn.prepare(
        "SELECT
           sc.id,
           sc.title,
           sc.slots,
           (SELECT COUNT(*) FROM applications a WHERE a.scholarship_id = sc.id) AS total,
           (SELECT COUNT(*) FROM applications a WHERE a.scholarship_id = sc.id AND a.status = 'pending'),
           (SELECT COUNT(*) FROM applications a WHERE a.scholarship_id = sc.id AND a.status = 'approved'),
           (SELECT COUNT(*) FROM applications a WHERE a.scholarship_id = sc.id AND a.status = 'rejected')
         FROM scholarships sc
         ORDER BY sc.title",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let slots: i64 = row.get(2)?;
            let approved: i64 = row.get(5)?;
            Ok(ScholarshipSummary {
                scholarship_id: row.get(0)?,
                title: row.get(1)?,
                slots,
                total: row.get(3)?,
                pending: row.get(4)?,
                approved,
                rejected: row.get(6)?,
                remaining_slots: (slots - approved).max(0),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
