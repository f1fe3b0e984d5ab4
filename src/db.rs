use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "scholard.sqlite3";

pub fn open_db(data_dir: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    let conn = Connection::open(data_dir.join(DB_FILE_NAME))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            setting_key TEXT PRIMARY KEY,
            setting_value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    ensure_settings_updated_at(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admins(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            course TEXT,
            year_level INTEGER,
            subjects TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recent_grades(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            grades TEXT NOT NULL,
            semester TEXT NOT NULL,
            average REAL,
            session_id TEXT NOT NULL DEFAULT '',
            create_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    // Workspaces created before grade-edit sessions existed have no session_id column.
    ensure_recent_grades_session_id(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recent_grades_student ON recent_grades(student_id, create_at)",
        [],
    )?;
    // One snapshot per student per admin-enabled session. Legacy rows carry ''.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_recent_grades_student_session
            ON recent_grades(student_id, session_id)
            WHERE session_id <> ''",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scholarships(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            amount REAL NOT NULL,
            slots INTEGER NOT NULL,
            deadline TEXT,
            status TEXT NOT NULL DEFAULT 'open',
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS applications(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            scholarship_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            essay TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL,
            reviewed_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(scholarship_id) REFERENCES scholarships(id),
            UNIQUE(student_id, scholarship_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_applications_scholarship ON applications(scholarship_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_applications_student ON applications(student_id)",
        [],
    )?;

    Ok(conn)
}

/// Fixed-width UTC timestamp so text ordering matches time ordering.
pub fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub fn settings_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT setting_value FROM settings WHERE setting_key = ?",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn settings_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(setting_key, setting_value, updated_at)
         VALUES(?, ?, ?)
         ON CONFLICT(setting_key) DO UPDATE SET
           setting_value = excluded.setting_value,
           updated_at = excluded.updated_at",
        (key, value, now_ts()),
    )?;
    Ok(())
}

/// True for UNIQUE / PRIMARY KEY violations only; foreign-key failures are not conflicts.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == ErrorCode::ConstraintViolation
                && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn ensure_settings_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "settings", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE settings ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn ensure_recent_grades_session_id(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "recent_grades", "session_id")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE recent_grades ADD COLUMN session_id TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn settings_upsert_last_write_wins() {
        let conn = open_db(&temp_dir("scholard-db-settings")).expect("open db");
        assert_eq!(settings_get(&conn, "grade_edit_session").unwrap(), None);

        settings_set(&conn, "grade_edit_session", "1000").unwrap();
        settings_set(&conn, "grade_edit_session", "2000").unwrap();
        assert_eq!(
            settings_get(&conn, "grade_edit_session").unwrap().as_deref(),
            Some("2000")
        );

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn legacy_recent_grades_table_gains_session_id() {
        let dir = temp_dir("scholard-db-migrate");
        {
            let conn = Connection::open(dir.join(DB_FILE_NAME)).unwrap();
            conn.execute(
                "CREATE TABLE recent_grades(
                    id TEXT PRIMARY KEY,
                    student_id TEXT NOT NULL,
                    grades TEXT NOT NULL,
                    semester TEXT NOT NULL,
                    average REAL,
                    create_at TEXT NOT NULL
                )",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO recent_grades VALUES('r1', 's1', '[]', '2024-S2', NULL, '2024-08-01')",
                [],
            )
            .unwrap();
        }

        let conn = open_db(&dir).expect("reopen db");
        assert!(table_has_column(&conn, "recent_grades", "session_id").unwrap());
        let session: String = conn
            .query_row(
                "SELECT session_id FROM recent_grades WHERE id = 'r1'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(session, "");
    }
}
