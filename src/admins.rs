use crate::auth;
use crate::db;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

pub fn get_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<Admin>> {
    conn.query_row(
        "SELECT id, username, password_hash FROM admins WHERE username = ?",
        [username],
        |row| {
            Ok(Admin {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn insert(conn: &Connection, username: &str, password_hash: &str) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO admins(id, username, password_hash, created_at) VALUES(?, ?, ?, ?)",
        (&id, username, password_hash, db::now_ts()),
    )?;
    Ok(id)
}

/// Creates the configured admin account on a database that has none.
pub fn ensure_bootstrap_admin(conn: &Connection, username: &str, password: &str) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    insert(conn, username, &auth::hash_password(password))?;
    info!(username, "created bootstrap admin account");
    Ok(())
}
