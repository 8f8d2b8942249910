use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::credentials;

pub const DB_FILE_NAME: &str = "roster.sqlite3";

pub fn open_db(
    workspace: &Path,
    teacher_username: &str,
    teacher_seed_secret: &str,
) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    ensure_teacher(&conn, teacher_username, teacher_seed_secret)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            grade TEXT,
            father_name TEXT,
            mother_name TEXT,
            national_id TEXT,
            birth_date TEXT NOT NULL,
            phone TEXT,
            alt_phone TEXT,
            login_id TEXT,
            secret_hash TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_login_id ON students(login_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_phone ON students(phone)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_entries(
            student_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('present', 'absent')),
            marked_at TEXT NOT NULL,
            PRIMARY KEY(student_id, date),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Messages keep the sender's login id rather than a foreign key so they
    // survive removal of the student row.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_login_id TEXT NOT NULL,
            body TEXT NOT NULL,
            reply TEXT,
            created_at TEXT NOT NULL,
            replied_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_login_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teacher(
            id INTEGER PRIMARY KEY CHECK(id = 1),
            username TEXT NOT NULL,
            secret_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Seed the single teacher row on first open. An existing row is left alone so
/// a changed secret survives restarts.
pub fn ensure_teacher(conn: &Connection, username: &str, seed_secret: &str) -> anyhow::Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM teacher WHERE id = 1", [], |r| r.get(0))
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }
    let hash = credentials::hash_secret(seed_secret)?;
    conn.execute(
        "INSERT INTO teacher(id, username, secret_hash, updated_at)
         VALUES(1, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        (username, &hash),
    )?;
    tracing::info!(username, "seeded teacher account");
    Ok(())
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    ensure_teacher(&conn, "teacher", "teacher").expect("seed teacher");
    conn
}
