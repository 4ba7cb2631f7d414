//! Database schema migrations for SQLite.
//!
//! Versioned, forward-only. Each version moves the schema from N-1 to N inside
//! one transaction and records itself in `schema_migrations`.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: an up-to-date database is left untouched.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: messages and points.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per message; id order is echoarea index order.
        CREATE TABLE messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            msgid TEXT NOT NULL UNIQUE,
            blacklisted INTEGER NOT NULL DEFAULT 0,
            echoarea TEXT NOT NULL,
            tags TEXT,
            date INTEGER,
            distribution TEXT,
            msgfrom TEXT,
            address TEXT,
            msgto TEXT,
            subject TEXT,
            body TEXT,
            record TEXT NOT NULL,             -- exact canonical text, served as-is
            ingested_at INTEGER NOT NULL
        );

        -- Registered points; the row id is the point's address.
        CREATE TABLE points (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            authstr TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_messages_echoarea ON messages(echoarea, id);
        CREATE INDEX idx_messages_blacklisted ON messages(blacklisted);
        CREATE INDEX idx_points_authstr ON points(authstr);
        "#,
    )?;

    Ok(())
}

/// Current wall-clock time in Unix seconds.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
