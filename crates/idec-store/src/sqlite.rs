//! SQLite implementation of the Store trait.
//!
//! The tabular backend. It uses rusqlite with bundled SQLite, wrapped in async
//! via tokio::spawn_blocking.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use idec_core::{generate_authstr, validate_username, BundleEntry, Message, MsgId, PointIdentity};

use crate::batch::{prepare_batch, PreparedEntry};
use crate::error::{Result, StoreError};
use crate::migration::{self, now_secs};
use crate::traits::{InsertResult, Registration, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Mark a stored message as blacklisted.
    ///
    /// Returns false when no message has this msgid.
    pub async fn blacklist_message(&self, msgid: &MsgId) -> Result<bool> {
        let msgid = msgid.clone();
        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET blacklisted = 1 WHERE msgid = ?1",
                params![msgid.as_str()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// The lock is held only for the duration of `f`.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Blocking(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Blocking(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Insert one message row. Returns false if the msgid was already present.
fn insert_message(conn: &Connection, echoarea: &str, msgid: &MsgId, record: &str) -> Result<bool> {
    // Records that do not parse (e.g. from older peers) are still stored
    // verbatim; only the field columns stay empty.
    let fields = Message::parse(record).ok();
    let changed = conn.execute(
        "INSERT OR IGNORE INTO messages (
            msgid, echoarea, tags, date, distribution, msgfrom, address,
            msgto, subject, body, record, ingested_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            msgid.as_str(),
            echoarea,
            fields.as_ref().map(|m| m.tags.as_str()),
            fields.as_ref().map(|m| m.date),
            fields.as_ref().map(|m| m.distribution.as_str()),
            fields.as_ref().map(|m| m.from.as_str()),
            fields.as_ref().map(|m| m.address.as_str()),
            fields.as_ref().map(|m| m.to.as_str()),
            fields.as_ref().map(|m| m.subject.as_str()),
            fields.as_ref().map(|m| m.body.as_str()),
            record,
            now_secs(),
        ],
    )?;
    Ok(changed > 0)
}

fn row_to_msgid(row: &rusqlite::Row<'_>) -> rusqlite::Result<String> {
    row.get(0)
}

fn parse_stored_msgid(raw: &str) -> Result<MsgId> {
    MsgId::parse(raw).map_err(|_| StoreError::InvalidData(format!("stored msgid {:?}", raw)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn ensure_initialized(&self) -> Result<()> {
        self.blocking(migration::migrate).await
    }

    async fn exists(&self, msgid: &MsgId) -> Result<bool> {
        let msgid = msgid.clone();
        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE msgid = ?1",
                    params![msgid.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn get(&self, msgid: &MsgId) -> Result<Option<String>> {
        let msgid = msgid.clone();
        self.blocking(move |conn| {
            let record = conn
                .query_row(
                    "SELECT record FROM messages WHERE msgid = ?1",
                    params![msgid.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn put(&self, echoarea: &str, msgid: &MsgId, record: &str) -> Result<InsertResult> {
        idec_core::validate_echoarea(echoarea)?;
        let echoarea = echoarea.to_string();
        let msgid = msgid.clone();
        let record = record.to_string();

        self.blocking(move |conn| {
            if insert_message(conn, &echoarea, &msgid, &record)? {
                tracing::debug!(%msgid, %echoarea, "stored message");
                Ok(InsertResult::Inserted)
            } else {
                Ok(InsertResult::AlreadyExists)
            }
        })
        .await
    }

    async fn put_batch(&self, entries: &[BundleEntry]) -> Result<usize> {
        let prepared: Vec<PreparedEntry> = prepare_batch(entries);
        if prepared.is_empty() {
            return Ok(0);
        }

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut saved = 0;
            for entry in &prepared {
                if insert_message(&tx, &entry.echoarea, &entry.msgid, &entry.record)? {
                    saved += 1;
                }
            }
            tx.commit()?;
            tracing::debug!(saved, offered = prepared.len(), "merged bundle");
            Ok(saved)
        })
        .await
    }

    async fn count_for(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>> {
        let echoareas = echoareas.to_vec();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare("SELECT COUNT(1) FROM messages WHERE echoarea = ?1")?;
            let mut counts = BTreeMap::new();
            for echoarea in echoareas {
                let count: i64 = stmt.query_row(params![echoarea], |row| row.get(0))?;
                counts.insert(echoarea, count as usize);
            }
            Ok(counts)
        })
        .await
    }

    async fn index_for(&self, echoareas: &[String]) -> Result<Vec<MsgId>> {
        let echoareas = echoareas.to_vec();
        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT msgid FROM messages WHERE echoarea = ?1 ORDER BY id")?;
            let mut index = Vec::new();
            for echoarea in &echoareas {
                let rows = stmt
                    .query_map(params![echoarea], row_to_msgid)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                for raw in rows {
                    index.push(parse_stored_msgid(&raw)?);
                }
            }
            Ok(index)
        })
        .await
    }

    async fn echoareas(&self) -> Result<Vec<String>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT echoarea FROM messages ORDER BY echoarea")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn find_point(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT id FROM points WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn register_point(&self, username: &str) -> Result<Registration> {
        validate_username(username)?;
        let username = username.to_string();
        let authstr = generate_authstr(&username, &mut rand::thread_rng());

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO points (username, authstr, created_at)
                 VALUES (?1, ?2, ?3)",
                params![username, authstr, now_secs()],
            )?;
            if changed == 0 {
                return Ok(Registration::AlreadyExists);
            }
            tracing::info!(%username, "registered point");
            Ok(Registration::Created(authstr))
        })
        .await
    }

    async fn authenticate(&self, authstr: &str) -> Result<Option<PointIdentity>> {
        if authstr.is_empty() {
            return Ok(None);
        }
        let authstr = authstr.to_string();
        self.blocking(move |conn| {
            let point = conn
                .query_row(
                    "SELECT username, id FROM points WHERE authstr = ?1 ORDER BY id LIMIT 1",
                    params![authstr],
                    |row| {
                        let name: String = row.get(0)?;
                        let id: i64 = row.get(1)?;
                        Ok(PointIdentity::new(name, id.to_string()))
                    },
                )
                .optional()?;
            Ok(point)
        })
        .await
    }

    async fn list_points(&self) -> Result<Vec<String>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT username FROM points ORDER BY id")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn blacklist(&self) -> Result<BTreeSet<MsgId>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT msgid FROM messages WHERE blacklisted = 1")?;
            let rows = stmt
                .query_map([], row_to_msgid)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.iter().map(|raw| parse_stored_msgid(raw)).collect()
        })
        .await
    }
}
