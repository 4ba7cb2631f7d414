//! Flat-file implementation of the Store trait.
//!
//! Layout under the base directory:
//!
//! ```text
//! msg/<msgid>       canonical record
//! echo/<echoarea>   msgids, one per line, append-only
//! blacklist.txt     msgids, one per line
//! points.txt        username:authstr, one per line
//! ```
//!
//! A point's address is its 1-based line number in `points.txt`.
//!
//! Writers are serialized by a lock inside this process. Several processes
//! writing the same directory must be serialized externally. A batch is
//! written message by message, so a crash can leave a prefix of it applied.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use idec_core::{
    generate_authstr, validate_echoarea, validate_username, BundleEntry, Message, MsgId,
    PointIdentity,
};

use crate::batch::prepare_batch;
use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Registration, Store};

const MSG_DIR: &str = "msg";
const ECHO_DIR: &str = "echo";
const BLACKLIST_FILE: &str = "blacklist.txt";
const POINTS_FILE: &str = "points.txt";

/// Flat-file store implementation.
pub struct TxtStore {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl TxtStore {
    /// Open (and lay out, if needed) a base directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = Inner {
            root: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };
        inner.init()?;
        tracing::info!(path = %inner.root.display(), "opened txt store");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// The base directory.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Append a stored message to `blacklist.txt`.
    ///
    /// Returns false when no message has this msgid.
    pub async fn blacklist_message(&self, msgid: &MsgId) -> Result<bool> {
        let msgid = msgid.clone();
        self.blocking(move |inner| {
            let _guard = inner.lock()?;
            if !inner.msg_path(&msgid).exists() {
                return Ok(false);
            }
            if !inner.read_blacklist()?.contains(&msgid) {
                append_line(&inner.root.join(BLACKLIST_FILE), msgid.as_str())?;
            }
            Ok(true)
        })
        .await
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StoreError::Blocking(format!("spawn_blocking failed: {}", e)))?
    }
}

impl Inner {
    fn init(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(MSG_DIR))?;
        fs::create_dir_all(self.root.join(ECHO_DIR))?;
        for name in [BLACKLIST_FILE, POINTS_FILE] {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.root.join(name))?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Blocking(format!("writer lock poisoned: {}", e)))
    }

    fn msg_path(&self, msgid: &MsgId) -> PathBuf {
        self.root.join(MSG_DIR).join(msgid.as_str())
    }

    /// Path of an echoarea index. `None` for names that are not valid
    /// echoareas, which therefore cannot have an index.
    fn echo_path(&self, echoarea: &str) -> Option<PathBuf> {
        validate_echoarea(echoarea).ok()?;
        Some(self.root.join(ECHO_DIR).join(echoarea))
    }

    fn read_message(&self, msgid: &MsgId) -> Result<Option<String>> {
        read_optional(&self.msg_path(msgid))
    }

    /// Raw index lines, empty lines dropped.
    fn read_index_lines(&self, echoarea: &str) -> Result<Vec<String>> {
        let Some(path) = self.echo_path(echoarea) else {
            return Ok(Vec::new());
        };
        let text = read_optional(&path)?.unwrap_or_default();
        Ok(non_empty_lines(&text).map(str::to_string).collect())
    }

    fn read_index(&self, echoarea: &str) -> Result<Vec<MsgId>> {
        let mut index = Vec::new();
        for line in self.read_index_lines(echoarea)? {
            match MsgId::parse(&line) {
                Ok(id) => index.push(id),
                Err(_) => tracing::warn!(%echoarea, line = %line, "skipping bad index line"),
            }
        }
        Ok(index)
    }

    /// A message is stored once its file exists and the index of the
    /// echoarea named in its record lists it.
    fn is_stored(&self, msgid: &MsgId) -> Result<bool> {
        let Some(record) = self.read_message(msgid)? else {
            return Ok(false);
        };
        let Ok(echoarea) = Message::echoarea_of(&record) else {
            return Ok(false);
        };
        Ok(self
            .read_index_lines(echoarea)?
            .iter()
            .any(|line| line == msgid.as_str()))
    }

    fn read_blacklist(&self) -> Result<BTreeSet<MsgId>> {
        let text = read_optional(&self.root.join(BLACKLIST_FILE))?.unwrap_or_default();
        Ok(non_empty_lines(&text)
            .filter_map(|line| MsgId::parse(line).ok())
            .collect())
    }

    /// `(username, authstr)` pairs in file order.
    fn read_points(&self) -> Result<Vec<(String, String)>> {
        let text = read_optional(&self.root.join(POINTS_FILE))?.unwrap_or_default();
        Ok(non_empty_lines(&text)
            .map(|line| match line.split_once(':') {
                Some((name, authstr)) => (name.to_string(), authstr.to_string()),
                None => (line.to_string(), String::new()),
            })
            .collect())
    }

    /// Write the message file, then append to the index.
    ///
    /// Caller holds the writer lock and has checked for duplicates.
    fn write_message(&self, echo_path: &Path, msgid: &MsgId, record: &str) -> Result<()> {
        let mut file = File::create(self.msg_path(msgid))?;
        file.write_all(record.as_bytes())?;
        file.sync_data()?;
        append_line(echo_path, msgid.as_str())?;
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("{}\n", line).as_bytes())?;
    file.sync_data()?;
    Ok(())
}

#[async_trait]
impl Store for TxtStore {
    async fn ensure_initialized(&self) -> Result<()> {
        self.blocking(|inner| inner.init()).await
    }

    async fn exists(&self, msgid: &MsgId) -> Result<bool> {
        let msgid = msgid.clone();
        self.blocking(move |inner| inner.is_stored(&msgid)).await
    }

    async fn get(&self, msgid: &MsgId) -> Result<Option<String>> {
        let msgid = msgid.clone();
        self.blocking(move |inner| inner.read_message(&msgid)).await
    }

    async fn put(&self, echoarea: &str, msgid: &MsgId, record: &str) -> Result<InsertResult> {
        validate_echoarea(echoarea)?;
        let echoarea = echoarea.to_string();
        let msgid = msgid.clone();
        let record = record.to_string();

        self.blocking(move |inner| {
            let _guard = inner.lock()?;
            let echo_path = inner
                .echo_path(&echoarea)
                .ok_or_else(|| StoreError::InvalidData(format!("echoarea {:?}", echoarea)))?;
            if inner.is_stored(&msgid)?
                || inner
                    .read_index_lines(&echoarea)?
                    .iter()
                    .any(|line| line == msgid.as_str())
            {
                return Ok(InsertResult::AlreadyExists);
            }
            inner.write_message(&echo_path, &msgid, &record)?;
            tracing::debug!(%msgid, %echoarea, "stored message");
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn put_batch(&self, entries: &[BundleEntry]) -> Result<usize> {
        let prepared = prepare_batch(entries);
        if prepared.is_empty() {
            return Ok(0);
        }

        self.blocking(move |inner| {
            let _guard = inner.lock()?;
            let mut known: HashMap<String, HashSet<String>> = HashMap::new();
            let mut saved = 0;

            for entry in &prepared {
                let Some(echo_path) = inner.echo_path(&entry.echoarea) else {
                    continue;
                };
                let index = match known.entry(entry.echoarea.clone()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(
                        inner
                            .read_index_lines(&entry.echoarea)?
                            .into_iter()
                            .collect(),
                    ),
                };
                // The id may already live under another echoarea.
                if index.contains(entry.msgid.as_str()) || inner.is_stored(&entry.msgid)? {
                    continue;
                }
                inner.write_message(&echo_path, &entry.msgid, &entry.record)?;
                index.insert(entry.msgid.to_string());
                saved += 1;
            }

            tracing::debug!(saved, offered = prepared.len(), "merged bundle");
            Ok(saved)
        })
        .await
    }

    async fn count_for(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>> {
        let echoareas = echoareas.to_vec();
        self.blocking(move |inner| {
            let mut counts = BTreeMap::new();
            for echoarea in echoareas {
                let count = inner.read_index_lines(&echoarea)?.len();
                counts.insert(echoarea, count);
            }
            Ok(counts)
        })
        .await
    }

    async fn index_for(&self, echoareas: &[String]) -> Result<Vec<MsgId>> {
        let echoareas = echoareas.to_vec();
        self.blocking(move |inner| {
            let mut index = Vec::new();
            for echoarea in &echoareas {
                index.extend(inner.read_index(echoarea)?);
            }
            Ok(index)
        })
        .await
    }

    async fn echoareas(&self) -> Result<Vec<String>> {
        self.blocking(|inner| {
            let mut names = Vec::new();
            for dir_entry in fs::read_dir(inner.root.join(ECHO_DIR))? {
                let dir_entry = dir_entry?;
                let Ok(name) = dir_entry.file_name().into_string() else {
                    continue;
                };
                if !inner.read_index_lines(&name)?.is_empty() {
                    names.push(name);
                }
            }
            names.sort();
            Ok(names)
        })
        .await
    }

    async fn find_point(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        self.blocking(move |inner| {
            Ok(inner
                .read_points()?
                .iter()
                .any(|(name, _)| *name == username))
        })
        .await
    }

    async fn register_point(&self, username: &str) -> Result<Registration> {
        validate_username(username)?;
        let username = username.to_string();
        let authstr = generate_authstr(&username, &mut rand::thread_rng());

        self.blocking(move |inner| {
            let _guard = inner.lock()?;
            if inner.read_points()?.iter().any(|(name, _)| *name == username) {
                return Ok(Registration::AlreadyExists);
            }
            append_line(
                &inner.root.join(POINTS_FILE),
                &format!("{}:{}", username, authstr),
            )?;
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
        self.blocking(move |inner| {
            let point = inner
                .read_points()?
                .into_iter()
                .enumerate()
                .find(|(_, (_, token))| *token == authstr)
                .map(|(line, (name, _))| PointIdentity::new(name, (line + 1).to_string()));
            Ok(point)
        })
        .await
    }

    async fn list_points(&self) -> Result<Vec<String>> {
        self.blocking(|inner| {
            Ok(inner
                .read_points()?
                .into_iter()
                .map(|(name, _)| name)
                .collect())
        })
        .await
    }

    async fn blacklist(&self) -> Result<BTreeSet<MsgId>> {
        self.blocking(|inner| inner.read_blacklist()).await
    }
}
