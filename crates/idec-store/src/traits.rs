//! Store trait: the abstract interface for message and point persistence.
//!
//! This trait allows the node to be storage-agnostic. Implementations are the
//! SQLite (tabular) backend and the flat-file backend; the node picks one at
//! construction time and holds it as `Arc<dyn Store>`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use idec_core::{BundleEntry, MsgId, PointIdentity};

use crate::error::{Result, StoreError};

/// Result of writing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Message was stored and appended to its echoarea index.
    Inserted,
    /// A message with this msgid already exists (idempotent, not an error).
    AlreadyExists,
}

impl InsertResult {
    pub fn is_inserted(self) -> bool {
        matches!(self, InsertResult::Inserted)
    }
}

/// Result of registering a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The point was created with this authstr.
    Created(String),
    /// The username is taken; no token was issued.
    AlreadyExists,
}

impl Registration {
    /// The issued authstr, or an empty string when nothing was issued.
    pub fn into_token(self) -> String {
        match self {
            Registration::Created(authstr) => authstr,
            Registration::AlreadyExists => String::new(),
        }
    }
}

/// The Store trait: async interface for message and point persistence.
///
/// # Design Notes
///
/// - **Write-once**: `put` for an existing msgid returns `AlreadyExists` and
///   changes nothing.
/// - **Append-only index**: each echoarea index only ever grows, in write order.
/// - **Absence is not an error**: lookups return `Ok(None)`/`false`; errors are
///   reserved for I/O and corrupt data.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the underlying tables / directories / files if absent.
    ///
    /// Idempotent, safe on every startup.
    async fn ensure_initialized(&self) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Message Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether a message is stored.
    async fn exists(&self, msgid: &MsgId) -> Result<bool>;

    /// Get the canonical record of a message.
    async fn get(&self, msgid: &MsgId) -> Result<Option<String>>;

    /// Store a message and append it to the echoarea index.
    async fn put(&self, echoarea: &str, msgid: &MsgId, record: &str) -> Result<InsertResult>;

    /// Merge a sync bundle.
    ///
    /// Each body is decoded and its echoarea taken from the record. Entries
    /// already present (including repeats within the batch) are skipped, as
    /// are entries that fail to decode. Returns how many messages were written.
    async fn put_batch(&self, entries: &[BundleEntry]) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Echoarea Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Message counts per echoarea. Unknown echoareas count 0.
    async fn count_for(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>>;

    /// Msgids of the given echoareas, concatenated in input order.
    async fn index_for(&self, echoareas: &[String]) -> Result<Vec<MsgId>>;

    /// Every echoarea holding at least one message, sorted by name.
    async fn echoareas(&self) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Point Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether a username is registered.
    async fn find_point(&self, username: &str) -> Result<bool>;

    /// Register a point, issuing a fresh authstr.
    async fn register_point(&self, username: &str) -> Result<Registration>;

    /// Resolve an authstr to the point it belongs to.
    async fn authenticate(&self, authstr: &str) -> Result<Option<PointIdentity>>;

    /// All registered usernames, in registration order.
    async fn list_points(&self) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Blacklist
    // ─────────────────────────────────────────────────────────────────────────

    /// Msgids excluded from being served downstream.
    async fn blacklist(&self) -> Result<BTreeSet<MsgId>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Get a record, treating absence as [`StoreError::NotFound`].
    fn fetch(
        &self,
        msgid: &MsgId,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Count a single echoarea.
    fn count(&self, echoarea: &str) -> impl std::future::Future<Output = Result<usize>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn fetch(&self, msgid: &MsgId) -> Result<String> {
        self.get(msgid)
            .await?
            .ok_or_else(|| StoreError::NotFound(msgid.to_string()))
    }

    async fn count(&self, echoarea: &str) -> Result<usize> {
        let counts = self.count_for(&[echoarea.to_string()]).await?;
        Ok(counts.get(echoarea).copied().unwrap_or(0))
    }
}
