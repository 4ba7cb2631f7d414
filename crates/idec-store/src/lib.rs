//! # IDEC Store
//!
//! Storage abstraction for an IDEC node. Provides a trait-based interface for
//! message and point persistence with a SQLite and a flat-file backend.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - Tabular storage in one SQLite database
//! - [`TxtStore`] - Flat files (`msg/`, `echo/`, `points.txt`, `blacklist.txt`)
//! - [`InsertResult`] - Result of writing a message
//! - [`Registration`] - Result of registering a point
//!
//! ## Usage
//!
//! ```rust,no_run
//! use idec_store::{open, Backend, Store};
//!
//! async fn example() {
//!     let store = open(Backend::Sqlite, "idec.db").unwrap();
//!     let counts = store.count_for(&["ii.test.14".to_string()]).await.unwrap();
//!     println!("{:?}", counts);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once messages**: writing a known msgid returns `AlreadyExists`
//! - **Append-only indexes**: echoarea indexes only grow, in write order
//! - **Backends are interchangeable**: both pass the same behavioural tests

mod batch;
pub mod error;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod txt;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Registration, Store, StoreExt};
pub use txt::TxtStore;

/// Which backend a node keeps its messages in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Txt,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Txt => f.write_str("txt"),
        }
    }
}

/// Open a backend at `path` (a database file or a base directory).
pub fn open(backend: Backend, path: impl AsRef<Path>) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match backend {
        Backend::Sqlite => Arc::new(SqliteStore::open(path)?),
        Backend::Txt => Arc::new(TxtStore::open(path)?),
    };
    Ok(store)
}
