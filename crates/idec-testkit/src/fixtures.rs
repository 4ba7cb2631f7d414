//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use tempfile::TempDir;

use idec_core::{MsgId, PointIdentity, Submission};
use idec_store::{Backend, Result, SqliteStore, Store, TxtStore};
use idec_sync::TossingService;

/// Date of the first seeded message.
pub const BASE_DATE: i64 = 1_700_000_000;

/// A store of either backend plus a point to post as.
pub struct TestFixture {
    pub backend: Backend,
    pub store: Arc<dyn Store>,
    pub point: PointIdentity,
    /// Keeps the flat-file base directory alive.
    _dir: Option<TempDir>,
}

impl TestFixture {
    /// In-memory tabular store.
    pub fn sqlite() -> Result<Self> {
        Ok(Self {
            backend: Backend::Sqlite,
            store: Arc::new(SqliteStore::open_memory()?),
            point: PointIdentity::new("tester", "1"),
            _dir: None,
        })
    }

    /// Flat-file store in a fresh temporary directory.
    pub fn txt() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self {
            backend: Backend::Txt,
            store: Arc::new(TxtStore::open(dir.path())?),
            point: PointIdentity::new("tester", "1"),
            _dir: Some(dir),
        })
    }

    /// One fixture per backend.
    pub fn all_backends() -> Result<Vec<Self>> {
        Ok(vec![Self::sqlite()?, Self::txt()?])
    }

    pub fn with_point(mut self, point: PointIdentity) -> Self {
        self.point = point;
        self
    }

    pub fn tosser(&self) -> TossingService<dyn Store> {
        TossingService::new(self.store.clone())
    }

    /// Toss `n` numbered messages into `echoarea`, one second apart.
    ///
    /// Returns the msgids in arrival order.
    pub async fn seed(&self, echoarea: &str, n: usize) -> idec_sync::Result<Vec<MsgId>> {
        let tosser = self.tosser();
        let mut ids = Vec::with_capacity(n);
        for (i, submission) in numbered_submissions(echoarea, n).iter().enumerate() {
            let response = tosser
                .toss_at(&self.point, submission, BASE_DATE + i as i64)
                .await?;
            if let Some(msgid) = response.msgid() {
                ids.push(msgid.clone());
            }
        }
        Ok(ids)
    }
}

/// `n` distinct submissions to one echoarea.
pub fn numbered_submissions(echoarea: &str, n: usize) -> Vec<Submission> {
    (0..n)
        .map(|i| {
            Submission::new(
                echoarea,
                "All",
                format!("message {i}"),
                format!("This is message number {i}.\nSecond line."),
            )
        })
        .collect()
}

/// A handful of points with distinct names and addresses.
pub fn sample_points() -> Vec<PointIdentity> {
    ["alice", "bob", "carol"]
        .iter()
        .enumerate()
        .map(|(i, name)| PointIdentity::new(*name, (i + 1).to_string()))
        .collect()
}
