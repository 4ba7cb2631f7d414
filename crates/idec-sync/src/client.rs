//! Uplink sync: pull new messages of subscribed echoareas from a remote node.
//!
//! One pass of [`SyncClient::sync_once`]:
//!
//! ```text
//! Local                                Remote
//!   |-------- /x/c/<echoareas> -------->|   compare counts, pick depth
//!   |<------- name:count ---------------|
//!   |-------- /u/e/<echoareas>/-d:d --->|   trailing ids per echoarea
//!   |<------- index --------------------|
//!   |-------- /blacklist.txt ---------->|   (optional)
//!   |-------- /u/m/<40 ids> ----------->|   repeated per batch
//!   |<------- msgid:base64 lines -------|
//! ```
//!
//! The pass is idempotent: a second run after a complete one writes nothing.

use std::collections::HashSet;
use std::sync::Arc;

use idec_core::{validate_echoarea, MsgId, Submission};
use idec_store::Store;

use crate::error::{Result, SyncError};
use crate::remote::RemoteNode;

/// Result of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Catch-up depth the pass ran with.
    pub depth: usize,
    /// Ids in the remote index answer.
    pub offered: usize,
    /// Ids dropped because the remote blacklists them.
    pub blacklisted: usize,
    /// Ids requested in bundles.
    pub requested: usize,
    /// Bundle entries received for requested ids.
    pub fetched: usize,
    /// Bundle entries for ids that were never requested.
    pub discarded: usize,
    /// Messages written to the local store.
    pub saved: usize,
}

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum msgids per bundle request.
    pub bundle_batch_size: usize,
    /// Skip ids listed in the remote's blacklist.
    pub honor_remote_blacklist: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bundle_batch_size: 40,
            honor_remote_blacklist: true,
        }
    }
}

/// Pulls subscribed echoareas from one remote into a local store.
pub struct SyncClient<S: Store + ?Sized, R: RemoteNode + ?Sized> {
    store: Arc<S>,
    remote: Arc<R>,
    config: SyncConfig,
    echoareas: Vec<String>,
    auth: Option<String>,
}

impl<S: Store + ?Sized, R: RemoteNode + ?Sized> SyncClient<S, R> {
    /// Create a client with no subscriptions.
    pub fn new(store: Arc<S>, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            config: SyncConfig::default(),
            echoareas: Vec::new(),
            auth: None,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Point authstr used by [`SyncClient::send`].
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribed echoareas, in subscription order.
    pub fn echoareas(&self) -> &[String] {
        &self.echoareas
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to an echoarea. Already subscribed names are kept once.
    pub fn add_echoarea(&mut self, echoarea: &str) -> Result<()> {
        validate_echoarea(echoarea)?;
        if !self.echoareas.iter().any(|e| e == echoarea) {
            self.echoareas.push(echoarea.to_string());
        }
        Ok(())
    }

    /// Unsubscribe. Unknown names are ignored.
    pub fn remove_echoarea(&mut self, echoarea: &str) {
        self.echoareas.retain(|e| e != echoarea);
    }

    /// Subscribe to several echoareas. Nothing changes if any name is invalid.
    pub fn add_echoareas<I, T>(&mut self, echoareas: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let echoareas: Vec<T> = echoareas.into_iter().collect();
        for echoarea in &echoareas {
            validate_echoarea(echoarea.as_ref())?;
        }
        for echoarea in &echoareas {
            self.add_echoarea(echoarea.as_ref())?;
        }
        Ok(())
    }

    pub fn remove_echoareas<I, T>(&mut self, echoareas: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for echoarea in echoareas {
            self.remove_echoarea(echoarea.as_ref());
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// How many trailing ids to request so every subscribed echoarea catches
    /// up: the largest `remote - local` count difference, or 0.
    pub async fn catch_up_depth(&self) -> Result<usize> {
        if self.echoareas.is_empty() {
            return Ok(0);
        }
        let remote = self.remote.counts(&self.echoareas).await?;
        let local = self.store.count_for(&self.echoareas).await?;

        let depth = self
            .echoareas
            .iter()
            .map(|echoarea| {
                let theirs = remote.get(echoarea).copied().unwrap_or(0);
                let ours = local.get(echoarea).copied().unwrap_or(0);
                theirs.saturating_sub(ours)
            })
            .max()
            .unwrap_or(0);
        Ok(depth)
    }

    /// Run one sync pass. `report.saved` is the number of merged messages.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let mut report = SyncReport {
            depth: self.catch_up_depth().await?,
            ..SyncReport::default()
        };
        if report.depth == 0 {
            tracing::debug!(echoareas = ?self.echoareas, "already up to date");
            return Ok(report);
        }

        let index = self.remote.index(&self.echoareas, report.depth).await?;
        report.offered = index.len();

        let blacklist = if self.config.honor_remote_blacklist {
            self.remote.blacklist().await?
        } else {
            Default::default()
        };

        let mut seen = HashSet::with_capacity(index.len());
        let mut wanted: Vec<MsgId> = Vec::new();
        for msgid in index {
            if !seen.insert(msgid.clone()) {
                continue;
            }
            if blacklist.contains(&msgid) {
                report.blacklisted += 1;
                continue;
            }
            if self.store.exists(&msgid).await? {
                continue;
            }
            wanted.push(msgid);
        }
        report.requested = wanted.len();

        for batch in wanted.chunks(self.config.bundle_batch_size.max(1)) {
            let requested: HashSet<&MsgId> = batch.iter().collect();
            let (entries, extra): (Vec<_>, Vec<_>) = self
                .remote
                .bundle(batch)
                .await?
                .into_iter()
                .partition(|entry| requested.contains(&entry.msgid));
            report.discarded += extra.len();
            report.fetched += entries.len();
            report.saved += self.store.put_batch(&entries).await?;
        }

        tracing::info!(
            depth = report.depth,
            requested = report.requested,
            saved = report.saved,
            "sync pass complete"
        );
        Ok(report)
    }

    /// Send a submission to the remote as this client's point.
    pub async fn send(&self, submission: &Submission) -> Result<String> {
        let auth = self
            .auth
            .as_deref()
            .ok_or_else(|| SyncError::NotAuthorized("no authstr configured".into()))?;
        submission.validate()?;
        self.remote
            .post_point_message(auth, &submission.encode())
            .await
    }
}
