//! Remote node abstraction.
//!
//! [`RemoteNode`] is what a [`SyncClient`](crate::SyncClient) talks to. The
//! HTTP client itself stays outside this crate: anything that can GET a path
//! and POST a form implements [`Gateway`], and [`GatewayRemote`] turns it into
//! a `RemoteNode` by building legacy paths and parsing the text answers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use idec_core::{BundleEntry, MsgId};
use idec_store::Store;

use crate::error::{Result, SyncError};
use crate::responder::Responder;
use crate::wire::{self, EchoareaInfo, IndexSlice};

/// The operations a node offers to its downlinks.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    /// Message counts per echoarea (`/x/c/`).
    async fn counts(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>>;

    /// The trailing `depth` ids of each echoarea, or whole indexes when
    /// `depth` is 0 (`/u/e/`).
    async fn index(&self, echoareas: &[String], depth: usize) -> Result<Vec<MsgId>>;

    /// Bodies of the given messages (`/u/m/`). Unknown ids are left out.
    async fn bundle(&self, msgids: &[MsgId]) -> Result<Vec<BundleEntry>>;

    /// One message (`/m/`).
    async fn message(&self, msgid: &MsgId) -> Result<Option<String>>;

    /// Index of a single echoarea (`/e/`).
    async fn echoarea_index(&self, echoarea: &str) -> Result<Vec<MsgId>>;

    /// The advertised echoareas (`/list.txt`).
    async fn echoarea_list(&self) -> Result<Vec<EchoareaInfo>>;

    /// Msgids the remote refuses to serve (`/blacklist.txt`).
    async fn blacklist(&self) -> Result<BTreeSet<MsgId>>;

    /// Submit a point message (`POST /u/point`); returns the status line.
    async fn post_point_message(&self, pauth: &str, tmsg: &str) -> Result<String>;
}

fn slice_for(depth: usize) -> Option<IndexSlice> {
    (depth > 0).then(|| IndexSlice::last(depth))
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

/// Minimal HTTP surface of a remote node.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// GET `path`. `Ok(None)` when the remote answers 404.
    async fn get(&self, path: &str) -> Result<Option<String>>;

    /// POST a url-encoded form to `path` and return the body.
    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String>;
}

/// A [`RemoteNode`] speaking the legacy text protocol through a [`Gateway`].
pub struct GatewayRemote<G> {
    gateway: G,
}

impl<G: Gateway> GatewayRemote<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn get_required(&self, path: &str) -> Result<String> {
        self.gateway
            .get(path)
            .await?
            .ok_or_else(|| SyncError::Transport(format!("{} not found on remote", path)))
    }
}

#[async_trait]
impl<G: Gateway> RemoteNode for GatewayRemote<G> {
    async fn counts(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>> {
        if echoareas.is_empty() {
            return Ok(BTreeMap::new());
        }
        wire::parse_counts(&self.get_required(&wire::counts_path(echoareas)).await?)
    }

    async fn index(&self, echoareas: &[String], depth: usize) -> Result<Vec<MsgId>> {
        if echoareas.is_empty() {
            return Ok(Vec::new());
        }
        let path = wire::universal_index_path(echoareas, slice_for(depth));
        Ok(wire::parse_index(&self.get_required(&path).await?))
    }

    async fn bundle(&self, msgids: &[MsgId]) -> Result<Vec<BundleEntry>> {
        if msgids.is_empty() {
            return Ok(Vec::new());
        }
        let path = wire::universal_bundle_path(msgids);
        Ok(wire::parse_bundle(&self.get_required(&path).await?))
    }

    async fn message(&self, msgid: &MsgId) -> Result<Option<String>> {
        self.gateway.get(&wire::message_path(msgid)).await
    }

    async fn echoarea_index(&self, echoarea: &str) -> Result<Vec<MsgId>> {
        let path = wire::echoarea_path(echoarea);
        Ok(wire::parse_index(&self.get_required(&path).await?))
    }

    async fn echoarea_list(&self) -> Result<Vec<EchoareaInfo>> {
        wire::parse_list_txt(&self.get_required(wire::LIST_TXT_PATH).await?)
    }

    async fn blacklist(&self) -> Result<BTreeSet<MsgId>> {
        match self.gateway.get(wire::BLACKLIST_PATH).await? {
            Some(text) => Ok(wire::parse_blacklist(&text)),
            // Nodes without a blacklist simply do not serve the file.
            None => Ok(BTreeSet::new()),
        }
    }

    async fn post_point_message(&self, pauth: &str, tmsg: &str) -> Result<String> {
        self.gateway
            .post_form(wire::POINT_PATH, &[("pauth", pauth), ("tmsg", tmsg)])
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loopback
// ─────────────────────────────────────────────────────────────────────────────

/// A [`RemoteNode`] backed by a local [`Responder`].
///
/// Responses still go through the text rendering and parsing, so a loopback
/// sync behaves like one over the network.
pub struct LoopbackRemote<S: Store + ?Sized> {
    responder: Responder<S>,
}

impl<S: Store + ?Sized> LoopbackRemote<S> {
    pub fn new(responder: Responder<S>) -> Self {
        Self { responder }
    }

    pub fn over_store(store: Arc<S>) -> Self {
        Self::new(Responder::new(store))
    }
}

#[async_trait]
impl<S: Store + ?Sized> RemoteNode for LoopbackRemote<S> {
    async fn counts(&self, echoareas: &[String]) -> Result<BTreeMap<String, usize>> {
        wire::parse_counts(&self.responder.counts(&echoareas.join("/")).await?)
    }

    async fn index(&self, echoareas: &[String], depth: usize) -> Result<Vec<MsgId>> {
        let path = wire::universal_index_path(echoareas, slice_for(depth));
        let tail = path.trim_start_matches("/u/e/");
        Ok(wire::parse_index(&self.responder.universal_index(tail).await?))
    }

    async fn bundle(&self, msgids: &[MsgId]) -> Result<Vec<BundleEntry>> {
        let tail: Vec<&str> = msgids.iter().map(MsgId::as_str).collect();
        Ok(wire::parse_bundle(
            &self.responder.universal_bundle(&tail.join("/")).await?,
        ))
    }

    async fn message(&self, msgid: &MsgId) -> Result<Option<String>> {
        self.responder.message(msgid.as_str()).await
    }

    async fn echoarea_index(&self, echoarea: &str) -> Result<Vec<MsgId>> {
        Ok(wire::parse_index(
            &self.responder.echoarea_index(echoarea).await?,
        ))
    }

    async fn echoarea_list(&self) -> Result<Vec<EchoareaInfo>> {
        wire::parse_list_txt(&self.responder.list_txt().await?)
    }

    async fn blacklist(&self) -> Result<BTreeSet<MsgId>> {
        Ok(wire::parse_blacklist(&self.responder.blacklist_txt().await?))
    }

    async fn post_point_message(&self, pauth: &str, tmsg: &str) -> Result<String> {
        self.responder.point_message(pauth, tmsg).await
    }
}
