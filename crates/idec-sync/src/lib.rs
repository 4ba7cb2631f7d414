//! # IDEC Sync
//!
//! Everything that moves messages in and out of a node: tossing point
//! submissions, answering protocol requests and pulling from an uplink.
//!
//! ## Overview
//!
//! - [`TossingService`] admits a point's submission into the store.
//! - [`Responder`] renders the text answers a node serves to its downlinks.
//! - [`SyncClient`] pulls subscribed echoareas from a [`RemoteNode`].
//! - [`wire`] holds the path layout and the line formats shared by all three.
//!
//! ## Key Properties
//!
//! - **Idempotent**: re-running a sync or re-tossing a message writes nothing
//! - **Content addressed**: msgids are derived from the record, so every node
//!   agrees on them without coordination
//! - **Single pass**: a sync pass makes no retries; the next pass resumes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idec_store::SqliteStore;
//! use idec_sync::{LoopbackRemote, SyncClient};
//!
//! async fn example() {
//!     let local = Arc::new(SqliteStore::open("downlink.db").unwrap());
//!     let uplink = Arc::new(SqliteStore::open("uplink.db").unwrap());
//!     let remote = Arc::new(LoopbackRemote::over_store(uplink));
//!
//!     let mut client = SyncClient::new(local, remote);
//!     client.add_echoareas(["ii.test.14"]).unwrap();
//!     let report = client.sync_once().await.unwrap();
//!     println!("merged {} messages", report.saved);
//! }
//! ```

pub mod client;
pub mod error;
pub mod remote;
pub mod responder;
pub mod toss;
pub mod wire;

pub use client::{SyncClient, SyncConfig, SyncReport};
pub use error::{Result, SyncError};
pub use remote::{Gateway, GatewayRemote, LoopbackRemote, RemoteNode};
pub use responder::Responder;
pub use toss::{TossResponse, TossingService};
pub use wire::{EchoareaInfo, IndexSlice};
