//! # IDEC Node
//!
//! A complete echomail node: a store, the HTTP surface downlinks and points
//! talk to, and a sync client for pulling from an uplink.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idec_node::{router_remote, Node, NodeConfig};
//!
//! async fn example() {
//!     let uplink = Node::open(NodeConfig::from_file("uplink.toml").unwrap()).unwrap();
//!     let node = Node::open(NodeConfig::from_file("idec.toml").unwrap()).unwrap();
//!
//!     // In-process, through the uplink's router.
//!     let remote = Arc::new(router_remote(uplink.router()));
//!     let client = node.sync_client(remote).unwrap();
//!     client.sync_once().await.unwrap();
//!
//!     // Over the network, to the `[uplink] url` of the configuration.
//!     let report = node.fetch().await.unwrap();
//!     println!("{} new messages", report.saved);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `idec_node::core` - message codec and identifiers
//! - `idec_node::store` - storage backends
//! - `idec_node::sync` - tossing, responder and sync client

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod node;
pub mod remote;
pub mod uplink;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use logging::init_logging;
pub use node::Node;
pub use remote::{router_remote, RouterGateway, RouterRemote};
pub use uplink::{http_remote, HttpGateway, HttpRemote};

pub use idec_core as core;
pub use idec_store as store;
pub use idec_sync as sync;
