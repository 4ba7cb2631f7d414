//! # IDEC Core
//!
//! Pure primitives for an IDEC echomail node: canonical message records,
//! content-derived msgids, point submissions and sync bundles.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! a pure function of its inputs (the caller supplies timestamps and random
//! number generators).
//!
//! ## Key Types
//!
//! - [`Message`] - A canonical echomail record, split into its fields
//! - [`MsgId`] - The 20-character content-derived message identifier
//! - [`Submission`] - A message as submitted by a point, before canonicalization
//! - [`PointIdentity`] - Name and address of an authenticated point
//! - [`BundleEntry`] - A `msgid:base64(record)` pair exchanged during sync
//!
//! ## Canonicalization
//!
//! ```rust
//! use idec_core::{codec, PointIdentity, Submission};
//!
//! let point = PointIdentity::new("bob", "1");
//! let submission = Submission::new("chat", "All", "hi", "hello");
//! let admitted = codec::admit(&point, &submission, 1_600_000_000).unwrap();
//! assert_eq!(admitted.msgid.as_str().len(), 20);
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod message;
pub mod submission;
pub mod types;

pub use codec::{admit, canonicalize, Admitted, BundleEntry, MAX_MESSAGE_SIZE};
pub use crypto::{derive_authstr, generate_authstr, msgid_for};
pub use error::{CoreError, Result};
pub use message::{Message, BASE_TAGS};
pub use submission::Submission;
pub use types::{validate_echoarea, validate_username, MsgId, PointIdentity};
