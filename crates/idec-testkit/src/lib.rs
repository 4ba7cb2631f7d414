//! # IDEC Testkit
//!
//! Testing utilities for IDEC nodes.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: records and authstr inputs with the strings every node must derive
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: stores of either backend, seeded with messages
//!
//! ## Golden Vectors
//!
//! ```rust
//! use idec_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed, computed) in verify_all_vectors() {
//!     assert!(passed, "{}: {}", name, computed);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use idec_testkit::generators::{admitted_from_params, SubmissionParams};
//!
//! proptest! {
//!     #[test]
//!     fn msgid_is_deterministic(params: SubmissionParams) {
//!         prop_assert_eq!(
//!             admitted_from_params(&params).msgid,
//!             admitted_from_params(&params).msgid
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use idec_testkit::fixtures::TestFixture;
//!
//! for fixture in TestFixture::all_backends()? {
//!     let ids = fixture.seed("ii.test.14", 10).await?;
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{numbered_submissions, sample_points, TestFixture};
pub use generators::{admitted_from_params, SubmissionParams};
pub use vectors::{all_vectors, authstr_vectors, verify_all_vectors, AuthstrVector, GoldenVector};
