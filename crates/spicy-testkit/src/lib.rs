//! # Spicy Testkit
//!
//! Testing utilities for Spicy Signatures.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Record encodings pinned for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A known-good envelope and an in-memory test log
//!
//! ## Golden Vectors
//!
//! ```rust
//! use spicy_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, record) in verify_all_vectors() {
//!     assert!(matches, "{name}: {record}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use spicy_testkit::generators::{envelope_from_params, EnvelopeParams};
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(params: EnvelopeParams) {
//!         let a = envelope_from_params(&params).encode();
//!         let b = envelope_from_params(&params).encode();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use spicy_testkit::fixtures::{fixture_verifier, FIXTURE_BODY, FIXTURE_ENVELOPE};
//!
//! let verified = fixture_verifier()
//!     .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
//!     .unwrap();
//! assert_eq!(verified.index, 100252);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixture_policy, fixture_verifier, init_tracing, TestLog};
pub use generators::{envelope_from_params, EnvelopeParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
