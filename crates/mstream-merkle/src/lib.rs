// crates/mstream-merkle/src/lib.rs

//! Streaming Merkle roots with multi-leaf membership proofs.
//!
//! - [`TreeBuilder`] folds leaves into a root one at a time using one parked
//!   node per height, and optionally collects the sibling digests needed to
//!   prove a set of positions declared up front.
//! - [`verify`] / [`verify_with_leaf_count`] recompute the root from the proven
//!   leaves and the proof alone.
//! - Per-height [`NodeSink`]s mirror every computed node for persistence;
//!   their failures are advisory ([`CacheError`]).
//! - [`ProofBundle`] packages a proof for JSON/CBOR transport.
//!
//! The hash is injected as any `Fn(&[u8], &[u8]) -> Vec<u8>`; see [`hash`]
//! for SHA-256 and BLAKE3 parents and leaf encoding helpers.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Structural and advisory error types.
pub mod error;
/// Parent hashes, hash selection and leaf encodings.
pub mod hash;
/// Proof bundle envelope and JSON/CBOR I/O.
pub mod io;
/// Height-indexed parking slots and the insertion cascade.
pub mod layer;
/// Per-height node sinks.
pub mod sink;
/// Proven-position tracking over the leaf stream.
pub mod tracker;
/// Streaming tree builder.
pub mod tree;
/// Multi-leaf proof verification.
pub mod verify;

pub use error::{CacheError, MerkleError};
pub use hash::{HashFn, HashKind};
pub use io::ProofBundle;
pub use sink::{NodeSink, WriterSink};
pub use tracker::ProvenIndexTracker;
pub use tree::{TreeBuilder, TreeOutput};
pub use verify::{required_proof_len, verify, verify_with_leaf_count};
