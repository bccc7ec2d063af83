//! Error taxonomy.
//!
//! Two disjoint kinds:
//! - [`MerkleError`]: structural/precondition failures. Fatal for the call that
//!   produced them and never retried.
//! - [`CacheError`]: a per-height sink rejected a write. Advisory only; the
//!   cascade that triggered it still completed and the in-memory root/proof
//!   remain correct.
//!
//! A verifier that reconstructs a different root returns `Ok(false)`; that is
//! a rejected proof, not an error.

use std::io;
use thiserror::Error;

/// Structural and precondition errors for building and verifying trees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The number of inserted leaves is not a power of two.
    #[error("number of leaves must be a power of 2 (got {leaves})")]
    IncompleteTree {
        /// Leaves inserted so far.
        leaves: u64,
    },

    /// Positions are not strictly ascending (unsorted or duplicated).
    #[error("positions must be strictly ascending: {prev} followed by {next} at index {index}")]
    UnsortedPositions {
        /// Index of the offending entry.
        index: usize,
        /// Preceding value.
        prev: u64,
        /// Offending value.
        next: u64,
    },

    /// Positions and leaf values differ in length.
    #[error("got {positions} positions but {values} leaf values")]
    LengthMismatch {
        /// Number of positions supplied.
        positions: usize,
        /// Number of values supplied.
        values: usize,
    },

    /// Verification needs at least one proven leaf.
    #[error("no leaf positions to verify")]
    NoPositions,

    /// A position lies outside the tree.
    #[error("position {position} is outside a tree of {leaf_count} leaves")]
    PositionOutOfRange {
        /// The offending position.
        position: u64,
        /// Width of the tree.
        leaf_count: u64,
    },

    /// The proof ran out before every missing sibling was supplied.
    #[error("proof exhausted: {needed} elements required, {supplied} supplied")]
    ProofExhausted {
        /// Elements the reconstruction requires.
        needed: usize,
        /// Elements actually present.
        supplied: usize,
    },

    /// The proof has elements left over for a fixed-width tree.
    #[error("proof has {extra} unused trailing elements")]
    TrailingProof {
        /// Number of unconsumed elements.
        extra: usize,
    },

    /// The implied tree is taller than a `u64` position space allows.
    #[error("implied tree height {height} exceeds 64")]
    TreeTooTall {
        /// Implied height.
        height: usize,
    },

    /// A declared leaf count is not a power of two.
    #[error("leaf count {0} is not a power of 2")]
    LeafCountNotPowerOfTwo(u64),
}

/// A per-height sink failed while mirroring a node value.
#[derive(Debug, Error)]
#[error("error while caching at height {height}: {source}")]
pub struct CacheError {
    /// Height of the sink that failed.
    pub height: u32,
    /// Underlying I/O failure.
    #[source]
    pub source: io::Error,
}

/// Result alias for structural operations.
pub type Result<T, E = MerkleError> = std::result::Result<T, E>;
