//! Streaming tree builder.
//!
//! Leaves are appended one at a time. The builder keeps one parked node per
//! height, so computing a root over `n` leaves needs `O(log n)` memory and a
//! proof for `k` declared leaves adds `O(k log n)`.
//!
//! ```
//! use mstream_merkle::{hash::{leaf_from_u64, sha256_parent}, verify, TreeBuilder};
//!
//! let mut tree = TreeBuilder::proving(sha256_parent, vec![4])?;
//! for i in 0..8 {
//!     tree.insert(leaf_from_u64(i)).expect("no sinks attached");
//! }
//! let out = tree.finish()?;
//! assert_eq!(out.proof.len(), 3);
//! assert!(verify(&[4], &[leaf_from_u64(4)], &out.proof, &out.root, sha256_parent)?);
//! # Ok::<(), mstream_merkle::MerkleError>(())
//! ```

use tracing::debug;

use crate::error::{CacheError, MerkleError, Result};
use crate::layer::{LayerChain, Node, Top};
use crate::sink::NodeSink;
use crate::tracker::ProvenIndexTracker;

/// Root, proof and width of a finished tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeOutput {
    /// Root digest.
    pub root: Vec<u8>,
    /// Proof elements in emission order (empty in plain mode).
    pub proof: Vec<Vec<u8>>,
    /// Number of leaves inserted.
    pub leaf_count: u64,
}

/// Incremental Merkle tree over a power-of-two number of leaves.
///
/// Not thread safe: every mutation takes `&mut self` and the builder is meant
/// to be fed by a single producer.
pub struct TreeBuilder<'s, H> {
    layers: LayerChain<'s>,
    hash: H,
    proof: Vec<Vec<u8>>,
    tracker: ProvenIndexTracker,
}

impl<'s, H> TreeBuilder<'s, H>
where
    H: Fn(&[u8], &[u8]) -> Vec<u8>,
{
    /// Plain root computation.
    pub fn new(hash: H) -> Self {
        Self {
            layers: LayerChain::new(),
            hash,
            proof: Vec::new(),
            tracker: ProvenIndexTracker::default(),
        }
    }

    /// Root computation plus a proof for the strictly ascending `positions`.
    pub fn proving(hash: H, positions: Vec<u64>) -> Result<Self> {
        let tracker = ProvenIndexTracker::new(positions)?;
        Ok(Self {
            tracker,
            ..Self::new(hash)
        })
    }

    /// Mirror every node computed at `height` into `sink`.
    ///
    /// Attach sinks before inserting: a sink added after its height has
    /// already seen nodes only receives the ones that follow.
    #[must_use]
    pub fn with_sink(mut self, height: u32, sink: impl NodeSink + 's) -> Self {
        self.layers.set_sink(height, Box::new(sink));
        self
    }

    /// Append the next leaf.
    ///
    /// The tree state is always updated. An `Err` only reports that a sink
    /// rejected a write during this insertion (the last such failure).
    pub fn insert(&mut self, value: impl Into<Vec<u8>>) -> Result<(), CacheError> {
        let leaf = Node::leaf(value.into(), self.tracker.pop());
        match self.layers.cascade(leaf, &self.hash, &mut self.proof) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Root of the tree.
    ///
    /// Fails with [`MerkleError::IncompleteTree`] unless the leaf count is a
    /// non-zero power of two.
    pub fn root(&self) -> Result<&[u8]> {
        match self.layers.top() {
            Top::Root(root) => Ok(root),
            Top::Incomplete => Err(MerkleError::IncompleteTree {
                leaves: self.leaf_count(),
            }),
        }
    }

    /// Proof for the declared positions, in emission order.
    ///
    /// Checks completeness like [`root`](Self::root) and rejects declared
    /// positions the leaf stream never reached.
    pub fn proof(&self) -> Result<&[Vec<u8>]> {
        self.root()?;
        if let Some(&position) = self.tracker.remaining().first() {
            return Err(MerkleError::PositionOutOfRange {
                position,
                leaf_count: self.leaf_count(),
            });
        }
        Ok(&self.proof)
    }

    /// Leaves inserted so far.
    #[inline]
    #[must_use]
    pub const fn leaf_count(&self) -> u64 {
        self.tracker.cursor()
    }

    /// Heights created so far above the leaf layer.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.layers.len() - 1
    }

    /// Flush all sinks; failures are advisory like those from [`insert`](Self::insert).
    pub fn flush_sinks(&mut self) -> Result<(), CacheError> {
        self.layers.flush_sinks()
    }

    /// Consume the builder and return root, proof and leaf count.
    pub fn finish(self) -> Result<TreeOutput> {
        self.proof()?;
        let root = self.root()?.to_vec();
        let leaf_count = self.leaf_count();
        debug!(
            leaves = leaf_count,
            proof_len = self.proof.len(),
            root = %hex::encode(&root),
            "tree finished"
        );
        Ok(TreeOutput {
            root,
            proof: self.proof,
            leaf_count,
        })
    }
}

impl<H> std::fmt::Debug for TreeBuilder<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("layers", &self.layers)
            .field("proof_len", &self.proof.len())
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
