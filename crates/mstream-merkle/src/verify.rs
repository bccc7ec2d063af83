//! Multi-leaf proof verification.
//!
//! The verifier replays the builder's pairings level by level using only the
//! proven leaves and the proof. At every height each live node either meets
//! its live sibling or takes the missing one from the proof.
//!
//! Proof elements are read in the order the builder emitted them, which is
//! not level order: the builder appends a sibling when the pairing above it
//! completes, i.e. when the last leaf under the parent arrives, lower heights
//! first. Verification therefore runs in two passes: plan every merge and rank
//! the missing siblings by that emission time, then hash level by level.
//!
//! Width is not part of the wire format. [`verify`] derives the height from
//! the positions and the proof length; [`verify_with_leaf_count`] pins it.

use std::cmp::Ordering;

use crate::error::{MerkleError, Result};
use crate::tracker::check_ascending;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Merge {
    /// Both children are live.
    Pair,
    /// The sibling is missing; it is proof slot `slot`.
    Proof { slot: usize },
}

/// Merge schedule for a set of positions in a tree of fixed height.
#[derive(Debug)]
struct Plan {
    levels: Vec<Vec<Merge>>,
    /// Proof index for each slot, by slot number.
    ranks: Vec<usize>,
}

impl Plan {
    fn new(positions: &[u64], height: usize) -> Self {
        let mut live = positions.to_vec();
        let mut levels = Vec::with_capacity(height);
        let mut keyed: Vec<((u128, usize), usize)> = Vec::new();

        for level in 0..height {
            let mut merges = Vec::with_capacity(live.len());
            let mut next = Vec::with_capacity(live.len());
            let mut i = 0;
            while i < live.len() {
                let p = live[i];
                if p & 1 == 0 && live.get(i + 1) == Some(&(p | 1)) {
                    merges.push(Merge::Pair);
                    i += 2;
                } else {
                    let slot = keyed.len();
                    keyed.push((emission_time(level, p >> 1), slot));
                    merges.push(Merge::Proof { slot });
                    i += 1;
                }
                next.push(p >> 1);
            }
            levels.push(merges);
            live = next;
        }

        keyed.sort_unstable();
        let mut ranks = vec![0; keyed.len()];
        for (rank, &(_, slot)) in keyed.iter().enumerate() {
            ranks[slot] = rank;
        }
        Self { levels, ranks }
    }

    fn slots(&self) -> usize {
        self.ranks.len()
    }
}

/// When the builder combines parent `parent` at height `level + 1`: on the
/// arrival of the last leaf beneath it, lower heights first.
fn emission_time(level: usize, parent: u64) -> (u128, usize) {
    let last_leaf = ((u128::from(parent) + 1) << (level + 1)) - 1;
    (last_leaf, level)
}

fn check_inputs(positions: &[u64], values: usize) -> Result<()> {
    if positions.len() != values {
        return Err(MerkleError::LengthMismatch {
            positions: positions.len(),
            values,
        });
    }
    if positions.is_empty() {
        return Err(MerkleError::NoPositions);
    }
    check_ascending(positions)
}

/// Bit length of the highest position: the lowest height that can hold it.
fn min_height(positions: &[u64]) -> usize {
    let max = positions.last().copied().unwrap_or(0);
    (u64::BITS - max.leading_zeros()) as usize
}

fn replay<L, P, H>(plan: &Plan, positions: &[u64], leaves: &[L], proof: &[P], hash: &H) -> Vec<u8>
where
    L: AsRef<[u8]>,
    P: AsRef<[u8]>,
    H: Fn(&[u8], &[u8]) -> Vec<u8>,
{
    let mut pos = positions.to_vec();
    let mut live: Vec<Vec<u8>> = leaves.iter().map(|l| l.as_ref().to_vec()).collect();

    for merges in &plan.levels {
        let mut next_pos = Vec::with_capacity(merges.len());
        let mut next_live = Vec::with_capacity(merges.len());
        let mut i = 0;
        for merge in merges {
            let p = pos[i];
            let parent = match *merge {
                Merge::Pair => {
                    i += 2;
                    hash(&live[i - 2], &live[i - 1])
                }
                Merge::Proof { slot } => {
                    let sibling = proof[plan.ranks[slot]].as_ref();
                    i += 1;
                    if p & 1 == 0 {
                        hash(&live[i - 1], sibling)
                    } else {
                        hash(sibling, &live[i - 1])
                    }
                }
            };
            next_pos.push(p >> 1);
            next_live.push(parent);
        }
        pos = next_pos;
        live = next_live;
    }

    live.swap_remove(0)
}

/// Check that `leaves` at `positions` belong to the tree with `root`.
///
/// `positions` must be strictly ascending and `leaves` in the same order.
/// `proof` is the builder's output for exactly this position set. The tree
/// height is inferred: the lowest height holding every position, plus one
/// level per proof element beyond what that height needs.
///
/// Returns `Ok(false)` when the reconstruction does not match `root`, and
/// `Err` for malformed input, including a proof too short for the positions
/// ([`MerkleError::ProofExhausted`]).
///
/// The width is not on the wire, so a truncated proof that still covers the
/// highest position reads as a proof for a smaller tree and comes back as
/// `Ok(false)`, not `ProofExhausted`. Use [`verify_with_leaf_count`] when the
/// width is known and truncation must be an error.
pub fn verify<L, P, H>(
    positions: &[u64],
    leaves: &[L],
    proof: &[P],
    root: &[u8],
    hash: H,
) -> Result<bool>
where
    L: AsRef<[u8]>,
    P: AsRef<[u8]>,
    H: Fn(&[u8], &[u8]) -> Vec<u8>,
{
    check_inputs(positions, leaves.len())?;

    let floor = min_height(positions);
    let base = Plan::new(positions, floor);
    if proof.len() < base.slots() {
        return Err(MerkleError::ProofExhausted {
            needed: base.slots(),
            supplied: proof.len(),
        });
    }
    // Above `floor` a single live node remains, costing one element per level.
    let height = floor + (proof.len() - base.slots());
    if height > u64::BITS as usize {
        return Err(MerkleError::TreeTooTall { height });
    }
    let plan = if height == floor {
        base
    } else {
        Plan::new(positions, height)
    };

    Ok(replay(&plan, positions, leaves, proof, &hash) == root)
}

/// [`verify`] for a tree of known width.
///
/// `leaf_count` must be a power of two, every position must fall inside it,
/// and the proof must have exactly the length that width requires.
pub fn verify_with_leaf_count<L, P, H>(
    leaf_count: u64,
    positions: &[u64],
    leaves: &[L],
    proof: &[P],
    root: &[u8],
    hash: H,
) -> Result<bool>
where
    L: AsRef<[u8]>,
    P: AsRef<[u8]>,
    H: Fn(&[u8], &[u8]) -> Vec<u8>,
{
    check_inputs(positions, leaves.len())?;
    let plan = fixed_plan(leaf_count, positions)?;
    match proof.len().cmp(&plan.slots()) {
        Ordering::Less => Err(MerkleError::ProofExhausted {
            needed: plan.slots(),
            supplied: proof.len(),
        }),
        Ordering::Greater => Err(MerkleError::TrailingProof {
            extra: proof.len() - plan.slots(),
        }),
        Ordering::Equal => Ok(replay(&plan, positions, leaves, proof, &hash) == root),
    }
}

/// Number of proof elements a tree of `leaf_count` leaves emits for `positions`.
pub fn required_proof_len(leaf_count: u64, positions: &[u64]) -> Result<usize> {
    if positions.is_empty() {
        return Err(MerkleError::NoPositions);
    }
    check_ascending(positions)?;
    Ok(fixed_plan(leaf_count, positions)?.slots())
}

fn fixed_plan(leaf_count: u64, positions: &[u64]) -> Result<Plan> {
    if !leaf_count.is_power_of_two() {
        return Err(MerkleError::LeafCountNotPowerOfTwo(leaf_count));
    }
    if let Some(&position) = positions.iter().find(|&&p| p >= leaf_count) {
        return Err(MerkleError::PositionOutOfRange {
            position,
            leaf_count,
        });
    }
    Ok(Plan::new(positions, leaf_count.trailing_zeros() as usize))
}
