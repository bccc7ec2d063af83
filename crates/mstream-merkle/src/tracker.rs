//! Classifies the leaf stream against the positions declared for proving.

use crate::error::{MerkleError, Result};

/// Fail unless `positions` is strictly ascending.
pub(crate) fn check_ascending(positions: &[u64]) -> Result<()> {
    for (i, w) in positions.windows(2).enumerate() {
        if w[1] <= w[0] {
            return Err(MerkleError::UnsortedPositions {
                index: i + 1,
                prev: w[0],
                next: w[1],
            });
        }
    }
    Ok(())
}

/// Sparse boolean stream: `true` exactly at the declared positions.
///
/// [`pop`](Self::pop) is called once per inserted leaf, in order, starting at
/// position 0. With no declared positions every call returns `false`.
#[derive(Clone, Debug, Default)]
pub struct ProvenIndexTracker {
    positions: Vec<u64>,
    head: usize,
    cursor: u64,
}

impl ProvenIndexTracker {
    /// Build a tracker over strictly ascending `positions`.
    pub fn new(positions: Vec<u64>) -> Result<Self> {
        check_ascending(&positions)?;
        Ok(Self {
            positions,
            head: 0,
            cursor: 0,
        })
    }

    /// Classify the next position and advance the cursor.
    pub fn pop(&mut self) -> bool {
        let hit = self.positions.get(self.head) == Some(&self.cursor);
        if hit {
            self.head += 1;
        }
        self.cursor += 1;
        hit
    }

    /// Declared positions not reached yet.
    #[must_use]
    pub fn remaining(&self) -> &[u64] {
        &self.positions[self.head..]
    }

    /// Next position [`pop`](Self::pop) will classify, i.e. leaves seen so far.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_never_fires() {
        let mut t = ProvenIndexTracker::default();
        assert!((0..16).all(|_| !t.pop()));
        assert_eq!(t.cursor(), 16);
        assert!(t.remaining().is_empty());
    }

    #[test]
    fn fires_exactly_on_declared_positions() {
        let mut t = ProvenIndexTracker::new(vec![0, 3, 4, 9]).unwrap();
        let mut hits = Vec::new();
        for i in 0..12u64 {
            if t.pop() {
                hits.push(i);
            }
        }
        assert_eq!(hits, vec![0, 3, 4, 9]);
        assert!(t.remaining().is_empty());
    }

    #[test]
    fn remaining_reports_unreached_positions() {
        let mut t = ProvenIndexTracker::new(vec![1, 6]).unwrap();
        for _ in 0..4 {
            t.pop();
        }
        assert_eq!(t.remaining(), &[6]);
    }

    #[test]
    fn rejects_unsorted_and_duplicates() {
        assert_eq!(
            ProvenIndexTracker::new(vec![2, 1]).unwrap_err(),
            MerkleError::UnsortedPositions {
                index: 1,
                prev: 2,
                next: 1
            }
        );
        assert!(matches!(
            ProvenIndexTracker::new(vec![0, 4, 4]),
            Err(MerkleError::UnsortedPositions { index: 2, .. })
        ));
    }
}
