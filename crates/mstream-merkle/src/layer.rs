//! Height-indexed parking slots and the insertion cascade.
//!
//! Each height holds at most one node waiting for its right sibling. Slots
//! live in a `Vec` indexed by height; height `h + 1` is pushed the first time
//! a pairing completes at height `h`, so a complete tree of `2^k` leaves ends
//! with `k + 1` slots and only the top one occupied.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::error::CacheError;
use crate::sink::NodeSink;

/// A node passing through the cascade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Leaf bytes or parent digest.
    pub value: Vec<u8>,
    /// Proven leaf, or ancestor of one.
    pub on_proven_path: bool,
}

impl Node {
    /// Leaf node.
    #[inline]
    #[must_use]
    pub const fn leaf(value: Vec<u8>, on_proven_path: bool) -> Self {
        Self {
            value,
            on_proven_path,
        }
    }
}

struct Layer<'s> {
    height: u32,
    parked: Option<Node>,
    sink: Option<Box<dyn NodeSink + 's>>,
}

impl<'s> Layer<'s> {
    fn new(height: u32, sink: Option<Box<dyn NodeSink + 's>>) -> Self {
        Self {
            height,
            parked: None,
            sink,
        }
    }
}

/// Outcome of reading the top of the chain.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Top<'a> {
    /// Every lower slot is empty; the top slot holds the root.
    Root(&'a [u8]),
    /// Some lower slot still waits for a sibling, or nothing was inserted.
    Incomplete,
}

/// Chain of parking slots with optional per-height sinks.
pub struct LayerChain<'s> {
    layers: Vec<Layer<'s>>,
    /// Sinks for heights that have not been reached yet.
    pending_sinks: BTreeMap<u32, Box<dyn NodeSink + 's>>,
}

impl<'s> LayerChain<'s> {
    /// Chain holding only the leaf layer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::new(0, None)],
            pending_sinks: BTreeMap::new(),
        }
    }

    /// Attach a sink to `height`. Replaces any sink already registered there.
    pub fn set_sink(&mut self, height: u32, sink: Box<dyn NodeSink + 's>) {
        match self.layers.get_mut(height as usize) {
            Some(layer) => layer.sink = Some(sink),
            None => {
                self.pending_sinks.insert(height, sink);
            }
        }
    }

    /// Number of slots created so far (leaf layer included).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: the leaf layer exists from the start.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Push one leaf through the chain.
    ///
    /// Every completed pairing whose parent is on the proven path appends the
    /// children that are not (left first, then right) to `proof`. Returns the
    /// last sink failure seen during the walk; the walk itself always finishes.
    pub fn cascade<H>(
        &mut self,
        leaf: Node,
        hash: &H,
        proof: &mut Vec<Vec<u8>>,
    ) -> Option<CacheError>
    where
        H: Fn(&[u8], &[u8]) -> Vec<u8>,
    {
        let mut n = leaf;
        let mut last_err = None;
        let mut h = 0usize;

        loop {
            let layer = &mut self.layers[h];

            if let Some(sink) = layer.sink.as_mut() {
                if let Err(source) = sink.write_node(&n.value) {
                    warn!(height = layer.height, error = %source, "node sink write failed");
                    last_err = Some(CacheError {
                        height: layer.height,
                        source,
                    });
                }
            }

            let Some(left) = layer.parked.take() else {
                layer.parked = Some(n);
                break;
            };

            let right = n;
            let parent = Node {
                value: hash(&left.value, &right.value),
                on_proven_path: left.on_proven_path || right.on_proven_path,
            };

            // A child is needed iff its parent is on the path and it is not.
            if parent.on_proven_path {
                for child in [left, right] {
                    if !child.on_proven_path {
                        trace!(height = h, index = proof.len(), "proof element");
                        proof.push(child.value);
                    }
                }
            }

            self.ensure_layer(h + 1);
            n = parent;
            h += 1;
        }

        last_err
    }

    fn ensure_layer(&mut self, h: usize) {
        if self.layers.len() > h {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let height = h as u32;
        let sink = self.pending_sinks.remove(&height);
        debug!(height, cached = sink.is_some(), "layer created");
        self.layers.push(Layer::new(height, sink));
    }

    /// Walk the slots bottom-up looking for the root.
    pub(crate) fn top(&self) -> Top<'_> {
        let Some((top, below)) = self.layers.split_last() else {
            return Top::Incomplete;
        };
        if below.iter().any(|l| l.parked.is_some()) {
            return Top::Incomplete;
        }
        top.parked
            .as_ref()
            .map_or(Top::Incomplete, |n| Top::Root(&n.value))
    }

    /// Flush every attached sink, returning the last failure.
    pub fn flush_sinks(&mut self) -> Result<(), CacheError> {
        let mut last_err = None;
        let attached = self
            .layers
            .iter_mut()
            .filter_map(|l| {
                let height = l.height;
                l.sink.as_mut().map(|s| (height, s))
            })
            .chain(self.pending_sinks.iter_mut().map(|(h, s)| (*h, s)));
        for (height, sink) in attached {
            if let Err(source) = sink.flush() {
                warn!(height, error = %source, "node sink flush failed");
                last_err = Some(CacheError { height, source });
            }
        }
        last_err.map_or(Ok(()), Err)
    }
}

impl Default for LayerChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayerChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parked: Vec<bool> = self.layers.iter().map(|l| l.parked.is_some()).collect();
        f.debug_struct("LayerChain")
            .field("parked", &parked)
            .field("pending_sinks", &self.pending_sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(l: &[u8], r: &[u8]) -> Vec<u8> {
        [l, r].concat()
    }

    #[test]
    fn chain_grows_one_height_per_completed_level() {
        let mut chain = LayerChain::new();
        let mut proof = Vec::new();
        let mut lens = Vec::new();
        for i in 0u8..8 {
            assert!(chain.cascade(Node::leaf(vec![i], false), &concat, &mut proof).is_none());
            lens.push(chain.len());
        }
        assert_eq!(lens, vec![1, 2, 2, 3, 3, 3, 3, 4]);
        assert_eq!(chain.top(), Top::Root(&[0, 1, 2, 3, 4, 5, 6, 7]));
        assert!(proof.is_empty());
    }

    #[test]
    fn odd_count_is_incomplete() {
        let mut chain = LayerChain::new();
        let mut proof = Vec::new();
        assert_eq!(chain.top(), Top::Incomplete);
        for i in 0u8..3 {
            chain.cascade(Node::leaf(vec![i], false), &concat, &mut proof);
        }
        assert_eq!(chain.top(), Top::Incomplete);
    }

    #[test]
    fn emits_off_path_children_left_then_right() {
        let mut chain = LayerChain::new();
        let mut proof = Vec::new();
        // Prove leaf 2 of 4.
        for i in 0u8..4 {
            chain.cascade(Node::leaf(vec![i], i == 2), &concat, &mut proof);
        }
        assert_eq!(proof, vec![vec![3], vec![0, 1]]);
    }

    #[test]
    fn sinks_registered_ahead_attach_when_height_appears() {
        let mut h0: Vec<Vec<u8>> = Vec::new();
        let mut h2: Vec<Vec<u8>> = Vec::new();
        let mut proof = Vec::new();
        {
            let mut chain = LayerChain::new();
            chain.set_sink(0, Box::new(&mut h0));
            chain.set_sink(2, Box::new(&mut h2));
            for i in 0u8..4 {
                chain.cascade(Node::leaf(vec![i], false), &concat, &mut proof);
            }
            chain.flush_sinks().unwrap();
        }
        assert_eq!(h0, vec![vec![0], vec![1], vec![2], vec![3]]);
        assert_eq!(h2, vec![vec![0, 1, 2, 3]]);
    }
}
