//! Rhythm tree: recursive equal subdivision of a span of time.
//!
//! Tree is created with the root node only. Every other node appears
//! by subdividing a leaf into N equal parts. Subdivision can happen only
//! once per node, and nodes are never removed: the whole hierarchy lives
//! and dies with the tree.
//!
//! Nodes live in an arena inside the tree and are addressed by [`NodeId`].
//! Parent and children links are ids too, so nothing owns its parent.
//!
//! # Example
//!
//! ```
//! use score_rhythm::primitives::{Rational, RhythmTree};
//!
//! let mut tree = RhythmTree::new(Rational::one());
//! let beats = tree.subdivide(tree.root(), 3).unwrap();
//! tree.subdivide(beats[0], 2).unwrap();
//!
//! let timings: Vec<String> = tree
//!     .leaves()
//!     .map(|leaf| leaf.timing().to_string())
//!     .collect();
//! assert_eq!(timings, vec!["0", "1/6", "1/3", "2/3"]);
//! assert_eq!(tree.subdivision_counts(), vec![3, 2, 0, 0, 0, 0]);
//! assert_eq!(tree.to_string(), "(([ ][ ])[ ][ ])");
//! ```

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Rational, TimeError, TimeResult};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(0);

/// Handle of a node inside a particular [`RhythmTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    tree: u64,
    index: usize,
}
impl NodeId {
    /// Position of the node in creation order (root is 0).
    pub fn index(&self) -> usize {
        self.index
    }
}
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@tree{}", self.index, self.tree)
    }
}

/// Span `[timing, timing + duration)` of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmNode {
    id: NodeId,
    parent: Option<NodeId>,
    depth: usize,
    timing: Rational,
    duration: Rational,
    end: Rational,
    children: Vec<NodeId>,
}
impl RhythmNode {
    pub fn id(&self) -> NodeId {
        self.id
    }
    /// None for root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    pub fn depth(&self) -> usize {
        self.depth
    }
    /// Start, relative to the tree origin.
    pub fn timing(&self) -> Rational {
        self.timing
    }
    pub fn duration(&self) -> Rational {
        self.duration
    }
    pub fn end(&self) -> Rational {
        self.end
    }
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
    /// True if given position in bounds of node.
    pub fn contains(&self, time: Rational) -> bool {
        self.timing <= time && time < self.end()
    }
}

#[derive(Debug)]
pub struct RhythmTree {
    id: u64,
    nodes: Vec<RhythmNode>,
}
impl RhythmTree {
    /// Tree with the single root node, spanning `[0, total_duration)`.
    pub fn new(total_duration: Rational) -> Self {
        let id = NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed);
        let root = RhythmNode {
            id: NodeId { tree: id, index: 0 },
            parent: None,
            depth: 0,
            timing: Rational::zero(),
            duration: total_duration,
            end: total_duration,
            children: Vec::new(),
        };
        Self {
            id,
            nodes: vec![root],
        }
    }

    /// Rebuild tree from the sequence made by
    /// [`RhythmTree::subdivision_counts`].
    ///
    /// Sequence is read depth-first: every node takes one value, its
    /// children follow. 0 and 1 both mean "leaf". A count larger than the
    /// amount of values left can not be complete and is rejected before
    /// anything is allocated.
    pub fn from_subdivision_counts(
        total_duration: Rational,
        counts: &[usize],
    ) -> TimeResult<Self> {
        let mut tree = Self::new(total_duration);
        let mut counts_iter = counts.iter();
        let mut pending = vec![tree.root()];
        while let Some(node) = pending.pop() {
            let count = *counts_iter.next().ok_or_else(|| {
                TimeError::MalformedSubdivisions(format!(
                    "sequence of {} values ended before node {} was described",
                    counts.len(),
                    node.index()
                ))
            })?;
            let rest = counts_iter.len();
            if count > 1 && count > rest {
                return Err(TimeError::MalformedSubdivisions(format!(
                    "node {} wants {count} children, but only {rest} values left",
                    node.index()
                )));
            }
            let count = i64::try_from(count).map_err(|_| {
                TimeError::MalformedSubdivisions(format!(
                    "subdivision count is too big: {count}"
                ))
            })?;
            let children = match count {
                0 | 1 => Vec::new(),
                _ => tree.subdivide(node, count)?,
            };
            pending.extend(children.into_iter().rev());
        }
        let rest = counts_iter.len();
        if rest > 0 {
            return Err(TimeError::MalformedSubdivisions(format!(
                "{rest} values left after the tree was complete"
            )));
        }
        log::debug!(
            "rebuilt tree of {} nodes from {:?}",
            tree.node_count(),
            counts
        );
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            tree: self.id,
            index: 0,
        }
    }
    pub fn total_duration(&self) -> Rational {
        self.nodes[0].duration
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Fails with [`TimeError::UnknownNode`] if node is from another tree.
    pub fn node(&self, id: NodeId) -> TimeResult<&RhythmNode> {
        if id.tree != self.id {
            return Err(TimeError::UnknownNode(id));
        }
        self.nodes.get(id.index).ok_or(TimeError::UnknownNode(id))
    }
    pub fn children_of(&self, id: NodeId) -> TimeResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }
    pub fn parent_of(&self, id: NodeId) -> TimeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent())
    }
    pub fn depth_of(&self, id: NodeId) -> TimeResult<usize> {
        Ok(self.node(id)?.depth())
    }
    pub fn timing_of(&self, id: NodeId) -> TimeResult<Rational> {
        Ok(self.node(id)?.timing())
    }
    pub fn duration_of(&self, id: NodeId) -> TimeResult<Rational> {
        Ok(self.node(id)?.duration())
    }

    /// Split leaf into `count` equal children.
    ///
    /// # Returns
    /// - ids of the new children, from left to right.
    /// - empty Vec for `count == 1`: node stays a leaf.
    ///
    /// # Errors
    /// - [`TimeError::InvalidSubdivisionCount`] if `count < 1`
    /// - [`TimeError::AlreadySubdivided`] if node already has children
    /// - [`TimeError::UnknownNode`] if node is from another tree
    /// - [`TimeError::Overflow`] if child spans do not fit into rationals
    /// - [`TimeError::InvalidSubdivisionCount`] if `count` children can not
    ///   be allocated
    ///
    /// On error tree stays untouched.
    pub fn subdivide(
        &mut self,
        node: NodeId,
        count: i64,
    ) -> TimeResult<Vec<NodeId>> {
        let target = self.node(node)?;
        if count < 1 {
            return Err(TimeError::InvalidSubdivisionCount { node, count });
        }
        if !target.is_leaf() {
            return Err(TimeError::AlreadySubdivided(node));
        }
        if count == 1 {
            return Ok(Vec::new());
        }
        let (timing, depth) = (target.timing, target.depth + 1);
        let child_duration = target.duration.divide_by_integer(count)?;
        let size = usize::try_from(count)
            .map_err(|_| TimeError::InvalidSubdivisionCount { node, count })?;
        self.nodes
            .try_reserve(size)
            .map_err(|_| TimeError::InvalidSubdivisionCount { node, count })?;
        let spans = (0..count)
            .map(|idx| -> TimeResult<(Rational, Rational)> {
                let start = timing.add(child_duration.multiply_by_integer(idx)?)?;
                Ok((start, start.add(child_duration)?))
            })
            .collect::<TimeResult<Vec<_>>>()?;

        let first = self.nodes.len();
        let children: Vec<NodeId> = (0..size)
            .map(|offset| NodeId {
                tree: self.id,
                index: first + offset,
            })
            .collect();
        for (child, (start, end)) in children.iter().zip(spans) {
            self.nodes.push(RhythmNode {
                id: *child,
                parent: Some(node),
                depth,
                timing: start,
                duration: child_duration,
                end,
                children: Vec::new(),
            });
        }
        self.nodes[node.index].children = children.clone();
        log::debug!(
            "subdivided node {} into {} parts of {}",
            node,
            count,
            child_duration
        );
        Ok(children)
    }

    /// Depth-first sequence of children amounts of the subtree,
    /// leaves give 0.
    pub fn flatten_to_subdivision_counts(
        &self,
        node: NodeId,
    ) -> TimeResult<Vec<usize>> {
        self.node(node)?;
        Ok(self.flatten_from(node.index))
    }
    /// [`RhythmTree::flatten_to_subdivision_counts`] of the root.
    pub fn subdivision_counts(&self) -> Vec<usize> {
        self.flatten_from(0)
    }
    fn flatten_from(&self, index: usize) -> Vec<usize> {
        let mut counts = Vec::new();
        let mut pending = vec![index];
        while let Some(idx) = pending.pop() {
            let node = &self.nodes[idx];
            counts.push(node.children.len());
            pending.extend(node.children.iter().rev().map(|ch| ch.index));
        }
        counts
    }

    /// Leaves of the whole tree, in time order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            pending: vec![0],
        }
    }

    /// Deepest node, which contains given position.
    ///
    /// Fails with [`TimeError::NotFound`] if position is out of the tree.
    pub fn leaf_at(&self, time: Rational) -> TimeResult<NodeId> {
        let mut node = &self.nodes[0];
        if !node.contains(time) {
            return Err(TimeError::NotFound(time));
        }
        while let Some(child) = node
            .children
            .iter()
            .map(|ch| &self.nodes[ch.index])
            .find(|ch| ch.contains(time))
        {
            node = child;
        }
        Ok(node.id)
    }

    fn fmt_node(&self, index: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = &self.nodes[index];
        if node.is_leaf() {
            return write!(f, "[ ]");
        }
        write!(f, "(")?;
        for child in node.children.iter() {
            self.fmt_node(child.index, f)?;
        }
        write!(f, ")")
    }
}
impl fmt::Display for RhythmTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(0, f)
    }
}

/// Depth-first iterator over leaves, see [`RhythmTree::leaves`].
pub struct Leaves<'a> {
    tree: &'a RhythmTree,
    pending: Vec<usize>,
}
impl<'a> Iterator for Leaves<'a> {
    type Item = &'a RhythmNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.pending.pop() {
            let node = &self.tree.nodes[idx];
            if node.is_leaf() {
                return Some(node);
            }
            self.pending
                .extend(node.children.iter().rev().map(|ch| ch.index));
        }
        None
    }
}

/// Persisted form of the tree: its span and subdivision sequence.
#[derive(Serialize, Deserialize)]
struct RhythmTreeRepr {
    duration: Rational,
    subdivisions: Vec<usize>,
}
impl Serialize for RhythmTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RhythmTreeRepr {
            duration: self.total_duration(),
            subdivisions: self.subdivision_counts(),
        }
        .serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for RhythmTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = RhythmTreeRepr::deserialize(deserializer)?;
        Self::from_subdivision_counts(repr.duration, &repr.subdivisions)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::primitives::{Rational, TimeError};

    use super::RhythmTree;

    fn r(numer: i64, denom: i64) -> Rational {
        Rational::new(numer, denom).unwrap()
    }

    #[test]
    fn triplet_with_split_first_beat() {
        let mut tree = RhythmTree::new(Rational::one());
        let root = tree.root();
        let beats = tree.subdivide(root, 3).unwrap();
        assert_eq!(beats.len(), 3);
        for beat in beats.iter() {
            assert_eq!(tree.duration_of(*beat).unwrap(), r(1, 3));
            assert_eq!(tree.depth_of(*beat).unwrap(), 1);
            assert_eq!(tree.parent_of(*beat).unwrap(), Some(root));
        }
        let halves = tree.subdivide(beats[0], 2).unwrap();
        for half in halves.iter() {
            assert_eq!(tree.duration_of(*half).unwrap(), r(1, 6));
            assert_eq!(tree.depth_of(*half).unwrap(), 2);
        }
        tree.leaves()
            .map(|leaf| leaf.timing())
            .zip_eq([r(0, 1), r(1, 6), r(1, 3), r(2, 3)])
            .for_each(|(a, b)| assert_eq!(a, b));
    }

    #[test]
    fn children_tile_parent() {
        let mut tree = RhythmTree::new(r(7, 8));
        for count in 2..12 {
            let mut tree_n = RhythmTree::new(r(7, 8));
            let children = tree_n.subdivide(tree_n.root(), count).unwrap();
            let total: Rational = children
                .iter()
                .map(|ch| tree_n.duration_of(*ch).unwrap())
                .sum();
            assert_eq!(total, r(7, 8));
            for (a, b) in children.iter().tuple_windows() {
                let a = tree_n.node(*a).unwrap();
                let b = tree_n.node(*b).unwrap();
                assert_eq!(a.end(), b.timing());
            }
            let last = tree_n.node(*children.last().unwrap()).unwrap();
            assert_eq!(last.end(), r(7, 8));
        }
        let children = tree.subdivide(tree.root(), 5).unwrap();
        let grand = tree.subdivide(children[4], 3).unwrap();
        assert_eq!(tree.timing_of(grand[0]).unwrap(), r(28, 40));
        assert_eq!(
            tree.node(grand[2]).unwrap().end(),
            tree.total_duration()
        );
    }

    #[test]
    fn subdivide_twice() {
        let mut tree = RhythmTree::new(Rational::one());
        let root = tree.root();
        let children = tree.subdivide(root, 4).unwrap();
        assert_eq!(
            tree.subdivide(root, 3),
            Err(TimeError::AlreadySubdivided(root))
        );
        assert_eq!(tree.subdivide(root, 1), Err(TimeError::AlreadySubdivided(root)));
        assert_eq!(tree.children_of(root).unwrap(), children.as_slice());
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn invalid_counts() {
        let mut tree = RhythmTree::new(Rational::one());
        let root = tree.root();
        assert_eq!(
            tree.subdivide(root, -2),
            Err(TimeError::InvalidSubdivisionCount {
                node: root,
                count: -2
            })
        );
        assert!(matches!(
            tree.subdivide(root, 0),
            Err(TimeError::InvalidSubdivisionCount { .. })
        ));
        assert_eq!(tree.subdivide(root, 1), Ok(Vec::new()));
        assert!(tree.node(root).unwrap().is_leaf());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn foreign_node() {
        let mut a = RhythmTree::new(Rational::one());
        let b = RhythmTree::new(Rational::one());
        let foreign = b.root();
        assert_eq!(a.node(foreign), Err(TimeError::UnknownNode(foreign)));
        assert_eq!(a.subdivide(foreign, 2), Err(TimeError::UnknownNode(foreign)));
    }

    #[test]
    fn flatten_and_rebuild() {
        let mut tree = RhythmTree::new(r(3, 4));
        let beats = tree.subdivide(tree.root(), 3).unwrap();
        let halves = tree.subdivide(beats[1], 2).unwrap();
        tree.subdivide(halves[1], 3).unwrap();
        tree.subdivide(beats[2], 4).unwrap();
        let counts = tree.subdivision_counts();
        assert_eq!(counts, vec![3, 0, 2, 0, 3, 0, 0, 0, 4, 0, 0, 0, 0]);
        assert_eq!(
            tree.flatten_to_subdivision_counts(beats[1]).unwrap(),
            vec![2, 0, 3, 0, 0, 0]
        );

        let rebuilt =
            RhythmTree::from_subdivision_counts(r(3, 4), &counts).unwrap();
        assert_eq!(rebuilt.subdivision_counts(), counts);
        assert_eq!(rebuilt.to_string(), tree.to_string());
        tree.leaves()
            .zip_eq(rebuilt.leaves())
            .for_each(|(a, b)| {
                assert_eq!(a.depth(), b.depth());
                assert_eq!(a.timing(), b.timing());
                assert_eq!(a.duration(), b.duration());
            });
    }

    #[test]
    fn malformed_sequences() {
        assert!(matches!(
            RhythmTree::from_subdivision_counts(Rational::one(), &[2, 0]),
            Err(TimeError::MalformedSubdivisions(_))
        ));
        assert!(matches!(
            RhythmTree::from_subdivision_counts(Rational::one(), &[0, 0]),
            Err(TimeError::MalformedSubdivisions(_))
        ));
        assert!(matches!(
            RhythmTree::from_subdivision_counts(Rational::one(), &[]),
            Err(TimeError::MalformedSubdivisions(_))
        ));
        let single =
            RhythmTree::from_subdivision_counts(Rational::one(), &[1]).unwrap();
        assert_eq!(single.subdivision_counts(), vec![0]);
    }

    #[test]
    fn leaf_at() {
        let mut tree = RhythmTree::new(Rational::one());
        let beats = tree.subdivide(tree.root(), 3).unwrap();
        let halves = tree.subdivide(beats[0], 2).unwrap();
        assert_eq!(tree.leaf_at(r(0, 1)).unwrap(), halves[0]);
        assert_eq!(tree.leaf_at(r(1, 6)).unwrap(), halves[1]);
        assert_eq!(tree.leaf_at(r(1, 2)).unwrap(), beats[1]);
        assert_eq!(tree.leaf_at(r(99, 100)).unwrap(), beats[2]);
        assert_eq!(
            tree.leaf_at(Rational::one()),
            Err(TimeError::NotFound(Rational::one()))
        );
        assert!(tree.leaf_at(r(-1, 8)).is_err());
    }

    #[test]
    fn too_deep_for_rationals() {
        let mut tree = RhythmTree::new(Rational::one());
        let mut node = tree.root();
        let err = loop {
            match tree.subdivide(node, 3) {
                Ok(children) => node = children[0],
                Err(err) => break err,
            }
        };
        assert_eq!(err, TimeError::Overflow);
        // 3^39 still fits into i64, 3^40 does not
        assert_eq!(tree.depth_of(node).unwrap(), 39);
        let before = tree.node_count();
        assert_eq!(tree.subdivide(node, 3), Err(TimeError::Overflow));
        assert_eq!(tree.node_count(), before);
        assert!(tree.node(node).unwrap().is_leaf());
        assert_eq!(tree.subdivide(node, 1), Ok(Vec::new()));
    }

    #[test]
    fn huge_counts() {
        let mut tree = RhythmTree::new(Rational::one());
        let root = tree.root();
        assert_eq!(
            tree.subdivide(root, i64::MAX),
            Err(TimeError::InvalidSubdivisionCount {
                node: root,
                count: i64::MAX
            })
        );
        assert_eq!(tree.node_count(), 1);
        for counts in [
            &[1 << 62][..],
            &[usize::MAX][..],
            &[3, 0, 0][..],
            &[2, 4, 0][..],
        ] {
            assert!(matches!(
                RhythmTree::from_subdivision_counts(Rational::one(), counts),
                Err(TimeError::MalformedSubdivisions(_))
            ));
        }
    }
}
