//! Segment graph over byte offsets of a raw input string.
//!
//! Nodes are offsets `0..=len` and are addressed by their offset, so every
//! cache that refers to a node only stores a `NodeId`. An edge `from -> to`
//! stands for the segment `data[from..to]` (one syllable candidate or one run
//! of separators).
//!
//! # Example
//! ```
//! use libchinese_core::SegmentGraph;
//!
//! let mut graph = SegmentGraph::new("neihou");
//! graph.add_next(0, 3);
//! graph.add_next(3, 6);
//! assert!(graph.check_graph());
//! assert_eq!(graph.segment(0, 3), "nei");
//! assert_eq!(graph.distance_to_end(0), Some(2));
//! ```

use ahash::AHashSet;
use std::collections::VecDeque;

/// Stable index of a graph node. Equal to the byte offset it represents.
pub type NodeId = usize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GraphNode {
    nexts: Vec<NodeId>,
    prevs: Vec<NodeId>,
}

/// Directed acyclic graph of candidate segmentations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentGraph {
    data: String,
    nodes: Vec<Option<GraphNode>>,
}

impl Default for SegmentGraph {
    fn default() -> Self {
        Self::new("")
    }
}

impl SegmentGraph {
    /// Create a graph over `data` that only contains the start and end nodes.
    pub fn new(data: impl Into<String>) -> Self {
        let data = data.into();
        let mut nodes = vec![None; data.len() + 1];
        nodes[0] = Some(GraphNode::default());
        let end = data.len();
        nodes[end] = Some(GraphNode::default());
        Self { data, nodes }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Length of the underlying string, which is also the id of the end node.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn start(&self) -> NodeId {
        0
    }

    pub fn end(&self) -> NodeId {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether a node exists at `offset`.
    pub fn has_node(&self, offset: NodeId) -> bool {
        matches!(self.nodes.get(offset), Some(Some(_)))
    }

    /// All existing nodes in increasing offset order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| i))
    }

    /// Add the edge `from -> to`. Duplicate edges are ignored.
    ///
    /// Offsets past the end of the data, or edges that do not move forward,
    /// are ignored as well; such an edge can never be part of a segmentation.
    pub fn add_next(&mut self, from: NodeId, to: NodeId) {
        if from >= to || to > self.size() {
            return;
        }
        let already = self.nodes[from]
            .get_or_insert_with(GraphNode::default)
            .nexts
            .contains(&to);
        if already {
            return;
        }
        if let Some(node) = self.nodes[from].as_mut() {
            node.nexts.push(to);
        }
        self.nodes[to]
            .get_or_insert_with(GraphNode::default)
            .prevs
            .push(from);
    }

    /// Successors of a node in insertion order.
    pub fn nexts(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node) {
            Some(Some(n)) => &n.nexts,
            _ => &[],
        }
    }

    /// Predecessors of a node in insertion order.
    pub fn prevs(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node) {
            Some(Some(n)) => &n.prevs,
            _ => &[],
        }
    }

    /// Text covered by the segment `from -> to`.
    pub fn segment(&self, from: NodeId, to: NodeId) -> &str {
        self.data.get(from..to).unwrap_or_default()
    }

    /// Check that the end is reachable from the start and that every node
    /// reachable from the start can reach the end.
    pub fn check_graph(&self) -> bool {
        let distances = self.distances_to_end();
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::from([self.start()]);
        seen.insert(self.start());
        while let Some(node) = queue.pop_front() {
            if distances.get(node).copied().flatten().is_none() {
                return false;
            }
            for &next in self.nexts(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.contains(&self.end())
    }

    /// Minimum number of segments from every node to the end node.
    /// `None` marks nodes that cannot reach the end.
    pub fn distances_to_end(&self) -> Vec<Option<usize>> {
        let mut distances = vec![None; self.nodes.len()];
        let end = self.end();
        distances[end] = Some(0);
        let mut queue = VecDeque::from([end]);
        while let Some(node) = queue.pop_front() {
            let d = distances[node].unwrap_or(0);
            for &prev in self.prevs(node) {
                if distances[prev].is_none() {
                    distances[prev] = Some(d + 1);
                    queue.push_back(prev);
                }
            }
        }
        distances
    }

    pub fn distance_to_end(&self, node: NodeId) -> Option<usize> {
        self.distances_to_end().get(node).copied().flatten()
    }

    /// Visit every start-to-end path in depth-first order. The callback
    /// returns `false` to stop the walk.
    pub fn dfs<F>(&self, mut callback: F)
    where
        F: FnMut(&[NodeId]) -> bool,
    {
        let mut path = vec![self.start()];
        self.dfs_from(&mut path, &mut callback);
    }

    fn dfs_from<F>(&self, path: &mut Vec<NodeId>, callback: &mut F) -> bool
    where
        F: FnMut(&[NodeId]) -> bool,
    {
        let Some(&node) = path.last() else {
            return true;
        };
        if node == self.end() {
            return callback(path);
        }
        for &next in self.nexts(node) {
            path.push(next);
            let keep_going = self.dfs_from(path, callback);
            path.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// Replace this graph by `other` and return the nodes of the old graph
    /// whose derived state (matches, lattice frames) is no longer valid.
    ///
    /// A node survives when it exists in both graphs, lies strictly inside
    /// the common prefix of both strings (or the strings are equal), keeps
    /// its end-ness, has identical predecessors and all of its predecessors
    /// survive as well.
    pub fn merge(&mut self, other: SegmentGraph) -> AHashSet<NodeId> {
        let common = self
            .data
            .bytes()
            .zip(other.data.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        let identical = self.data == other.data;

        let mut kept = vec![false; self.nodes.len()];
        let mut discarded = AHashSet::new();
        for node in self.node_ids().collect::<Vec<_>>() {
            let keep = other.has_node(node)
                && (node < common || identical)
                && (node == self.end()) == (node == other.end())
                && self.prevs(node) == other.prevs(node)
                && self.prevs(node).iter().all(|&p| kept[p]);
            if keep {
                kept[node] = true;
            } else {
                discarded.insert(node);
            }
        }

        tracing::trace!(
            old = %self.data,
            new = %other.data,
            discarded = discarded.len(),
            "merge segment graph"
        );
        *self = other;
        discarded
    }
}
