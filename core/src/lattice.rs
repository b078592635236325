//! Word lattice built on top of a segment graph.
//!
//! Lattice nodes are grouped into frames keyed by the graph node at which the
//! word ends. Each node keeps the k best hypotheses reaching it; a hypothesis
//! points back to a node of an earlier frame, or to the implicit
//! beginning-of-sentence when its path starts at the graph start.

use crate::language_model::{State, WordIndex};
use crate::segment_graph::NodeId;
use ahash::{AHashMap, AHashSet};
use std::cmp::Ordering;
use std::fmt;

/// Extra per-node payload supplied by the dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LatticeNodeData {
    #[default]
    None,
    /// Encoded syllables of the word, two bytes per syllable.
    Encoded(Vec<u8>),
}

impl LatticeNodeData {
    pub fn encoded(&self) -> &[u8] {
        match self {
            LatticeNodeData::None => &[],
            LatticeNodeData::Encoded(e) => e,
        }
    }
}

/// Reference to a lattice node: frame plus position inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub frame: NodeId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Hypothesis {
    pub(crate) score: f32,
    pub(crate) state: State,
    /// Predecessor node and the rank of its hypothesis we extend.
    pub(crate) prev: Option<(NodeRef, usize)>,
}

#[derive(Debug, Clone)]
pub struct LatticeNode {
    word: String,
    idx: WordIndex,
    path: Vec<NodeId>,
    cost: f32,
    data: LatticeNodeData,
    pub(crate) hyps: Vec<Hypothesis>,
}

impl LatticeNode {
    pub fn new(
        word: impl Into<String>,
        idx: WordIndex,
        path: Vec<NodeId>,
        cost: f32,
        data: LatticeNodeData,
    ) -> Self {
        Self {
            word: word.into(),
            idx,
            path,
            cost,
            data,
            hyps: Vec::new(),
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn index(&self) -> WordIndex {
        self.idx
    }

    /// Graph nodes covered by this word, separators included.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn from(&self) -> NodeId {
        self.path.first().copied().unwrap_or_default()
    }

    pub fn to(&self) -> NodeId {
        self.path.last().copied().unwrap_or_default()
    }

    /// Dictionary cost added on top of the language-model score.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn data(&self) -> &LatticeNodeData {
        &self.data
    }

    pub fn encoded(&self) -> &[u8] {
        self.data.encoded()
    }

    /// Whether the last decode found a way to reach this node.
    pub fn is_reachable(&self) -> bool {
        !self.hyps.is_empty()
    }

    /// Best accumulated score, `-inf` when unreachable.
    pub fn score(&self) -> f32 {
        self.hyps.first().map_or(f32::NEG_INFINITY, |h| h.score)
    }

    /// Language-model state after this word on the best hypothesis.
    pub fn state(&self) -> Option<&State> {
        self.hyps.first().map(|h| &h.state)
    }

    pub fn prev(&self) -> Option<NodeRef> {
        self.hyps.first().and_then(|h| h.prev.map(|(r, _)| r))
    }
}

/// One node of a sentence, detached from the lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceNode {
    pub word: String,
    pub index: WordIndex,
    pub path: Vec<NodeId>,
    pub encoded: Vec<u8>,
}

impl SentenceNode {
    pub(crate) fn from_lattice(node: &LatticeNode) -> Self {
        Self {
            word: node.word.clone(),
            index: node.idx,
            path: node.path.clone(),
            encoded: node.encoded().to_vec(),
        }
    }

    pub fn from(&self) -> NodeId {
        self.path.first().copied().unwrap_or_default()
    }

    pub fn to(&self) -> NodeId {
        self.path.last().copied().unwrap_or_default()
    }
}

/// A decoded sentence: words from the start of the graph plus total score.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceResult {
    nodes: Vec<SentenceNode>,
    score: f32,
}

impl SentenceResult {
    pub fn new(nodes: Vec<SentenceNode>, score: f32) -> Self {
        Self { nodes, score }
    }

    pub fn sentence(&self) -> &[SentenceNode] {
        &self.nodes
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Comparator for descending score order. Use with a stable sort so
    /// equal scores keep construction order.
    pub fn cmp_desc(a: &Self, b: &Self) -> Ordering {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SentenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            f.write_str(&node.word)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lattice {
    pub(crate) frames: AHashMap<NodeId, Vec<LatticeNode>>,
    pub(crate) nbests: Vec<SentenceResult>,
}

impl Lattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.nbests.clear();
    }

    /// Lattice nodes ending at graph node `frame`.
    pub fn nodes(&self, frame: NodeId) -> &[LatticeNode] {
        self.frames.get(&frame).map_or(&[], |v| v.as_slice())
    }

    pub fn node(&self, r: NodeRef) -> Option<&LatticeNode> {
        self.frames.get(&r.frame).and_then(|v| v.get(r.index))
    }

    /// Graph nodes that already have words in the lattice.
    pub fn matched_frames(&self) -> AHashSet<NodeId> {
        self.frames.keys().copied().collect()
    }

    pub fn sentence_size(&self) -> usize {
        self.nbests.len()
    }

    pub fn sentence(&self, i: usize) -> Option<&SentenceResult> {
        self.nbests.get(i)
    }

    pub fn sentences(&self) -> &[SentenceResult] {
        &self.nbests
    }

    pub(crate) fn push(&mut self, node: LatticeNode) {
        self.frames.entry(node.to()).or_default().push(node);
    }

    /// Drop frames of the given graph nodes and every node whose path
    /// passes through one of them.
    pub fn discard_node(&mut self, nodes: &AHashSet<NodeId>) {
        if nodes.is_empty() {
            return;
        }
        self.frames.retain(|frame, _| !nodes.contains(frame));
        for frame in self.frames.values_mut() {
            frame.retain(|n| !n.path.iter().any(|p| nodes.contains(p)));
        }
        self.nbests.clear();
    }

    /// Words along the best chain ending at `r`, concatenated.
    pub fn full_word(&self, r: NodeRef) -> String {
        self.chain(r, 0)
            .iter()
            .map(|n| n.word.as_str())
            .collect()
    }

    /// Sentence made of the best chain ending at `r`, with `adjust` added to
    /// the node score.
    pub fn to_sentence_result(&self, r: NodeRef, adjust: f32) -> Option<SentenceResult> {
        let node = self.node(r).filter(|n| n.is_reachable())?;
        let nodes = self
            .chain(r, 0)
            .into_iter()
            .map(SentenceNode::from_lattice)
            .collect();
        Some(SentenceResult::new(nodes, node.score() + adjust))
    }

    /// Nodes along the chain of hypothesis `rank` of `r`, oldest first.
    pub(crate) fn chain(&self, r: NodeRef, rank: usize) -> Vec<&LatticeNode> {
        let mut out = Vec::new();
        let mut cur = Some((r, rank));
        while let Some((r, rank)) = cur {
            let Some(node) = self.node(r) else {
                break;
            };
            out.push(node);
            cur = node.hyps.get(rank).and_then(|h| h.prev);
        }
        out.reverse();
        out
    }
}
