//! Beam-pruned Viterbi decoding over a segment graph.
//!
//! The decoder asks a [`Dictionary`] for every word ending at graph nodes not
//! yet present in the lattice, then scores all lattice frames in ascending
//! node order with a [`LanguageModel`]. Each lattice node keeps up to `nbest`
//! hypotheses so that distinct sentences can be back-traced from the end
//! frame.

use crate::language_model::{LanguageModel, State, WordNode};
use crate::lattice::{
    Hypothesis, Lattice, LatticeNode, LatticeNodeData, NodeRef, SentenceNode, SentenceResult,
};
use crate::segment_graph::{NodeId, SegmentGraph};
use ahash::AHashSet;
use std::cmp::Ordering;

/// Word source consulted by the decoder.
pub trait Dictionary {
    /// Per-session cache threaded through repeated decodes.
    type MatchState;

    /// Report every word whose syllable path ends at a graph node outside
    /// `ignore`. The callback receives the path (graph nodes, separators
    /// included), the word, its dictionary cost and payload. It returns
    /// whether the word was accepted into the lattice.
    fn match_prefix(
        &self,
        graph: &SegmentGraph,
        ignore: &AHashSet<NodeId>,
        state: Option<&mut Self::MatchState>,
        callback: &mut dyn FnMut(&[NodeId], &str, f32, LatticeNodeData) -> bool,
    );
}

/// Search bounds of one decode pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub nbest: usize,
    /// Drop sentences scoring more than this below the best one.
    pub max_distance: f32,
    /// Drop sentences scoring below this floor.
    pub min_path: f32,
    /// Predecessor nodes considered per frame.
    pub beam_size: usize,
    /// Lattice nodes kept per frame.
    pub frame_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            nbest: 1,
            max_distance: f32::MAX,
            min_path: -f32::MAX,
            beam_size: 20,
            frame_size: 40,
        }
    }
}

pub struct Decoder<'a, D, M> {
    dict: &'a D,
    model: &'a M,
}

fn cmp_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

impl<'a, D, M> Decoder<'a, D, M>
where
    D: Dictionary,
    M: LanguageModel,
{
    pub fn new(dict: &'a D, model: &'a M) -> Self {
        Self { dict, model }
    }

    pub fn dict(&self) -> &D {
        self.dict
    }

    pub fn model(&self) -> &M {
        self.model
    }

    /// Decode with every dictionary word accepted.
    pub fn decode(
        &self,
        lattice: &mut Lattice,
        graph: &SegmentGraph,
        state: &State,
        options: &DecodeOptions,
        match_state: Option<&mut D::MatchState>,
    ) -> bool {
        self.decode_with(lattice, graph, state, options, match_state, |_, _, _| true)
    }

    /// Decode `graph` into `lattice`, starting from language-model `state`.
    ///
    /// `accept` filters dictionary words before they enter the lattice.
    /// Returns whether at least one sentence reached the end of the graph.
    pub fn decode_with<F>(
        &self,
        lattice: &mut Lattice,
        graph: &SegmentGraph,
        state: &State,
        options: &DecodeOptions,
        match_state: Option<&mut D::MatchState>,
        mut accept: F,
    ) -> bool
    where
        F: FnMut(&[NodeId], &WordNode, &LatticeNodeData) -> bool,
    {
        lattice.nbests.clear();
        if graph.is_empty() {
            lattice.clear();
            return false;
        }

        let ignore = lattice.matched_frames();
        let mut pending = Vec::new();
        let model = self.model;
        self.dict
            .match_prefix(graph, &ignore, match_state, &mut |path, word, cost, data| {
                let node = WordNode::new(word, model.index(word));
                if !accept(path, &node, &data) {
                    return false;
                }
                pending.push(LatticeNode::new(
                    word,
                    node.index(),
                    path.to_vec(),
                    cost,
                    data,
                ));
                true
            });
        let added = pending.len();
        for node in pending {
            lattice.push(node);
        }

        self.forward(lattice, graph, state, options);
        self.backtrace(lattice, graph, options);

        tracing::debug!(
            added,
            frames = lattice.frames.len(),
            nbest = lattice.nbests.len(),
            "decoded lattice"
        );
        !lattice.nbests.is_empty()
    }

    fn forward(
        &self,
        lattice: &mut Lattice,
        graph: &SegmentGraph,
        state: &State,
        options: &DecodeOptions,
    ) {
        let start = graph.start();
        let keep = options.nbest.max(1);
        let mut frame_ids: Vec<NodeId> = lattice.frames.keys().copied().collect();
        frame_ids.sort_unstable();

        for frame in frame_ids {
            let Some(slot) = lattice.frames.get_mut(&frame) else {
                continue;
            };
            let mut nodes = std::mem::take(slot);
            for node in nodes.iter_mut() {
                node.hyps = self.extend(lattice, node, start, state, options.beam_size, keep);
            }
            nodes.sort_by(|a, b| cmp_score_desc(a.score(), b.score()));
            // Pruned nodes stay in the frame so a later decode from another
            // start state can score them again.
            for node in nodes.iter_mut().skip(options.frame_size.max(1)) {
                node.hyps.clear();
            }
            lattice.frames.insert(frame, nodes);
        }
    }

    fn extend(
        &self,
        lattice: &Lattice,
        node: &LatticeNode,
        start: NodeId,
        state: &State,
        beam_size: usize,
        keep: usize,
    ) -> Vec<Hypothesis> {
        let from = node.from();
        let word = WordNode::new(node.word(), node.index());
        let step = |prev_state: &State, prev_score: f32, prev: Option<(NodeRef, usize)>| {
            if word.word().is_empty() {
                return Hypothesis {
                    score: prev_score,
                    state: prev_state.clone(),
                    prev,
                };
            }
            let (lm, next) = self.model.score(prev_state, &word);
            Hypothesis {
                score: prev_score + lm + node.cost(),
                state: next,
                prev,
            }
        };

        let mut hyps = Vec::new();
        if from == start {
            hyps.push(step(state, 0.0, None));
        } else {
            let prevs = lattice
                .nodes(from)
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_reachable())
                .take(beam_size.max(1));
            for (index, p) in prevs {
                let r = NodeRef { frame: from, index };
                for (rank, h) in p.hyps.iter().enumerate() {
                    hyps.push(step(&h.state, h.score, Some((r, rank))));
                }
            }
        }
        hyps.sort_by(|a, b| cmp_score_desc(a.score, b.score));
        hyps.truncate(keep);
        hyps
    }

    fn backtrace(&self, lattice: &mut Lattice, graph: &SegmentGraph, options: &DecodeOptions) {
        let end = graph.end();
        let mut ends: Vec<(f32, NodeRef, usize)> = Vec::new();
        for (index, node) in lattice.nodes(end).iter().enumerate() {
            for (rank, h) in node.hyps.iter().enumerate() {
                ends.push((h.score, NodeRef { frame: end, index }, rank));
            }
        }
        ends.sort_by(|a, b| cmp_score_desc(a.0, b.0));

        let mut seen: AHashSet<String> = AHashSet::new();
        let mut results: Vec<SentenceResult> = Vec::new();
        for (score, r, rank) in ends {
            if results.len() >= options.nbest.max(1) {
                break;
            }
            if score < options.min_path {
                // ends are sorted, nothing later can pass either
                break;
            }
            if let Some(best) = results.first() {
                if score < best.score() - options.max_distance {
                    continue;
                }
            }
            let nodes: Vec<_> = lattice
                .chain(r, rank)
                .into_iter()
                .map(SentenceNode::from_lattice)
                .collect();
            let sentence = SentenceResult::new(nodes, score);
            if !seen.insert(sentence.to_string()) {
                continue;
            }
            results.push(sentence);
        }
        lattice.nbests = results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::NGramModel;

    /// Dictionary over a fixed list of (from, to, word, cost) edges.
    struct ListDict(Vec<(NodeId, NodeId, &'static str, f32)>);

    impl Dictionary for ListDict {
        type MatchState = usize;

        fn match_prefix(
            &self,
            graph: &SegmentGraph,
            ignore: &AHashSet<NodeId>,
            state: Option<&mut usize>,
            callback: &mut dyn FnMut(&[NodeId], &str, f32, LatticeNodeData) -> bool,
        ) {
            let mut calls = 0;
            for &(from, to, word, cost) in &self.0 {
                if ignore.contains(&to) || !graph.has_node(to) {
                    continue;
                }
                calls += 1;
                callback(&[from, to], word, cost, LatticeNodeData::None);
            }
            if let Some(state) = state {
                *state += calls;
            }
        }
    }

    fn graph(text: &str, edges: &[(NodeId, NodeId)]) -> SegmentGraph {
        let mut g = SegmentGraph::new(text);
        for &(a, b) in edges {
            g.add_next(a, b);
        }
        g
    }

    fn model() -> NGramModel {
        let mut m = NGramModel::new();
        m.insert_unigram("你", -2.0, 0.0);
        m.insert_unigram("好", -2.0, 0.0);
        m.insert_unigram("你好", -2.5, 0.0);
        m.insert_unigram("尼", -3.0, 0.0);
        m
    }

    #[test]
    fn best_path_prefers_higher_score() {
        let g = graph("neihou", &[(0, 3), (3, 6), (0, 6)]);
        let dict = ListDict(vec![
            (0, 3, "你", 0.0),
            (0, 3, "尼", 0.0),
            (3, 6, "好", 0.0),
            (0, 6, "你好", 0.0),
        ]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        let options = DecodeOptions {
            nbest: 3,
            ..DecodeOptions::default()
        };
        assert!(decoder.decode(&mut lattice, &g, &m.null_state(), &options, None));
        let best = lattice.sentence(0).unwrap();
        assert_eq!(best.to_string(), "你好");
        assert_eq!(best.len(), 1);
        assert!((best.score() - -2.5).abs() < 1e-5);
        let words: Vec<String> = lattice.sentences().iter().map(|s| s.to_string()).collect();
        assert_eq!(words, vec!["你好", "尼好"]);
    }

    #[test]
    fn nbest_is_deduplicated_and_sorted() {
        let g = graph("neihou", &[(0, 3), (3, 6), (0, 6)]);
        let dict = ListDict(vec![
            (0, 3, "你", 0.0),
            (0, 3, "尼", 0.0),
            (3, 6, "好", 0.0),
            (0, 6, "你好", 0.0),
        ]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        let options = DecodeOptions {
            nbest: 5,
            ..DecodeOptions::default()
        };
        decoder.decode(&mut lattice, &g, &m.null_state(), &options, None);
        // "你" + "好" spells the same sentence as "你好" and is dropped.
        let sentences = lattice.sentences();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].to_string(), "尼好");
        assert!(sentences.windows(2).all(|w| w[0].score() >= w[1].score()));
    }

    #[test]
    fn max_distance_filters_weak_sentences() {
        let g = graph("neihou", &[(0, 3), (3, 6), (0, 6)]);
        let dict = ListDict(vec![
            (0, 3, "你", 0.0),
            (0, 3, "尼", 0.0),
            (3, 6, "好", 0.0),
            (0, 6, "你好", 0.0),
        ]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        let options = DecodeOptions {
            nbest: 5,
            max_distance: 0.1,
            ..DecodeOptions::default()
        };
        decoder.decode(&mut lattice, &g, &m.null_state(), &options, None);
        assert_eq!(lattice.sentence_size(), 1);
    }

    #[test]
    fn min_path_drops_best_sentence_too() {
        let g = graph("neihou", &[(0, 6)]);
        let dict = ListDict(vec![(0, 6, "你好", 0.0)]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        let options = DecodeOptions {
            min_path: -1.0,
            ..DecodeOptions::default()
        };
        assert!(!decoder.decode(&mut lattice, &g, &m.null_state(), &options, None));
        assert_eq!(lattice.sentence_size(), 0);

        let options = DecodeOptions {
            nbest: 5,
            min_path: -3.5,
            ..DecodeOptions::default()
        };
        let g = graph("neihou", &[(0, 3), (3, 6), (0, 6)]);
        let dict = ListDict(vec![
            (0, 3, "你", 0.0),
            (0, 3, "尼", 0.0),
            (3, 6, "好", 0.0),
            (0, 6, "你好", 0.0),
        ]);
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        decoder.decode(&mut lattice, &g, &m.null_state(), &options, None);
        // 尼好 scores -5.0 and falls under the floor.
        assert_eq!(lattice.sentence_size(), 1);
        assert!(lattice.sentences().iter().all(|s| s.score() >= -3.5));
    }

    #[test]
    fn pruned_nodes_come_back_under_new_start_state() {
        let g = graph("hou", &[(0, 3)]);
        let dict = ListDict(vec![(0, 3, "好", 0.0), (0, 3, "號", 0.0)]);
        let mut m = model();
        m.insert_unigram("號", -3.0, 0.0);
        m.insert_bigram("你", "號", -0.5);
        let decoder = Decoder::new(&dict, &m);
        let options = DecodeOptions {
            frame_size: 1,
            ..DecodeOptions::default()
        };

        let mut lattice = Lattice::new();
        decoder.decode(&mut lattice, &g, &m.null_state(), &options, None);
        assert_eq!(lattice.sentence(0).unwrap().to_string(), "好");
        assert_eq!(lattice.nodes(3).iter().filter(|n| n.is_reachable()).count(), 1);

        let after = State::with_last("你");
        decoder.decode(&mut lattice, &g, &after, &options, None);
        let mut fresh = Lattice::new();
        decoder.decode(&mut fresh, &g, &after, &options, None);
        assert_eq!(lattice.sentence(0).unwrap().to_string(), "號");
        assert_eq!(lattice.sentences(), fresh.sentences());
    }

    #[test]
    fn empty_word_passes_score_through() {
        let g = graph("nei'", &[(0, 3), (3, 4)]);
        let dict = ListDict(vec![(0, 3, "你", 0.0), (3, 4, "", 0.0)]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        decoder.decode(&mut lattice, &g, &m.null_state(), &DecodeOptions::default(), None);
        let best = lattice.sentence(0).unwrap();
        assert_eq!(best.to_string(), "你");
        assert_eq!(best.score(), -2.0);
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn matched_frames_are_not_queried_again() {
        let g = graph("neihou", &[(0, 3), (3, 6)]);
        let dict = ListDict(vec![(0, 3, "你", 0.0), (3, 6, "好", 0.0)]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        let mut calls = 0usize;
        decoder.decode(&mut lattice, &g, &m.null_state(), &DecodeOptions::default(), Some(&mut calls));
        assert_eq!(calls, 2);
        let first = lattice.sentence(0).cloned();
        decoder.decode(&mut lattice, &g, &m.null_state(), &DecodeOptions::default(), Some(&mut calls));
        assert_eq!(calls, 2);
        assert_eq!(lattice.sentence(0).cloned(), first);
    }

    #[test]
    fn rejected_words_stay_out() {
        let g = graph("neihou", &[(0, 3), (3, 6), (0, 6)]);
        let dict = ListDict(vec![
            (0, 3, "你", 0.0),
            (3, 6, "好", 0.0),
            (0, 6, "你好", 0.0),
        ]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        decoder.decode_with(
            &mut lattice,
            &g,
            &m.null_state(),
            &DecodeOptions::default(),
            None,
            |_, word, _| word.word() != "你好",
        );
        assert_eq!(lattice.sentence(0).unwrap().to_string(), "你好");
        assert_eq!(lattice.sentence(0).unwrap().len(), 2);
    }

    #[test]
    fn unreachable_end_gives_no_sentence() {
        let g = graph("neihou", &[(0, 3), (3, 6)]);
        let dict = ListDict(vec![(3, 6, "好", 0.0)]);
        let m = model();
        let decoder = Decoder::new(&dict, &m);
        let mut lattice = Lattice::new();
        assert!(!decoder.decode(&mut lattice, &g, &m.null_state(), &DecodeOptions::default(), None));
        assert_eq!(lattice.sentence_size(), 0);
    }
}
