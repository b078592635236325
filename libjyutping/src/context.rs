//! Input context: one user's in-progress Jyutping input.
//!
//! The context owns the raw input, the segment graph, the lattice, the match
//! cache and the stack of selected words. Every edit re-parses the unselected
//! part of the input, merges the result into the previous graph (dropping
//! lattice nodes and cached matches of vanished graph nodes) and decodes
//! again.
//!
//! ```
//! use libjyutping::{DictFormat, JyutpingContext, JyutpingDictionary, JyutpingIme};
//! use libchinese_core::{NGramModel, UserLanguageModel};
//!
//! let mut dict = JyutpingDictionary::new();
//! dict.load(0, "你好 nei'hou 0\n".as_bytes(), DictFormat::Text).unwrap();
//! let ime = JyutpingIme::new(dict, UserLanguageModel::new(NGramModel::new()));
//!
//! let mut context = JyutpingContext::new(&ime);
//! context.type_text("neihou");
//! assert_eq!(context.sentence(), "你好");
//! context.select(0);
//! assert!(context.selected());
//! ```

use ahash::AHashSet;

use crate::decoder::JyutpingDecoder;
use crate::encoder::{decode_full_jyutping, parse_user_jyutping_with};
use crate::ime::JyutpingIme;
use crate::match_state::JyutpingMatchState;
use libchinese_core::{
    InputBuffer, LanguageModel, Lattice, NodeRef, SegmentGraph, SentenceResult, State, WordNode,
    USER_DICT,
};

/// A word frozen by `select`, ending at `offset` in the raw input.
#[derive(Debug, Clone)]
struct SelectedJyutping {
    offset: usize,
    word: WordNode,
    encoded: Vec<u8>,
}

#[derive(Debug)]
pub struct JyutpingContext<'a> {
    ime: &'a JyutpingIme,
    buffer: InputBuffer,
    selected: Vec<Vec<SelectedJyutping>>,
    graph: SegmentGraph,
    lattice: Lattice,
    match_state: JyutpingMatchState,
    candidates: Vec<SentenceResult>,
    option_revision: u64,
    dict_revisions: Vec<u64>,
}

impl<'a> JyutpingContext<'a> {
    pub fn new(ime: &'a JyutpingIme) -> Self {
        let config = ime.config();
        Self {
            ime,
            buffer: InputBuffer::new(true),
            selected: Vec::new(),
            graph: SegmentGraph::new(""),
            lattice: Lattice::new(),
            match_state: JyutpingMatchState::with_capacity(
                config.base.node_cache_size,
                config.base.match_cache_size,
            ),
            candidates: Vec::new(),
            option_revision: ime.option_revision(),
            dict_revisions: ime.dict().revisions().to_vec(),
        }
    }

    pub fn ime(&self) -> &'a JyutpingIme {
        self.ime
    }

    /// Apply option and dictionary changes made since the last operation.
    ///
    /// New options reset the whole context. A changed dictionary slot drops
    /// the cached matches of that slot and the lattice built from them.
    /// Returns whether anything was reset.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        if self.ime.option_revision() != self.option_revision {
            self.option_revision = self.ime.option_revision();
            self.clear();
            changed = true;
        }
        let revisions = self.ime.dict().revisions().to_vec();
        if revisions != self.dict_revisions {
            self.match_state.sync(&revisions);
            self.lattice.clear();
            self.dict_revisions = revisions;
            changed = true;
        }
        changed
    }

    pub fn user_input(&self) -> &str {
        self.buffer.text()
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn graph(&self) -> &SegmentGraph {
        &self.graph
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn match_state(&self) -> &JyutpingMatchState {
        &self.match_state
    }

    pub fn candidates(&self) -> &[SentenceResult] {
        &self.candidates
    }

    /// Insert `text` at the cursor. Selections past the cursor are cancelled.
    ///
    /// Returns false for empty or non-ASCII text.
    pub fn type_text(&mut self, text: &str) -> bool {
        if text.is_empty() || !text.is_ascii() {
            return false;
        }
        self.sync();
        self.pop_till(self.buffer.cursor());
        self.buffer.type_str(text);
        self.update();
        true
    }

    /// Remove `input[from..to]`. Erasing everything resets the context.
    pub fn erase(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        self.sync();
        if from == 0 && to >= self.buffer.len() {
            self.reset_derived();
        } else {
            self.pop_till(from);
        }
        self.buffer.erase(from, to);
        if !self.buffer.is_empty() {
            self.update();
        }
    }

    /// Move the cursor, cancelling selections that extend past it.
    pub fn set_cursor(&mut self, pos: usize) {
        self.sync();
        let cancelled = self.pop_till(pos);
        self.buffer.set_cursor(pos);
        if cancelled {
            self.update();
        }
    }

    /// Freeze candidate `idx`. Out of range indices are ignored.
    pub fn select(&mut self, idx: usize) {
        self.sync();
        let Some(candidate) = self.candidates.get(idx) else {
            return;
        };
        let offset = self.selected_length();
        let model = self.ime.model();
        let mut selection: Vec<SelectedJyutping> = candidate
            .sentence()
            .iter()
            .map(|node| SelectedJyutping {
                offset: offset + node.to(),
                word: WordNode::new(node.word.clone(), model.index(&node.word)),
                encoded: node.encoded.clone(),
            })
            .collect();
        drop(model);
        let Some(last) = selection.last() else {
            return;
        };

        // Trailing separators carry no word but still count as selected.
        let remain = self.buffer.text().get(last.offset..).unwrap_or_default();
        if !remain.is_empty() && remain.bytes().all(|b| b == b'\'') {
            selection.push(SelectedJyutping {
                offset: self.buffer.len(),
                word: WordNode::new("", 0),
                encoded: Vec::new(),
            });
        }
        self.selected.push(selection);
        self.update();
    }

    /// Undo the most recent selection.
    pub fn cancel(&mut self) {
        self.sync();
        self.selected.pop();
        self.update();
    }

    /// Cancel selections until at most `pos` bytes of input are selected.
    /// Returns whether any selection was cancelled.
    pub fn cancel_till(&mut self, pos: usize) -> bool {
        self.sync();
        let cancelled = self.pop_till(pos);
        if cancelled {
            self.update();
        }
        cancelled
    }

    fn pop_till(&mut self, pos: usize) -> bool {
        let mut cancelled = false;
        while self.selected_length() > pos {
            self.selected.pop();
            cancelled = true;
        }
        cancelled
    }

    /// Whether the whole input has been selected.
    pub fn selected(&self) -> bool {
        !self.buffer.is_empty() && self.selected_length() == self.buffer.len()
    }

    /// Bytes of input covered by selections.
    pub fn selected_length(&self) -> usize {
        self.selected
            .last()
            .and_then(|s| s.last())
            .map_or(0, |s| s.offset)
    }

    fn selected_items(&self) -> impl Iterator<Item = &SelectedJyutping> {
        self.selected
            .iter()
            .flatten()
            .filter(|item| !item.word.word().is_empty())
    }

    pub fn selected_sentence(&self) -> String {
        self.selected_items().map(|item| item.word.word()).collect()
    }

    pub fn selected_words(&self) -> Vec<String> {
        self.selected_items()
            .map(|item| item.word.word().to_string())
            .collect()
    }

    /// Full jyutping of the selected words, `'`-separated.
    pub fn selected_full_jyutping(&self) -> String {
        self.selected_items()
            .map(|item| decode_full_jyutping(&item.encoded).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("'")
    }

    pub fn candidate_full_jyutping(&self, idx: usize) -> Option<String> {
        let candidate = self.candidates.get(idx)?;
        Some(
            candidate
                .sentence()
                .iter()
                .filter(|node| !node.word.is_empty())
                .map(|node| decode_full_jyutping(&node.encoded).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("'"),
        )
    }

    /// Selected words followed by the best candidate.
    pub fn sentence(&self) -> String {
        let mut sentence = self.selected_sentence();
        if let Some(best) = self.candidates.first() {
            sentence.push_str(&best.to_string());
        }
        sentence
    }

    pub fn preedit(&self) -> String {
        self.preedit_with_cursor().0
    }

    /// Selected words, then the segments of the best candidate separated by
    /// spaces, with the cursor translated into that string.
    pub fn preedit_with_cursor(&self) -> (String, usize) {
        let mut preedit = self.selected_sentence();
        let len = self.selected_length();
        let c = self.buffer.cursor().max(len);
        let mut cursor = preedit.len();

        if let Some(best) = self.candidates.first() {
            let mut first = true;
            for node in best.sentence() {
                for pair in node.path.windows(2) {
                    if first {
                        first = false;
                    } else {
                        preedit.push(' ');
                    }
                    let (from, to) = (pair[0], pair[1]);
                    if c >= from + len && c < to + len {
                        cursor = preedit.len() + c - from - len;
                    }
                    preedit.push_str(self.graph.segment(from, to));
                }
            }
        }
        if c == self.buffer.len() {
            cursor = preedit.len();
        }
        (preedit, cursor)
    }

    /// Start of the segment of the best candidate touching the cursor.
    pub fn jyutping_before_cursor(&self) -> Option<usize> {
        let len = self.selected_length();
        let c = self.buffer.cursor().checked_sub(len)?;
        self.best_segments()
            .find(|&(_, to)| to >= c)
            .map(|(from, _)| from + len)
    }

    /// End of the first segment of the best candidate past the cursor.
    pub fn jyutping_after_cursor(&self) -> Option<usize> {
        let len = self.selected_length();
        let c = self.buffer.cursor().checked_sub(len)?;
        self.best_segments()
            .find(|&(_, to)| to > c)
            .map(|(_, to)| to + len)
    }

    fn best_segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.candidates
            .first()
            .into_iter()
            .flat_map(|best| best.sentence())
            .flat_map(|node| node.path.windows(2).map(|pair| (pair[0], pair[1])))
    }

    /// Language-model state after the selected words.
    pub fn state(&self) -> State {
        let model = self.ime.model();
        let words: Vec<&WordNode> = self.selected.iter().flatten().map(|s| &s.word).collect();
        model.replay(model.null_state(), words)
    }

    /// Learn from a fully selected input.
    ///
    /// A sentence made of single-syllable selections becomes a user
    /// dictionary word and is learned as one word; otherwise the selected
    /// words feed the history.
    pub fn learn(&mut self) {
        if !self.selected() {
            return;
        }
        let words = if self.learn_word() {
            vec![self.selected_sentence()]
        } else {
            self.selected_words()
        };
        tracing::debug!(?words, "learning selected sentence");
        self.ime.model_mut().history_mut().add(&words);
    }

    /// Add the selection to the user dictionary when every selection step
    /// picked exactly one single-syllable word and there are at least two.
    pub fn learn_word(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        let mut hanzi = String::new();
        let mut syllables = Vec::new();
        for selection in &self.selected {
            let mut words = selection.iter().filter(|item| !item.word.word().is_empty());
            let Some(item) = words.next() else {
                continue;
            };
            if item.encoded.len() != 2 || words.next().is_some() {
                return false;
            }
            let Ok(jyutping) = decode_full_jyutping(&item.encoded) else {
                return false;
            };
            hanzi.push_str(item.word.word());
            syllables.push(jyutping);
        }
        // Single characters are never learned as words.
        if syllables.len() < 2 {
            return false;
        }

        let jyutping = syllables.join("'");
        match self.ime.dict_mut().add_word(USER_DICT, &jyutping, &hanzi, 0.0) {
            Ok(()) => {
                tracing::debug!(%hanzi, %jyutping, "learned user word");
                true
            }
            Err(err) => {
                tracing::warn!(%hanzi, %jyutping, %err, "cannot learn user word");
                false
            }
        }
    }

    /// Reset input, selections and everything derived from them.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.reset_derived();
    }

    fn reset_derived(&mut self) {
        self.candidates.clear();
        self.selected.clear();
        self.lattice.clear();
        self.match_state.clear();
        self.graph = SegmentGraph::new("");
    }

    fn update(&mut self) {
        if self.buffer.is_empty() {
            self.clear();
            return;
        }

        if self.selected() {
            self.candidates.clear();
        } else {
            self.decode();
        }

        let len = self.selected_length();
        if self.buffer.cursor() < len {
            self.buffer.set_cursor(len);
        }
    }

    fn decode(&mut self) {
        let ime = self.ime;
        let config = ime.config();
        let dict = ime.dict();
        let model = ime.model();

        let start = self.selected_length();
        let words: Vec<&WordNode> = self.selected.iter().flatten().map(|s| &s.word).collect();
        let state = model.replay(model.null_state(), words);

        let input = self.buffer.text().get(start..).unwrap_or_default();
        let graph = parse_user_jyutping_with(input, config.inner_segment, config.base.max_fuzzy_forks);
        let discarded = self.graph.merge(graph);
        if !discarded.is_empty() {
            self.lattice.discard_node(&discarded);
            self.match_state.discard_node(&discarded);
        }
        debug_assert!(self.graph.check_graph());

        let decoder = JyutpingDecoder::new(&dict, &*model);
        let options = config.base.decode_options();
        decoder.decode(
            &mut self.lattice,
            &self.graph,
            &state,
            &options,
            Some(&mut self.match_state),
        );

        self.candidates.clear();
        let mut dup = AHashSet::new();
        for sentence in self.lattice.sentences() {
            dup.insert(sentence.to_string());
            self.candidates.push(sentence.clone());
        }

        // Words and partial sentences ending inside the input, penalized by
        // how many segments remain to the end.
        let graph = &self.graph;
        let lattice = &self.lattice;
        let bos = graph.start();
        let distances = graph.distances_to_end();
        let penalty = model.unknown_penalty() / 3.0;
        let begin = self.candidates.len();
        for i in (1..=graph.size()).rev() {
            if !graph.has_node(i) {
                continue;
            }
            let distance = distances.get(i).copied().flatten().unwrap_or(0);
            let adjust = distance as f32 * penalty;
            let nodes = lattice.nodes(i);

            let mut min = 0.0f32;
            let mut max = -f32::MAX;
            for (index, node) in nodes.iter().enumerate() {
                if node.from() != bos || !node.is_reachable() {
                    continue;
                }
                if !model.is_unknown(node.index(), node.word()) {
                    min = min.min(node.score());
                    max = max.max(node.score());
                }
                if dup.contains(node.word()) {
                    continue;
                }
                if let Some(result) = lattice.to_sentence_result(NodeRef { frame: i, index }, adjust) {
                    dup.insert(node.word().to_string());
                    self.candidates.push(result);
                }
            }
            for (index, node) in nodes.iter().enumerate() {
                if node.from() == bos
                    || !node.is_reachable()
                    || node.score() <= min
                    || node.score() + options.max_distance <= max
                {
                    continue;
                }
                let node_ref = NodeRef { frame: i, index };
                let full_word = lattice.full_word(node_ref);
                if dup.contains(&full_word) {
                    continue;
                }
                if let Some(result) = lattice.to_sentence_result(node_ref, adjust) {
                    dup.insert(full_word);
                    self.candidates.push(result);
                }
            }
        }
        self.candidates[begin..].sort_by(SentenceResult::cmp_desc);
        tracing::trace!(
            candidates = self.candidates.len(),
            nbest = begin,
            "updated candidates"
        );
    }
}
