// libjyutping/src/dictionary.rs
//
// Jyutping dictionary on top of the core trie slots.
//
// Keys are `encoded syllables + 0x01 + UTF-8 hanzi`, values are log10 costs
// added to the language-model score of the word. Slot 0 is the system
// dictionary, slot 1 the user dictionary.
//
// Two lookups:
// - `match_words`: every word whose syllables match an encoded key, where a
//   final byte of 0 matches any final
// - `match_prefix`: the decoder entry point; walks a segment graph and
//   reports every dictionary word ending at each node, plus a penalized
//   fallback word per segment so the lattice stays connected

use crate::encoder::{
    decode_full_jyutping, encode_full_jyutping, is_valid_user_jyutping, string_to_syllables,
    JyutpingFinal, MatchedJyutpingSyllables, FIRST_FINAL, LAST_FINAL,
};
use crate::match_state::{JyutpingMatchState, MatchResult, MatchedPath, PathOrigin, TrieNodes};
use ahash::AHashSet;
use libchinese_core::{
    Dictionary, LatticeNodeData, NodeId, SegmentGraph, Trie, TrieDictionary, TriePosition,
    TRIE_ROOT,
};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Separates encoded syllables from the hanzi in a trie key.
pub const JYUTPING_HANZI_SEP: u8 = 0x01;

/// `log10(0.5)`, charged once per fuzzy final on a path.
pub const FUZZY_COST: f32 = -0.301_03;

/// Cost of the fallback word spelling out an unmatched segment.
pub const INVALID_JYUTPING_COST: f32 = -100.0;

pub const BINARY_FORMAT_MAGIC: u32 = 0x000f_c733;
pub const BINARY_FORMAT_VERSION: u32 = 0x1;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid dictionary format: {0}")]
    InvalidFormat(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("fst error: {0}")]
    Fst(#[from] fst::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictFormat {
    Text,
    Binary,
}

#[derive(Debug, Clone, Default)]
pub struct JyutpingDictionary {
    dict: TrieDictionary,
}

fn is_separator_segment(segment: &str) -> bool {
    segment.starts_with('\'')
}

/// The single predecessor of `node` when it is reached through a separator.
fn prev_is_separator(graph: &SegmentGraph, node: NodeId) -> Option<NodeId> {
    match graph.prevs(node) {
        [prev] if is_separator_segment(graph.segment(*prev, node)) => Some(*prev),
        _ => None,
    }
}

/// Syllable path string, e.g. `"nei|hou|"`. Separator segments are skipped.
fn path_key(graph: &SegmentGraph, path: &[NodeId]) -> String {
    let mut key = String::new();
    for pair in path.windows(2) {
        let segment = graph.segment(pair[0], pair[1]);
        if is_separator_segment(segment) {
            continue;
        }
        key.push_str(segment);
        key.push('|');
    }
    key
}

fn make_key(full_jyutping: &str, hanzi: &str) -> Result<Vec<u8>, DictError> {
    let mut key = encode_full_jyutping(full_jyutping)
        .map_err(|e| DictError::InvalidArgument(e.to_string()))?;
    key.push(JYUTPING_HANZI_SEP);
    key.extend_from_slice(hanzi.as_bytes());
    Ok(key)
}

fn is_dict_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c')
}

/// Advance every position by one syllable out of `syllables`.
fn traverse_one_step(
    trie: &Trie<f32>,
    positions: &[(TriePosition, usize)],
    syllables: &MatchedJyutpingSyllables,
) -> Vec<(TriePosition, usize)> {
    let mut result = Vec::new();
    for &(pos, fuzzies) in positions {
        for (initial, finals) in syllables {
            let Some(pos) = trie.traverse(pos, &[*initial as u8]) else {
                continue;
            };
            let open = matches!(finals.as_slice(), [(JyutpingFinal::Invalid, _)]);
            if open {
                for final_ in FIRST_FINAL..=LAST_FINAL {
                    if let Some(next) = trie.traverse(pos, &[final_]) {
                        result.push((next, fuzzies + 1));
                    }
                }
            } else {
                for &(final_, fuzzy) in finals {
                    if let Some(next) = trie.traverse(pos, &[final_ as u8]) {
                        result.push((next, fuzzies + usize::from(fuzzy)));
                    }
                }
            }
        }
    }
    result
}

impl JyutpingDictionary {
    /// Dictionary with empty system and user slots.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dict_size(&self) -> usize {
        self.dict.dict_size()
    }

    pub fn add_empty_dict(&mut self) -> usize {
        self.dict.add_empty_dict()
    }

    pub fn remove_from(&mut self, idx: usize) {
        self.dict.remove_from(idx);
    }

    pub fn trie(&self, idx: usize) -> Option<&Trie<f32>> {
        self.dict.trie(idx)
    }

    /// Number of entries in slot `idx`.
    pub fn len(&self, idx: usize) -> usize {
        self.dict.trie(idx).map_or(0, Trie::len)
    }

    pub fn revision(&self, idx: usize) -> Option<u64> {
        self.dict.revision(idx)
    }

    pub fn revisions(&self) -> &[u64] {
        self.dict.revisions()
    }

    fn check_slot(&self, idx: usize) -> Result<(), DictError> {
        if idx < self.dict_size() {
            Ok(())
        } else {
            Err(DictError::InvalidArgument(format!("no dictionary slot {idx}")))
        }
    }

    /// Replace slot `idx` with the dictionary read from `reader`.
    ///
    /// On any error the slot keeps its previous content.
    pub fn load<R: Read>(&mut self, idx: usize, reader: R, format: DictFormat) -> Result<(), DictError> {
        self.check_slot(idx)?;
        let trie = match format {
            DictFormat::Text => Self::read_text(BufReader::new(reader))?,
            DictFormat::Binary => Self::read_binary(reader)?,
        };
        tracing::debug!(slot = idx, entries = trie.len(), ?format, "loaded dictionary");
        self.dict.replace_trie(idx, trie);
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, idx: usize, path: P, format: DictFormat) -> Result<(), DictError> {
        let file = File::open(path)?;
        self.load(idx, file, format)
    }

    fn read_text<R: BufRead>(reader: R) -> Result<Trie<f32>, DictError> {
        let mut trie = Trie::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let tokens: Vec<&str> = line.split(is_dict_space).filter(|t| !t.is_empty()).collect();
            let [hanzi, jyutping, cost] = tokens.as_slice() else {
                if !tokens.is_empty() {
                    tracing::trace!(line = lineno + 1, "skipping malformed dictionary line");
                }
                continue;
            };
            let cost: f32 = cost.parse().map_err(|_| {
                DictError::InvalidArgument(format!("line {}: invalid cost {cost:?}", lineno + 1))
            })?;
            let key = make_key(jyutping, hanzi)?;
            trie.set(&key, cost);
        }
        Ok(trie)
    }

    fn read_binary<R: Read>(mut reader: R) -> Result<Trie<f32>, DictError> {
        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        if u32::from_be_bytes(word) != BINARY_FORMAT_MAGIC {
            return Err(DictError::InvalidFormat("invalid jyutping magic".into()));
        }
        reader.read_exact(&mut word)?;
        if u32::from_be_bytes(word) != BINARY_FORMAT_VERSION {
            return Err(DictError::InvalidFormat("invalid jyutping version".into()));
        }
        let mut len = [0u8; 8];
        reader.read_exact(&mut len)?;
        let len = u64::from_be_bytes(len);
        let mut bytes = Vec::new();
        reader.take(len).read_to_end(&mut bytes)?;
        if bytes.len() as u64 != len {
            return Err(DictError::InvalidFormat(format!(
                "truncated trie: expected {len} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Trie::from_fst_bytes(bytes)?)
    }

    /// Write slot `idx` to `writer`.
    pub fn save<W: Write>(&self, idx: usize, mut writer: W, format: DictFormat) -> Result<(), DictError> {
        self.check_slot(idx)?;
        let Some(trie) = self.dict.trie(idx) else {
            return Ok(());
        };
        match format {
            DictFormat::Text => Self::write_text(trie, &mut writer)?,
            DictFormat::Binary => {
                let bytes = trie.to_fst_bytes()?;
                writer.write_all(&BINARY_FORMAT_MAGIC.to_be_bytes())?;
                writer.write_all(&BINARY_FORMAT_VERSION.to_be_bytes())?;
                writer.write_all(&(bytes.len() as u64).to_be_bytes())?;
                writer.write_all(&bytes)?;
            }
        }
        writer.flush()?;
        tracing::debug!(slot = idx, entries = trie.len(), ?format, "saved dictionary");
        Ok(())
    }

    pub fn save_file<P: AsRef<Path>>(&self, idx: usize, path: P, format: DictFormat) -> Result<(), DictError> {
        let file = File::create(path)?;
        self.save(idx, BufWriter::new(file), format)
    }

    fn write_text<W: Write>(trie: &Trie<f32>, writer: &mut W) -> Result<(), DictError> {
        for (key, value) in trie.entries() {
            let Some(sep) = key.iter().position(|&b| b == JYUTPING_HANZI_SEP) else {
                continue;
            };
            let jyutping = decode_full_jyutping(&key[..sep])
                .map_err(|e| DictError::InvalidFormat(e.to_string()))?;
            let hanzi = std::str::from_utf8(&key[sep + 1..])
                .map_err(|e| DictError::InvalidFormat(e.to_string()))?;
            writeln!(writer, "{hanzi} {jyutping} {value}")?;
        }
        Ok(())
    }

    /// Add `hanzi` spelled `full_jyutping` (`'`-separated syllables) to slot
    /// `idx`, replacing any previous cost.
    pub fn add_word(&mut self, idx: usize, full_jyutping: &str, hanzi: &str, cost: f32) -> Result<(), DictError> {
        self.check_slot(idx)?;
        let key = make_key(full_jyutping, hanzi)?;
        self.dict.add_word(idx, &key, cost);
        Ok(())
    }

    /// Returns whether the word was present.
    pub fn remove_word(&mut self, idx: usize, full_jyutping: &str, hanzi: &str) -> Result<bool, DictError> {
        self.check_slot(idx)?;
        let key = make_key(full_jyutping, hanzi)?;
        Ok(self.dict.remove_word(idx, &key))
    }

    /// Report every word matching encoded user syllables `data`.
    ///
    /// The callback receives the encoded syllables of the entry, the hanzi
    /// and the cost; returning `false` stops the enumeration of the current
    /// slot. Data that is not valid encoded user input matches nothing.
    pub fn match_words<F>(&self, data: &[u8], mut callback: F)
    where
        F: FnMut(&[u8], &str, f32) -> bool,
    {
        if !is_valid_user_jyutping(data) {
            return;
        }
        let tries = self.dict.tries();
        let mut nodes: Vec<(usize, TriePosition)> = (0..tries.len()).map(|i| (i, TRIE_ROOT)).collect();
        for i in 0..=data.len() {
            if nodes.is_empty() {
                return;
            }
            let current = data.get(i).copied().unwrap_or(JYUTPING_HANZI_SEP);
            let mut next = Vec::with_capacity(nodes.len());
            for (slot, pos) in nodes {
                let trie = &tries[slot];
                if current != 0 {
                    if let Some(pos) = trie.traverse(pos, &[current]) {
                        next.push((slot, pos));
                    }
                } else {
                    for final_ in FIRST_FINAL..=LAST_FINAL {
                        if let Some(pos) = trie.traverse(pos, &[final_]) {
                            next.push((slot, pos));
                        }
                    }
                }
            }
            nodes = next;
        }

        let size = data.len();
        for (slot, pos) in nodes {
            tries[slot].foreach(pos, |key, value| {
                match std::str::from_utf8(&key[size + 1..]) {
                    Ok(hanzi) => callback(&key[..size], hanzi, value),
                    Err(_) => true,
                }
            });
        }
    }
}

/// Walk state of one `match_prefix` call.
struct MatchContext<'a> {
    dict: &'a JyutpingDictionary,
    graph: &'a SegmentGraph,
    ignore: &'a AHashSet<NodeId>,
    state: &'a mut JyutpingMatchState,
    callback: &'a mut dyn FnMut(&[NodeId], &str, f32, LatticeNodeData) -> bool,
}

impl MatchContext<'_> {
    fn match_node(&mut self, node: NodeId) {
        if !self.state.matched_paths.contains_key(&node) {
            let paths = self.build_paths(node);
            self.state.matched_paths.insert(node, paths);
        }
        if !self.ignore.contains(&node) {
            self.emit_words(node);
        }
    }

    fn build_paths(&mut self, node: NodeId) -> Vec<MatchedPath> {
        let graph = self.graph;
        let mut paths = Vec::new();

        // A new word may start here unless this is the end or a separator.
        if node != graph.end() && !is_separator_segment(graph.segment(node, node + 1)) {
            let mut path = Vec::with_capacity(2);
            if let Some(prev) = prev_is_separator(graph, node) {
                path.push(prev);
            }
            path.push(node);
            for slot in 0..self.dict.dict_size() {
                paths.push(MatchedPath {
                    slot,
                    nodes: Rc::new(TrieNodes {
                        positions: vec![(TRIE_ROOT, 0)],
                        size: 0,
                    }),
                    path: path.clone(),
                    origin: PathOrigin::Start,
                });
            }
        }

        for &prev in graph.prevs(node) {
            let segment = graph.segment(prev, node);
            let prev_paths = self
                .state
                .matched_paths
                .get(&prev)
                .cloned()
                .unwrap_or_default();
            if is_separator_segment(segment) {
                for p in prev_paths {
                    let mut path = p.path;
                    path.push(node);
                    paths.push(MatchedPath {
                        path,
                        origin: PathOrigin::Carried,
                        ..p
                    });
                }
                continue;
            }

            let syllables = string_to_syllables(segment);
            for p in &prev_paths {
                let Some(trie) = self.dict.trie(p.slot) else {
                    continue;
                };
                let mut path = p.path.clone();
                path.push(node);
                let key = path_key(graph, &path);
                let cached = self.state.node_cache(p.slot).get(key.as_str()).cloned();
                let nodes = match cached {
                    Some(nodes) => {
                        self.state.stats.hits += 1;
                        nodes
                    }
                    None => {
                        self.state.stats.misses += 1;
                        let nodes = Rc::new(TrieNodes {
                            positions: traverse_one_step(trie, &p.nodes.positions, &syllables),
                            size: p.size() + 1,
                        });
                        self.state.node_cache(p.slot).put(key, Rc::clone(&nodes));
                        nodes
                    }
                };
                if !nodes.positions.is_empty() {
                    paths.push(MatchedPath {
                        slot: p.slot,
                        nodes,
                        path,
                        origin: PathOrigin::Extended,
                    });
                }
            }
        }
        paths
    }

    fn emit_words(&mut self, node: NodeId) {
        let graph = self.graph;
        let paths = self
            .state
            .matched_paths
            .get(&node)
            .cloned()
            .unwrap_or_default();

        for &prev in graph.prevs(node) {
            let segment = graph.segment(prev, node);
            if is_separator_segment(segment) {
                // A trailing separator still has to reach the end.
                if node == graph.end() {
                    (self.callback)(&[prev, node], "", 0.0, LatticeNodeData::None);
                }
                continue;
            }

            let mut matched = false;
            let ending_here = paths.iter().filter(|p| {
                p.origin == PathOrigin::Extended
                    && p.path.len() >= 2
                    && p.path[p.path.len() - 2] == prev
            });
            for p in ending_here {
                let results = self.match_results(p);
                for item in results.iter() {
                    let accepted = (self.callback)(
                        &p.path,
                        &item.word,
                        item.cost,
                        LatticeNodeData::Encoded(item.encoded.clone()),
                    );
                    if accepted && p.size() == 1 {
                        matched = true;
                    }
                }
            }

            if !matched {
                let mut path = Vec::with_capacity(3);
                if let Some(prev_prev) = prev_is_separator(graph, prev) {
                    path.push(prev_prev);
                }
                path.push(prev);
                path.push(node);
                (self.callback)(&path, segment, INVALID_JYUTPING_COST, LatticeNodeData::None);
            }
        }
    }

    fn match_results(&mut self, path: &MatchedPath) -> Rc<Vec<MatchResult>> {
        let key = path_key(self.graph, &path.path);
        if let Some(hit) = self.state.match_cache(path.slot).get(key.as_str()) {
            let hit = Rc::clone(hit);
            self.state.stats.hits += 1;
            return hit;
        }
        self.state.stats.misses += 1;

        let mut items = Vec::new();
        if let Some(trie) = self.dict.trie(path.slot) {
            let encoded_len = path.size() * 2;
            for &(pos, fuzzies) in &path.nodes.positions {
                let extra = fuzzies as f32 * FUZZY_COST;
                let Some(pos) = trie.traverse(pos, &[JYUTPING_HANZI_SEP]) else {
                    continue;
                };
                trie.foreach(pos, |key, value| {
                    if let Ok(word) = std::str::from_utf8(&key[encoded_len + 1..]) {
                        items.push(MatchResult {
                            word: word.to_string(),
                            cost: value + extra,
                            encoded: key[..encoded_len].to_vec(),
                        });
                    }
                    true
                });
            }
        }
        let items = Rc::new(items);
        self.state.match_cache(path.slot).put(key, Rc::clone(&items));
        items
    }
}

impl Dictionary for JyutpingDictionary {
    type MatchState = JyutpingMatchState;

    fn match_prefix(
        &self,
        graph: &SegmentGraph,
        ignore: &AHashSet<NodeId>,
        state: Option<&mut JyutpingMatchState>,
        callback: &mut dyn FnMut(&[NodeId], &str, f32, LatticeNodeData) -> bool,
    ) {
        let mut local;
        let state = match state {
            Some(state) => state,
            None => {
                local = JyutpingMatchState::new();
                &mut local
            }
        };
        state.sync(self.revisions());

        let mut context = MatchContext {
            dict: self,
            graph,
            ignore,
            state,
            callback,
        };

        // Smaller offsets first, so every predecessor is matched before its
        // successors.
        let mut queue = BinaryHeap::new();
        let mut visited = AHashSet::new();
        queue.push(Reverse(graph.start()));
        while let Some(Reverse(node)) = queue.pop() {
            if !visited.insert(node) {
                continue;
            }
            for &next in graph.nexts(node) {
                queue.push(Reverse(next));
            }
            context.match_node(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_one_user_jyutping, parse_user_jyutping};

    fn sample() -> JyutpingDictionary {
        let mut dict = JyutpingDictionary::new();
        let text = "你 nei 0\n好 hou 0\n你好 nei'hou -0.5\n五 ng 0\n";
        dict.load(0, text.as_bytes(), DictFormat::Text).unwrap();
        dict
    }

    fn collect(dict: &JyutpingDictionary, input: &str) -> Vec<(Vec<NodeId>, String, f32)> {
        let graph = parse_user_jyutping(input, true);
        let mut out = Vec::new();
        dict.match_prefix(&graph, &AHashSet::new(), None, &mut |path, word, cost, _| {
            out.push((path.to_vec(), word.to_string(), cost));
            true
        });
        out
    }

    #[test]
    fn match_words_by_full_syllables() {
        let dict = sample();
        let mut words = Vec::new();
        dict.match_words(&encode_one_user_jyutping("neihou"), |_, hanzi, cost| {
            words.push((hanzi.to_string(), cost));
            true
        });
        assert_eq!(words, vec![("你好".to_string(), -0.5)]);
    }

    #[test]
    fn match_words_with_open_final() {
        let dict = sample();
        let mut words = Vec::new();
        dict.match_words(&encode_one_user_jyutping("nh"), |encoded, hanzi, _| {
            assert_eq!(encoded.len(), 4);
            words.push(hanzi.to_string());
            true
        });
        assert_eq!(words, vec!["你好"]);
    }

    #[test]
    fn match_prefix_reports_words_and_fallbacks() {
        let dict = sample();
        let found = collect(&dict, "neihou");
        assert!(found.contains(&(vec![0, 3], "你".into(), 0.0)));
        assert!(found.contains(&(vec![3, 6], "好".into(), 0.0)));
        assert!(found.contains(&(vec![0, 3, 6], "你好".into(), -0.5)));
        assert!(!found.iter().any(|(_, _, cost)| *cost == INVALID_JYUTPING_COST));
    }

    #[test]
    fn incomplete_syllables_pay_fuzzy_cost() {
        let dict = sample();
        let found = collect(&dict, "nh");
        let hit = found
            .iter()
            .find(|(_, word, _)| word == "你好")
            .map(|(_, _, cost)| *cost);
        let expected = -0.5 + 2.0 * FUZZY_COST;
        assert!((hit.unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn unknown_segment_falls_back_to_spelling() {
        let dict = sample();
        let found = collect(&dict, "x");
        assert_eq!(found, vec![(vec![0, 1], "x".into(), INVALID_JYUTPING_COST)]);
    }

    #[test]
    fn trailing_separator_reaches_end() {
        let dict = sample();
        let found = collect(&dict, "nei'");
        assert!(found.contains(&(vec![3, 4], String::new(), 0.0)));
        let found = collect(&dict, "nei'hou");
        assert!(found.contains(&(vec![3, 4, 7], "好".into(), 0.0)));
        assert!(found.contains(&(vec![0, 3, 4, 7], "你好".into(), -0.5)));
    }

    #[test]
    fn ignored_nodes_emit_nothing() {
        let dict = sample();
        let graph = parse_user_jyutping("neihou", true);
        let mut ignore = AHashSet::new();
        ignore.insert(3);
        let mut ends = Vec::new();
        dict.match_prefix(&graph, &ignore, None, &mut |path, _, _, _| {
            ends.push(*path.last().unwrap());
            true
        });
        assert!(ends.iter().all(|&n| n == 6));
    }

    #[test]
    fn text_line_rules() {
        let mut dict = JyutpingDictionary::new();
        let text = "你 nei 0\nbroken line\n\n  好\thou\t-1.5  \n";
        dict.load(0, text.as_bytes(), DictFormat::Text).unwrap();
        assert_eq!(dict.len(0), 2);

        let bad = "你 nei 0\n好 xyz 0\n";
        assert!(matches!(
            dict.load(0, bad.as_bytes(), DictFormat::Text),
            Err(DictError::InvalidArgument(_))
        ));
        assert_eq!(dict.len(0), 2);
    }

    #[test]
    fn revisions_follow_mutations() {
        let mut dict = JyutpingDictionary::new();
        let before = dict.revision(1).unwrap();
        dict.add_word(1, "nei'hou", "你好", 0.0).unwrap();
        assert!(dict.revision(1).unwrap() > before);
        assert!(dict.remove_word(1, "nei'hou", "你好").unwrap());
        assert!(!dict.remove_word(1, "nei'hou", "你好").unwrap());
        assert!(dict.add_word(5, "nei", "你", 0.0).is_err());
    }
}
