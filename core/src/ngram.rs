//! Static word bigram language model with backoff.
//!
//! Probabilities are stored as `log10` values. A bigram hit is used as is;
//! otherwise the score backs off to `backoff(prev) + unigram(word)`. Words
//! without a unigram entry score `unknown_penalty`.
use crate::language_model::{
    LanguageModel, ModelError, State, WordIndex, WordNode, DEFAULT_UNKNOWN_PENALTY,
    UNKNOWN_WORD_INDEX,
};
use serde::{Deserialize, Serialize};
use ahash::AHashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NGramModel {
    /// word -> vocabulary index (starting at 1, 0 is the unknown word)
    vocab: AHashMap<String, WordIndex>,

    /// unigram: log10 P(w)
    unigram: AHashMap<String, f32>,

    /// backoff weight of a word used as bigram history
    backoff: AHashMap<String, f32>,

    /// bigram: log10 P(w2 | w1) keyed by (w1, w2)
    bigram: AHashMap<(String, String), f32>,

    unknown_penalty: f32,
}

impl Default for NGramModel {
    fn default() -> Self {
        Self::new()
    }
}

impl NGramModel {
    /// Create an empty model. Every word is unknown.
    pub fn new() -> Self {
        Self {
            vocab: AHashMap::new(),
            unigram: AHashMap::new(),
            backoff: AHashMap::new(),
            bigram: AHashMap::new(),
            unknown_penalty: DEFAULT_UNKNOWN_PENALTY,
        }
    }

    pub fn set_unknown_penalty(&mut self, penalty: f32) {
        self.unknown_penalty = penalty;
    }

    /// Insert a unigram log10(probability) with its backoff weight.
    pub fn insert_unigram(&mut self, w: impl Into<String>, log_p: f32, backoff: f32) {
        let w = w.into();
        let next = self.vocab.len() as WordIndex + 1;
        self.vocab.entry(w.clone()).or_insert(next);
        self.backoff.insert(w.clone(), backoff);
        self.unigram.insert(w, log_p);
    }

    /// Insert a bigram log10(probability).
    pub fn insert_bigram(&mut self, w1: impl Into<String>, w2: impl Into<String>, log_p: f32) {
        self.bigram.insert((w1.into(), w2.into()), log_p);
    }

    pub fn get_unigram(&self, w: &str) -> Option<f32> {
        self.unigram.get(w).copied()
    }

    pub fn get_bigram(&self, w1: &str, w2: &str) -> Option<f32> {
        self.bigram.get(&(w1.to_string(), w2.to_string())).copied()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// log10 P(word | prev) with backoff.
    pub fn word_score(&self, prev: Option<&str>, word: &str) -> f32 {
        let Some(unigram) = self.get_unigram(word) else {
            return self.unknown_penalty;
        };
        match prev {
            Some(prev) => match self.get_bigram(prev, word) {
                Some(p) => p,
                None => self.backoff.get(prev).copied().unwrap_or(0.0) + unigram,
            },
            None => unigram,
        }
    }

    /// Build a model from tokenized sentences using add-k smoothing.
    pub fn from_sentences<S: AsRef<str>>(sentences: &[Vec<S>], k: f32) -> Self {
        let mut unigram_counts: AHashMap<String, u64> = AHashMap::new();
        let mut bigram_counts: AHashMap<(String, String), u64> = AHashMap::new();
        for sentence in sentences {
            for (i, w) in sentence.iter().enumerate() {
                *unigram_counts.entry(w.as_ref().to_string()).or_insert(0) += 1;
                if i > 0 {
                    let key = (sentence[i - 1].as_ref().to_string(), w.as_ref().to_string());
                    *bigram_counts.entry(key).or_insert(0) += 1;
                }
            }
        }

        let mut model = Self::new();
        let mut words: Vec<_> = Self::counts_to_unigram_logprob(&unigram_counts, k)
            .into_iter()
            .collect();
        // Stable vocabulary indices regardless of hash order.
        words.sort_by(|a, b| a.0.cmp(&b.0));
        for (w, p) in words {
            model.insert_unigram(w, p, 0.0);
        }
        for ((w1, w2), p) in Self::counts_to_bigram_logprob(&bigram_counts, &unigram_counts, k) {
            model.insert_bigram(w1, w2, p);
        }
        model
    }

    /// Convert unigram counts to log10(probabilities) using add-k smoothing.
    pub fn counts_to_unigram_logprob(
        counts: &AHashMap<String, u64>,
        k: f32,
    ) -> AHashMap<String, f32> {
        let total: f32 = counts.values().map(|&c| c as f32).sum();
        let denom = total + k * counts.len() as f32;
        counts
            .iter()
            .map(|(tok, &c)| (tok.clone(), ((c as f32 + k) / denom).log10()))
            .collect()
    }

    /// Convert bigram counts into log10 P(w2 | w1) using add-k smoothing.
    pub fn counts_to_bigram_logprob(
        bigram_counts: &AHashMap<(String, String), u64>,
        unigram_counts: &AHashMap<String, u64>,
        k: f32,
    ) -> AHashMap<(String, String), f32> {
        let mut cont_count: AHashMap<&String, usize> = AHashMap::new();
        for (w1, _) in bigram_counts.keys() {
            *cont_count.entry(w1).or_insert(0) += 1;
        }

        bigram_counts
            .iter()
            .map(|((w1, w2), &c)| {
                let denom_count = unigram_counts.get(w1).copied().unwrap_or(0) as f32;
                let v = cont_count.get(w1).copied().unwrap_or(1).max(1) as f32;
                let p = (c as f32 + k) / (denom_count + k * v);
                ((w1.clone(), w2.clone()), p.log10())
            })
            .collect()
    }

    // --- Serialization helpers ---

    pub fn save<W: Write>(&self, writer: W) -> Result<(), ModelError> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, ModelError> {
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Save the model to the given path using bincode.
    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load the model from bincode file.
    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let file = File::open(path)?;
        Self::load(BufReader::new(file))
    }
}

impl LanguageModel for NGramModel {
    fn index(&self, word: &str) -> WordIndex {
        self.vocab.get(word).copied().unwrap_or(UNKNOWN_WORD_INDEX)
    }

    fn score(&self, state: &State, word: &WordNode) -> (f32, State) {
        let score = self.word_score(state.last_word(), word.word());
        (score, State::with_last(word.word()))
    }

    fn is_unknown(&self, idx: WordIndex, word: &str) -> bool {
        idx == UNKNOWN_WORD_INDEX && !self.unigram.contains_key(word)
    }

    fn unknown_penalty(&self) -> f32 {
        self.unknown_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> NGramModel {
        let mut m = NGramModel::new();
        m.insert_unigram("你", -2.0, -0.5);
        m.insert_unigram("好", -2.5, -0.3);
        m.insert_bigram("你", "好", -0.7);
        m
    }

    #[test]
    fn bigram_hit_and_backoff() {
        let m = tiny();
        assert_eq!(m.word_score(Some("你"), "好"), -0.7);
        // backoff(好) + unigram(你)
        assert!((m.word_score(Some("好"), "你") - (-2.3)).abs() < 1e-6);
        assert_eq!(m.word_score(None, "你"), -2.0);
    }

    #[test]
    fn unknown_words() {
        let m = tiny();
        assert_eq!(m.index("嗰"), UNKNOWN_WORD_INDEX);
        assert!(m.is_unknown(m.index("嗰"), "嗰"));
        assert!(!m.is_unknown(m.index("你"), "你"));
        assert_eq!(m.word_score(None, "嗰"), DEFAULT_UNKNOWN_PENALTY);
    }

    #[test]
    fn score_threads_state() {
        let m = tiny();
        let state = m.null_state();
        let (_, state) = m.score(&state, &WordNode::new("你", m.index("你")));
        let (s, state) = m.score(&state, &WordNode::new("好", m.index("好")));
        assert_eq!(s, -0.7);
        assert_eq!(state.last_word(), Some("好"));
    }

    #[test]
    fn counts_produce_normalized_unigrams() {
        let sentences = vec![vec!["我", "哋"], vec!["我"]];
        let m = NGramModel::from_sentences(&sentences, 0.0);
        let p_wo = 10f32.powf(m.get_unigram("我").unwrap());
        let p_dei = 10f32.powf(m.get_unigram("哋").unwrap());
        assert!((p_wo + p_dei - 1.0).abs() < 1e-5);
        assert!((m.get_bigram("我", "哋").unwrap() - 0.5f32.log10()).abs() < 1e-5);
    }

    #[test]
    fn bincode_round_trip() {
        let m = tiny();
        let mut buf = Vec::new();
        m.save(&mut buf).unwrap();
        let back = NGramModel::load(&buf[..]).unwrap();
        assert_eq!(back.word_score(Some("你"), "好"), -0.7);
        assert_eq!(back.index("好"), m.index("好"));
    }
}
