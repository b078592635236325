// core/src/history.rs
//
// Rolling history of committed sentences used for adaptive scoring.
// Keeps unigram and bigram counts over the most recent `capacity` words;
// older sentences fall out of the window in FIFO order.

use crate::language_model::ModelError;
use serde::{Deserialize, Serialize};
use ahash::AHashMap;
use std::collections::VecDeque;
use std::io::{Read, Write};

/// Score returned for words never seen in the history.
pub const HISTORY_UNKNOWN_SCORE: f32 = -12.0;

/// Share of the bigram estimate when mixing with the unigram estimate.
const BIGRAM_WEIGHT: f32 = 0.68;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBigram {
    sentences: VecDeque<Vec<String>>,
    unigram: AHashMap<String, u32>,
    bigram: AHashMap<(String, String), u32>,
    total_words: usize,
    capacity: usize,
}

impl Default for HistoryBigram {
    fn default() -> Self {
        Self::with_capacity(8192)
    }
}

impl HistoryBigram {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `capacity` words.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sentences: VecDeque::new(),
            unigram: AHashMap::new(),
            bigram: AHashMap::new(),
            total_words: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a committed sentence (a sequence of words).
    pub fn add<S: AsRef<str>>(&mut self, sentence: &[S]) {
        let words: Vec<String> = sentence
            .iter()
            .map(|w| w.as_ref().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return;
        }
        self.count(&words, true);
        self.total_words += words.len();
        self.sentences.push_back(words);

        while self.total_words > self.capacity {
            match self.sentences.pop_front() {
                Some(old) => {
                    self.count(&old, false);
                    self.total_words -= old.len();
                }
                None => break,
            }
        }
    }

    fn count(&mut self, words: &[String], add: bool) {
        fn bump<K: std::hash::Hash + Eq>(map: &mut AHashMap<K, u32>, key: K, add: bool) {
            if add {
                *map.entry(key).or_insert(0) += 1;
            } else if let Some(c) = map.get_mut(&key) {
                *c = c.saturating_sub(1);
                if *c == 0 {
                    map.remove(&key);
                }
            }
        }
        for (i, w) in words.iter().enumerate() {
            bump(&mut self.unigram, w.clone(), add);
            if i > 0 {
                bump(&mut self.bigram, (words[i - 1].clone(), w.clone()), add);
            }
        }
    }

    pub fn unigram_freq(&self, word: &str) -> u32 {
        self.unigram.get(word).copied().unwrap_or(0)
    }

    pub fn bigram_freq(&self, prev: &str, word: &str) -> u32 {
        self.bigram
            .get(&(prev.to_string(), word.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_unknown(&self, word: &str) -> bool {
        self.unigram_freq(word) == 0
    }

    /// log10 score of `word` following `prev`.
    pub fn score(&self, prev: Option<&str>, word: &str) -> f32 {
        let uf = self.unigram_freq(word);
        if uf == 0 {
            return HISTORY_UNKNOWN_SCORE;
        }
        let pu = uf as f32 / (self.total_words as f32 + 1.0);
        let pb = match prev {
            Some(prev) => {
                let bf = self.bigram_freq(prev, word);
                bf as f32 / (self.unigram_freq(prev) as f32 + 1.0)
            }
            None => 0.0,
        };
        (BIGRAM_WEIGHT * pb + (1.0 - BIGRAM_WEIGHT) * pu).log10()
    }

    /// Drop every sentence that contains `word`.
    pub fn forget(&mut self, word: &str) {
        let kept: Vec<_> = self
            .sentences
            .drain(..)
            .filter(|s| !s.iter().any(|w| w == word))
            .collect();
        self.unigram.clear();
        self.bigram.clear();
        self.total_words = 0;
        for sentence in kept {
            self.add(&sentence);
        }
    }

    pub fn clear(&mut self) {
        self.sentences.clear();
        self.unigram.clear();
        self.bigram.clear();
        self.total_words = 0;
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<(), ModelError> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, ModelError> {
        Ok(bincode::deserialize_from(reader)?)
    }
}
