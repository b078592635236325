//! Language-model contract consumed by the decoder.
//!
//! Scores are `log10` probabilities: `0.0` is certain, more negative is less
//! likely. A `State` carries the context needed to score the next word.

use std::sync::Arc;
use thiserror::Error;

/// Index of a word in a model vocabulary.
pub type WordIndex = u32;

/// Index given to words a model does not know.
pub const UNKNOWN_WORD_INDEX: WordIndex = 0;

/// Placeholder index for words that have not been looked up yet.
pub const INVALID_WORD_INDEX: WordIndex = WordIndex::MAX;

/// `log10(1 / 60_000_000)`, the default score of an unknown word.
pub const DEFAULT_UNKNOWN_PENALTY: f32 = -7.778_151_3;

/// A word together with its vocabulary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordNode {
    word: String,
    idx: WordIndex,
}

impl WordNode {
    pub fn new(word: impl Into<String>, idx: WordIndex) -> Self {
        Self {
            word: word.into(),
            idx,
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn index(&self) -> WordIndex {
        self.idx
    }

    pub fn set_index(&mut self, idx: WordIndex) {
        self.idx = idx;
    }
}

/// Scoring context: the last word fed into the model, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct State {
    last: Option<Arc<str>>,
}

impl State {
    pub fn with_last(word: &str) -> Self {
        Self {
            last: Some(Arc::from(word)),
        }
    }

    pub fn last_word(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub trait LanguageModel {
    /// State with no context at all.
    fn null_state(&self) -> State {
        State::default()
    }

    fn index(&self, word: &str) -> WordIndex;

    /// Score `word` after `state` and return the state that follows it.
    fn score(&self, state: &State, word: &WordNode) -> (f32, State);

    fn is_unknown(&self, idx: WordIndex, word: &str) -> bool;

    /// Score given to a word the model has never seen.
    fn unknown_penalty(&self) -> f32 {
        DEFAULT_UNKNOWN_PENALTY
    }

    /// Feed `words` one after another starting from `state`.
    fn replay<'a, I>(&self, state: State, words: I) -> State
    where
        I: IntoIterator<Item = &'a WordNode>,
        Self: Sized,
    {
        words.into_iter().fold(state, |state, word| {
            if word.word().is_empty() {
                state
            } else {
                self.score(&state, word).1
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_penalty_constant() {
        let expected = (1.0f64 / 60_000_000.0).log10() as f32;
        assert!((DEFAULT_UNKNOWN_PENALTY - expected).abs() < 1e-5);
    }

    #[test]
    fn state_keeps_last_word() {
        let state = State::with_last("你好");
        assert_eq!(state.last_word(), Some("你好"));
        assert_eq!(State::default().last_word(), None);
    }
}
