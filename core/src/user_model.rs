//! Language model mixing a static n-gram model with the user history.
//!
//! For a word seen in the history the probabilities of both models are
//! interpolated linearly, `p = (1 - w) * p_static + w * p_history`, and the
//! result is returned as `log10(p)`. Words absent from the history score as in
//! the static model alone.

use crate::history::HistoryBigram;
use crate::language_model::{LanguageModel, State, WordIndex, WordNode};
use crate::ngram::NGramModel;

#[derive(Debug, Clone)]
pub struct UserLanguageModel {
    model: NGramModel,
    history: HistoryBigram,
    weight: f32,
}

impl UserLanguageModel {
    pub fn new(model: NGramModel) -> Self {
        Self {
            model,
            history: HistoryBigram::new(),
            weight: 0.2,
        }
    }

    pub fn with_history(model: NGramModel, history: HistoryBigram) -> Self {
        Self {
            history,
            ..Self::new(model)
        }
    }

    /// Weight of the history model, clamped to `[0, 1]`.
    pub fn set_history_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 1.0);
    }

    pub fn history_weight(&self) -> f32 {
        self.weight
    }

    pub fn model(&self) -> &NGramModel {
        &self.model
    }

    pub fn history(&self) -> &HistoryBigram {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryBigram {
        &mut self.history
    }
}

impl LanguageModel for UserLanguageModel {
    fn index(&self, word: &str) -> WordIndex {
        self.model.index(word)
    }

    fn score(&self, state: &State, word: &WordNode) -> (f32, State) {
        let (static_score, next) = self.model.score(state, word);
        if self.history.is_unknown(word.word()) {
            return (static_score, next);
        }
        let history_score = self.history.score(state.last_word(), word.word());
        let p = (1.0 - self.weight) * 10f32.powf(static_score)
            + self.weight * 10f32.powf(history_score);
        (p.log10(), next)
    }

    fn is_unknown(&self, idx: WordIndex, word: &str) -> bool {
        self.model.is_unknown(idx, word) && self.history.is_unknown(word)
    }

    fn unknown_penalty(&self) -> f32 {
        self.model.unknown_penalty()
    }
}
