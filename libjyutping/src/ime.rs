//! Jyutping input method: dictionary, language model and decoding options
//! shared by every input context.
//!
//! Contexts borrow the IME and read its options on each decode. Changing an
//! option bumps [`JyutpingIme::option_revision`]; a context that sees a new
//! revision resets itself before its next operation.

use std::cell::{Cell, Ref, RefCell, RefMut};

use crate::config::JyutpingConfig;
use crate::dictionary::JyutpingDictionary;
use libchinese_core::{DecodeOptions, HistoryBigram, UserLanguageModel};

#[derive(Debug)]
pub struct JyutpingIme {
    dict: RefCell<JyutpingDictionary>,
    model: RefCell<UserLanguageModel>,
    config: RefCell<JyutpingConfig>,
    option_revision: Cell<u64>,
}

impl JyutpingIme {
    pub fn new(dict: JyutpingDictionary, model: UserLanguageModel) -> Self {
        Self::from_config(dict, model, JyutpingConfig::default())
    }

    /// Build an IME with options taken from `config`.
    ///
    /// The history weight is applied to `model`. An empty history is
    /// replaced by one with the configured capacity.
    pub fn from_config(
        dict: JyutpingDictionary,
        mut model: UserLanguageModel,
        config: JyutpingConfig,
    ) -> Self {
        model.set_history_weight(config.base.history_weight);
        if model.history().is_empty() {
            *model.history_mut() = HistoryBigram::with_capacity(config.base.history_capacity);
        }
        Self {
            dict: RefCell::new(dict),
            model: RefCell::new(model),
            config: RefCell::new(config),
            option_revision: Cell::new(0),
        }
    }

    /// Panics if the dictionary is mutably borrowed, which only happens
    /// while a caller holds [`JyutpingIme::dict_mut`].
    pub fn dict(&self) -> Ref<'_, JyutpingDictionary> {
        self.dict.borrow()
    }

    pub fn dict_mut(&self) -> RefMut<'_, JyutpingDictionary> {
        self.dict.borrow_mut()
    }

    pub fn model(&self) -> Ref<'_, UserLanguageModel> {
        self.model.borrow()
    }

    pub fn model_mut(&self) -> RefMut<'_, UserLanguageModel> {
        self.model.borrow_mut()
    }

    /// Snapshot of the current options.
    pub fn config(&self) -> JyutpingConfig {
        self.config.borrow().clone()
    }

    pub fn option_revision(&self) -> u64 {
        self.option_revision.get()
    }

    fn update_config<F>(&self, f: F)
    where
        F: FnOnce(&mut JyutpingConfig),
    {
        let changed = {
            let mut config = self.config.borrow_mut();
            let before = config.clone();
            f(&mut config);
            *config != before
        };
        if changed {
            self.option_revision.set(self.option_revision.get() + 1);
            tracing::debug!(revision = self.option_revision.get(), "ime options changed");
        }
    }

    pub fn inner_segment(&self) -> bool {
        self.config.borrow().inner_segment
    }

    pub fn set_inner_segment(&self, inner: bool) {
        self.update_config(|c| c.inner_segment = inner);
    }

    pub fn nbest(&self) -> usize {
        self.config.borrow().base.nbest
    }

    pub fn set_nbest(&self, n: usize) {
        self.update_config(|c| c.base.nbest = n);
    }

    pub fn beam_size(&self) -> usize {
        self.config.borrow().base.beam_size
    }

    pub fn set_beam_size(&self, n: usize) {
        self.update_config(|c| c.base.beam_size = n);
    }

    pub fn frame_size(&self) -> usize {
        self.config.borrow().base.frame_size
    }

    pub fn set_frame_size(&self, n: usize) {
        self.update_config(|c| c.base.frame_size = n);
    }

    pub fn max_distance(&self) -> f32 {
        self.config.borrow().base.max_distance
    }

    pub fn min_path(&self) -> f32 {
        self.config.borrow().base.min_path
    }

    /// Drop sentences scoring more than `max_distance` below the best one or
    /// below `min_path`.
    pub fn set_score_filter(&self, max_distance: f32, min_path: f32) {
        self.update_config(|c| {
            c.base.max_distance = max_distance;
            c.base.min_path = min_path;
        });
    }

    pub fn decode_options(&self) -> DecodeOptions {
        self.config.borrow().base.decode_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libchinese_core::NGramModel;

    fn ime() -> JyutpingIme {
        JyutpingIme::new(
            JyutpingDictionary::new(),
            UserLanguageModel::new(NGramModel::new()),
        )
    }

    #[test]
    fn setters_bump_revision_on_change_only() {
        let ime = ime();
        assert_eq!(ime.option_revision(), 0);
        ime.set_nbest(1);
        assert_eq!(ime.option_revision(), 0);
        ime.set_nbest(3);
        assert_eq!(ime.nbest(), 3);
        assert_eq!(ime.option_revision(), 1);
        ime.set_inner_segment(false);
        ime.set_score_filter(10.0, -50.0);
        assert_eq!(ime.option_revision(), 3);
        assert_eq!(ime.decode_options().max_distance, 10.0);
        assert_eq!(ime.min_path(), -50.0);
    }

    #[test]
    fn config_applies_history_weight() {
        let mut config = JyutpingConfig::default();
        config.base.history_weight = 0.5;
        config.base.frame_size = 8;
        let ime = JyutpingIme::from_config(
            JyutpingDictionary::new(),
            UserLanguageModel::new(NGramModel::new()),
            config,
        );
        assert_eq!(ime.model().history_weight(), 0.5);
        assert_eq!(ime.frame_size(), 8);
    }
}
