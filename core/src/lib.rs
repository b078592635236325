//! libchinese-core
//!
//! Language-agnostic pieces of a lattice-based input method engine, shared by
//! language-specific crates (libjyutping).
//!
//! Public API:
//! - `SegmentGraph` - DAG of candidate segmentations over raw input offsets
//! - `Trie` / `TrieDictionary` - byte-keyed cost tries grouped in dictionary slots
//! - `LanguageModel` - scoring contract, with `NGramModel`, `HistoryBigram`
//!   and the mixing `UserLanguageModel`
//! - `Lattice` / `Decoder` - beam-pruned Viterbi decoding with n-best output
//! - `InputBuffer` - raw input with cursor
//! - `Config` - decoder options, serializable as TOML
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod segment_graph;
pub use segment_graph::{NodeId, SegmentGraph};

pub mod trie;
pub use trie::{Trie, TriePosition, TRIE_ROOT};

pub mod trie_dictionary;
pub use trie_dictionary::{TrieDictionary, SYSTEM_DICT, USER_DICT};

pub mod language_model;
pub use language_model::{
    LanguageModel, ModelError, State, WordIndex, WordNode, DEFAULT_UNKNOWN_PENALTY,
    INVALID_WORD_INDEX, UNKNOWN_WORD_INDEX,
};

pub mod ngram;
pub use ngram::NGramModel;

pub mod history;
pub use history::HistoryBigram;

pub mod user_model;
pub use user_model::UserLanguageModel;

pub mod lattice;
pub use lattice::{Lattice, LatticeNode, LatticeNodeData, NodeRef, SentenceNode, SentenceResult};

pub mod decoder;
pub use decoder::{DecodeOptions, Decoder, Dictionary};

pub mod input_buffer;
pub use input_buffer::InputBuffer;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Generic decoder configuration.
///
/// This config contains only language-agnostic fields. Language-specific
/// options (segmentation switches and the like) belong in the language crate,
/// which flattens this struct into its own config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of distinct sentences produced by the primary decode.
    pub nbest: usize,
    /// Predecessor lattice nodes considered per frame.
    pub beam_size: usize,
    /// Lattice nodes kept per frame.
    pub frame_size: usize,
    /// Sentences scoring further than this below the best are dropped.
    pub max_distance: f32,
    /// Absolute score floor for n-best sentences.
    pub min_path: f32,

    // Match cache bounds (entries per dictionary slot)
    pub node_cache_size: usize,
    pub match_cache_size: usize,

    // Learning
    /// Weight of the history model when mixing with the static model.
    pub history_weight: f32,
    /// Number of words the history keeps.
    pub history_capacity: usize,

    /// Upper bound on ambiguous-boundary forks while parsing one input.
    pub max_fuzzy_forks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nbest: 1,
            beam_size: 20,
            frame_size: 40,
            max_distance: f32::MAX,
            min_path: -f32::MAX,
            node_cache_size: 1024,
            match_cache_size: 2048,
            history_weight: 0.2,
            history_capacity: 8192,
            max_fuzzy_forks: 256,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Search bounds handed to the decoder.
    ///
    /// # Example
    /// ```
    /// # use libchinese_core::Config;
    /// let config = Config { nbest: 3, ..Config::default() };
    /// assert_eq!(config.decode_options().nbest, 3);
    /// assert_eq!(config.decode_options().beam_size, 20);
    /// ```
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            nbest: self.nbest,
            max_distance: self.max_distance,
            min_path: self.min_path,
            beam_size: self.beam_size,
            frame_size: self.frame_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str("nbest = 4\nbeam_size = 8\n").unwrap();
        assert_eq!(config.nbest, 4);
        assert_eq!(config.beam_size, 8);
        assert_eq!(config.frame_size, 40);
        assert_eq!(config.max_fuzzy_forks, 256);
    }

    #[test]
    fn toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decoder.toml");
        let config = Config {
            nbest: 2,
            max_distance: 5.0,
            ..Config::default()
        };
        config.save_toml(&path).unwrap();
        assert_eq!(Config::load_toml(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load_toml("/nonexistent/decoder.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
