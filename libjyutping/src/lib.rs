//! libjyutping crate root
//!
//! Cantonese (Jyutping) input on top of the shared `libchinese-core` decoding
//! engine: syllable tables and codec, segmentation of raw input, the trie
//! dictionary with its match cache, and the input context that ties them to
//! a language model.
//!
//! Public API exported here:
//! - `JyutpingDictionary`, `DictFormat`, `DictError` from `dictionary`
//! - `JyutpingMatchState` from `match_state`
//! - `JyutpingDecoder` from `decoder`
//! - `JyutpingIme` and `JyutpingContext`
//! - `JyutpingConfig`
//!
//! The codec lives in `encoder` and is used through its module path.

pub mod config;
pub mod context;
pub mod data;
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod ime;
pub mod match_state;

pub use config::JyutpingConfig;
pub use context::JyutpingContext;
pub use decoder::JyutpingDecoder;
pub use dictionary::{DictError, DictFormat, JyutpingDictionary};
pub use encoder::{EncodeError, JyutpingFinal, JyutpingInitial, JyutpingSyllable};
pub use ime::JyutpingIme;
pub use match_state::{CacheStats, JyutpingMatchState};

// Convenience re-exports of the core types callers need alongside.
pub use libchinese_core::{
    LanguageModel, NGramModel, SentenceResult, UserLanguageModel, SYSTEM_DICT, USER_DICT,
};
