// libjyutping/src/decoder.rs
//
// Jyutping flavour of the core decoder: single-syllable words that the
// language model has never seen are kept out of the lattice, unless they
// start right at the beginning of the input.

use crate::dictionary::JyutpingDictionary;
use crate::match_state::JyutpingMatchState;
use libchinese_core::{DecodeOptions, Decoder, LanguageModel, Lattice, SegmentGraph, State};

pub struct JyutpingDecoder<'a, M> {
    inner: Decoder<'a, JyutpingDictionary, M>,
}

impl<'a, M: LanguageModel> JyutpingDecoder<'a, M> {
    pub fn new(dict: &'a JyutpingDictionary, model: &'a M) -> Self {
        Self {
            inner: Decoder::new(dict, model),
        }
    }

    pub fn dict(&self) -> &JyutpingDictionary {
        self.inner.dict()
    }

    pub fn model(&self) -> &M {
        self.inner.model()
    }

    /// Decode `graph` into `lattice`. Returns whether a sentence reached the
    /// end of the input.
    pub fn decode(
        &self,
        lattice: &mut Lattice,
        graph: &SegmentGraph,
        state: &State,
        options: &DecodeOptions,
        match_state: Option<&mut JyutpingMatchState>,
    ) -> bool {
        let model = self.inner.model();
        let start = graph.start();
        self.inner
            .decode_with(lattice, graph, state, options, match_state, |path, word, data| {
                let single = data.encoded().len() == 2;
                let at_start = path.first() == Some(&start);
                !(model.is_unknown(word.index(), word.word()) && single && !at_start)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictFormat;
    use crate::encoder::parse_user_jyutping;
    use libchinese_core::NGramModel;

    fn setup() -> (JyutpingDictionary, NGramModel) {
        let mut dict = JyutpingDictionary::new();
        let text = "你 nei 0\n好 hou 0\n號 hou 0\n你好 nei'hou 0\n";
        dict.load(0, text.as_bytes(), DictFormat::Text).unwrap();
        let mut model = NGramModel::new();
        model.insert_unigram("你", -1.0, 0.0);
        model.insert_unigram("好", -1.0, 0.0);
        model.insert_unigram("你好", -1.5, 0.0);
        (dict, model)
    }

    #[test]
    fn unknown_single_syllable_word_only_at_start() {
        let (dict, model) = setup();
        let decoder = JyutpingDecoder::new(&dict, &model);
        let graph = parse_user_jyutping("neihou", true);
        let mut lattice = Lattice::new();
        let options = DecodeOptions {
            nbest: 3,
            ..DecodeOptions::default()
        };
        assert!(decoder.decode(&mut lattice, &graph, &model.null_state(), &options, None));
        let words: Vec<&str> = lattice.nodes(6).iter().map(|n| n.word()).collect();
        assert!(words.contains(&"好"));
        assert!(words.contains(&"你好"));
        assert!(!words.contains(&"號"));

        let graph = parse_user_jyutping("hou", true);
        let mut lattice = Lattice::new();
        decoder.decode(&mut lattice, &graph, &model.null_state(), &options, None);
        let words: Vec<&str> = lattice.nodes(3).iter().map(|n| n.word()).collect();
        assert!(words.contains(&"號"));
    }

    #[test]
    fn best_sentence_uses_phrase() {
        let (dict, model) = setup();
        let decoder = JyutpingDecoder::new(&dict, &model);
        let graph = parse_user_jyutping("neihou", true);
        let mut lattice = Lattice::new();
        let mut state = JyutpingMatchState::new();
        decoder.decode(
            &mut lattice,
            &graph,
            &model.null_state(),
            &DecodeOptions::default(),
            Some(&mut state),
        );
        assert_eq!(lattice.sentence(0).unwrap().to_string(), "你好");
    }
}
