// libjyutping/src/encoder.rs
//
// Jyutping syllable codec and user-input segmentation.
//
// Every syllable encodes to two bytes: the initial and the final, both taken
// from disjoint printable ranges starting at 'A'. A final byte of 0 in user
// input stands for "any final" (an initial typed on its own).
//
// `parse_user_jyutping` builds the segment graph of raw keystrokes:
// - runs of `'` become one separator edge
// - the longest syllable prefix is taken greedily
// - at an ambiguous boundary (`...n|g...`, `...a|...` etc.) both splits are
//   compared by how far the following syllable reaches
// - `ng`/`m` compounds optionally get an inner split (`ngaa` -> `ng|aa`)

use crate::data;
use libchinese_core::SegmentGraph;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use thiserror::Error;

/// Longest syllable spelling, in bytes.
pub const MAX_JYUTPING_LENGTH: usize = 6;

/// Default bound on forks at ambiguous boundaries while parsing one input.
pub const DEFAULT_MAX_FUZZY_FORKS: usize = 256;

/// Last letters shared by syllable endings and syllable beginnings.
const BOUNDARY_LETTERS: &[u8] = b"aegkmnoptu";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid full jyutping: {0}")]
    InvalidSyllable(String),

    #[error("invalid jyutping key length: {0}")]
    InvalidLength(usize),
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JyutpingInitial {
    Invalid = 0,
    B = b'A',
    P,
    M,
    F,
    D,
    T,
    N,
    L,
    G,
    K,
    NG,
    H,
    GW,
    KW,
    W,
    Z,
    C,
    S,
    J,
    Zero,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JyutpingFinal {
    Invalid = 0,
    AA = b'A',
    AAI,
    AAU,
    AAM,
    AAN,
    AANG,
    AAP,
    AAT,
    AAK,
    AI,
    AU,
    AM,
    AN,
    ANG,
    AP,
    AT,
    AK,
    E,
    EI,
    ET,
    EU,
    EM,
    EN,
    ENG,
    EP,
    EK,
    I,
    IU,
    IM,
    IN,
    ING,
    IP,
    IT,
    IK,
    O,
    OI,
    OU,
    ON,
    ONG,
    OT,
    OK,
    OE,
    OENG,
    OEK,
    OM,
    EOI,
    EON,
    EOT,
    U,
    UI,
    UN,
    UNG,
    UT,
    UK,
    YU,
    YUN,
    YUT,
    M,
    NG,
    Zero,
}

pub const FIRST_INITIAL: u8 = JyutpingInitial::B as u8;
pub const LAST_INITIAL: u8 = JyutpingInitial::Zero as u8;
pub const FIRST_FINAL: u8 = JyutpingFinal::AA as u8;
pub const LAST_FINAL: u8 = JyutpingFinal::Zero as u8;

use JyutpingFinal as F;
use JyutpingInitial as I;

const INITIALS: [(JyutpingInitial, &str); 20] = [
    (I::B, "b"),
    (I::P, "p"),
    (I::M, "m"),
    (I::F, "f"),
    (I::D, "d"),
    (I::T, "t"),
    (I::N, "n"),
    (I::L, "l"),
    (I::G, "g"),
    (I::K, "k"),
    (I::NG, "ng"),
    (I::H, "h"),
    (I::GW, "gw"),
    (I::KW, "kw"),
    (I::W, "w"),
    (I::Z, "z"),
    (I::C, "c"),
    (I::S, "s"),
    (I::J, "j"),
    (I::Zero, ""),
];

const FINALS: [(JyutpingFinal, &str); 60] = [
    (F::AA, "aa"),
    (F::AAI, "aai"),
    (F::AAU, "aau"),
    (F::AAM, "aam"),
    (F::AAN, "aan"),
    (F::AANG, "aang"),
    (F::AAP, "aap"),
    (F::AAT, "aat"),
    (F::AAK, "aak"),
    (F::AI, "ai"),
    (F::AU, "au"),
    (F::AM, "am"),
    (F::AN, "an"),
    (F::ANG, "ang"),
    (F::AP, "ap"),
    (F::AT, "at"),
    (F::AK, "ak"),
    (F::E, "e"),
    (F::EI, "ei"),
    (F::ET, "et"),
    (F::EU, "eu"),
    (F::EM, "em"),
    (F::EN, "en"),
    (F::ENG, "eng"),
    (F::EP, "ep"),
    (F::EK, "ek"),
    (F::I, "i"),
    (F::IU, "iu"),
    (F::IM, "im"),
    (F::IN, "in"),
    (F::ING, "ing"),
    (F::IP, "ip"),
    (F::IT, "it"),
    (F::IK, "ik"),
    (F::O, "o"),
    (F::OI, "oi"),
    (F::OU, "ou"),
    (F::ON, "on"),
    (F::ONG, "ong"),
    (F::OT, "ot"),
    (F::OK, "ok"),
    (F::OE, "oe"),
    (F::OENG, "oeng"),
    (F::OEK, "oek"),
    (F::OM, "om"),
    (F::EOI, "eoi"),
    (F::EON, "eon"),
    (F::EOT, "eot"),
    (F::U, "u"),
    (F::UI, "ui"),
    (F::UN, "un"),
    (F::UNG, "ung"),
    (F::UT, "ut"),
    (F::UK, "uk"),
    (F::YU, "yu"),
    (F::YUN, "yun"),
    (F::YUT, "yut"),
    (F::M, "m"),
    (F::NG, "ng"),
    (F::Zero, ""),
];

impl JyutpingInitial {
    pub fn from_byte(b: u8) -> Self {
        if is_valid_initial(b) {
            INITIALS[(b - FIRST_INITIAL) as usize].0
        } else {
            JyutpingInitial::Invalid
        }
    }

    /// Spelling of the initial; empty for `Zero` and `Invalid`.
    pub fn as_str(self) -> &'static str {
        let b = self as u8;
        if is_valid_initial(b) {
            INITIALS[(b - FIRST_INITIAL) as usize].1
        } else {
            ""
        }
    }

    /// Parse a spelled initial. The empty string is the zero initial.
    pub fn parse(s: &str) -> Option<Self> {
        INITIALS.iter().find(|(_, name)| *name == s).map(|(i, _)| *i)
    }

    /// All valid initials in encoding order.
    pub fn all() -> impl Iterator<Item = JyutpingInitial> {
        INITIALS.iter().map(|(i, _)| *i)
    }
}

impl JyutpingFinal {
    pub fn from_byte(b: u8) -> Self {
        if is_valid_final(b) {
            FINALS[(b - FIRST_FINAL) as usize].0
        } else {
            JyutpingFinal::Invalid
        }
    }

    pub fn as_str(self) -> &'static str {
        let b = self as u8;
        if is_valid_final(b) {
            FINALS[(b - FIRST_FINAL) as usize].1
        } else {
            ""
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        FINALS.iter().find(|(_, name)| *name == s).map(|(f, _)| *f)
    }

    /// All valid finals in encoding order.
    pub fn all() -> impl Iterator<Item = JyutpingFinal> {
        FINALS.iter().map(|(f, _)| *f)
    }
}

/// One syllable: initial plus final. Ordered by initial, then final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JyutpingSyllable {
    initial: JyutpingInitial,
    final_: JyutpingFinal,
}

impl JyutpingSyllable {
    pub const fn new(initial: JyutpingInitial, final_: JyutpingFinal) -> Self {
        Self { initial, final_ }
    }

    pub fn initial(&self) -> JyutpingInitial {
        self.initial
    }

    pub fn final_(&self) -> JyutpingFinal {
        self.final_
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.initial as u8, self.final_ as u8]
    }
}

impl fmt::Display for JyutpingSyllable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.initial.as_str(), self.final_.as_str())
    }
}

/// Candidate syllables of one segment: each initial with its finals and
/// whether the final was reached through fuzzy expansion.
pub type MatchedJyutpingSyllables = Vec<(JyutpingInitial, Vec<(JyutpingFinal, bool)>)>;

pub fn is_valid_initial(c: u8) -> bool {
    (FIRST_INITIAL..=LAST_INITIAL).contains(&c)
}

pub fn is_valid_final(c: u8) -> bool {
    (FIRST_FINAL..=LAST_FINAL).contains(&c)
}

/// Whether `initial + final` is a syllable of the language.
pub fn is_valid_initial_final(initial: JyutpingInitial, final_: JyutpingFinal) -> bool {
    if initial == JyutpingInitial::Invalid || final_ == JyutpingFinal::Invalid {
        return false;
    }
    data::is_valid_pair(initial, final_)
}

/// Index of a pair in the validity bitmap.
pub(crate) fn pair_index(initial: JyutpingInitial, final_: JyutpingFinal) -> usize {
    let span = (LAST_FINAL - FIRST_FINAL) as usize + 1;
    (initial as u8 - FIRST_INITIAL) as usize * span + (final_ as u8 - FIRST_FINAL) as usize
}

/// Longest syllable or initial at the start of `s`, and whether it is a
/// complete syllable. Syllabic `m`/`ng` alone do not count as complete.
/// Falls back to one character.
fn longest_match(s: &str) -> (usize, bool) {
    let max = s.len().min(MAX_JYUTPING_LENGTH);
    for len in (1..=max).rev() {
        let Some(prefix) = s.get(..len) else {
            continue;
        };
        if data::syllable(prefix).is_some() {
            return (len, prefix != "m" && prefix != "ng");
        }
        if len <= 2 && JyutpingInitial::parse(prefix).is_some() {
            return (len, false);
        }
    }
    (s.chars().next().map_or(0, char::len_utf8), false)
}

/// Segment raw user input into a graph of syllable candidates.
///
/// # Example
/// ```
/// use libjyutping::encoder::parse_user_jyutping;
///
/// let graph = parse_user_jyutping("jinhau", true);
/// assert_eq!(graph.nexts(0), &[3]);
/// assert_eq!(graph.segment(3, 6), "hau");
/// ```
pub fn parse_user_jyutping(input: &str, inner: bool) -> SegmentGraph {
    parse_user_jyutping_with(input, inner, DEFAULT_MAX_FUZZY_FORKS)
}

/// Like [`parse_user_jyutping`], with an explicit bound on the number of
/// boundaries where both splits are kept. Past the bound only the greedy
/// split is added.
pub fn parse_user_jyutping_with(input: &str, inner: bool, max_forks: usize) -> SegmentGraph {
    let mut graph = SegmentGraph::new(input);
    let bytes = input.as_bytes();
    let size = input.len();
    let mut queue = BinaryHeap::new();
    queue.push(Reverse(0usize));
    let mut forks = 0usize;

    while let Some(Reverse(top)) = queue.pop() {
        while queue.peek() == Some(&Reverse(top)) {
            queue.pop();
        }
        if top >= size {
            continue;
        }
        if bytes[top] == b'\'' {
            let run = bytes[top..].iter().take_while(|&&b| b == b'\'').count();
            let next = top + run;
            graph.add_next(top, next);
            if next < size {
                queue.push(Reverse(next));
            }
            continue;
        }
        let Some(rest) = input.get(top..) else {
            continue;
        };
        let (len, complete) = longest_match(rest);
        if !complete {
            graph.add_next(top, top + len);
            queue.push(Reverse(top + len));
            continue;
        }

        let mut chosen = [0usize; 2];
        let mut n_chosen = 0;
        let ambiguous = len > 1
            && top + len < size
            && bytes[top + len] != b'\''
            && BOUNDARY_LETTERS.contains(&bytes[top + len - 1])
            && data::syllable(&rest[..len - 1]).is_some();
        if ambiguous {
            let next = longest_match(&rest[len..]);
            let alt = longest_match(&rest[len - 1..]);
            let greedy_key = (len + next.0, next.1);
            let alt_key = (len - 1 + alt.0, alt.1);
            let take_greedy = greedy_key >= alt_key;
            let mut take_alt = greedy_key <= alt_key;
            if take_greedy && take_alt {
                if forks >= max_forks {
                    take_alt = false;
                } else {
                    forks += 1;
                }
            }
            if take_greedy {
                graph.add_next(top, top + len);
                queue.push(Reverse(top + len));
                chosen[n_chosen] = len;
                n_chosen += 1;
            }
            if take_alt {
                graph.add_next(top, top + len - 1);
                queue.push(Reverse(top + len - 1));
                chosen[n_chosen] = len - 1;
                n_chosen += 1;
            }
        } else {
            graph.add_next(top, top + len);
            queue.push(Reverse(top + len));
            chosen[n_chosen] = len;
            n_chosen += 1;
        }

        if !inner {
            continue;
        }
        for &chosen_len in &chosen[..n_chosen] {
            if chosen_len < 4 {
                continue;
            }
            if let Some((first, _)) = data::inner_segment(&rest[..chosen_len]) {
                graph.add_next(top, top + first.len());
                graph.add_next(top + first.len(), top + chosen_len);
            }
        }
    }
    if forks >= max_forks {
        tracing::debug!(forks, "ambiguous boundary fork limit reached");
    }
    graph
}

/// Encode user input along its first segmentation, two bytes per segment.
/// A lone initial encodes with final byte 0. Any segment that is neither a
/// syllable nor an initial makes the whole result empty.
pub fn encode_one_user_jyutping(input: &str) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let graph = parse_user_jyutping(input, false);
    let mut result = Vec::new();
    let mut node = graph.start();
    while let Some(&next) = graph.nexts(node).first() {
        let seg = graph.segment(node, next);
        node = next;
        if seg.is_empty() || seg.starts_with('\'') {
            continue;
        }
        let syllables = string_to_syllables(seg);
        let Some((initial, finals)) = syllables.first() else {
            return Vec::new();
        };
        if *initial == JyutpingInitial::Invalid || finals.is_empty() {
            return Vec::new();
        }
        result.push(*initial as u8);
        result.push(finals.first().map_or(0, |(f, _)| *f as u8));
    }
    result
}

/// Whether `data` looks like encoded user input: pairs whose first byte is
/// a valid initial.
pub fn is_valid_user_jyutping(data: &[u8]) -> bool {
    data.len() % 2 == 0 && data.chunks(2).all(|pair| is_valid_initial(pair[0]))
}

/// Spell out encoded syllables, joined by `'`.
///
/// # Example
/// ```
/// use libjyutping::encoder::{decode_full_jyutping, encode_full_jyutping};
///
/// let encoded = encode_full_jyutping("nei'hou").unwrap();
/// assert_eq!(decode_full_jyutping(&encoded).unwrap(), "nei'hou");
/// ```
pub fn decode_full_jyutping(data: &[u8]) -> Result<String, EncodeError> {
    if data.len() % 2 != 0 {
        return Err(EncodeError::InvalidLength(data.len()));
    }
    let mut result = String::new();
    for (i, pair) in data.chunks(2).enumerate() {
        if i > 0 {
            result.push('\'');
        }
        result.push_str(JyutpingInitial::from_byte(pair[0]).as_str());
        result.push_str(JyutpingFinal::from_byte(pair[1]).as_str());
    }
    Ok(result)
}

/// Encode `'`-separated full syllables. Every token must be a syllable.
pub fn encode_full_jyutping(jyutping: &str) -> Result<Vec<u8>, EncodeError> {
    let mut result = Vec::new();
    for token in jyutping.split('\'') {
        let syllable = data::syllable(token)
            .ok_or_else(|| EncodeError::InvalidSyllable(jyutping.to_string()))?;
        result.extend_from_slice(&syllable.encode());
    }
    Ok(result)
}

fn add_candidate(result: &mut MatchedJyutpingSyllables, syllable: JyutpingSyllable) {
    let pos = match result.iter().position(|(i, _)| *i == syllable.initial()) {
        Some(pos) => pos,
        None => {
            result.push((syllable.initial(), Vec::new()));
            result.len() - 1
        }
    };
    let finals = &mut result[pos].1;
    if !finals.iter().any(|(f, _)| *f == syllable.final_()) {
        finals.push((syllable.final_(), false));
    }
}

/// Candidate syllables of one segment.
///
/// A full syllable maps to its own pair; a lone initial maps to the initial
/// with `JyutpingFinal::Invalid`, which stands for any final. `m` and `ng`
/// are only treated as initials. Anything else yields a single invalid pair.
pub fn string_to_syllables(jyutping: &str) -> MatchedJyutpingSyllables {
    let mut result = MatchedJyutpingSyllables::new();
    if jyutping != "m" && jyutping != "ng" {
        if let Some(syllable) = data::syllable(jyutping) {
            add_candidate(&mut result, syllable);
        }
    }
    if let Some(initial) = JyutpingInitial::parse(jyutping) {
        add_candidate(
            &mut result,
            JyutpingSyllable::new(initial, JyutpingFinal::Invalid),
        );
    }
    if result.is_empty() {
        result.push((
            JyutpingInitial::Invalid,
            vec![(JyutpingFinal::Invalid, false)],
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_ranges() {
        assert_eq!(LAST_INITIAL - FIRST_INITIAL + 1, 20);
        assert_eq!(LAST_FINAL - FIRST_FINAL + 1, 60);
        assert_eq!(JyutpingInitial::from_byte(b'O'), JyutpingInitial::W);
        assert_eq!(JyutpingFinal::from_byte(LAST_FINAL), JyutpingFinal::Zero);
        assert_eq!(JyutpingFinal::from_byte(0), JyutpingFinal::Invalid);
        assert!(!is_valid_initial(b'A' - 1));
        assert!(!is_valid_initial(LAST_INITIAL + 1));
    }

    #[test]
    fn spelled_names_round_trip() {
        for initial in JyutpingInitial::all() {
            assert_eq!(JyutpingInitial::parse(initial.as_str()), Some(initial));
        }
        for final_ in JyutpingFinal::all() {
            assert_eq!(JyutpingFinal::parse(final_.as_str()), Some(final_));
        }
    }

    #[test]
    fn longest_match_rules() {
        assert_eq!(longest_match("hou"), (3, true));
        assert_eq!(longest_match("ng"), (2, false));
        assert_eq!(longest_match("m"), (1, false));
        assert_eq!(longest_match("gw"), (2, false));
        assert_eq!(longest_match("xyz"), (1, false));
        assert_eq!(longest_match("zoenghaa"), (5, true));
    }

    #[test]
    fn syllable_display_and_order() {
        let a = JyutpingSyllable::new(JyutpingInitial::N, JyutpingFinal::EI);
        let b = JyutpingSyllable::new(JyutpingInitial::H, JyutpingFinal::OU);
        assert_eq!(a.to_string(), "nei");
        assert!(a < b);
    }

    #[test]
    fn lone_initial_has_open_final() {
        assert_eq!(encode_one_user_jyutping("ng"), vec![JyutpingInitial::NG as u8, 0]);
        let syls = string_to_syllables("g");
        assert_eq!(syls, vec![(JyutpingInitial::G, vec![(JyutpingFinal::Invalid, false)])]);
        let syls = string_to_syllables("x");
        assert_eq!(syls[0].0, JyutpingInitial::Invalid);
    }

    #[test]
    fn encode_full_rejects_unknown_tokens() {
        assert!(matches!(
            encode_full_jyutping("nei'xyz"),
            Err(EncodeError::InvalidSyllable(_))
        ));
        assert_eq!(decode_full_jyutping(&[b'A']), Err(EncodeError::InvalidLength(1)));
    }

    #[test]
    fn fork_limit_keeps_greedy_edge() {
        // "gaang|aa" and "gaan|gaa" reach equally far.
        let open = parse_user_jyutping_with("gaangaa", false, 4);
        let capped = parse_user_jyutping_with("gaangaa", false, 0);
        assert!(capped.nexts(0).len() <= open.nexts(0).len());
        assert_eq!(capped.nexts(0).first(), open.nexts(0).first());
        assert!(capped.check_graph());
    }
}
