// libjyutping/src/data.rs
//
// Static syllable tables.
//
// The syllable map is generated once from the finals each initial combines
// with, plus the syllabic nasals (`m`, `ng`, `hm`, `hng`). The validity bitmap
// is derived from the same map, so both always agree. The inner-segment table
// lists `ng-`/`m-` compounds that can also be read as two syllables.

use crate::encoder::{
    pair_index, JyutpingFinal as F, JyutpingInitial as I, JyutpingSyllable, FIRST_FINAL,
    FIRST_INITIAL, LAST_FINAL, LAST_INITIAL,
};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use phf::phf_map;

const COMMON: &[F] = &[
    F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU, F::AM,
    F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU, F::IM, F::IN,
    F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OE, F::OENG, F::OEK,
    F::EOI, F::EON, F::EOT, F::UNG, F::UK, F::YU, F::YUN, F::YUT,
];

const LABIAL: &[F] = &[
    F::AA, F::AAI, F::AAU, F::AAN, F::AANG, F::AAT, F::AAK, F::AI, F::AU, F::AM, F::AN, F::ANG,
    F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU, F::IN, F::ING, F::IT, F::IK, F::O,
    F::OU, F::ONG, F::OK, F::UI, F::UN, F::UT, F::UNG, F::UK,
];

/// Finals each initial combines with.
const FINALS_BY_INITIAL: &[(I, &[F])] = &[
    (I::B, LABIAL),
    (I::P, LABIAL),
    (
        I::M,
        &[
            F::AA, F::AAI, F::AAU, F::AAN, F::AANG, F::AAT, F::AAK, F::AI, F::AU, F::AN, F::ANG,
            F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU, F::IN, F::ING, F::IT, F::IK,
            F::O, F::OU, F::ONG, F::OK, F::UI, F::UN, F::UT, F::UNG, F::UK,
        ],
    ),
    (
        I::F,
        &[
            F::AA, F::AAI, F::AAN, F::AANG, F::AAT, F::AI, F::AU, F::AN, F::ANG, F::AT, F::EI,
            F::ING, F::O, F::ONG, F::OK, F::U, F::UI, F::UN, F::UNG, F::UK,
        ],
    ),
    (
        I::D,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU,
            F::IM, F::IN, F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OE,
            F::OENG, F::OEK, F::EOI, F::EON, F::EOT, F::UNG, F::UK, F::YUN, F::YUT,
        ],
    ),
    (
        I::T,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU,
            F::IM, F::IN, F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OE,
            F::OENG, F::OEK, F::EOI, F::EON, F::EOT, F::UNG, F::UK, F::YUN, F::YUT,
        ],
    ),
    (
        I::N,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::I, F::IU, F::IM,
            F::IN, F::ING, F::IP, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OENG, F::EOI,
            F::EON, F::UNG, F::UK, F::YU, F::YUN, F::YUT,
        ],
    ),
    (I::L, COMMON),
    (
        I::G,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::I, F::IU, F::IM,
            F::IN, F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ON, F::ONG, F::OT, F::OK,
            F::OE, F::OENG, F::OEK, F::EOI, F::UNG, F::UK,
        ],
    ),
    (
        I::K,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU,
            F::IM, F::IN, F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OENG,
            F::OEK, F::EOI, F::UI, F::UNG, F::UK, F::YUN, F::YUT,
        ],
    ),
    (
        I::NG,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAK, F::AI, F::AU, F::AM,
            F::AN, F::ANG, F::AP, F::AT, F::AK, F::O, F::OI, F::OU, F::ON, F::ONG, F::OK,
        ],
    ),
    (
        I::H,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::ENG, F::EK, F::I, F::IU,
            F::IM, F::IN, F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ON, F::ONG, F::OT,
            F::OK, F::OE, F::OENG, F::OEK, F::EOI, F::UNG, F::UK, F::YUN, F::YUT,
        ],
    ),
    (
        I::GW,
        &[
            F::AA, F::AAI, F::AAN, F::AANG, F::AAT, F::AAK, F::AI, F::AN, F::ANG, F::AT, F::IK,
            F::ING, F::O, F::OK, F::ONG,
        ],
    ),
    (
        I::KW,
        &[
            F::AA, F::AAI, F::AANG, F::AI, F::AN, F::ANG, F::AT, F::IK, F::ING, F::ONG,
        ],
    ),
    (
        I::W,
        &[
            F::AA, F::AAI, F::AAN, F::AANG, F::AAT, F::AAK, F::AI, F::AN, F::ANG, F::AT, F::AK,
            F::E, F::ING, F::IK, F::O, F::ONG, F::OK, F::U, F::UI, F::UN, F::UT,
        ],
    ),
    (I::Z, COMMON),
    (I::C, COMMON),
    (I::S, COMMON),
    (
        I::J,
        &[
            F::AA, F::AAI, F::AAU, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU, F::AM,
            F::AN, F::ANG, F::AP, F::AT, F::E, F::EI, F::ENG, F::EK, F::I, F::IU, F::IM, F::IN,
            F::ING, F::IP, F::IT, F::IK, F::O, F::OI, F::OU, F::ONG, F::OK, F::OE, F::OENG,
            F::OEK, F::EOI, F::EON, F::EOT, F::UNG, F::UK, F::YU, F::YUN, F::YUT,
        ],
    ),
    (
        I::Zero,
        &[
            F::AA, F::AAI, F::AAU, F::AAM, F::AAN, F::AANG, F::AAP, F::AAT, F::AAK, F::AI, F::AU,
            F::AM, F::AN, F::ANG, F::AP, F::AT, F::AK, F::E, F::EI, F::O, F::OI, F::OU, F::ON,
            F::ONG, F::OK, F::UK, F::UNG,
        ],
    ),
];

/// Syllabic nasals, spelled out explicitly.
const NASALS: &[(&str, I, F)] = &[
    ("m", I::M, F::Zero),
    ("ng", I::NG, F::Zero),
    ("hm", I::H, F::M),
    ("hng", I::H, F::NG),
];

static SYLLABLES: Lazy<AHashMap<String, JyutpingSyllable>> = Lazy::new(|| {
    let mut map = AHashMap::new();
    for &(initial, finals) in FINALS_BY_INITIAL {
        for &final_ in finals {
            let syllable = JyutpingSyllable::new(initial, final_);
            map.insert(syllable.to_string(), syllable);
        }
    }
    for &(spelling, initial, final_) in NASALS {
        map.insert(spelling.to_string(), JyutpingSyllable::new(initial, final_));
    }
    map
});

static VALID_PAIRS: Lazy<Vec<bool>> = Lazy::new(|| {
    let initials = (LAST_INITIAL - FIRST_INITIAL) as usize + 1;
    let finals = (LAST_FINAL - FIRST_FINAL) as usize + 1;
    let mut bits = vec![false; initials * finals];
    for syllable in SYLLABLES.values() {
        bits[pair_index(syllable.initial(), syllable.final_())] = true;
    }
    bits
});

/// Compounds that also split into an `ng`/`m` syllable and a zero-initial
/// syllable.
static INNER_SEGMENT: phf::Map<&'static str, (&'static str, &'static str)> = phf_map! {
    "ngaa" => ("ng", "aa"),
    "ngaai" => ("ng", "aai"),
    "ngaau" => ("ng", "aau"),
    "ngaam" => ("ng", "aam"),
    "ngaan" => ("ng", "aan"),
    "ngaang" => ("ng", "aang"),
    "ngaap" => ("ng", "aap"),
    "ngaak" => ("ng", "aak"),
    "ngai" => ("ng", "ai"),
    "ngau" => ("ng", "au"),
    "ngam" => ("ng", "am"),
    "ngan" => ("ng", "an"),
    "ngang" => ("ng", "ang"),
    "ngap" => ("ng", "ap"),
    "ngat" => ("ng", "at"),
    "ngak" => ("ng", "ak"),
    "ngoi" => ("ng", "oi"),
    "ngou" => ("ng", "ou"),
    "ngon" => ("ng", "on"),
    "ngong" => ("ng", "ong"),
    "ngok" => ("ng", "ok"),
    "maai" => ("m", "aai"),
    "maau" => ("m", "aau"),
    "maan" => ("m", "aan"),
    "maang" => ("m", "aang"),
    "maat" => ("m", "aat"),
    "maak" => ("m", "aak"),
};

/// Look up a full syllable spelling.
pub fn syllable(spelling: &str) -> Option<JyutpingSyllable> {
    SYLLABLES.get(spelling).copied()
}

/// Every syllable spelling with its pair, in no particular order.
pub fn syllables() -> impl Iterator<Item = (&'static str, JyutpingSyllable)> {
    SYLLABLES.iter().map(|(s, syl)| (s.as_str(), *syl))
}

pub(crate) fn is_valid_pair(initial: I, final_: F) -> bool {
    VALID_PAIRS
        .get(pair_index(initial, final_))
        .copied()
        .unwrap_or(false)
}

/// Two-syllable reading of an `ng`/`m` compound.
pub fn inner_segment(spelling: &str) -> Option<(&'static str, &'static str)> {
    INNER_SEGMENT.get(spelling).copied()
}
