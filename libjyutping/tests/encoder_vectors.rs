// Segmentation and syllable codec vectors.
//
// Covers the syllable table round trip, the validity bitmap against the
// table, and connectivity of graphs parsed from arbitrary input.
//
// File: libjyutping/tests/encoder_vectors.rs

use libjyutping::data;
use libjyutping::encoder::{
    decode_full_jyutping, encode_full_jyutping, encode_one_user_jyutping, is_valid_initial_final,
    parse_user_jyutping, string_to_syllables,
};
use libjyutping::{JyutpingFinal, JyutpingInitial};
use std::collections::HashSet;

fn full_paths(input: &str, inner: bool) -> Vec<Vec<String>> {
    let graph = parse_user_jyutping(input, inner);
    let mut paths = Vec::new();
    graph.dfs(|path| {
        paths.push(
            path.windows(2)
                .map(|p| graph.segment(p[0], p[1]).to_string())
                .collect(),
        );
        true
    });
    paths
}

#[test]
fn jinhau_has_two_syllable_path() {
    let paths = full_paths("jinhau", true);
    assert!(paths.contains(&vec!["jin".to_string(), "hau".to_string()]));
}

#[test]
fn ng_alone_is_an_edge_but_not_a_syllable() {
    let graph = parse_user_jyutping("ng", true);
    assert_eq!(graph.nexts(0), &[2]);
    assert!(graph.check_graph());
    let syllables = string_to_syllables("ng");
    assert_eq!(syllables.len(), 1);
    assert_eq!(syllables[0].0, JyutpingInitial::NG);
    assert_eq!(syllables[0].1, vec![(JyutpingFinal::Invalid, false)]);
}

#[test]
fn separators_form_one_edge() {
    let graph = parse_user_jyutping("nei''hou", true);
    assert_eq!(graph.nexts(3), &[5]);
    assert_eq!(graph.segment(3, 5), "''");
    assert_eq!(encode_one_user_jyutping("nei''hou").len(), 4);
}

#[test]
fn unknown_segment_encodes_to_nothing() {
    assert!(encode_one_user_jyutping("x").is_empty());
    assert!(encode_one_user_jyutping("neix").is_empty());
    assert!(encode_one_user_jyutping("xnei").is_empty());
    // lone initials still encode
    assert_eq!(
        encode_one_user_jyutping("neih"),
        vec![
            JyutpingInitial::N as u8,
            JyutpingFinal::EI as u8,
            JyutpingInitial::H as u8,
            0
        ]
    );
}

#[test]
fn inner_segment_adds_split() {
    let with_inner = full_paths("ngaan", true);
    let without = full_paths("ngaan", false);
    assert!(with_inner.contains(&vec!["ng".to_string(), "aan".to_string()]));
    assert!(!without.contains(&vec!["ng".to_string(), "aan".to_string()]));
}

#[test]
fn every_syllable_round_trips() {
    let mut count = 0;
    for (spelling, syllable) in data::syllables() {
        let encoded = encode_full_jyutping(spelling).unwrap();
        assert_eq!(encoded, syllable.encode());
        assert_eq!(decode_full_jyutping(&encoded).unwrap(), spelling);
        count += 1;
    }
    assert!(count > 600);
}

#[test]
fn bitmap_matches_syllable_table() {
    let table: HashSet<(JyutpingInitial, JyutpingFinal)> = data::syllables()
        .map(|(_, s)| (s.initial(), s.final_()))
        .collect();
    for initial in JyutpingInitial::all() {
        for final_ in JyutpingFinal::all() {
            assert_eq!(
                is_valid_initial_final(initial, final_),
                table.contains(&(initial, final_)),
                "{initial:?} {final_:?}"
            );
        }
    }
}

#[test]
fn random_inputs_stay_connected() {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz'";
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for round in 0..500 {
        let len = 1 + round % 17;
        let input: String = (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                ALPHABET[(seed % ALPHABET.len() as u64) as usize] as char
            })
            .collect();
        for inner in [false, true] {
            let graph = parse_user_jyutping(&input, inner);
            assert!(graph.check_graph(), "{input}");
            assert!(graph.distance_to_end(0).is_some(), "{input}");
        }
    }
}

#[test]
fn ambiguous_boundary_keeps_both_splits() {
    // "gaan|gaa" and "gaang|aa" both cover the input with full syllables.
    let paths = full_paths("gaangaa", false);
    assert!(paths.contains(&vec!["gaan".to_string(), "gaa".to_string()]));
    assert!(paths.contains(&vec!["gaang".to_string(), "aa".to_string()]));
}
