// Dictionary load/save and word matching.
//
// File: libjyutping/tests/dictionary_io.rs

use libjyutping::dictionary::BINARY_FORMAT_MAGIC;
use libjyutping::encoder::{encode_full_jyutping, encode_one_user_jyutping};
use libjyutping::{DictError, DictFormat, JyutpingDictionary, SYSTEM_DICT, USER_DICT};

const SAMPLE: &str = "\
你 nei 0
你好 nei'hou -0.5
好 hou -0.25
號 hou -1.75
廣東話 gwong'dung'waa -2.125
";

fn sample() -> JyutpingDictionary {
    let mut dict = JyutpingDictionary::new();
    dict.load(SYSTEM_DICT, SAMPLE.as_bytes(), DictFormat::Text)
        .unwrap();
    dict
}

fn words(dict: &JyutpingDictionary, encoded: &[u8]) -> Vec<(String, f32)> {
    let mut out = Vec::new();
    dict.match_words(encoded, |_, hanzi, cost| {
        out.push((hanzi.to_string(), cost));
        true
    });
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[test]
fn odd_length_query_matches_nothing() {
    let dict = sample();
    let mut encoded = encode_full_jyutping("hou").unwrap();
    encoded.pop();
    assert!(words(&dict, &encoded).is_empty());
    assert!(words(&dict, &[]).is_empty());
}

#[test]
fn callback_can_stop_enumeration() {
    let dict = sample();
    let mut seen = 0;
    dict.match_words(&encode_full_jyutping("hou").unwrap(), |_, _, _| {
        seen += 1;
        false
    });
    assert_eq!(seen, 1);
}

#[test]
fn open_final_matches_every_final() {
    let dict = sample();
    let found = words(&dict, &encode_one_user_jyutping("gwdw"));
    assert_eq!(found, vec![("廣東話".to_string(), -2.125)]);
    assert!(words(&dict, &encode_one_user_jyutping("hdw")).is_empty());
    let found = words(&dict, &encode_one_user_jyutping("gwongdungw"));
    assert_eq!(found, vec![("廣東話".to_string(), -2.125)]);
}

#[test]
fn binary_round_trip_keeps_entries() {
    let dict = sample();
    let mut bytes = Vec::new();
    dict.save(SYSTEM_DICT, &mut bytes, DictFormat::Binary).unwrap();
    assert_eq!(&bytes[..4], &BINARY_FORMAT_MAGIC.to_be_bytes());

    let mut loaded = JyutpingDictionary::new();
    loaded.load(SYSTEM_DICT, bytes.as_slice(), DictFormat::Binary).unwrap();
    let hou = encode_full_jyutping("hou").unwrap();
    assert_eq!(words(&loaded, &hou), words(&dict, &hou));
    assert_eq!(loaded.len(SYSTEM_DICT), 5);
}

#[test]
fn text_round_trip_keeps_full_precision() {
    let dict = sample();
    let mut text = Vec::new();
    dict.save(SYSTEM_DICT, &mut text, DictFormat::Text).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains("廣東話 gwong'dung'waa -2.125"));

    let mut loaded = JyutpingDictionary::new();
    loaded.load(USER_DICT, text.as_bytes(), DictFormat::Text).unwrap();
    assert_eq!(loaded.len(USER_DICT), 5);
    assert_eq!(loaded.len(SYSTEM_DICT), 0);
}

#[test]
fn corrupted_magic_keeps_loaded_trie() {
    let mut dict = sample();
    let query = encode_full_jyutping("nei'hou").unwrap();
    let before = words(&dict, &query);
    let revision = dict.revision(SYSTEM_DICT);

    let mut bytes = Vec::new();
    dict.save(SYSTEM_DICT, &mut bytes, DictFormat::Binary).unwrap();
    bytes[0] ^= 0xff;
    let err = dict
        .load(SYSTEM_DICT, bytes.as_slice(), DictFormat::Binary)
        .unwrap_err();
    assert!(matches!(err, DictError::InvalidFormat(_)));
    assert_eq!(words(&dict, &query), before);
    assert_eq!(dict.revision(SYSTEM_DICT), revision);
}

#[test]
fn truncated_binary_is_rejected() {
    let mut dict = sample();
    let mut bytes = Vec::new();
    dict.save(SYSTEM_DICT, &mut bytes, DictFormat::Binary).unwrap();
    bytes.truncate(bytes.len() - 3);
    assert!(dict
        .load(SYSTEM_DICT, bytes.as_slice(), DictFormat::Binary)
        .is_err());
    assert_eq!(dict.len(SYSTEM_DICT), 5);
}

#[test]
fn files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jyutping.dict");
    let dict = sample();
    dict.save_file(SYSTEM_DICT, &path, DictFormat::Binary).unwrap();

    let mut loaded = JyutpingDictionary::new();
    loaded.load_file(SYSTEM_DICT, &path, DictFormat::Binary).unwrap();
    assert_eq!(loaded.len(SYSTEM_DICT), 5);
    assert!(matches!(
        loaded.load_file(SYSTEM_DICT, dir.path().join("missing"), DictFormat::Text),
        Err(DictError::Io(_))
    ));
}
