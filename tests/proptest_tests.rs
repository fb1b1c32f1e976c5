//! Property-based tests using proptest.
//!
//! These tests verify invariants of the dotted-path editor, the pattern
//! matcher and the stream engine using randomly generated inputs.

use proptest::prelude::*;
use serde_json::{Map, Value};
use tarpatch::patch::{JsonPatch, get_path, set_path};
use tarpatch::{OutputCompression, PatternSet, Rule, TransformOptions, transform_stream};

mod common;

/// Scalars and nested objects keyed by single letters.
///
/// Documents hold no arrays, so array-index removal (which shifts elements
/// and is not idempotent) stays out of the generated patches.
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-d]", inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>()))
    })
}

fn object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]", json_strategy(), 0..4)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

fn dotted_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..4).prop_map(|parts| parts.join("."))
}

/// Object keys, small indices and indices far past any array end.
fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-d]",
        (0usize..4).prop_map(|i| i.to_string()),
        any::<u64>().prop_map(|i| i.to_string()),
    ]
}

fn patch_strategy() -> impl Strategy<Value = JsonPatch> {
    (
        prop::collection::vec(dotted_path_strategy(), 0..4),
        prop::collection::vec((dotted_path_strategy(), json_strategy()), 0..4),
    )
        .prop_map(|(remove, replace)| {
            let patch = remove
                .into_iter()
                .fold(JsonPatch::new(), |patch, path| patch.remove(path));
            replace
                .into_iter()
                .fold(patch, |patch, (path, value)| patch.replace(path, value))
        })
}

/// Archive-safe relative paths: 1-3 lowercase components.
fn entry_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..4).prop_map(|parts| parts.join("/"))
}

proptest! {
    /// Applying a patch twice gives the same document as applying it once.
    #[test]
    fn patch_is_idempotent(doc in object_strategy(), patch in patch_strategy()) {
        let mut once = doc.clone();
        patch.apply(&mut once);
        let mut twice = once.clone();
        patch.apply(&mut twice);
        prop_assert_eq!(once, twice);
    }

    /// A value written at a path can be read back from it.
    #[test]
    fn set_then_get(
        mut doc in object_strategy(),
        path in dotted_path_strategy(),
        value in json_strategy(),
    ) {
        set_path(&mut doc, &path, value.clone());
        prop_assert_eq!(get_path(&doc, &path), Some(&value));
    }

    /// Replacing inside an array either lands the value or changes nothing.
    #[test]
    fn set_into_array_never_panics(
        len in 0usize..4,
        path in dotted_path_strategy(),
        value in json_strategy(),
    ) {
        let mut doc = serde_json::json!({"items": vec![Value::Null; len]});
        let before = doc.clone();
        let path = format!("items.{}", path);

        set_path(&mut doc, &path, value.clone());

        if get_path(&doc, &path) != Some(&value) {
            prop_assert_eq!(doc, before);
        }
    }

    /// A removed path is absent afterwards.
    #[test]
    fn removed_paths_are_absent(doc in object_strategy(), remove in dotted_path_strategy()) {
        let mut patched = doc;
        JsonPatch::new().remove(remove.clone()).apply(&mut patched);
        prop_assert!(get_path(&patched, &remove).is_none());
    }

    /// A pattern without glob syntax selects exactly its own path.
    #[test]
    fn literal_pattern_matches_itself(path in entry_path_strategy(), other in entry_path_strategy()) {
        let set = PatternSet::new([path.as_str()]).unwrap();
        prop_assert!(set.matches(&path));
        prop_assert_eq!(set.matches(&other), other == path);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// With no rules the output holds the same entries with the same content.
    #[test]
    fn copy_only_preserves_entries(
        entries in prop::collection::btree_map(
            entry_path_strategy(),
            prop::collection::vec(any::<u8>(), 0..2048),
            1..6,
        ),
        gzip_input in any::<bool>(),
    ) {
        let fixtures: Vec<_> = entries
            .iter()
            .map(|(path, data)| common::Fixture::file(path, data))
            .collect();
        let input = if gzip_input {
            common::tgz_bytes(&fixtures)
        } else {
            common::tar_bytes(&fixtures)
        };

        let mut output = Vec::new();
        let options = TransformOptions::new().compression(OutputCompression::None);
        let report = transform_stream(&input[..], &mut output, &[], &options).unwrap();

        prop_assert_eq!(report.entries_copied, fixtures.len());
        prop_assert_eq!(common::read_bytes(&output), fixtures);
    }

    /// Entry names survive a copy byte for byte, UTF-8 or not.
    #[cfg(unix)]
    #[test]
    fn copy_only_preserves_raw_names(
        names in prop::collection::btree_set(
            prop::collection::vec(prop_oneof![b'a'..=b'z', 0x80u8..=0xff], 1..24),
            1..5,
        ),
    ) {
        let entries: Vec<(&[u8], Option<&[u8]>, &[u8])> =
            names.iter().map(|n| (n.as_slice(), None, &b"x"[..])).collect();
        let input = common::raw_tar_bytes(&entries);

        let mut output = Vec::new();
        transform_stream(&input[..], &mut output, &[], &TransformOptions::new()).unwrap();

        let copied: Vec<_> = common::raw_names(&output).into_iter().map(|(n, _)| n).collect();
        let expected: Vec<_> = names.into_iter().collect();
        prop_assert_eq!(copied, expected);
    }

    /// Suppressing by extension drops exactly the matching entries.
    #[test]
    fn suppress_drops_matching_entries(
        names in prop::collection::btree_set("[a-z]{1,6}\\.(log|txt)", 1..8),
    ) {
        let fixtures: Vec<_> = names.iter().map(|n| common::Fixture::file(n, b"x")).collect();
        let input = common::tar_bytes(&fixtures);

        let mut output = Vec::new();
        let rules = [Rule::suppress(["*.log"]).unwrap()];
        transform_stream(&input[..], &mut output, &rules, &TransformOptions::new()).unwrap();

        let kept: Vec<_> = common::read_bytes(&output).into_iter().map(|e| e.path).collect();
        let expected: Vec<_> = names.iter().filter(|n| n.ends_with(".txt")).cloned().collect();
        prop_assert_eq!(kept, expected);
    }
}
