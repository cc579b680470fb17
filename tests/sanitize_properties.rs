use proptest::prelude::*;
use regex::Regex;

use autorunner::sanitize::strip_ansi;

fn escape_sequence() -> impl Strategy<Value = String> {
    prop_oneof![
        // Two-byte escapes.
        (0x40u8..=0x5F)
            .prop_filter("CSI introducer", |b| *b != b'[')
            .prop_map(|b| format!("\x1b{}", b as char)),
        // CSI: parameters, intermediates, final byte.
        ("[0-?]{0,6}", "[ -/]{0,2}", "[@-~]").prop_map(|(p, i, f)| format!("\x1b[{p}{i}{f}")),
    ]
}

fn plain_text() -> impl Strategy<Value = String> {
    "[^\x1b]{0,12}"
}

fn mixed_line() -> impl Strategy<Value = (String, String)> {
    proptest::collection::vec((plain_text(), escape_sequence()), 0..8).prop_map(|parts| {
        let mut dirty = String::new();
        let mut clean = String::new();
        for (text, esc) in parts {
            dirty.push_str(&text);
            dirty.push_str(&esc);
            clean.push_str(&text);
        }
        (dirty, clean)
    })
}

proptest! {
    #[test]
    fn removes_every_sequence_and_keeps_text((dirty, clean) in mixed_line()) {
        let stripped = strip_ansi(&dirty);
        prop_assert_eq!(stripped.as_ref(), clean.as_str());
    }

    #[test]
    fn output_contains_no_sequence(input in "(\x1b|\\[|[0-9;]|m|[a-z ]){0,40}") {
        let grammar = Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap();
        let out = strip_ansi(&input);
        prop_assert!(!grammar.is_match(&out));
    }

    #[test]
    fn stripping_is_idempotent(input in "(\x1b|\\[|[0-9;]|[A-Za-z]|\u{e9}){0,40}") {
        let once = strip_ansi(&input).into_owned();
        let twice = strip_ansi(&once);
        prop_assert_eq!(twice.as_ref(), once.as_str());
    }

    #[test]
    fn text_without_escape_is_untouched(input in "[^\x1b]{0,64}") {
        prop_assert!(matches!(strip_ansi(&input), std::borrow::Cow::Borrowed(_)));
    }
}
