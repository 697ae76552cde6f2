//! Property tests for the matcher and builder

use proptest::prelude::*;
use xmlmatch::{Document, Pattern, Value};

fn letters() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..12)
}

proptest! {
    #[test]
    fn prop_matching_is_idempotent(items in letters()) {
        let pattern = Pattern::compile(r#"[*, "b", x, *]"#).unwrap();
        let value = Value::from(items.clone());
        let first = pattern.try_match(value.clone());
        let second = pattern.try_match(value);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_find_binds_leftmost(items in letters()) {
        let pattern = Pattern::compile(r#"[*, "b", next, *]"#).unwrap();
        let expected = items
            .windows(2)
            .find(|w| w[0] == "b")
            .map(|w| w[1]);
        let outcome = pattern.try_match(Value::from(items.clone()));
        let actual = outcome.bindings().and_then(|b| b.get_str("next"));
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_positional_length_must_agree(len in 0usize..8, wildcards in 0usize..8) {
        let source = format!("[{}]", vec!["_"; wildcards].join(", "));
        let pattern = Pattern::compile(&source).unwrap();
        let value = Value::from(vec!["a"; len]);
        prop_assert_eq!(pattern.is_match(value), len == wildcards);
    }

    #[test]
    fn prop_anchored_head_and_tail(items in letters()) {
        let pattern = Pattern::compile("[first, *, last]").unwrap();
        let outcome = pattern.try_match(Value::from(items.clone()));
        if items.len() >= 2 {
            let bindings = outcome.bindings().unwrap();
            prop_assert_eq!(bindings.get_str("first"), items.first().copied());
            prop_assert_eq!(bindings.get_str("last"), items.last().copied());
        } else {
            prop_assert!(!outcome.is_match());
        }
    }

    #[test]
    fn prop_partial_map_ignores_extra_fields(
        values in prop::collection::vec("[a-z0-9]{0,8}", 0..6),
    ) {
        let attributes: String = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!(r#" a{}="{}""#, i, v))
            .collect();
        let doc = Document::parse(&format!("<e{}>text<x/></e>", attributes)).unwrap();
        let pattern = Pattern::compile(r#"{ name: "e" }"#).unwrap();
        prop_assert!(pattern.is_match(&doc.root));
    }

    #[test]
    fn prop_whitespace_children_are_kept(
        gaps in prop::collection::vec("[ \t\n]{1,4}", 1..6),
    ) {
        let mut xml = String::from("<r>");
        for gap in &gaps {
            xml.push_str(gap);
            xml.push_str("<c/>");
        }
        xml.push_str("\n</r>");
        let doc = Document::parse(&xml).unwrap();
        prop_assert_eq!(doc.root.children.len(), gaps.len() * 2 + 1);
    }
}
