//! Structural matcher
//!
//! Interprets a compiled [`Pattern`] against a [`Value`]. Matching never
//! mutates the value or the pattern; bindings live only in the returned set.
//!
//! Sequence patterns are split at their `*` spans into a leading run, any
//! number of interior runs and a trailing run. The leading and trailing runs
//! are anchored to the ends of the sequence; each interior run is located by
//! a left-to-right scan and the cursor moves past the first place it fits.
//! A chosen position is never revisited, so the leftmost assignment wins.

use std::fmt;

use log::trace;

use super::ast::{FieldPattern, Literal, PatternNode, SeqItem};
use super::value::{Bindings, Value};
use super::Pattern;
use crate::error::{MatchFailure, Result};

/// Result of [`try_match`]; a failed match is a value, not an error
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// Every sub-pattern matched
    Matched(Bindings<'a>),
    /// Some sub-pattern did not match
    NoMatch(MatchFailure),
}

impl<'a> MatchOutcome<'a> {
    /// Check whether the pattern matched
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    /// Bindings of a successful match
    pub fn bindings(&self) -> Option<&Bindings<'a>> {
        match self {
            MatchOutcome::Matched(bindings) => Some(bindings),
            MatchOutcome::NoMatch(_) => None,
        }
    }

    /// Consume into the bindings of a successful match
    pub fn into_bindings(self) -> Option<Bindings<'a>> {
        match self {
            MatchOutcome::Matched(bindings) => Some(bindings),
            MatchOutcome::NoMatch(_) => None,
        }
    }

    /// Where and why the match failed
    pub fn failure(&self) -> Option<&MatchFailure> {
        match self {
            MatchOutcome::Matched(_) => None,
            MatchOutcome::NoMatch(failure) => Some(failure),
        }
    }
}

/// Match `pattern` against `value`. Pins look up names bound earlier in
/// this match first, then `outer`.
pub fn try_match<'a>(
    pattern: &Pattern,
    value: &Value<'a>,
    outer: &Bindings<'_>,
) -> MatchOutcome<'a> {
    let mut matcher = Matcher::new(outer);
    let mut bindings = Bindings::new();
    match matcher.match_node(pattern.root(), value, &mut bindings) {
        Ok(()) => MatchOutcome::Matched(bindings),
        Err(failure) => MatchOutcome::NoMatch(failure),
    }
}

/// Like [`try_match`], but a failed match is an [`Error::Match`](crate::Error::Match)
pub fn must_match<'a>(
    pattern: &Pattern,
    value: &Value<'a>,
    outer: &Bindings<'_>,
) -> Result<Bindings<'a>> {
    match try_match(pattern, value, outer) {
        MatchOutcome::Matched(bindings) => Ok(bindings),
        MatchOutcome::NoMatch(failure) => Err(failure.with_pattern(pattern.source()).into()),
    }
}

/// Apply one pattern to many values, keeping the bindings of every match
/// in input order
pub fn find_matches<'a, I>(pattern: &Pattern, values: I, outer: &Bindings<'_>) -> Vec<Bindings<'a>>
where
    I: IntoIterator,
    I::Item: Into<Value<'a>>,
{
    values
        .into_iter()
        .filter_map(|value| try_match(pattern, &value.into(), outer).into_bindings())
        .collect()
}

#[derive(Debug)]
enum Step<'p> {
    Field(&'p str),
    Index(usize),
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Field(name) => write!(f, ".{}", name),
            Step::Index(i) => write!(f, "[{}]", i),
        }
    }
}

type MatchResult = std::result::Result<(), MatchFailure>;

struct Matcher<'o, 'b, 'p> {
    outer: &'o Bindings<'b>,
    trail: Vec<Step<'p>>,
}

impl<'o, 'b, 'p> Matcher<'o, 'b, 'p> {
    fn new(outer: &'o Bindings<'b>) -> Self {
        Self {
            outer,
            trail: Vec::new(),
        }
    }

    fn path(&self) -> String {
        let mut path = String::from("$");
        for step in &self.trail {
            path.push_str(&step.to_string());
        }
        path
    }

    fn fail(&self, reason: impl Into<String>) -> MatchResult {
        Err(MatchFailure::new(reason, self.path()))
    }

    fn match_node<'a>(
        &mut self,
        node: &'p PatternNode,
        value: &Value<'a>,
        bindings: &mut Bindings<'a>,
    ) -> MatchResult {
        match node {
            PatternNode::Wildcard => Ok(()),
            PatternNode::Capture(name) => {
                bindings.insert(name.as_str(), value.clone());
                Ok(())
            }
            PatternNode::Literal(literal) => {
                if literal_matches(literal, value) {
                    Ok(())
                } else {
                    self.fail(format!("expected {}, found {}", literal, value.describe()))
                }
            }
            PatternNode::Pin(name) => self.match_pin(name, value, bindings),
            PatternNode::Map(fields) => self.match_map(fields, value, bindings),
            PatternNode::Seq(items) => match value {
                Value::Seq(values) => self.match_seq(items, values, bindings),
                other => self.fail(format!("expected a sequence, found {}", other.describe())),
            },
        }
    }

    fn match_pin<'a>(
        &mut self,
        name: &str,
        value: &Value<'a>,
        bindings: &Bindings<'a>,
    ) -> MatchResult {
        let (equal, bound) = if let Some(bound) = bindings.get(name) {
            (same_value(bound, value), bound.describe())
        } else if let Some(bound) = self.outer.get(name) {
            (same_value(bound, value), bound.describe())
        } else {
            return self.fail(format!("pin '^{}' refers to an unbound name", name));
        };

        if equal {
            Ok(())
        } else {
            self.fail(format!(
                "expected ^{} ({}), found {}",
                name,
                bound,
                value.describe()
            ))
        }
    }

    fn match_map<'a>(
        &mut self,
        fields: &'p [FieldPattern],
        value: &Value<'a>,
        bindings: &mut Bindings<'a>,
    ) -> MatchResult {
        if !value.is_object() {
            let wanted = fields
                .first()
                .map_or(String::new(), |f| format!(" with field '{}'", f.name));
            return self.fail(format!(
                "expected an object{}, found {}",
                wanted,
                value.describe()
            ));
        }

        for field in fields {
            let Some(field_value) = value.field(&field.name) else {
                return self.fail(format!("{} has no field '{}'", value.kind(), field.name));
            };
            self.trail.push(Step::Field(&field.name));
            let result = self.match_node(&field.pattern, &field_value, bindings);
            self.trail.pop();
            result?;
        }
        Ok(())
    }

    fn match_seq<'a>(
        &mut self,
        items: &'p [SeqItem],
        values: &[Value<'a>],
        bindings: &mut Bindings<'a>,
    ) -> MatchResult {
        let runs: Vec<&'p [SeqItem]> = items.split(SeqItem::is_span).collect();

        // No span: plain positional match
        if runs.len() == 1 {
            if items.len() != values.len() {
                return self.fail(format!(
                    "expected {} items, found {}",
                    items.len(),
                    values.len()
                ));
            }
            return self.match_run(items, values, 0, bindings);
        }

        let head = runs[0];
        let tail = runs[runs.len() - 1];
        if head.len() + tail.len() > values.len() {
            return self.fail(format!(
                "expected at least {} items, found {}",
                head.len() + tail.len(),
                values.len()
            ));
        }

        self.match_run(head, values, 0, bindings)?;

        let end = values.len() - tail.len();
        let mut cursor = head.len();
        for &run in &runs[1..runs.len() - 1] {
            cursor = self.find_run(run, values, cursor, end, bindings)?;
        }

        self.match_run(tail, values, end, bindings)
    }

    /// Scan `values[cursor..end]` for the first position where `run` matches
    /// contiguously; returns the index just past it
    fn find_run<'a>(
        &mut self,
        run: &'p [SeqItem],
        values: &[Value<'a>],
        cursor: usize,
        end: usize,
        bindings: &mut Bindings<'a>,
    ) -> std::result::Result<usize, MatchFailure> {
        if run.len() <= end.saturating_sub(cursor) {
            for start in cursor..=end - run.len() {
                let mark = bindings.len();
                match self.match_run(run, values, start, bindings) {
                    Ok(()) => {
                        trace!("find: run of {} matched at index {}", run.len(), start);
                        return Ok(start + run.len());
                    }
                    Err(failure) => {
                        trace!("find: no match at index {}: {}", start, failure.reason);
                        bindings.truncate(mark);
                    }
                }
            }
        }

        Err(MatchFailure::new(
            format!(
                "no item in [{}..{}) matches {}",
                cursor,
                end,
                display_run(run)
            ),
            self.path(),
        ))
    }

    fn match_run<'a>(
        &mut self,
        run: &'p [SeqItem],
        values: &[Value<'a>],
        start: usize,
        bindings: &mut Bindings<'a>,
    ) -> MatchResult {
        for (offset, item) in run.iter().enumerate() {
            let SeqItem::Item(node) = item else {
                continue;
            };
            let index = start + offset;
            self.trail.push(Step::Index(index));
            let result = self.match_node(node, &values[index], bindings);
            self.trail.pop();
            result?;
        }
        Ok(())
    }
}

fn same_value<'x>(bound: &Value<'x>, value: &Value<'x>) -> bool {
    bound == value
}

fn literal_matches(literal: &Literal, value: &Value<'_>) -> bool {
    match (literal, value) {
        (Literal::Str(expected), Value::Str(actual)) => expected == actual,
        (Literal::Number(expected), Value::Number(actual)) => expected == actual,
        (Literal::Nil, Value::Nil) => true,
        _ => false,
    }
}

fn display_run(run: &[SeqItem]) -> String {
    run.iter()
        .filter_map(|item| match item {
            SeqItem::Item(node) => Some(node.to_string()),
            SeqItem::Span => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq<'a>(items: &[&'a str]) -> Value<'a> {
        Value::from(items.to_vec())
    }

    fn run<'a>(pattern: &str, value: &Value<'a>) -> MatchOutcome<'a> {
        let pattern = Pattern::compile(pattern).unwrap();
        try_match(&pattern, value, &Bindings::new())
    }

    #[test]
    fn test_positional_sequence() {
        let value = seq(&["a", "b", "c"]);
        let outcome = run(r#"["a", x, "c"]"#, &value);
        assert_eq!(outcome.bindings().unwrap().get_str("x"), Some("b"));

        let outcome = run(r#"["a", x]"#, &value);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.reason, "expected 2 items, found 3");
        assert_eq!(failure.path, "$");
    }

    #[test]
    fn test_positional_mismatch_reports_index() {
        let value = seq(&["a", "b", "c"]);
        let outcome = run(r#"["a", "x", c]"#, &value);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.path, "$[1]");
        assert_eq!(failure.reason, r#"expected "x", found "b""#);
    }

    #[test]
    fn test_find_binds_leftmost() {
        let value = seq(&["x", "hit", "y", "hit"]);
        let pattern = Pattern::compile(r#"[*, "hit", *]"#).unwrap();
        assert!(try_match(&pattern, &value, &Bindings::new()).is_match());

        let value = Value::from(vec![
            Value::from(vec!["k", "1"]),
            Value::from(vec!["v", "2"]),
            Value::from(vec!["v", "3"]),
        ]);
        let outcome = run(r#"[*, ["v", n], *]"#, &value);
        assert_eq!(outcome.bindings().unwrap().get_str("n"), Some("2"));
    }

    #[test]
    fn test_find_failed_attempts_leave_no_bindings() {
        let value = Value::from(vec![
            Value::from(vec!["a", "1"]),
            Value::from(vec!["b", "2"]),
        ]);
        let outcome = run(r#"[*, [k, "2"], *]"#, &value);
        let bindings = outcome.into_bindings().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get_str("k"), Some("b"));
    }

    #[test]
    fn test_find_not_found() {
        let value = seq(&["a", "b"]);
        let failure = run(r#"[*, "z", *]"#, &value).failure().cloned().unwrap();
        assert_eq!(failure.reason, r#"no item in [0..2) matches "z""#);
    }

    #[test]
    fn test_anchored_head_and_tail() {
        let value = seq(&["a", "b", "c", "d"]);
        let outcome = run(r#"[first, *, last]"#, &value);
        let bindings = outcome.into_bindings().unwrap();
        assert_eq!(bindings.get_str("first"), Some("a"));
        assert_eq!(bindings.get_str("last"), Some("d"));

        assert!(run(r#"["a", *]"#, &value).is_match());
        assert!(!run(r#"["b", *]"#, &value).is_match());
        assert!(run(r#"[*, "d"]"#, &value).is_match());
        assert!(run(r#"[*]"#, &value).is_match());
        assert!(run(r#"[*]"#, &seq(&[])).is_match());
        assert!(!run(r#"[a, *, b]"#, &seq(&["only"])).is_match());
    }

    #[test]
    fn test_multiple_interior_runs_are_greedy() {
        let value = seq(&["a", "x", "b", "x", "b", "c"]);
        let outcome = run(r#"[*, "x", p, *, "b", *]"#, &value);
        let bindings = outcome.into_bindings().unwrap();
        assert_eq!(bindings.get_str("p"), Some("b"));

        // second run must be found after the first one
        assert!(!run(r#"[*, "c", *, "a", *]"#, &value).is_match());
        assert!(run(r#"[*, "a", *, "c", *]"#, &value).is_match());
    }

    #[test]
    fn test_contiguous_interior_run() {
        let value = seq(&["a", "b", "a", "c"]);
        let outcome = run(r#"[*, "a", next, *]"#, &value);
        assert_eq!(outcome.bindings().unwrap().get_str("next"), Some("b"));
        let outcome = run(r#"[*, "a", "c", *]"#, &value);
        assert!(outcome.is_match());
    }

    #[test]
    fn test_interior_run_respects_tail_anchor() {
        let value = seq(&["a", "b"]);
        assert!(!run(r#"[*, "b", *, "b"]"#, &value).is_match());
        assert!(run(r#"[*, "a", *, "b"]"#, &value).is_match());
    }

    #[test]
    fn test_pins() {
        let value = seq(&["a", "a", "b"]);
        assert!(run("[x, ^x, _]", &value).is_match());
        assert!(!run("[_, x, ^x]", &value).is_match());

        let pattern = Pattern::compile("[*, ^wanted, *]").unwrap();
        let outer = Bindings::new().with("wanted", "b");
        assert!(try_match(&pattern, &value, &outer).is_match());

        let outcome = try_match(&pattern, &value, &Bindings::new());
        assert_eq!(
            outcome.failure().unwrap().reason,
            "no item in [0..3) matches ^wanted"
        );
    }

    #[test]
    fn test_unbound_pin_fails() {
        let outcome = run("^nothing", &Value::from("a"));
        assert_eq!(
            outcome.failure().unwrap().reason,
            "pin '^nothing' refers to an unbound name"
        );
    }

    #[test]
    fn test_literals() {
        assert!(run("nil", &Value::Nil).is_match());
        assert!(!run("nil", &Value::from("")).is_match());
        assert!(run("42", &Value::from(42i64)).is_match());
        assert!(!run("42", &Value::from("42")).is_match());
        assert!(run("'x'", &Value::from("x")).is_match());
    }

    #[test]
    fn test_map_against_scalar_fails() {
        let outcome = run("{ name: n }", &Value::Nil);
        assert_eq!(
            outcome.failure().unwrap().reason,
            "expected an object with field 'name', found nil"
        );
        assert!(!run("{ name: n }", &seq(&["a"])).is_match());
        assert!(!run("[a]", &Value::from("a")).is_match());
    }

    #[test]
    fn test_must_match_error() {
        let pattern = Pattern::compile(r#"[*, "z", *]"#).unwrap();
        let err = must_match(&pattern, &seq(&["a"]), &Bindings::new()).unwrap_err();
        match err {
            crate::Error::Match(failure) => {
                assert_eq!(failure.pattern.as_deref(), Some(r#"[*, "z", *]"#));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_find_matches() {
        let pattern = Pattern::compile(r#"[k, "1"]"#).unwrap();
        let values = vec![
            Value::from(vec!["a", "1"]),
            Value::from(vec!["b", "2"]),
            Value::from(vec!["c", "1"]),
        ];
        let found = find_matches(&pattern, values, &Bindings::new());
        let keys: Vec<_> = found.iter().filter_map(|b| b.get_str("k")).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
