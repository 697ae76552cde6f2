//! Pattern language and structural matcher
//!
//! A pattern is compiled once into a [`Pattern`] and may then be matched
//! against any number of values, from any number of threads:
//!
//! ```rust
//! use xmlmatch::{Document, Pattern};
//!
//! let doc = Document::parse(r#"<root><a id="1">one</a><b/></root>"#).unwrap();
//! let pattern =
//!     Pattern::compile(r#"{ root: { elements: [{ name: "a", content: c }, *] } }"#).unwrap();
//! let bindings = pattern.must_match(&doc).unwrap();
//! assert_eq!(bindings.get_str("c"), Some("one"));
//! ```

mod ast;
mod matcher;
mod parser;
mod shape;
mod value;

pub use ast::{FieldPattern, Literal, PatternNode, SeqItem};
pub use matcher::{find_matches, must_match, try_match, MatchOutcome};
pub use parser::{tokenize, ParsedPattern, PatternParser, Token};
pub use shape::Shape;
pub use value::{Bindings, Value};

use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::limits::Limits;

/// A compiled, immutable pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    root: PatternNode,
    source: String,
    captures: Vec<String>,
    pins: Vec<String>,
    shape: Shape,
}

impl Pattern {
    /// Compile a pattern whose target is not statically known
    pub fn compile(source: &str) -> Result<Self> {
        Self::compile_with_limits(source, Shape::Any, &Limits::default())
    }

    /// Compile a pattern for a target of the given shape; fields the shape
    /// does not provide are rejected
    pub fn compile_for(source: &str, shape: Shape) -> Result<Self> {
        Self::compile_with_limits(source, shape, &Limits::default())
    }

    /// Compile with custom limits
    pub fn compile_with_limits(source: &str, shape: Shape, limits: &Limits) -> Result<Self> {
        let parsed = PatternParser::new(source, limits)?.parse(&shape)?;
        debug!(
            "compiled pattern for {}: {} capture(s), {} pin(s)",
            shape,
            parsed.captures.len(),
            parsed.pins.len()
        );
        Ok(Self {
            root: parsed.root,
            source: source.to_string(),
            captures: parsed.captures,
            pins: parsed.pins,
            shape,
        })
    }

    /// Original pattern text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names bound by a successful match, in binding order
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Names this pattern pins
    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    /// Root of the compiled tree
    pub fn root(&self) -> &PatternNode {
        &self.root
    }

    /// Shape the pattern was compiled for
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Match against `value` with no outer bindings
    pub fn try_match<'a>(&self, value: impl Into<Value<'a>>) -> MatchOutcome<'a> {
        try_match(self, &value.into(), &Bindings::new())
    }

    /// Match against `value`; pins may refer to names in `outer`
    pub fn try_match_with<'a>(
        &self,
        value: impl Into<Value<'a>>,
        outer: &Bindings<'_>,
    ) -> MatchOutcome<'a> {
        try_match(self, &value.into(), outer)
    }

    /// Match against `value`, failing with [`Error::Match`] on mismatch
    pub fn must_match<'a>(&self, value: impl Into<Value<'a>>) -> Result<Bindings<'a>> {
        must_match(self, &value.into(), &Bindings::new())
    }

    /// [`Pattern::must_match`] with outer bindings for pins
    pub fn must_match_with<'a>(
        &self,
        value: impl Into<Value<'a>>,
        outer: &Bindings<'_>,
    ) -> Result<Bindings<'a>> {
        must_match(self, &value.into(), outer)
    }

    /// Check whether `value` matches
    pub fn is_match<'a>(&self, value: impl Into<Value<'a>>) -> bool {
        self.try_match(value).is_match()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl std::str::FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}
