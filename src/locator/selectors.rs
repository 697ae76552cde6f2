//! Location path parsing
//!
//! Supports the abbreviated subset `/`, `//`, `.`, `name`, `prefix:name`,
//! `*`, `prefix:*`, `@name`, `@prefix:name`, `@*` and `text()`.

use crate::error::{Error, Result};
use crate::names::{is_valid_ncname, split_qname};

/// A parsed location path
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// The raw path expression
    pub path: String,
    /// Whether the path starts at the document (`/...`)
    pub absolute: bool,
    /// Parsed path steps
    pub steps: Vec<PathStep>,
}

impl LocationPath {
    /// Parse a location path
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(Error::Locator("empty location path".to_string()));
        }

        let steps = split_path(trimmed)
            .into_iter()
            .map(PathStep::parse)
            .collect::<Result<Vec<_>>>()?;

        if steps.last().map(|s| s.kind) == Some(PathStepKind::DescendantOrSelf) {
            return Err(Error::Locator(format!(
                "location path '{}' ends with '//'",
                trimmed
            )));
        }

        Ok(Self {
            path: trimmed.to_string(),
            absolute: trimmed.starts_with('/'),
            steps,
        })
    }

    /// Check if this path searches descendants at some step
    pub fn is_descendant(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.kind == PathStepKind::DescendantOrSelf)
    }
}

/// A single step in a location path
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    /// The kind of step
    pub kind: PathStepKind,
    /// Local name test, `*` for any
    pub name: String,
    /// Optional namespace prefix
    pub prefix: Option<String>,
}

impl PathStep {
    /// Parse a step from a string
    pub fn parse(step: &str) -> Result<Self> {
        let step = step.trim();

        match step {
            "." => return Ok(Self::bare(PathStepKind::Self_)),
            ".//" => return Ok(Self::bare(PathStepKind::DescendantOrSelf)),
            "text()" => return Ok(Self::bare(PathStepKind::Text)),
            ".." => {
                return Err(Error::Locator(
                    "parent steps are not supported".to_string(),
                ))
            }
            _ => {}
        }

        if step.contains('[') {
            return Err(Error::Locator(format!(
                "predicates are not supported: '{}'",
                step
            )));
        }

        let (kind, rest) = match step.strip_prefix('@') {
            Some(rest) => (PathStepKind::Attribute, rest),
            None => (PathStepKind::Child, step),
        };

        let (prefix, name) = split_qname(rest);
        let name_ok = name == "*" || is_valid_ncname(name);
        let prefix_ok = prefix.map_or(true, is_valid_ncname);
        if !name_ok || !prefix_ok {
            return Err(Error::Locator(format!("invalid step '{}'", step)));
        }

        Ok(Self {
            kind,
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
        })
    }

    fn bare(kind: PathStepKind) -> Self {
        Self {
            kind,
            name: String::new(),
            prefix: None,
        }
    }

    /// Create a child step
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            kind: PathStepKind::Child,
            name: name.into(),
            prefix: None,
        }
    }

    /// Create an attribute step
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            kind: PathStepKind::Attribute,
            name: name.into(),
            prefix: None,
        }
    }

    /// Set the prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Get the qualified name (prefix:local)
    pub fn qname(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Check if this step matches any name (*)
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

/// Kind of path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStepKind {
    /// Child element axis (default)
    Child,
    /// Attribute axis (@)
    Attribute,
    /// Text children (`text()`)
    Text,
    /// Descendant-or-self axis (//)
    DescendantOrSelf,
    /// Self axis (.)
    Self_,
}

/// Split a location path into steps
///
/// `//` becomes a `.//` marker step; a leading `/` is dropped.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.trim();

    if path.is_empty() {
        return Vec::new();
    }

    let mut steps = Vec::new();
    let mut current_start = 0;

    if path.starts_with("//") {
        steps.push(".//");
        current_start = 2;
    } else if path.starts_with('/') {
        current_start = 1;
    }

    let bytes = path.as_bytes();
    let len = bytes.len();
    let mut i = current_start;

    while i < len {
        if bytes[i] == b'/' {
            let is_double = i + 1 < len && bytes[i + 1] == b'/';

            if i > current_start {
                steps.push(&path[current_start..i]);
            }

            if is_double {
                steps.push(".//");
                current_start = i + 2;
                i += 2;
            } else {
                current_start = i + 1;
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    if current_start < len {
        steps.push(&path[current_start..]);
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_simple() {
        assert_eq!(split_path("a/b/c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_path_with_leading_slash() {
        assert_eq!(split_path("/a/b"), vec!["a", "b"]);
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn test_split_path_with_descendant() {
        assert_eq!(split_path(".//a/b"), vec![".", ".//", "a", "b"]);
        assert_eq!(split_path("//a//@id"), vec![".//", "a", ".//", "@id"]);
    }

    #[test]
    fn test_path_step_parse_prefixed() {
        let step = PathStep::parse("ns:element").unwrap();
        assert_eq!(step.kind, PathStepKind::Child);
        assert_eq!(step.name, "element");
        assert_eq!(step.prefix, Some("ns".to_string()));
        assert_eq!(step.qname(), "ns:element");
        assert_eq!(step, PathStep::child("element").with_prefix("ns"));
        assert_eq!(PathStep::parse("book").unwrap(), PathStep::child("book"));
    }

    #[test]
    fn test_path_step_parse_attribute() {
        let step = PathStep::parse("@id").unwrap();
        assert_eq!(step, PathStep::attribute("id"));
        let step = PathStep::parse("@*").unwrap();
        assert!(step.is_wildcard());
        let step = PathStep::parse("@p:id").unwrap();
        assert_eq!(step, PathStep::attribute("id").with_prefix("p"));
    }

    #[test]
    fn test_path_step_parse_special() {
        assert_eq!(PathStep::parse(".").unwrap().kind, PathStepKind::Self_);
        assert_eq!(PathStep::parse("text()").unwrap().kind, PathStepKind::Text);
        assert!(PathStep::parse("p:*").unwrap().is_wildcard());
    }

    #[test]
    fn test_path_step_rejects_unsupported() {
        assert!(matches!(PathStep::parse(".."), Err(Error::Locator(_))));
        assert!(matches!(PathStep::parse("a[1]"), Err(Error::Locator(_))));
        assert!(matches!(PathStep::parse("1a"), Err(Error::Locator(_))));
        assert!(matches!(PathStep::parse("count()"), Err(Error::Locator(_))));
    }

    #[test]
    fn test_location_path() {
        let path = LocationPath::parse("/root//child").unwrap();
        assert!(path.absolute);
        assert!(path.is_descendant());
        assert_eq!(path.steps.len(), 3);

        let path = LocationPath::parse("./a").unwrap();
        assert!(!path.absolute);
        assert!(!path.is_descendant());

        assert!(LocationPath::parse("").is_err());
        assert!(LocationPath::parse("a//").is_err());
        assert!(LocationPath::parse("/").unwrap().steps.is_empty());
    }
}
