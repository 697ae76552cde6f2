//! Error types for xmlmatch
//!
//! This module defines all error types used throughout the library.
//! A failed match is not an error by itself: [`MatchFailure`] only appears
//! when a caller asked for a mandatory match.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlmatch Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlmatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid pattern, raised at compile time
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Mandatory match did not succeed
    #[error("match failure: {0}")]
    Match(#[from] MatchFailure),

    /// Malformed markup handed to the builder
    #[error("XML error: {0}")]
    Xml(String),

    /// Namespace error (undeclared prefix, bad declaration)
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name or identifier)
    #[error("name error: {0}")]
    Name(String),

    /// Location path could not be evaluated
    #[error("locator error: {0}")]
    Locator(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pattern compilation error with source context
#[derive(Debug, Clone, PartialEq)]
pub struct PatternError {
    /// Error message
    pub message: String,
    /// Byte offset into the pattern source
    pub offset: Option<usize>,
    /// Pattern source text
    pub source: Option<String>,
}

impl PatternError {
    /// Create a new pattern error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
            source: None,
        }
    }

    /// Set the byte offset where the problem was found
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the pattern source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(offset) = self.offset {
            write!(f, " at offset {}", offset)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nPattern:\n{}", src)?;
            if let Some(offset) = self.offset {
                let column = src.get(..offset).map_or(0, |head| head.chars().count());
                write!(f, "\n{}^", " ".repeat(column))?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for PatternError {}

/// Mandatory match failure with the location of the failing sub-pattern
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFailure {
    /// Why the sub-pattern did not match
    pub reason: String,
    /// Path of the failing sub-pattern, e.g. `$.attributes[1].name`
    pub path: String,
    /// Source of the whole pattern
    pub pattern: Option<String>,
}

impl MatchFailure {
    /// Create a new match failure
    pub fn new(reason: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            path: path.into(),
            pattern: None,
        }
    }

    /// Set the pattern source
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        write!(f, "\n\nPath: {}", self.path)?;

        if let Some(ref pattern) = self.pattern {
            write!(f, "\n\nPattern:\n{}", pattern)?;
        }

        Ok(())
    }
}

impl std::error::Error for MatchFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        let err = PatternError::new("duplicate capture 'x'")
            .with_offset(4)
            .with_source("[x, x]");

        let msg = format!("{}", err);
        assert!(msg.contains("duplicate capture 'x'"));
        assert!(msg.contains("at offset 4"));
        assert!(msg.contains("Pattern:"));
        assert!(msg.ends_with("    ^"));
    }

    #[test]
    fn test_match_failure_display() {
        let err = MatchFailure::new("expected \"foo\", found \"bar\"", "$.attributes[0].name")
            .with_pattern("{attributes: [{name: \"foo\"}]}");

        let msg = format!("{}", err);
        assert!(msg.contains("expected \"foo\""));
        assert!(msg.contains("Path: $.attributes[0].name"));
        assert!(msg.contains("Pattern:"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = PatternError::new("test").into();
        assert!(matches!(err, Error::Pattern(_)));

        let err: Error = MatchFailure::new("test", "$").into();
        assert!(matches!(err, Error::Match(_)));
    }
}
