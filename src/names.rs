//! Name validation and utilities
//!
//! XML names (NCNames, QNames) as they appear in documents and location
//! paths, and the identifiers used for captures and pins in patterns.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// XML 1.0 (5th edition) NameStartChar, without ':'
const NAME_START_CHARS: &str = concat!(
    r"A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}",
    r"\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}",
    r"\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}",
);

/// NameChar additions on top of NameStartChar
const NAME_CHARS: &str = r"\-\.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}";

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^[{start}][{start}{rest}]*$",
        start = NAME_START_CHARS,
        rest = NAME_CHARS
    ))
    .expect("NCName regex is valid")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Words that cannot be used as capture or pin names
const RESERVED: &[&str] = &["nil", "_"];

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match split_qname(name) {
        (Some(prefix), local) => is_valid_ncname(prefix) && is_valid_ncname(local),
        (None, local) => is_valid_ncname(local),
    }
}

/// Check if a string can name a capture or pin in a pattern
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED.contains(&name)
}

/// Validate a QName and return an error if invalid
pub fn validate_qname(name: &str) -> Result<()> {
    if is_valid_qname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid QName: '{}'", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}
