//! # xmlmatch
//!
//! A namespace-aware XML tree model and a structural pattern matcher for it.
//!
//! ## Features
//!
//! - Immutable, whitespace-preserving document tree built on `quick-xml`
//! - Namespace resolution at build time, with bindings shared inside a scope
//! - A small pattern language: mapping patterns, ordered sequence patterns,
//!   find patterns with `*` spans, captures and pinned equality constraints
//! - Compile-time pattern validation against the field bundle of the target
//! - A location-path locator for picking starting nodes
//! - Protection against oversized input through [`Limits`]
//!
//! ## Example
//!
//! ```rust
//! use xmlmatch::{Document, Pattern, Shape};
//!
//! let doc = Document::parse(
//!     r#"<root xmlns="urn:example"><child1 foo="abc">hello</child1></root>"#,
//! ).unwrap();
//!
//! let pattern = Pattern::compile_for(
//!     r#"{ name: "root",
//!          namespace: { href: ns },
//!          elements: [{ name: n, attributes: [{ value: v }] }] }"#,
//!     Shape::Element,
//! ).unwrap();
//!
//! let bindings = pattern.must_match(&doc.root).unwrap();
//! assert_eq!(bindings.get_str("ns"), Some("urn:example"));
//! assert_eq!(bindings.get_str("n"), Some("child1"));
//! assert_eq!(bindings.get_str("v"), Some("abc"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and namespaces
pub mod names;
pub mod namespaces;

// Tree model and builder
pub mod documents;

// Pattern engine
pub mod pattern;

// Location paths
pub mod locator;

// Re-exports for convenience
pub use documents::{Attribute, Document, Element, Node, NodeRef, Text};
pub use error::{Error, MatchFailure, PatternError, Result};
pub use limits::Limits;
pub use locator::{find_all, find_one};
pub use namespaces::{NamespaceBinding, NamespaceMap};
pub use pattern::{Bindings, MatchOutcome, Pattern, Shape, Value};

/// Version of the xmlmatch library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace, always bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
