//! XML namespace handling
//!
//! Namespace bindings are created once per `xmlns` / `xmlns:p` declaration
//! and owned by the frame of the element that declares them. Descendants hold
//! `Arc` references to the same binding, so identity is shared inside one
//! scope, while equality is always decided by URI.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::XML_NAMESPACE;

/// Mapping from prefix to namespace URI, as handed to the locator
pub type NamespaceMap = HashMap<String, String>;

/// An immutable `(prefix, uri)` pair produced by a namespace declaration
#[derive(Debug, Clone, Eq, Serialize)]
pub struct NamespaceBinding {
    prefix: Option<String>,
    #[serde(rename = "href")]
    uri: String,
}

impl NamespaceBinding {
    /// Create a binding; `None` (or an empty prefix) denotes the default namespace
    pub fn new(prefix: Option<impl Into<String>>, uri: impl Into<String>) -> Self {
        let prefix = prefix.map(Into::into).filter(|p: &String| !p.is_empty());
        Self {
            prefix,
            uri: uri.into(),
        }
    }

    /// Create a default (unprefixed) namespace binding
    pub fn default_namespace(uri: impl Into<String>) -> Self {
        Self {
            prefix: None,
            uri: uri.into(),
        }
    }

    /// Create a prefixed namespace binding
    pub fn prefixed(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::new(Some(prefix), uri)
    }

    /// The declared prefix, `None` for a default namespace
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The namespace URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Check whether this binding is a default namespace declaration
    pub fn is_default(&self) -> bool {
        self.prefix.is_none()
    }
}

impl PartialEq for NamespaceBinding {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Hash for NamespaceBinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl fmt::Display for NamespaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "xmlns:{}=\"{}\"", prefix, self.uri),
            None => write!(f, "xmlns=\"{}\"", self.uri),
        }
    }
}

/// One declaration in a scope frame
#[derive(Debug, Clone)]
enum Declaration {
    /// `xmlns="uri"` or `xmlns:p="uri"`
    Bind(Arc<NamespaceBinding>),
    /// `xmlns=""`, removes the default namespace for the subtree
    UndeclareDefault,
}

/// In-scope namespace bindings for an element
///
/// A chain of frames, one per declaring element, linked toward the document
/// scope. Elements that declare nothing share their parent's frame.
#[derive(Debug)]
pub struct NamespaceScope {
    declarations: Vec<Declaration>,
    parent: Option<Arc<NamespaceScope>>,
}

impl NamespaceScope {
    /// The document-level scope, which binds only the reserved `xml` prefix
    pub fn document() -> Arc<Self> {
        Arc::new(Self {
            declarations: vec![Declaration::Bind(Arc::new(NamespaceBinding::prefixed(
                "xml",
                XML_NAMESPACE,
            )))],
            parent: None,
        })
    }

    /// Start a child frame of `parent`
    pub fn child(parent: &Arc<Self>) -> ScopeBuilder {
        ScopeBuilder {
            declarations: Vec::new(),
            parent: Arc::clone(parent),
        }
    }

    /// Resolve `prefix` (`None` or `""` for the default namespace),
    /// nearest declaration wins
    pub fn resolve(&self, prefix: Option<&str>) -> Option<Arc<NamespaceBinding>> {
        let prefix = prefix.filter(|p| !p.is_empty());
        let mut frame = Some(self);
        while let Some(scope) = frame {
            for declaration in scope.declarations.iter().rev() {
                match (declaration, prefix) {
                    (Declaration::Bind(binding), _) if binding.prefix() == prefix => {
                        return Some(Arc::clone(binding));
                    }
                    (Declaration::UndeclareDefault, None) => return None,
                    _ => {}
                }
            }
            frame = scope.parent.as_deref();
        }
        None
    }

    /// Bindings declared directly on this frame, in declaration order
    pub fn declared(&self) -> impl Iterator<Item = &Arc<NamespaceBinding>> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Bind(binding) => Some(binding),
            Declaration::UndeclareDefault => None,
        })
    }

    /// All bindings visible from this frame, nearest declaration first,
    /// each prefix listed once
    pub fn in_scope(&self) -> Vec<Arc<NamespaceBinding>> {
        let mut seen: Vec<Option<&str>> = Vec::new();
        let mut visible = Vec::new();
        let mut frame = Some(self);
        while let Some(scope) = frame {
            for declaration in scope.declarations.iter().rev() {
                let prefix = match declaration {
                    Declaration::Bind(binding) => binding.prefix(),
                    Declaration::UndeclareDefault => None,
                };
                if seen.contains(&prefix) {
                    continue;
                }
                seen.push(prefix);
                if let Declaration::Bind(binding) = declaration {
                    visible.push(Arc::clone(binding));
                }
            }
            frame = scope.parent.as_deref();
        }
        visible
    }
}

/// Collects the declarations of one element before its frame is sealed
#[derive(Debug)]
pub struct ScopeBuilder {
    declarations: Vec<Declaration>,
    parent: Arc<NamespaceScope>,
}

impl ScopeBuilder {
    /// Record an `xmlns` / `xmlns:p` declaration
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        let prefix = prefix.filter(|p| !p.is_empty());
        if prefix.is_none() && uri.is_empty() {
            self.declarations.push(Declaration::UndeclareDefault);
        } else {
            self.declarations
                .push(Declaration::Bind(Arc::new(NamespaceBinding::new(prefix, uri))));
        }
    }

    /// Number of declarations recorded so far
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check whether nothing was declared
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Seal the frame; reuses the parent frame when nothing was declared
    pub fn finish(self) -> Arc<NamespaceScope> {
        if self.declarations.is_empty() {
            self.parent
        } else {
            Arc::new(NamespaceScope {
                declarations: self.declarations,
                parent: Some(self.parent),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_equality_ignores_prefix() {
        let a = NamespaceBinding::prefixed("a", "http://example.com");
        let b = NamespaceBinding::default_namespace("http://example.com");
        let c = NamespaceBinding::prefixed("a", "http://example.org");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_prefix_is_default() {
        let ns = NamespaceBinding::new(Some(""), "http://example.com");
        assert!(ns.is_default());
        assert_eq!(ns.prefix(), None);
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(
            NamespaceBinding::prefixed("noko", "urn:n").to_string(),
            "xmlns:noko=\"urn:n\""
        );
        assert_eq!(
            NamespaceBinding::default_namespace("urn:d").to_string(),
            "xmlns=\"urn:d\""
        );
    }

    #[test]
    fn test_resolve_nearest_wins() {
        let doc = NamespaceScope::document();
        let mut outer = NamespaceScope::child(&doc);
        outer.declare(None, "urn:outer");
        outer.declare(Some("p"), "urn:p");
        let outer = outer.finish();

        let mut inner = NamespaceScope::child(&outer);
        inner.declare(None, "urn:inner");
        let inner = inner.finish();

        assert_eq!(inner.resolve(None).unwrap().uri(), "urn:inner");
        assert_eq!(inner.resolve(Some("")).unwrap().uri(), "urn:inner");
        assert_eq!(inner.resolve(Some("p")).unwrap().uri(), "urn:p");
        assert_eq!(outer.resolve(None).unwrap().uri(), "urn:outer");
        assert!(inner.resolve(Some("q")).is_none());
    }

    #[test]
    fn test_resolve_shares_identity_within_scope() {
        let doc = NamespaceScope::document();
        let mut outer = NamespaceScope::child(&doc);
        outer.declare(Some("p"), "urn:p");
        let outer = outer.finish();
        let inner = NamespaceScope::child(&outer).finish();

        let a = outer.resolve(Some("p")).unwrap();
        let b = inner.resolve(Some("p")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&outer, &inner));
    }

    #[test]
    fn test_undeclare_default() {
        let doc = NamespaceScope::document();
        let mut outer = NamespaceScope::child(&doc);
        outer.declare(None, "urn:d");
        let outer = outer.finish();
        let mut inner = NamespaceScope::child(&outer);
        inner.declare(None, "");
        let inner = inner.finish();

        assert!(inner.resolve(None).is_none());
        assert!(inner.in_scope().iter().all(|ns| !ns.is_default()));
    }

    #[test]
    fn test_xml_prefix_is_always_bound() {
        let doc = NamespaceScope::document();
        let scope = NamespaceScope::child(&doc).finish();
        assert_eq!(scope.resolve(Some("xml")).unwrap().uri(), XML_NAMESPACE);
        assert_eq!(scope.declared().count(), 1);
    }

    #[test]
    fn test_in_scope_lists_each_prefix_once() {
        let doc = NamespaceScope::document();
        let mut outer = NamespaceScope::child(&doc);
        outer.declare(Some("p"), "urn:p1");
        let outer = outer.finish();
        let mut inner = NamespaceScope::child(&outer);
        inner.declare(Some("p"), "urn:p2");
        let inner = inner.finish();

        let visible = inner.in_scope();
        let p: Vec<_> = visible.iter().filter(|ns| ns.prefix() == Some("p")).collect();
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].uri(), "urn:p2");
    }
}
