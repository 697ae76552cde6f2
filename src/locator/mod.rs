//! Node locator
//!
//! Selects starting nodes for matching with a small location-path subset.
//! Prefixes in a path are resolved through the caller's [`NamespaceMap`],
//! never through the declarations of the document.
//!
//! ## Limitations
//!
//! Only forward axes are supported: no predicates, no functions other than
//! `text()`, no parent or ancestor steps.

mod selectors;

pub use selectors::{split_path, LocationPath, PathStep, PathStepKind};

use std::collections::HashSet;

use log::debug;

use crate::documents::{Attribute, Document, Element, Node, NodeRef, Text};
use crate::error::{Error, Result};
use crate::namespaces::{NamespaceBinding, NamespaceMap};

/// Find the first node selected by `path`, in document order
pub fn find_one<'a>(
    scope: NodeRef<'a>,
    path: &str,
    namespaces: &NamespaceMap,
) -> Result<Option<NodeRef<'a>>> {
    Ok(find_all(scope, path, namespaces)?.into_iter().next())
}

/// Find every node selected by `path`, in document order, without duplicates
pub fn find_all<'a>(
    scope: NodeRef<'a>,
    path: &str,
    namespaces: &NamespaceMap,
) -> Result<Vec<NodeRef<'a>>> {
    LocationPath::parse(path)?.select(scope, namespaces)
}

/// Resolved name test of a step
struct NameTest<'s, 'n> {
    /// `None` matches any local name
    local: Option<&'s str>,
    /// Required namespace URI, `None` meaning no namespace.
    /// Ignored when `any_namespace` is set.
    uri: Option<&'n str>,
    any_namespace: bool,
}

impl<'s, 'n> NameTest<'s, 'n> {
    fn resolve(step: &'s PathStep, namespaces: &'n NamespaceMap) -> Result<Self> {
        let uri = match &step.prefix {
            Some(prefix) => Some(
                namespaces
                    .get(prefix)
                    .map(String::as_str)
                    .ok_or_else(|| {
                        Error::Namespace(format!(
                            "prefix '{}' in location path is not mapped to a namespace",
                            prefix
                        ))
                    })?,
            ),
            None => None,
        };
        let wildcard = step.is_wildcard();
        Ok(Self {
            local: if wildcard { None } else { Some(step.name.as_str()) },
            uri,
            any_namespace: wildcard && step.prefix.is_none(),
        })
    }

    fn matches(&self, local: &str, uri: Option<&str>) -> bool {
        self.local.map_or(true, |l| l == local) && (self.any_namespace || self.uri == uri)
    }
}

impl LocationPath {
    /// Evaluate this path from `scope`
    pub fn select<'a>(
        &self,
        scope: NodeRef<'a>,
        namespaces: &NamespaceMap,
    ) -> Result<Vec<NodeRef<'a>>> {
        if self.absolute && !matches!(scope, NodeRef::Document(_)) {
            return Err(Error::Locator(format!(
                "absolute path '{}' needs a document scope",
                self.path
            )));
        }

        let mut context = vec![scope];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in &context {
                apply_step(step, *node, namespaces, &mut next)?;
            }
            context = dedupe(next);
            if context.is_empty() {
                break;
            }
        }

        let keys: HashSet<NodeKey> = context.iter().map(node_key).collect();
        let selected: Vec<NodeRef<'a>> = document_order(scope)
            .into_iter()
            .filter(|node| keys.contains(&node_key(node)))
            .collect();
        debug!("location path '{}' selected {} node(s)", self.path, selected.len());
        Ok(selected)
    }
}

fn apply_step<'a>(
    step: &PathStep,
    node: NodeRef<'a>,
    namespaces: &NamespaceMap,
    out: &mut Vec<NodeRef<'a>>,
) -> Result<()> {
    match step.kind {
        PathStepKind::Self_ => out.push(node),
        PathStepKind::DescendantOrSelf => {
            out.push(node);
            match node {
                NodeRef::Document(doc) => {
                    out.push(NodeRef::Element(&doc.root));
                    collect_descendants(&doc.root, out);
                }
                NodeRef::Element(element) => collect_descendants(element, out),
                _ => {}
            }
        }
        PathStepKind::Child => {
            let test = NameTest::resolve(step, namespaces)?;
            match node {
                NodeRef::Document(doc) => {
                    if test.matches(&doc.root.name, doc.root.namespace_uri()) {
                        out.push(NodeRef::Element(&doc.root));
                    }
                }
                NodeRef::Element(element) => out.extend(
                    element
                        .elements()
                        .filter(|e| test.matches(&e.name, e.namespace_uri()))
                        .map(NodeRef::Element),
                ),
                _ => {}
            }
        }
        PathStepKind::Attribute => {
            let test = NameTest::resolve(step, namespaces)?;
            if let NodeRef::Element(element) = node {
                out.extend(
                    element
                        .attributes
                        .iter()
                        .filter(|a| test.matches(&a.name, a.namespace_uri()))
                        .map(NodeRef::Attribute),
                );
            }
        }
        PathStepKind::Text => {
            if let NodeRef::Element(element) = node {
                out.extend(
                    element
                        .children
                        .iter()
                        .filter_map(Node::as_text)
                        .map(NodeRef::Text),
                );
            }
        }
    }
    Ok(())
}

fn collect_descendants<'a>(element: &'a Element, out: &mut Vec<NodeRef<'a>>) {
    for child in element.elements() {
        out.push(NodeRef::Element(child));
        collect_descendants(child, out);
    }
}

/// Every node reachable from `scope`, in document order
fn document_order(scope: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut order = vec![scope];
    match scope {
        NodeRef::Document(doc) => {
            order.push(NodeRef::Element(&doc.root));
            push_contents(&doc.root, &mut order);
        }
        NodeRef::Element(element) => push_contents(element, &mut order),
        _ => {}
    }
    order
}

fn push_contents<'a>(element: &'a Element, out: &mut Vec<NodeRef<'a>>) {
    out.extend(element.attributes.iter().map(NodeRef::Attribute));
    for child in &element.children {
        match child {
            Node::Element(e) => {
                out.push(NodeRef::Element(e));
                push_contents(e, out);
            }
            Node::Text(text) => out.push(NodeRef::Text(text)),
        }
    }
}

/// Node identity: variant tag and address.
/// A document and its root element can share an address, hence the tag.
type NodeKey = (u8, *const ());

fn node_key(node: &NodeRef<'_>) -> NodeKey {
    match *node {
        NodeRef::Document(d) => (0, d as *const Document as *const ()),
        NodeRef::Element(e) => (1, e as *const Element as *const ()),
        NodeRef::Attribute(a) => (2, a as *const Attribute as *const ()),
        NodeRef::Text(t) => (3, t as *const Text as *const ()),
        NodeRef::Namespace(b) => (4, b as *const NamespaceBinding as *const ()),
    }
}

fn dedupe(nodes: Vec<NodeRef<'_>>) -> Vec<NodeRef<'_>> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter(|node| seen.insert(node_key(node)))
        .collect()
}
