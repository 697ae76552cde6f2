//! XML document tree
//!
//! The tree is built once and is read-only afterwards. Namespaces are
//! resolved during construction and cached on every element and attribute,
//! so nothing downstream ever walks the scope chain to answer `namespace`.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::names::{split_qname, validate_qname};
use crate::namespaces::{NamespaceBinding, NamespaceScope};
use crate::XMLNS_NAMESPACE;

/// XML attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Local name
    pub name: String,
    /// Unescaped value
    pub value: String,
    /// Resolved namespace; always `None` for an unprefixed attribute
    pub namespace: Option<Arc<NamespaceBinding>>,
}

impl Attribute {
    /// Create an attribute in no namespace
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            namespace: None,
        }
    }

    /// Namespace URI of the attribute, if any
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref().map(NamespaceBinding::uri)
    }
}

/// Text node; CDATA sections are folded into text
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// Character data
    pub content: String,
}

impl Text {
    /// Create a text node
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Check whether the text is whitespace only
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Child node of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Element node
    Element(Element),
    /// Text node
    Text(Text),
}

impl Node {
    /// Get as an element if applicable
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Get as a text node if applicable
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }
}

/// XML element
#[derive(Debug, Clone)]
pub struct Element {
    /// Local name
    pub name: String,
    /// Resolved namespace of the element name
    pub namespace: Option<Arc<NamespaceBinding>>,
    /// Attributes in source order, namespace declarations excluded
    pub attributes: Vec<Attribute>,
    /// All child nodes in document order, whitespace text included
    pub children: Vec<Node>,
    scope: Arc<NamespaceScope>,
    declares_scope: bool,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Element {
    /// Create an element in no namespace with no attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
            scope: NamespaceScope::document(),
            declares_scope: false,
        }
    }

    /// Local name of the element
    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// Namespace URI of the element, if any
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref().map(NamespaceBinding::uri)
    }

    /// Resolve a prefix (`None` for the default namespace) against the
    /// bindings in scope at this element
    pub fn resolve_namespace(&self, prefix: Option<&str>) -> Option<Arc<NamespaceBinding>> {
        self.scope.resolve(prefix)
    }

    /// Bindings declared on this element
    pub fn namespace_definitions(&self) -> Vec<Arc<NamespaceBinding>> {
        if self.declares_scope {
            self.scope.declared().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// All bindings visible at this element, nearest first
    pub fn namespaces_in_scope(&self) -> Vec<Arc<NamespaceBinding>> {
        self.scope.in_scope()
    }

    /// Get an attribute value by local name, in no namespace
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.is_none())
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by namespace URI and local name
    pub fn get_attribute_ns(&self, uri: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace_uri() == Some(uri))
            .map(|a| a.value.as_str())
    }

    /// Child elements only, in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.elements().filter(|e| e.name == local_name).collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&text.content),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }
}

/// XML document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document element
    pub root: Element,
}

impl Document {
    /// Parse an XML document from a string with default limits
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from a file with default limits
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    /// Parse an XML document from a string
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        reader.check_end_names(true);

        let document_scope = NamespaceScope::document();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Xml(format!(
                    "Error parsing XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(e) => {
                    limits.check_xml_depth(stack.len() + 1)?;
                    let parent = stack.last().map_or(&document_scope, |p| &p.scope);
                    let element = Self::parse_element(&e, parent, limits)?;
                    Self::check_single_root(&root, &stack)?;
                    stack.push(element);
                }
                Event::Empty(e) => {
                    limits.check_xml_depth(stack.len() + 1)?;
                    let parent = stack.last().map_or(&document_scope, |p| &p.scope);
                    let element = Self::parse_element(&e, parent, limits)?;
                    Self::check_single_root(&root, &stack)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        Self::attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                    Self::push_text(&mut stack, &text)?;
                }
                Event::CData(e) => {
                    let bytes = e.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| Error::Xml(format!("Invalid CDATA section: {}", e)))?;
                    Self::push_text(&mut stack, text)?;
                }
                Event::Eof => break,
                _ => {} // Comments, processing instructions, declarations
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!(
                "Unexpected end of document inside <{}>",
                stack.last().map_or("", |e| e.name.as_str())
            )));
        }

        let root = root.ok_or_else(|| Error::Xml("Document has no root element".to_string()))?;
        debug!(
            "built document rooted at <{}> with {} children",
            root.name,
            root.children.len()
        );
        Ok(Self { root })
    }

    fn check_single_root(root: &Option<Element>, stack: &[Element]) -> Result<()> {
        if stack.is_empty() && root.is_some() {
            Err(Error::Xml("Document has more than one root element".to_string()))
        } else {
            Ok(())
        }
    }

    fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => *root = Some(element),
        }
    }

    /// Append character data to the open element, merging with a preceding
    /// text node. Outside the root only whitespace is allowed.
    fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
        let Some(parent) = stack.last_mut() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::Xml(format!(
                "Text outside the root element: {:?}",
                text.trim()
            )));
        };
        if text.is_empty() {
            return Ok(());
        }
        match parent.children.last_mut() {
            Some(Node::Text(previous)) => previous.content.push_str(text),
            _ => parent.children.push(Node::Text(Text::new(text))),
        }
        Ok(())
    }

    /// Build an element from a start tag: namespace declarations first, then
    /// the element name and attributes are resolved against the new frame.
    fn parse_element(
        start: &BytesStart,
        parent: &Arc<NamespaceScope>,
        limits: &Limits,
    ) -> Result<Element> {
        let qname = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();
        validate_qname(&qname)?;

        let mut scope = NamespaceScope::child(parent);
        let mut raw_attributes: Vec<(String, String)> = Vec::new();

        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if (attr_name == "xmlns" || attr_name.starts_with("xmlns:"))
                && attr_value == XMLNS_NAMESPACE
            {
                return Err(Error::Namespace(format!(
                    "'{}' cannot bind the reserved xmlns namespace",
                    attr_name
                )));
            }

            if attr_name == "xmlns" {
                scope.declare(None, &attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                if attr_value.is_empty() {
                    return Err(Error::Namespace(format!(
                        "Prefix '{}' cannot be bound to an empty URI",
                        prefix
                    )));
                }
                scope.declare(Some(prefix), &attr_value);
            } else {
                validate_qname(&attr_name)?;
                raw_attributes.push((attr_name, attr_value));
            }
        }

        limits.check_namespaces(scope.len())?;
        limits.check_attributes(raw_attributes.len())?;

        let declares_scope = !scope.is_empty();
        let scope = scope.finish();

        let (prefix, local) = split_qname(&qname);
        let namespace = match prefix {
            Some(p) => Some(scope.resolve(Some(p)).ok_or_else(|| {
                Error::Namespace(format!("Undeclared prefix '{}' on element <{}>", p, qname))
            })?),
            None => scope.resolve(None),
        };

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (name, value) in raw_attributes {
            let (prefix, local) = split_qname(&name);
            // Unprefixed attributes never take the default namespace
            let namespace = match prefix {
                Some(p) => Some(scope.resolve(Some(p)).ok_or_else(|| {
                    Error::Namespace(format!("Undeclared prefix '{}' on attribute '{}'", p, name))
                })?),
                None => None,
            };
            if attributes
                .iter()
                .any(|a: &Attribute| a.name == local && a.namespace == namespace)
            {
                return Err(Error::Xml(format!(
                    "Duplicate attribute '{}' on element <{}>",
                    name, qname
                )));
            }
            attributes.push(Attribute {
                name: local.to_string(),
                value,
                namespace,
            });
        }

        Ok(Element {
            name: local.to_string(),
            namespace,
            attributes,
            children: Vec::new(),
            scope,
            declares_scope,
        })
    }
}

impl std::str::FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Any node a locator may hand back as a starting point for matching
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// The document itself
    Document(&'a Document),
    /// An element
    Element(&'a Element),
    /// An attribute
    Attribute(&'a Attribute),
    /// A text node
    Text(&'a Text),
    /// A namespace binding
    Namespace(&'a NamespaceBinding),
}

impl<'a> NodeRef<'a> {
    /// Get as an element if applicable
    pub fn as_element(&self) -> Option<&'a Element> {
        match self {
            NodeRef::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Get as an attribute if applicable
    pub fn as_attribute(&self) -> Option<&'a Attribute> {
        match self {
            NodeRef::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    /// Get as a text node if applicable
    pub fn as_text(&self) -> Option<&'a Text> {
        match self {
            NodeRef::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Get as a namespace binding if applicable
    pub fn as_namespace(&self) -> Option<&'a NamespaceBinding> {
        match self {
            NodeRef::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Same node, compared by address
    pub fn same_node(&self, other: &NodeRef<'_>) -> bool {
        match (self, other) {
            (NodeRef::Document(a), NodeRef::Document(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Element(a), NodeRef::Element(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Attribute(a), NodeRef::Attribute(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Text(a), NodeRef::Text(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Namespace(a), NodeRef::Namespace(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Element(element) => NodeRef::Element(element),
            Node::Text(text) => NodeRef::Text(text),
        }
    }
}
