//! Dynamic view of the tree used by the matcher
//!
//! A [`Value`] borrows from the document; reading a field returns another
//! value built on the fly from the fixed bundle of the variant.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

use super::shape::Shape;
use crate::documents::{Attribute, Document, Element, Node, NodeRef, Text};
use crate::namespaces::NamespaceBinding;

/// A value a pattern can be matched against
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Absent value
    Nil,
    /// String
    Str(Cow<'a, str>),
    /// Number
    Number(f64),
    /// Ordered sequence
    Seq(Vec<Value<'a>>),
    /// Document bundle
    Document(&'a Document),
    /// Element bundle
    Element(&'a Element),
    /// Attribute bundle
    Attribute(&'a Attribute),
    /// Text bundle
    Text(&'a Text),
    /// Namespace bundle; equal when the URIs are equal
    Namespace(&'a NamespaceBinding),
}

impl<'a> Value<'a> {
    /// Human readable kind, used in mismatch reasons
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Seq(_) => "sequence",
            Value::Document(_) => "document",
            Value::Element(_) => "element",
            Value::Attribute(_) => "attribute",
            Value::Text(_) => "text",
            Value::Namespace(_) => "namespace",
        }
    }

    /// Shape of the bundle this value exposes
    pub fn shape(&self) -> Shape {
        match self {
            Value::Nil | Value::Str(_) | Value::Number(_) => Shape::Scalar,
            Value::Seq(_) => Shape::Seq(Box::new(Shape::Any)),
            Value::Document(_) => Shape::Document,
            Value::Element(_) => Shape::Element,
            Value::Attribute(_) => Shape::Attribute,
            Value::Text(_) => Shape::Text,
            Value::Namespace(_) => Shape::Namespace,
        }
    }

    /// Read a field of the bundle; `None` when this value is not an object
    /// or its bundle has no such field
    pub fn field(&self, name: &str) -> Option<Value<'a>> {
        match *self {
            Value::Document(doc) => match name {
                "root" => Some(Value::Element(&doc.root)),
                _ => None,
            },
            Value::Element(element) => match name {
                "name" => Some(Value::from(element.name.as_str())),
                "namespace" => Some(Value::from(element.namespace.as_deref())),
                "attributes" => Some(Value::Seq(
                    element.attributes.iter().map(Value::Attribute).collect(),
                )),
                "children" => Some(Value::Seq(element.children.iter().map(Value::from).collect())),
                "content" => Some(Value::Str(Cow::Owned(element.content()))),
                "elements" => Some(Value::Seq(element.elements().map(Value::Element).collect())),
                _ => None,
            },
            Value::Attribute(attribute) => match name {
                "name" => Some(Value::from(attribute.name.as_str())),
                "value" => Some(Value::from(attribute.value.as_str())),
                "namespace" => Some(Value::from(attribute.namespace.as_deref())),
                _ => None,
            },
            Value::Text(text) => match name {
                "name" => Some(Value::from("text")),
                "content" => Some(Value::from(text.content.as_str())),
                _ => None,
            },
            Value::Namespace(ns) => match name {
                "prefix" => Some(Value::from(ns.prefix())),
                "href" => Some(Value::from(ns.uri())),
                _ => None,
            },
            Value::Nil | Value::Str(_) | Value::Number(_) | Value::Seq(_) => None,
        }
    }

    /// Check whether this value exposes a field bundle
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Document(_)
                | Value::Element(_)
                | Value::Attribute(_)
                | Value::Text(_)
                | Value::Namespace(_)
        )
    }

    /// Check for nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get as a string slice if applicable
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a number if applicable
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as a sequence if applicable
    pub fn as_seq(&self) -> Option<&[Value<'a>]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Get as an element if applicable
    pub fn as_element(&self) -> Option<&'a Element> {
        match self {
            Value::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Get as an attribute if applicable
    pub fn as_attribute(&self) -> Option<&'a Attribute> {
        match self {
            Value::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    /// Get as a namespace binding if applicable
    pub fn as_namespace(&self) -> Option<&'a NamespaceBinding> {
        match self {
            Value::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Short description used in mismatch reasons
    pub fn describe(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{:?}", s),
            Value::Number(n) => n.to_string(),
            Value::Seq(items) => format!("sequence of {} items", items.len()),
            Value::Document(doc) => format!("document <{}>", doc.root.name),
            Value::Element(element) => format!("element <{}>", element.name),
            Value::Attribute(attribute) => format!("attribute '{}'", attribute.name),
            Value::Text(text) => format!("text {:?}", text.content),
            Value::Namespace(ns) => format!("namespace {}", ns),
        }
    }

    /// Render as JSON
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Nil => JsonValue::Null,
            Value::Str(s) => JsonValue::String(s.to_string()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Seq(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Document(doc) => json!({ "root": Value::Element(&doc.root).to_json() }),
            Value::Element(element) => json!({
                "type": "element",
                "name": element.name,
                "namespace": Value::from(element.namespace.as_deref()).to_json(),
                "attributes": element
                    .attributes
                    .iter()
                    .map(|a| Value::Attribute(a).to_json())
                    .collect::<Vec<_>>(),
                "children": element
                    .children
                    .iter()
                    .map(|c| Value::from(c).to_json())
                    .collect::<Vec<_>>(),
            }),
            Value::Attribute(attribute) => json!({
                "type": "attribute",
                "name": attribute.name,
                "value": attribute.value,
                "namespace": Value::from(attribute.namespace.as_deref()).to_json(),
            }),
            Value::Text(text) => json!({ "type": "text", "content": text.content }),
            Value::Namespace(ns) => serde_json::to_value(ns).unwrap_or(JsonValue::Null),
        }
    }
}

impl<'a> From<&'a Document> for Value<'a> {
    fn from(doc: &'a Document) -> Self {
        Value::Document(doc)
    }
}

impl<'a> From<&'a Element> for Value<'a> {
    fn from(element: &'a Element) -> Self {
        Value::Element(element)
    }
}

impl<'a> From<&'a Attribute> for Value<'a> {
    fn from(attribute: &'a Attribute) -> Self {
        Value::Attribute(attribute)
    }
}

impl<'a> From<&'a Text> for Value<'a> {
    fn from(text: &'a Text) -> Self {
        Value::Text(text)
    }
}

impl<'a> From<&'a NamespaceBinding> for Value<'a> {
    fn from(ns: &'a NamespaceBinding) -> Self {
        Value::Namespace(ns)
    }
}

impl<'a> From<&'a Node> for Value<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Element(element) => Value::Element(element),
            Node::Text(text) => Value::Text(text),
        }
    }
}

impl<'a> From<NodeRef<'a>> for Value<'a> {
    fn from(node: NodeRef<'a>) -> Self {
        match node {
            NodeRef::Document(doc) => Value::Document(doc),
            NodeRef::Element(element) => Value::Element(element),
            NodeRef::Attribute(attribute) => Value::Attribute(attribute),
            NodeRef::Text(text) => Value::Text(text),
            NodeRef::Namespace(ns) => Value::Namespace(ns),
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Str(Cow::Borrowed(s))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Str(Cow::Owned(s))
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value<'_> {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

impl<'a, T: Into<Value<'a>>> From<Vec<T>> for Value<'a> {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

/// Named values produced by a successful match, in binding order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings<'a> {
    values: IndexMap<String, Value<'a>>,
}

impl<'a> Bindings<'a> {
    /// Create an empty binding set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value<'a>>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`Bindings::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value<'a>>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a bound value
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.values.get(name)
    }

    /// Get a bound string value
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Check whether a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound names in binding order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<'a>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every binding made after the first `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for Bindings<'a> {
    type Item = (String, Value<'a>);
    type IntoIter = indexmap::map::IntoIter<String, Value<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a, K: Into<String>, V: Into<Value<'a>>> FromIterator<(K, V)> for Bindings<'a> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
