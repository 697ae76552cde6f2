//! Field bundles of the node variants
//!
//! Every variant exposes a fixed list of fields. The compiler uses these
//! schemas to reject field names that a statically known target can never
//! provide.

use std::fmt;

/// Statically known shape of a pattern target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Nothing known; field names are not checked
    Any,
    /// String, number or nil
    Scalar,
    /// Document bundle
    Document,
    /// Element bundle
    Element,
    /// Attribute bundle
    Attribute,
    /// Text bundle
    Text,
    /// Namespace bundle (may be nil at run time)
    Namespace,
    /// Element or text child
    ChildNode,
    /// Ordered sequence of items of the inner shape
    Seq(Box<Shape>),
}

const DOCUMENT_FIELDS: &[&str] = &["root"];
const ELEMENT_FIELDS: &[&str] = &[
    "name",
    "namespace",
    "attributes",
    "children",
    "content",
    "elements",
];
const ATTRIBUTE_FIELDS: &[&str] = &["name", "value", "namespace"];
const TEXT_FIELDS: &[&str] = &["name", "content"];
const NAMESPACE_FIELDS: &[&str] = &["prefix", "href"];

impl Shape {
    /// Parse a shape name as used on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "document" => Some(Self::Document),
            "element" => Some(Self::Element),
            "attribute" => Some(Self::Attribute),
            "text" => Some(Self::Text),
            "namespace" => Some(Self::Namespace),
            "node" => Some(Self::ChildNode),
            _ => None,
        }
    }

    /// Fields of the bundle, `None` if the shape is not an object
    /// or is not statically known
    pub fn fields(&self) -> Option<&'static [&'static str]> {
        match self {
            Shape::Document => Some(DOCUMENT_FIELDS),
            // element fields are a superset of the text ones
            Shape::Element | Shape::ChildNode => Some(ELEMENT_FIELDS),
            Shape::Attribute => Some(ATTRIBUTE_FIELDS),
            Shape::Text => Some(TEXT_FIELDS),
            Shape::Namespace => Some(NAMESPACE_FIELDS),
            Shape::Any | Shape::Scalar | Shape::Seq(_) => None,
        }
    }

    /// Shape of a field's value; `Any` when the target is unknown,
    /// `None` when the bundle has no such field
    pub fn field_shape(&self, name: &str) -> Option<Shape> {
        if *self == Shape::Any {
            return Some(Shape::Any);
        }
        if !self.fields()?.contains(&name) {
            return None;
        }
        let shape = match name {
            "root" => Shape::Element,
            "namespace" => Shape::Namespace,
            "attributes" => Shape::Seq(Box::new(Shape::Attribute)),
            "children" => Shape::Seq(Box::new(Shape::ChildNode)),
            "elements" => Shape::Seq(Box::new(Shape::Element)),
            _ => Shape::Scalar,
        };
        Some(shape)
    }

    /// Shape of the items when this is a sequence, `Any` when unknown
    pub fn item_shape(&self) -> Option<Shape> {
        match self {
            Shape::Seq(inner) => Some((**inner).clone()),
            Shape::Any => Some(Shape::Any),
            _ => None,
        }
    }

    /// Check whether a map pattern can ever match this shape
    pub fn is_object(&self) -> bool {
        matches!(self, Shape::Any) || self.fields().is_some()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Any => write!(f, "any"),
            Shape::Scalar => write!(f, "scalar"),
            Shape::Document => write!(f, "document"),
            Shape::Element => write!(f, "element"),
            Shape::Attribute => write!(f, "attribute"),
            Shape::Text => write!(f, "text"),
            Shape::Namespace => write!(f, "namespace"),
            Shape::ChildNode => write!(f, "node"),
            Shape::Seq(inner) => write!(f, "sequence of {}", inner),
        }
    }
}
