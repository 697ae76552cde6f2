//! Compiled pattern tree

use std::fmt;

/// Literal scalar in a pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string
    Str(String),
    /// Number
    Number(f64),
    /// `nil`
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

/// One node of a compiled pattern
#[derive(Debug, Clone, PartialEq)]
pub enum PatternNode {
    /// `{ field: pattern, ... }`
    Map(Vec<FieldPattern>),
    /// `[ item, *, item, ... ]`
    Seq(Vec<SeqItem>),
    /// String, number or nil
    Literal(Literal),
    /// `^name`
    Pin(String),
    /// `name`
    Capture(String),
    /// `_`
    Wildcard,
}

/// A named field inside a map pattern
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    /// Field name in the target bundle
    pub name: String,
    /// Pattern for the field value
    pub pattern: PatternNode,
}

/// An item of a sequence pattern
#[derive(Debug, Clone, PartialEq)]
pub enum SeqItem {
    /// `*`, zero or more items
    Span,
    /// Exactly one item
    Item(PatternNode),
}

impl SeqItem {
    /// Check whether this is a wildcard span
    pub fn is_span(&self) -> bool {
        matches!(self, SeqItem::Span)
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternNode::Map(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", field.name, field.pattern)?;
                }
                if fields.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            PatternNode::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        SeqItem::Span => write!(f, "*")?,
                        SeqItem::Item(node) => write!(f, "{}", node)?,
                    }
                }
                write!(f, "]")
            }
            PatternNode::Literal(literal) => write!(f, "{}", literal),
            PatternNode::Pin(name) => write!(f, "^{}", name),
            PatternNode::Capture(name) => write!(f, "{}", name),
            PatternNode::Wildcard => write!(f, "_"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_shape() {
        let node = PatternNode::Map(vec![FieldPattern {
            name: "children".to_string(),
            pattern: PatternNode::Seq(vec![
                SeqItem::Span,
                SeqItem::Item(PatternNode::Map(vec![
                    FieldPattern {
                        name: "name".to_string(),
                        pattern: PatternNode::Literal(Literal::Str("g1".to_string())),
                    },
                    FieldPattern {
                        name: "content".to_string(),
                        pattern: PatternNode::Capture("c".to_string()),
                    },
                ])),
                SeqItem::Span,
            ]),
        }]);
        assert_eq!(
            node.to_string(),
            r#"{ children: [*, { name: "g1", content: c }, *] }"#
        );
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(PatternNode::Pin("ns".to_string()).to_string(), "^ns");
        assert_eq!(PatternNode::Wildcard.to_string(), "_");
        assert_eq!(PatternNode::Literal(Literal::Nil).to_string(), "nil");
        assert_eq!(PatternNode::Literal(Literal::Number(2.5)).to_string(), "2.5");
        assert_eq!(PatternNode::Map(Vec::new()).to_string(), "{}");
    }
}
