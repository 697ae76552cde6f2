//! Pattern compiler
//!
//! Turns pattern text into a [`PatternNode`] tree in one pass, checking every
//! construct against the statically known [`Shape`] of its target:
//!
//! ```text
//! Pattern    := MapPattern | SeqPattern | Literal | Pin | Capture | Wildcard
//! MapPattern := '{' (Field (',' Field)*)? '}'
//! Field      := ident ':' Pattern | ident ':'
//! SeqPattern := '[' (SeqItem (',' SeqItem)*)? ']'
//! SeqItem    := '*' | Pattern
//! Literal    := string | number | nil
//! Pin        := '^' ident
//! Capture    := ident
//! Wildcard   := '_'
//! ```

use std::fmt;

use super::ast::{FieldPattern, Literal, PatternNode, SeqItem};
use super::shape::Shape;
use crate::error::{Error, PatternError, Result};
use crate::limits::Limits;
use crate::names::is_valid_identifier;

/// Lexical token of the pattern language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `*`
    Star,
    /// `^`
    Caret,
    /// Identifier, including `_` and `nil`
    Ident(String),
    /// Quoted string
    Str(String),
    /// Number
    Number(f64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::Star => write!(f, "'*'"),
            Token::Caret => write!(f, "'^'"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Number(n) => write!(f, "number {}", n),
        }
    }
}

/// Split pattern text into tokens with their byte offsets
pub fn tokenize(source: &str) -> std::result::Result<Vec<(Token, usize)>, PatternError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '*' => Token::Star,
            '^' => Token::Caret,
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            let (esc_offset, escaped) = chars.next().ok_or_else(|| {
                                PatternError::new("unterminated string").with_offset(offset)
                            })?;
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '\\' | '"' | '\'' => escaped,
                                other => {
                                    return Err(PatternError::new(format!(
                                        "unknown escape '\\{}'",
                                        other
                                    ))
                                    .with_offset(esc_offset - 1))
                                }
                            });
                        }
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(PatternError::new("unterminated string").with_offset(offset));
                }
                tokens.push((Token::Str(value), offset));
                continue;
            }
            c if c == '-' || c.is_ascii_digit() => {
                let mut end = offset;
                let mut seen_dot = false;
                while let Some(&(i, ch)) = chars.peek() {
                    let accept = ch.is_ascii_digit()
                        || (i == offset && ch == '-')
                        || (ch == '.' && !seen_dot && i > offset);
                    if !accept {
                        break;
                    }
                    seen_dot |= ch == '.';
                    end = i + ch.len_utf8();
                    chars.next();
                }
                let text = &source[offset..end];
                let number = text
                    .parse::<f64>()
                    .ok()
                    .filter(|_| !text.ends_with('.'))
                    .ok_or_else(|| {
                        PatternError::new(format!("invalid number '{}'", text)).with_offset(offset)
                    })?;
                tokens.push((Token::Number(number), offset));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if !(ch.is_ascii_alphanumeric() || ch == '_') {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push((Token::Ident(source[offset..end].to_string()), offset));
                continue;
            }
            other => {
                return Err(
                    PatternError::new(format!("unexpected character '{}'", other))
                        .with_offset(offset),
                )
            }
        };
        chars.next();
        tokens.push((token, offset));
    }

    Ok(tokens)
}

/// Output of the compiler
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    /// Root of the pattern tree
    pub root: PatternNode,
    /// Capture names in binding order
    pub captures: Vec<String>,
    /// Pin names in pattern order
    pub pins: Vec<String>,
}

/// Recursive-descent compiler for the pattern language
#[derive(Debug)]
pub struct PatternParser<'s> {
    source: &'s str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
    limits: Limits,
    captures: Vec<String>,
    pins: Vec<String>,
}

impl<'s> PatternParser<'s> {
    /// Create a parser over `source`
    pub fn new(source: &'s str, limits: &Limits) -> Result<Self> {
        let tokens = tokenize(source).map_err(|e| e.with_source(source))?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            limits: limits.clone(),
            captures: Vec::new(),
            pins: Vec::new(),
        })
    }

    /// Parse a whole pattern targeting `shape`
    pub fn parse(mut self, shape: &Shape) -> Result<ParsedPattern> {
        if self.tokens.is_empty() {
            return Err(self.error("empty pattern", 0));
        }
        let root = self.parse_pattern(shape, 1)?;
        if let Some((token, offset)) = self.tokens.get(self.pos) {
            let message = format!("unexpected {} after end of pattern", token);
            return Err(self.error(message, *offset));
        }
        Ok(ParsedPattern {
            root,
            captures: self.captures,
            pins: self.pins,
        })
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> Error {
        Error::Pattern(
            PatternError::new(message)
                .with_offset(offset)
                .with_source(self.source),
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, offset)| *offset)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<usize> {
        match self.next() {
            Some((token, offset)) if token == expected => Ok(offset),
            Some((token, offset)) => {
                Err(self.error(format!("expected {}, found {}", expected, token), offset))
            }
            None => Err(self.error(
                format!("expected {}, found end of pattern", expected),
                self.source.len(),
            )),
        }
    }

    fn parse_pattern(&mut self, shape: &Shape, depth: usize) -> Result<PatternNode> {
        let offset = self.offset();
        match self.next() {
            Some((Token::LBrace, _)) => {
                self.limits.check_pattern_depth(depth)?;
                self.parse_map(shape, depth, offset)
            }
            Some((Token::LBracket, _)) => {
                self.limits.check_pattern_depth(depth)?;
                self.parse_seq(shape, depth, offset)
            }
            Some((Token::Str(s), _)) => Ok(PatternNode::Literal(Literal::Str(s))),
            Some((Token::Number(n), _)) => Ok(PatternNode::Literal(Literal::Number(n))),
            Some((Token::Caret, _)) => {
                let name = self.parse_name("pin")?;
                self.pins.push(name.clone());
                Ok(PatternNode::Pin(name))
            }
            Some((Token::Ident(name), _)) if name == "nil" => {
                Ok(PatternNode::Literal(Literal::Nil))
            }
            Some((Token::Ident(name), _)) if name == "_" => Ok(PatternNode::Wildcard),
            Some((Token::Ident(name), _)) => self.capture(name, offset),
            Some((token, offset)) => {
                Err(self.error(format!("unexpected {}, expected a pattern", token), offset))
            }
            None => Err(self.error("unexpected end of pattern", self.source.len())),
        }
    }

    fn parse_name(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some((Token::Ident(name), offset)) => {
                if is_valid_identifier(&name) {
                    Ok(name)
                } else {
                    Err(self.error(format!("'{}' cannot be used as a {} name", name, what), offset))
                }
            }
            Some((token, offset)) => Err(self.error(
                format!("expected a {} name, found {}", what, token),
                offset,
            )),
            None => Err(self.error(
                format!("expected a {} name, found end of pattern", what),
                self.source.len(),
            )),
        }
    }

    fn capture(&mut self, name: String, offset: usize) -> Result<PatternNode> {
        if !is_valid_identifier(&name) {
            return Err(self.error(format!("'{}' cannot be used as a capture name", name), offset));
        }
        if self.captures.contains(&name) {
            return Err(self.error(format!("duplicate capture '{}'", name), offset));
        }
        self.captures.push(name.clone());
        Ok(PatternNode::Capture(name))
    }

    fn parse_map(&mut self, shape: &Shape, depth: usize, open: usize) -> Result<PatternNode> {
        if !shape.is_object() {
            return Err(self.error(
                format!("map pattern cannot match a {}", shape),
                open,
            ));
        }

        let mut fields: Vec<FieldPattern> = Vec::new();
        loop {
            let (name, name_offset) = match self.next() {
                Some((Token::RBrace, _)) => break,
                Some((Token::Ident(name), offset)) => (name, offset),
                Some((token, offset)) => {
                    return Err(self.error(
                        format!("expected a field name or '}}', found {}", token),
                        offset,
                    ))
                }
                None => return Err(self.error("unclosed map pattern", open)),
            };
            let field_shape = shape.field_shape(&name).ok_or_else(|| {
                self.error(format!("{} has no field '{}'", shape, name), name_offset)
            })?;
            if fields.iter().any(|f| f.name == name) {
                return Err(self.error(format!("field '{}' given twice", name), name_offset));
            }
            self.expect(Token::Colon)?;

            let pattern = match self.peek() {
                // `name:` is shorthand for `name: name`
                Some(Token::Comma) | Some(Token::RBrace) | None => {
                    self.capture(name.clone(), name_offset)?
                }
                _ => self.parse_pattern(&field_shape, depth + 1)?,
            };
            fields.push(FieldPattern { name, pattern });
            self.limits.check_pattern_items(fields.len())?;

            match self.next() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RBrace, _)) => break,
                Some((token, offset)) => {
                    return Err(self.error(format!("expected ',' or '}}', found {}", token), offset))
                }
                None => {
                    return Err(self.error("unclosed map pattern", open));
                }
            }
        }

        Ok(PatternNode::Map(fields))
    }

    fn parse_seq(&mut self, shape: &Shape, depth: usize, open: usize) -> Result<PatternNode> {
        let item_shape = shape.item_shape().ok_or_else(|| {
            self.error(format!("sequence pattern cannot match a {}", shape), open)
        })?;

        let mut items: Vec<SeqItem> = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    self.next();
                    break;
                }
                Some(Token::Star) => {
                    let offset = self.offset();
                    self.next();
                    if items.last().map_or(false, SeqItem::is_span) {
                        return Err(self.error(
                            "ambiguous wildcard spans: '*' must be separated by a pattern",
                            offset,
                        ));
                    }
                    items.push(SeqItem::Span);
                }
                Some(_) => {
                    let node = self.parse_pattern(&item_shape, depth + 1)?;
                    items.push(SeqItem::Item(node));
                }
                None => return Err(self.error("unclosed sequence pattern", open)),
            }
            self.limits.check_pattern_items(items.len())?;

            match self.next() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RBracket, _)) => break,
                Some((token, offset)) => {
                    return Err(self.error(format!("expected ',' or ']', found {}", token), offset))
                }
                None => return Err(self.error("unclosed sequence pattern", open)),
            }
        }

        Ok(PatternNode::Seq(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<ParsedPattern> {
        PatternParser::new(src, &Limits::default())?.parse(&Shape::Any)
    }

    fn parse_for(src: &str, shape: Shape) -> Result<ParsedPattern> {
        PatternParser::new(src, &Limits::default())?.parse(&shape)
    }

    fn pattern_error(result: Result<ParsedPattern>) -> PatternError {
        match result {
            Err(Error::Pattern(e)) => e,
            other => panic!("expected a pattern error, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<Token> = tokenize(r#"{ a: [*, "x\"y", -1.5, ^b, _] }"#)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                Token::Ident("a".to_string()),
                Token::Colon,
                Token::LBracket,
                Token::Star,
                Token::Comma,
                Token::Str("x\"y".to_string()),
                Token::Comma,
                Token::Number(-1.5),
                Token::Comma,
                Token::Caret,
                Token::Ident("b".to_string()),
                Token::Comma,
                Token::Ident("_".to_string()),
                Token::RBracket,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("'abc").is_err());
        assert!(tokenize("1.").is_err());
        assert!(tokenize("-").is_err());
        assert!(tokenize("\"\\q\"").is_err());
        assert_eq!(tokenize("{ a: # }").unwrap_err().offset, Some(5));
    }

    #[test]
    fn test_shorthand_expands_to_capture() {
        let parsed = parse("{name:, content: }").unwrap();
        assert_eq!(
            parsed.root,
            PatternNode::Map(vec![
                FieldPattern {
                    name: "name".to_string(),
                    pattern: PatternNode::Capture("name".to_string()),
                },
                FieldPattern {
                    name: "content".to_string(),
                    pattern: PatternNode::Capture("content".to_string()),
                },
            ])
        );
        assert_eq!(parsed.captures, vec!["name", "content"]);
    }

    #[test]
    fn test_literals_pins_wildcards() {
        let parsed = parse(r#"["a", 'b', 3, nil, ^x, _, y]"#).unwrap();
        let PatternNode::Seq(items) = parsed.root else {
            panic!("expected a sequence");
        };
        assert_eq!(items.len(), 7);
        assert_eq!(items[3], SeqItem::Item(PatternNode::Literal(Literal::Nil)));
        assert_eq!(items[4], SeqItem::Item(PatternNode::Pin("x".to_string())));
        assert_eq!(items[5], SeqItem::Item(PatternNode::Wildcard));
        assert_eq!(parsed.pins, vec!["x"]);
        assert_eq!(parsed.captures, vec!["y"]);
    }

    #[test]
    fn test_trailing_commas() {
        assert!(parse("{ name: n, }").is_ok());
        assert!(parse("[a, *,]").is_ok());
        assert!(parse("{}").is_ok());
        assert!(parse("[]").is_ok());
    }

    #[test]
    fn test_rejects_adjacent_spans() {
        let err = pattern_error(parse("[*, *, x]"));
        assert!(err.message.contains("ambiguous"));
        assert_eq!(err.offset, Some(4));
        assert!(parse("[*, a, *, b, *]").is_ok());
    }

    #[test]
    fn test_rejects_duplicate_captures() {
        let err = pattern_error(parse("{ name: x, children: [*, { name: x }, *] }"));
        assert!(err.message.contains("duplicate capture 'x'"));
        let err = pattern_error(parse("{ name:, value: name }"));
        assert!(err.message.contains("duplicate capture 'name'"));
    }

    #[test]
    fn test_rejects_unknown_fields_for_known_shape() {
        let err = pattern_error(parse_for("{ href: h }", Shape::Element));
        assert!(err.message.contains("element has no field 'href'"));
        assert!(parse_for("{ namespace: { href: h } }", Shape::Element).is_ok());
        let err = pattern_error(parse_for("{ namespace: { uri: u } }", Shape::Attribute));
        assert!(err.message.contains("namespace has no field 'uri'"));
        let err = pattern_error(parse_for(
            "{ attributes: [*, { content: c }, *] }",
            Shape::Element,
        ));
        assert!(err.message.contains("attribute has no field 'content'"));
        assert!(parse("{ href: h }").is_ok());
    }

    #[test]
    fn test_rejects_structure_against_scalars() {
        let err = pattern_error(parse_for("{ name: { x: y } }", Shape::Element));
        assert!(err.message.contains("map pattern cannot match a scalar"));
        let err = pattern_error(parse_for("{ attributes: { name: n } }", Shape::Element));
        assert!(err.message.contains("sequence of attribute"));
        let err = pattern_error(parse_for("[a]", Shape::Element));
        assert!(err.message.contains("sequence pattern cannot match a element"));
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(parse("^_").is_err());
        assert!(parse("^nil").is_err());
        assert!(parse("^").is_err());
        assert!(parse("{ _: }").is_err());
    }

    #[test]
    fn test_rejects_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("{ name }").is_err());
        assert!(parse("{ name: x").is_err());
        assert!(parse("[a, b").is_err());
        assert!(parse("[a b]").is_err());
        assert!(parse("x y").is_err());
        assert!(parse("{ name: x, name: y }").is_err());
        assert!(parse("{ 'name': x }").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_pattern_depth: 2,
            ..Limits::default()
        };
        assert!(PatternParser::new("{ a: { b: c } }", &limits)
            .unwrap()
            .parse(&Shape::Any)
            .is_ok());
        let err = PatternParser::new("{ a: { b: { c: d } } }", &limits)
            .unwrap()
            .parse(&Shape::Any)
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}
