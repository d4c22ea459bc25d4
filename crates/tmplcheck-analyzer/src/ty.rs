//! Declared type expressions.
//!
//! [`TypeExpr`] is the parsed form of the type text in a `types` statement.
//! [`TypeParser`] implements the grammar:
//!
//! ```text
//! type     := '?'? postfix
//! postfix  := base '[]'?
//! base     := keyword | 'iterable' ('<' (key ',')? type '>')? | '\' name ('\' name)*
//! keyword  := string | number | boolean | null | object | mixed
//! key      := string | number
//! ```
//!
//! `bool`, `int` and `float` are accepted as deprecated aliases.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeSyntaxError;
use crate::metadata::TypeMetadataProvider;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// TypeExpr
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Iterable,
    Mixed,
}

impl BasicType {
    fn keyword(word: &str) -> Option<Self> {
        Some(match word {
            "string" => BasicType::String,
            "number" => BasicType::Number,
            "boolean" => BasicType::Boolean,
            "null" => BasicType::Null,
            "object" => BasicType::Object,
            "iterable" => BasicType::Iterable,
            "mixed" => BasicType::Mixed,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BasicType::String => "string",
            BasicType::Number => "number",
            BasicType::Boolean => "boolean",
            BasicType::Null => "null",
            BasicType::Object => "object",
            BasicType::Iterable => "iterable",
            BasicType::Mixed => "mixed",
        }
    }
}

/// A declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Basic(BasicType),
    /// `?T`; never nested.
    Nullable(Box<TypeExpr>),
    /// `iterable<V>`, `iterable<K, V>` or `V[]`.
    IterableOf {
        value: Box<TypeExpr>,
        key: Option<Box<TypeExpr>>,
    },
    /// `\Fully\Qualified\Name`, stored without the leading `\`.
    ClassRef(String),
}

impl TypeExpr {
    /// Parse a type, discarding deprecation notices.
    pub fn parse(text: &str) -> Result<Self, TypeSyntaxError> {
        TypeParser::new(text).parse()
    }

    pub fn mixed() -> Self {
        TypeExpr::Basic(BasicType::Mixed)
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, TypeExpr::Basic(BasicType::Mixed))
    }

    /// `?T` and `null` admit null; `mixed` is not treated as nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            TypeExpr::Nullable(_) | TypeExpr::Basic(BasicType::Null)
        )
    }

    /// `T` for `?T`, `self` otherwise.
    pub fn non_null(&self) -> &TypeExpr {
        match self {
            TypeExpr::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Scalars have no attributes.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeExpr::Basic(BasicType::String | BasicType::Number | BasicType::Boolean)
        )
    }

    /// Every class referenced anywhere in this type.
    pub fn class_refs(&self) -> Vec<&str> {
        match self {
            TypeExpr::Basic(_) => Vec::new(),
            TypeExpr::Nullable(inner) => inner.class_refs(),
            TypeExpr::IterableOf { value, key } => {
                let mut refs = value.class_refs();
                if let Some(key) = key {
                    refs.extend(key.class_refs());
                }
                refs
            }
            TypeExpr::ClassRef(name) => vec![name.as_str()],
        }
    }

    /// Valid if every referenced class is known to the provider.
    pub fn is_structurally_valid(&self, provider: &dyn TypeMetadataProvider) -> bool {
        self.class_refs()
            .into_iter()
            .all(|name| provider.type_exists(name))
    }

    /// Does a runtime value satisfy this type?
    pub fn matches(&self, value: &Value, provider: &dyn TypeMetadataProvider) -> bool {
        match self {
            TypeExpr::Basic(basic) => match basic {
                BasicType::String => match value {
                    Value::String(_) => true,
                    Value::Object { class, .. } => provider.is_stringable(class),
                    _ => false,
                },
                BasicType::Number => matches!(value, Value::Int(_) | Value::Float(_)),
                BasicType::Boolean => matches!(value, Value::Bool(_)),
                BasicType::Null => value.is_null(),
                BasicType::Object => matches!(value, Value::Object { .. }),
                BasicType::Iterable => value.is_iterable(),
                BasicType::Mixed => true,
            },
            TypeExpr::Nullable(inner) => value.is_null() || inner.matches(value, provider),
            TypeExpr::IterableOf {
                value: value_type,
                key,
            } => match value.entries() {
                Some(entries) => entries.iter().all(|(k, v)| {
                    value_type.matches(v, provider)
                        && key
                            .as_ref()
                            .is_none_or(|key_type| key_type.matches(&k.as_value(), provider))
                }),
                None => false,
            },
            TypeExpr::ClassRef(name) => match value {
                Value::Object { class, .. } => provider.is_subtype(class, name),
                _ => false,
            },
        }
    }
}

impl FromStr for TypeExpr {
    type Err = TypeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeExpr::parse(s)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Basic(basic) => write!(f, "{}", basic.as_str()),
            TypeExpr::Nullable(inner) => write!(f, "?{inner}"),
            TypeExpr::IterableOf { value, key: None } => write!(f, "iterable<{value}>"),
            TypeExpr::IterableOf {
                value,
                key: Some(key),
            } => write!(f, "iterable<{key}, {value}>"),
            TypeExpr::ClassRef(name) => write!(f, "\\{name}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeParser
// ══════════════════════════════════════════════════════════════════════════════

/// A deprecated alias found while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecation {
    pub alias: &'static str,
    pub replacement: &'static str,
}

const DEPRECATED_ALIASES: &[(&str, &str, BasicType)] = &[
    ("bool", "boolean", BasicType::Boolean),
    ("int", "number", BasicType::Number),
    ("float", "number", BasicType::Number),
];

/// Recursive-descent parser for declared types.
pub struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
    deprecations: Vec<Deprecation>,
}

impl<'a> TypeParser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            deprecations: Vec::new(),
        }
    }

    /// Parse the whole input as one type.
    pub fn parse(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        self.skip_ws();
        if self.at_end() {
            return Err(TypeSyntaxError::Empty);
        }
        let ty = self.parse_type()?;
        self.skip_ws();
        match self.peek() {
            None => Ok(ty),
            Some(c) => Err(self.unexpected(c)),
        }
    }

    /// Deprecated aliases encountered, in source order.
    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }

    fn parse_type(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        if self.eat('?') {
            if self.peek() == Some('?') {
                return Err(TypeSyntaxError::DoubleNullable);
            }
            let inner = self.parse_postfix()?;
            return Ok(TypeExpr::Nullable(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        let base = self.parse_base()?;
        if self.src[self.pos..].starts_with("[]") {
            self.pos += 2;
            return Ok(TypeExpr::IterableOf {
                value: Box::new(base),
                key: None,
            });
        }
        Ok(base)
    }

    fn parse_base(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        if self.peek() == Some('\\') {
            return self.parse_class_name();
        }

        let word = self.identifier();
        if word.is_empty() {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(TypeSyntaxError::UnexpectedEnd { expected: "a type" }),
            };
        }

        if word == "iterable" && self.peek() == Some('<') {
            return self.parse_generic();
        }
        if let Some(basic) = BasicType::keyword(word) {
            return Ok(TypeExpr::Basic(basic));
        }
        if let Some(&(alias, replacement, basic)) =
            DEPRECATED_ALIASES.iter().find(|(alias, ..)| *alias == word)
        {
            self.deprecations.push(Deprecation { alias, replacement });
            return Ok(TypeExpr::Basic(basic));
        }
        Err(TypeSyntaxError::UnknownKeyword(word.to_string()))
    }

    /// `<V>` or `<K, V>`, after `iterable`.
    fn parse_generic(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        self.bump();
        self.skip_ws();
        let first = self.parse_type()?;
        self.skip_ws();

        let (key, value) = if self.eat(',') {
            if !matches!(
                first,
                TypeExpr::Basic(BasicType::String | BasicType::Number)
            ) {
                return Err(TypeSyntaxError::InvalidKeyType(first.to_string()));
            }
            self.skip_ws();
            let value = self.parse_type()?;
            self.skip_ws();
            (Some(Box::new(first)), value)
        } else {
            (None, first)
        };

        if !self.eat('>') {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(TypeSyntaxError::UnexpectedEnd { expected: "'>'" }),
            };
        }
        Ok(TypeExpr::IterableOf {
            value: Box::new(value),
            key,
        })
    }

    fn parse_class_name(&mut self) -> Result<TypeExpr, TypeSyntaxError> {
        let start = self.pos;
        let mut segments = Vec::new();
        while self.eat('\\') {
            let segment = self.identifier();
            if segment.is_empty() || segment.starts_with(|c: char| c.is_ascii_digit()) {
                let end = self.pos;
                return Err(TypeSyntaxError::MalformedClassName(
                    self.src[start..end].to_string(),
                ));
            }
            segments.push(segment);
        }
        Ok(TypeExpr::ClassRef(segments.join("\\")))
    }

    // ── Scanning ──

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// `[A-Za-z0-9_]*`; callers check the first character.
    fn identifier(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn unexpected(&self, found: char) -> TypeSyntaxError {
        TypeSyntaxError::Unexpected {
            found,
            offset: self.pos,
        }
    }
}
