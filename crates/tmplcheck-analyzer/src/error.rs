//! Error types for the fallible, non-diagnostic operations of the analyzer.
//!
//! Analysis findings are [`tmplcheck_types::Diagnostic`] values; the enums
//! here cover the plumbing around them: type grammar, template loading and
//! decoding of configuration or metadata dumps.

use thiserror::Error;

/// A declared type string that does not follow the type grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeSyntaxError {
    #[error("empty type")]
    Empty,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unexpected end of type, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unknown type keyword '{0}'")]
    UnknownKeyword(String),
    #[error("nullable type cannot be nullable again")]
    DoubleNullable,
    #[error("iterable key type must be 'string' or 'number', found '{0}'")]
    InvalidKeyType(String),
    #[error("malformed class name '{0}'")]
    MalformedClassName(String),
}

/// Failure to hand out a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("template '{name}' could not be parsed: {reason}")]
    Parse { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid analyzer configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("analyzer configuration must be a JSON object")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid type metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("type '{0}' is described more than once")]
    Duplicate(String),
}
