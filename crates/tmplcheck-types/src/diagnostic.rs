use crate::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
///
/// Only `Error` is blocking. `Deprecation` is reported like a warning but
/// kept distinct so tooling can filter it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Deprecation,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Deprecation => write!(f, "deprecation"),
        }
    }
}

/// Diagnostic category, determined by code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Type,
    Macro,
    Scope,
    Access,
    Import,
    Guard,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type"),
            Self::Macro => write!(f, "macro"),
            Self::Scope => write!(f, "scope"),
            Self::Access => write!(f, "access"),
            Self::Import => write!(f, "import"),
            Self::Guard => write!(f, "guard"),
        }
    }
}

/// Numeric diagnostic code (Q100–Q699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagnosticCode(pub u16);

impl DiagnosticCode {
    // ── Declared types (Q100–Q199) ──
    pub const INVALID_TYPE_SYNTAX: Self = Self(100);
    pub const DEPRECATED_TYPE: Self = Self(101);
    pub const UNKNOWN_TYPE: Self = Self(102);

    // ── Macros (Q200–Q299) ──
    pub const UNKNOWN_MACRO: Self = Self(200);
    pub const TOO_MANY_ARGUMENTS: Self = Self(201);
    pub const TOO_FEW_ARGUMENTS: Self = Self(202);
    pub const INVALID_NAMED_ARGUMENT: Self = Self(203);
    pub const POSITIONAL_AFTER_NAMED: Self = Self(204);
    pub const REQUIRED_AFTER_OPTIONAL: Self = Self(205);

    // ── Scope (Q300–Q399) ──
    pub const UNDECLARED_VARIABLE: Self = Self(300);

    // ── Member access (Q400–Q499) ──
    pub const INVALID_ATTRIBUTE_ACCESS: Self = Self(400);
    pub const INVALID_ENUM_CASE: Self = Self(401);
    pub const INVALID_CONSTANT: Self = Self(402);

    // ── Imports (Q500–Q599) ──
    pub const UNRESOLVED_IMPORT: Self = Self(500);

    // ── Render-time guards (Q600–Q699) ──
    pub const MISSING_VARIABLE: Self = Self(600);
    pub const NULL_VARIABLE: Self = Self(601);
    pub const TYPE_MISMATCH: Self = Self(602);

    /// Get the category for this code.
    pub fn category(self) -> Category {
        match self.0 {
            100..=199 => Category::Type,
            200..=299 => Category::Macro,
            300..=399 => Category::Scope,
            400..=499 => Category::Access,
            500..=599 => Category::Import,
            600..=699 => Category::Guard,
            _ => Category::Type, // fallback
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

/// A single finding produced by the analyzer or by a render-time guard.
///
/// The message text is stable so tooling can pattern-match on it; the
/// location suffix `(at path:line)` is part of the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{location}: {code} [{category}] {message}")]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    pub fn new(
        code: DiagnosticCode,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            code,
            severity,
            category: code.category(),
            message: message.into(),
            location,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(code, Severity::Error, message, location)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(code, Severity::Warning, message, location)
    }

    pub fn deprecation(
        code: DiagnosticCode,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self::new(code, Severity::Deprecation, message, location)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Anything that accepts diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Append-only collection of diagnostics for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entries: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.total_errors += 1;
        } else {
            self.total_warnings += 1;
        }
        self.entries.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error())
    }

    /// All diagnostics carrying `code`, in report order.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.with_code(code).count()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.message.as_str()).collect()
    }

    /// Move every entry of `other` into this collection.
    pub fn extend(&mut self, other: Diagnostics) {
        for d in other.entries {
            self.push(d);
        }
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}
