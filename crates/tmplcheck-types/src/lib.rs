//! Shared types for tmplcheck.
//!
//! This crate defines the template AST handed over by the parser, source
//! spans, and the diagnostics model used by the analyzer and by the
//! render-time guards.

mod diagnostic;
mod span;
pub mod ast;

pub use diagnostic::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Diagnostics, Severity};
pub use span::{Location, Span};
