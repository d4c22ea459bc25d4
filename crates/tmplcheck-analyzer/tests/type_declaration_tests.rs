//! Declared-type validation tests.
//!
//! Each test analyzes a template with a `types` statement and asserts on the
//! resulting type diagnostics.

mod common;

use common::*;
use tmplcheck_analyzer::{AnalyzerConfig, ArrayLoader, Inspection};
use tmplcheck_types::ast::{Expr, Stmt};
use tmplcheck_types::{DiagnosticCode, Severity};

fn declare(type_text: &str) -> tmplcheck_analyzer::AnalysisReport {
    analyze(&page(vec![Stmt::types(&[("foo", type_text)], 1)]))
}

// ══════════════════════════════════════════════════════════════════════════════
// Valid declarations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn basic_types_are_valid() {
    for ty in ["string", "number", "boolean", "null", "iterable", "object", "mixed"] {
        assert_clean(&declare(ty));
    }
}

#[test]
fn nullable_and_iterable_forms_are_valid() {
    for ty in [
        "?string",
        "string[]",
        "?number[]",
        "iterable<boolean>",
        "iterable<string, number>",
        "iterable<number, ?string>",
        "iterable<string, iterable<string>>",
        "iterable<iterable<iterable<string, number>>>",
    ] {
        assert_clean(&declare(ty));
    }
}

#[test]
fn known_classes_interfaces_traits_and_enums_are_valid() {
    for ty in [
        "\\App\\Widget",
        "?\\App\\Widget",
        "\\App\\Widget[]",
        "iterable<string, \\App\\Widget>",
        "\\Stringable",
        "\\App\\Traet",
        "\\App\\Enom",
    ] {
        assert_clean(&declare(ty));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Invalid declarations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn syntax_errors_are_reported() {
    for ty in [
        "??string",
        "strin",
        "iterable<string",
        "iterable<\\App\\Widget, string>",
        "iterable<boolean, string>",
        "App\\Widget",
        "string[][]",
        "",
    ] {
        let message = assert_only(&declare(ty), DiagnosticCode::INVALID_TYPE_SYNTAX);
        assert_eq!(
            message,
            format!("Invalid type '{ty}' for variable 'foo' (at page.twig:1)")
        );
    }
}

#[test]
fn unknown_class_is_reported() {
    let message = assert_only(&declare("\\App\\Nope"), DiagnosticCode::UNKNOWN_TYPE);
    assert_eq!(
        message,
        "Invalid type '\\App\\Nope' for variable 'foo' (at page.twig:1)"
    );
}

#[test]
fn unknown_class_nested_in_iterable_is_reported() {
    assert_only(
        &declare("iterable<string, \\App\\Nope[]>"),
        DiagnosticCode::UNKNOWN_TYPE,
    );
}

#[test]
fn every_declaration_is_checked() {
    let report = analyze(&page(vec![Stmt::types(
        &[("a", "strin"), ("b", "string"), ("c", "\\Nope")],
        3,
    )]));
    assert_eq!(report.diagnostics.total_errors, 2);
    assert_eq!(count_code(&report, DiagnosticCode::INVALID_TYPE_SYNTAX), 1);
    assert_eq!(count_code(&report, DiagnosticCode::UNKNOWN_TYPE), 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Deprecated aliases
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn deprecated_aliases_are_non_blocking() {
    for (alias, replacement) in [("bool", "boolean"), ("int", "number"), ("float", "number")] {
        let report = declare(alias);
        let message = assert_only(&report, DiagnosticCode::DEPRECATED_TYPE);
        assert_eq!(
            message,
            format!("Deprecated type '{alias}' used (at page.twig:1). Use '{replacement}' instead.")
        );
        assert_eq!(report.diagnostics.entries[0].severity, Severity::Deprecation);
        assert!(!report.has_errors());
    }
}

#[test]
fn deprecated_alias_inside_iterable_is_reported() {
    let report = declare("iterable<int, bool>");
    assert_eq!(count_code(&report, DiagnosticCode::DEPRECATED_TYPE), 2);
}

#[test]
fn deprecated_alias_still_declares_variable() {
    // `foo` is a number, so dot access on it is invalid.
    let report = analyze(&page(vec![
        Stmt::types(&[("foo", "int")], 1),
        Stmt::print(Expr::attr(
            Expr::name("foo", 2),
            "bar",
        )),
    ]));
    assert_code(&report, DiagnosticCode::INVALID_ATTRIBUTE_ACCESS);
}

// ══════════════════════════════════════════════════════════════════════════════
// Configuration
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn disabled_inspection_reports_nothing() {
    let report = analyze_with(
        AnalyzerConfig::default().without(Inspection::InvalidTypes),
        &ArrayLoader::new(),
        &page(vec![Stmt::types(&[("foo", "strin"), ("bar", "int")], 1)]),
    );
    assert_clean(&report);
}

#[test]
fn types_in_macros_are_checked_too() {
    let report = analyze(&page(vec![Stmt::macro_decl(
        "marco",
        vec![],
        vec![Stmt::types(&[("foo", "\\App\\Nope")], 2)],
        1,
    )]));
    let message = assert_only(&report, DiagnosticCode::UNKNOWN_TYPE);
    assert!(message.ends_with("(at page.twig:2)"));
}
