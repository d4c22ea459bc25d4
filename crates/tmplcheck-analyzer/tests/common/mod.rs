//! Shared fixtures for the analyzer integration tests.

#![allow(dead_code)]

use tmplcheck_analyzer::metadata::Visibility;
use tmplcheck_analyzer::{
    AnalysisReport, Analyzer, AnalyzerConfig, ArrayLoader, ClassRegistry, TypeInfo,
};
use tmplcheck_types::ast::Module;
use tmplcheck_types::{Diagnostic, DiagnosticCode};

pub const TEMPLATE: &str = "page.twig";

/// Types the templates under test refer to.
pub fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with(TypeInfo::class("App\\Widget").property("attr", Visibility::Public))
        .with(
            TypeInfo::class("App\\Dummy")
                .property("pubProp", Visibility::Public)
                .property("protProp", Visibility::Protected)
                .property("privProp", Visibility::Private)
                .virtual_property("magic")
                .method("pubMeth", Visibility::Public)
                .method("protMeth", Visibility::Protected)
                .method("privMeth", Visibility::Private)
                .method("getGit", Visibility::Public)
                .method("isIz", Visibility::Public)
                .method("hasHaz", Visibility::Public)
                .constant("LIMIT"),
        )
        .with(TypeInfo::enumeration("App\\Enom", &["This", "That"]))
        .with(TypeInfo::trait_named("App\\Traet"))
        .with(TypeInfo::class("App\\Traeted").uses("App\\Traet"))
        .with(TypeInfo::interface("Stringable"))
        .with(TypeInfo::class("App\\Markup").extends("Stringable"))
        .with(TypeInfo::class("Exception").method("__toString", Visibility::Public))
        .with_constant("PHP_EOL")
        .with_constant("DATE_ATOM")
}

pub fn analyze_with(config: AnalyzerConfig, loader: &ArrayLoader, module: &Module) -> AnalysisReport {
    let registry = registry();
    Analyzer::new(config, loader, &registry).analyze(module)
}

pub fn analyze_in(loader: &ArrayLoader, module: &Module) -> AnalysisReport {
    analyze_with(AnalyzerConfig::default(), loader, module)
}

pub fn analyze(module: &Module) -> AnalysisReport {
    analyze_in(&ArrayLoader::new(), module)
}

pub fn describe(report: &AnalysisReport) -> String {
    report
        .diagnostics
        .entries
        .iter()
        .map(|d: &Diagnostic| format!("  [{}] {}", d.code, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assert_clean(report: &AnalysisReport) {
    assert!(
        report.diagnostics.is_empty(),
        "expected no diagnostics, got {}:\n{}",
        report.diagnostics.len(),
        describe(report)
    );
}

pub fn count_code(report: &AnalysisReport, code: DiagnosticCode) -> usize {
    report.diagnostics.count(code)
}

pub fn assert_code(report: &AnalysisReport, code: DiagnosticCode) {
    assert!(
        count_code(report, code) > 0,
        "expected diagnostic {code}, got:\n{}",
        describe(report)
    );
}

/// Exactly one diagnostic overall, carrying `code`; returns its message.
pub fn assert_only(report: &AnalysisReport, code: DiagnosticCode) -> String {
    assert_eq!(
        report.diagnostics.len(),
        1,
        "expected exactly one {code}, got:\n{}",
        describe(report)
    );
    let d = &report.diagnostics.entries[0];
    assert_eq!(d.code, code, "got:\n{}", describe(report));
    d.message.clone()
}

pub fn page(body: Vec<tmplcheck_types::ast::Stmt>) -> Module {
    Module::new(TEMPLATE, body)
}
