//! Import resolution tests: namespaces, from-imports, cycles and failures.

mod common;

use common::*;
use tmplcheck_analyzer::{
    AnalyzerConfig, Analyzer, ArrayLoader, JsonLoader, TemplateLoader,
};
use tmplcheck_types::ast::{
    Argument, Expr, Ident, Import, ImportKind, MacroParam, Module, Stmt,
};
use tmplcheck_types::{DiagnosticCode, Severity, Span};

/// `macros.twig` declaring `field(name, value = null)`.
fn macros_template() -> Module {
    Module::new(
        "macros.twig",
        vec![Stmt::macro_decl(
            "field",
            vec![
                MacroParam::required("name", 1),
                MacroParam::optional("value", Expr::null(1)),
            ],
            vec![],
            1,
        )],
    )
}

fn loader() -> ArrayLoader {
    ArrayLoader::new().with(macros_template())
}

fn args(n: usize, line: u32) -> Vec<Argument> {
    (0..n)
        .map(|i| Argument::positional(Expr::string(format!("arg{i}"), line)))
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Namespace imports
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn namespace_call_is_validated_against_imported_signature() {
    let module = page(vec![
        Stmt::import("macros.twig", "forms", 1),
        Stmt::print(Expr::namespace_call("forms", "field", args(1, 2), 2)),
        Stmt::print(Expr::namespace_call("forms", "field", args(3, 3), 3)),
    ]);
    let message = assert_only(&analyze_in(&loader(), &module), DiagnosticCode::TOO_MANY_ARGUMENTS);
    assert_eq!(message, "Too many arguments (3) for macro 'field' (at page.twig:3)");
}

#[test]
fn unknown_macro_in_namespace_is_reported() {
    let module = page(vec![
        Stmt::import("macros.twig", "forms", 1),
        Stmt::print(Expr::namespace_call("forms", "input", args(1, 2), 2)),
    ]);
    let message = assert_only(&analyze_in(&loader(), &module), DiagnosticCode::UNKNOWN_MACRO);
    assert_eq!(message, "Unknown macro 'input' (at page.twig:2)");
}

#[test]
fn call_through_undeclared_namespace_is_unknown() {
    let module = page(vec![Stmt::print(Expr::namespace_call(
        "forms",
        "field",
        args(1, 1),
        1,
    ))]);
    assert_only(&analyze(&module), DiagnosticCode::UNKNOWN_MACRO);
}

#[test]
fn self_namespace_import_resolves_local_macros() {
    let module = page(vec![
        Stmt::Import(Import {
            template: Expr::name("_self", 1),
            kind: ImportKind::Namespace(Ident::at("me", 1)),
            span: Span::line(1),
        }),
        Stmt::macro_decl("hello", vec![MacroParam::required("who", 2)], vec![], 2),
        Stmt::print(Expr::namespace_call("me", "hello", args(1, 3), 3)),
        Stmt::print(Expr::namespace_call("me", "hello", args(0, 4), 4)),
    ]);
    let message = assert_only(&analyze(&module), DiagnosticCode::TOO_FEW_ARGUMENTS);
    assert!(message.ends_with("(at page.twig:4)"));
}

#[test]
fn import_inside_macro_is_visible_module_wide() {
    let module = page(vec![
        Stmt::macro_decl(
            "wrapper",
            vec![],
            vec![Stmt::import("macros.twig", "forms", 2)],
            1,
        ),
        Stmt::print(Expr::namespace_call("forms", "field", args(0, 4), 4)),
    ]);
    assert_only(&analyze_in(&loader(), &module), DiagnosticCode::TOO_FEW_ARGUMENTS);
}

// ══════════════════════════════════════════════════════════════════════════════
// From-imports
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn from_import_binds_alias() {
    let module = page(vec![
        Stmt::from_import("macros.twig", &[("field", Some("f"))], 1),
        Stmt::print(Expr::imported_call("f", args(2, 2), 2)),
        Stmt::print(Expr::imported_call("f", args(0, 3), 3)),
    ]);
    let report = analyze_in(&loader(), &module);
    let message = assert_only(&report, DiagnosticCode::TOO_FEW_ARGUMENTS);
    // Messages use the name the template called.
    assert_eq!(message, "Too few arguments (0) for macro 'f' (at page.twig:3)");
}

#[test]
fn from_import_of_missing_macro_leaves_name_unknown() {
    let module = page(vec![
        Stmt::from_import("macros.twig", &[("input", None)], 1),
        Stmt::print(Expr::imported_call("input", args(1, 2), 2)),
    ]);
    assert_only(&analyze_in(&loader(), &module), DiagnosticCode::UNKNOWN_MACRO);
}

#[test]
fn local_macro_shadows_imported_one() {
    let module = page(vec![
        Stmt::from_import("macros.twig", &[("field", None)], 1),
        Stmt::macro_decl("field", vec![], vec![], 2),
        // Valid for the imported signature, too many for the local one.
        Stmt::print(Expr::imported_call("field", args(1, 3), 3)),
    ]);
    assert_only(&analyze_in(&loader(), &module), DiagnosticCode::TOO_MANY_ARGUMENTS);
}

// ══════════════════════════════════════════════════════════════════════════════
// Cycles and caching
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn self_import_by_name_terminates() {
    let module = page(vec![
        Stmt::import(TEMPLATE, "me", 1),
        Stmt::macro_decl("hello", vec![MacroParam::required("who", 2)], vec![], 2),
        Stmt::print(Expr::namespace_call("me", "hello", args(2, 3), 3)),
    ]);
    let loader = ArrayLoader::new().with(module.clone());
    let message = assert_only(&analyze_in(&loader, &module), DiagnosticCode::TOO_MANY_ARGUMENTS);
    assert!(message.ends_with("(at page.twig:3)"));
}

#[test]
fn transitive_cycle_terminates_without_duplicates() {
    let a = Module::new(
        "a.twig",
        vec![
            Stmt::import("b.twig", "b", 1),
            Stmt::macro_decl("from_a", vec![], vec![], 2),
            Stmt::print(Expr::namespace_call("b", "from_b", args(1, 3), 3)),
        ],
    );
    let b = Module::new(
        "b.twig",
        vec![
            Stmt::import("a.twig", "a", 1),
            Stmt::macro_decl("from_b", vec![], vec![], 2),
            Stmt::print(Expr::namespace_call("a", "from_a", args(1, 3), 3)),
        ],
    );
    let loader = ArrayLoader::new().with(a.clone()).with(b);
    let report = analyze_in(&loader, &a);

    let mut messages = report.diagnostics.messages();
    messages.sort_unstable();
    assert_eq!(
        messages,
        vec![
            "Too many arguments (1) for macro 'from_a' (at b.twig:3)",
            "Too many arguments (1) for macro 'from_b' (at a.twig:3)",
        ]
    );
}

#[test]
fn shared_import_is_analyzed_once() {
    let broken = Module::new(
        "broken.twig",
        vec![Stmt::types(&[("x", "strin")], 1)],
    );
    let module = page(vec![
        Stmt::import("broken.twig", "one", 1),
        Stmt::import("broken.twig", "two", 2),
        Stmt::from_import("broken.twig", &[("nothing", None)], 3),
    ]);
    let loader = ArrayLoader::new().with(broken);
    let message = assert_only(&analyze_in(&loader, &module), DiagnosticCode::INVALID_TYPE_SYNTAX);
    assert_eq!(message, "Invalid type 'strin' for variable 'x' (at broken.twig:1)");
}

#[test]
fn analyses_do_not_share_state() {
    let registry = registry();
    let loader = loader();
    let mut analyzer = Analyzer::new(AnalyzerConfig::default(), &loader, &registry);

    let first = page(vec![
        Stmt::macro_decl("marco", vec![], vec![], 1),
        Stmt::print(Expr::self_call("marco", vec![], 2)),
    ]);
    assert_clean(&analyzer.analyze(&first));

    let second = page(vec![Stmt::print(Expr::self_call("marco", vec![], 1))]);
    assert_only(&analyzer.analyze(&second), DiagnosticCode::UNKNOWN_MACRO);
}

// ══════════════════════════════════════════════════════════════════════════════
// Unresolvable imports
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn missing_template_is_a_warning_and_calls_are_skipped() {
    let module = page(vec![
        Stmt::import("nope.twig", "forms", 1),
        Stmt::from_import("nope.twig", &[("field", None)], 2),
        Stmt::print(Expr::namespace_call("forms", "anything", args(9, 3), 3)),
        Stmt::print(Expr::imported_call("field", vec![], 4)),
    ]);
    let report = analyze(&module);

    assert!(!report.has_errors(), "got:\n{}", describe(&report));
    assert_eq!(report.diagnostics.len(), 2);
    let first = &report.diagnostics.entries[0];
    assert_eq!(first.code, DiagnosticCode::UNRESOLVED_IMPORT);
    assert_eq!(first.severity, Severity::Warning);
    assert_eq!(
        first.message,
        "Unable to load imported template 'nope.twig': template 'nope.twig' not found (at page.twig:1)"
    );
    assert!(report.diagnostics.entries[1]
        .message
        .ends_with("(at page.twig:2)"));
}

#[test]
fn undecodable_template_is_a_warning() {
    let loader = JsonLoader::new().with("macros.twig", "{not json");
    assert!(loader.load("macros.twig").is_err());

    let registry = registry();
    let module = page(vec![Stmt::import("macros.twig", "forms", 1)]);
    let report = Analyzer::new(AnalyzerConfig::default(), &loader, &registry).analyze(&module);
    let message = assert_only(&report, DiagnosticCode::UNRESOLVED_IMPORT);
    assert!(message.contains("could not be parsed"));
}

#[test]
fn json_loader_serves_serialized_templates() {
    let json = serde_json::to_string(&macros_template()).unwrap();
    let loader = JsonLoader::new().with("macros.twig", json);
    let registry = registry();
    let module = page(vec![
        Stmt::from_import("macros.twig", &[("field", None)], 1),
        Stmt::print(Expr::imported_call("field", args(3, 2), 2)),
    ]);
    let report = Analyzer::new(AnalyzerConfig::default(), &loader, &registry).analyze(&module);
    assert_only(&report, DiagnosticCode::TOO_MANY_ARGUMENTS);
}

#[test]
fn dynamic_import_is_opaque() {
    let module = page(vec![
        Stmt::set(&["theme"], vec![Expr::string("macros.twig", 1)], 1),
        Stmt::from_import_expr(Expr::name("theme", 2), &[("field", None)], 2),
        Stmt::print(Expr::imported_call("field", args(7, 3), 3)),
    ]);
    assert_clean(&analyze(&module));
}
