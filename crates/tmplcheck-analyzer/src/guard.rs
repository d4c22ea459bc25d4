//! Render-time guards for declared variable contracts.
//!
//! [`synthesize`] turns a `types` statement into guards, [`instrument`]
//! attaches them to a module, and [`evaluate`] / [`check_template`] run them
//! against a render context the way compiled templates do.

use tmplcheck_types::ast::{
    Guard, GuardCheck, GuardedTypes, IfBranch, IfStmt, Loop, MacroDecl, Module, Stmt,
    TypeAnnotation,
};
use tmplcheck_types::{Diagnostic, DiagnosticCode, Diagnostics, Location};

use crate::metadata::TypeMetadataProvider;
use crate::ty::TypeExpr;
use crate::value::Context;

// ══════════════════════════════════════════════════════════════════════════════
// Synthesis
// ══════════════════════════════════════════════════════════════════════════════

/// Guards for every declaration, in declaration order:
/// existence unless optional, non-null unless nullable, type match unless
/// the type is exactly `mixed`.
pub fn synthesize(annotation: &TypeAnnotation) -> Vec<Guard> {
    let mut guards = Vec::new();
    for decl in &annotation.mapping {
        let variable = &decl.name.name;
        let parsed = TypeExpr::parse(&decl.type_text).ok();
        let nullable = match &parsed {
            Some(ty) => ty.is_nullable(),
            None => decl.type_text.trim_start().starts_with('?'),
        };
        let mixed = parsed.as_ref().is_some_and(TypeExpr::is_mixed);

        if !decl.optional {
            guards.push(Guard {
                variable: variable.clone(),
                check: GuardCheck::Exists,
            });
        }
        if !nullable {
            guards.push(Guard {
                variable: variable.clone(),
                check: GuardCheck::NotNull,
            });
        }
        if !mixed {
            guards.push(Guard {
                variable: variable.clone(),
                check: GuardCheck::Matches {
                    type_text: decl.type_text.clone(),
                },
            });
        }
    }
    guards
}

/// A copy of `module` with every `types` statement, at any depth, wrapped
/// together with its guards.
pub fn instrument(module: &Module) -> Module {
    Module {
        name: module.name.clone(),
        body: instrument_block(&module.body),
        span: module.span,
    }
}

fn instrument_block(body: &[Stmt]) -> Vec<Stmt> {
    body.iter().map(instrument_stmt).collect()
}

fn instrument_stmt(stmt: &Stmt) -> Stmt {
    match stmt {
        Stmt::Types(annotation) => Stmt::Guarded(GuardedTypes {
            types: annotation.clone(),
            guards: synthesize(annotation),
        }),
        Stmt::For(l) => Stmt::For(Loop {
            body: instrument_block(&l.body),
            else_body: instrument_block(&l.else_body),
            ..l.clone()
        }),
        Stmt::If(i) => Stmt::If(IfStmt {
            branches: i
                .branches
                .iter()
                .map(|b| IfBranch {
                    condition: b.condition.clone(),
                    body: instrument_block(&b.body),
                })
                .collect(),
            else_body: instrument_block(&i.else_body),
            span: i.span,
        }),
        Stmt::Macro(m) => Stmt::Macro(MacroDecl {
            body: instrument_block(&m.body),
            ..m.clone()
        }),
        other => other.clone(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Evaluation
// ══════════════════════════════════════════════════════════════════════════════

/// Run guards against a context. Every guard runs; each failure is one
/// error diagnostic.
pub fn evaluate(
    guards: &[Guard],
    context: &Context,
    provider: &dyn TypeMetadataProvider,
    location: &Location,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for guard in guards {
        let name = &guard.variable;
        let value = context.get(name);
        let failure = match &guard.check {
            GuardCheck::Exists if value.is_none() => Some((
                DiagnosticCode::MISSING_VARIABLE,
                format!("Non-optional variable '{name}' is not set"),
            )),
            GuardCheck::NotNull if value.is_some_and(|v| v.is_null()) => Some((
                DiagnosticCode::NULL_VARIABLE,
                format!("Non-nullable variable '{name}' is null"),
            )),
            GuardCheck::Matches { type_text } => match value {
                Some(v) if !v.is_null() && !type_matches(type_text, v, provider) => Some((
                    DiagnosticCode::TYPE_MISMATCH,
                    format!("Type for variable '{name}' does not match"),
                )),
                _ => None,
            },
            _ => None,
        };
        if let Some((code, message)) = failure {
            let actual = value.map_or("unset", |v| v.type_name());
            tracing::trace!(variable = %name, %code, actual, "guard failed");
            out.push(Diagnostic::error(code, message, location.clone()));
        }
    }
    out
}

/// Malformed types were reported at declaration time and match anything.
fn type_matches(
    type_text: &str,
    value: &crate::value::Value,
    provider: &dyn TypeMetadataProvider,
) -> bool {
    TypeExpr::parse(type_text).map_or(true, |ty| ty.matches(value, provider))
}

/// Run the guard blocks at the top level of an instrumented module.
pub fn check_template(
    module: &Module,
    context: &Context,
    provider: &dyn TypeMetadataProvider,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::empty();
    for stmt in &module.body {
        if let Stmt::Guarded(guarded) = stmt {
            let location = guarded.types.span.at(module.name.as_str());
            for d in evaluate(&guarded.guards, context, provider, &location) {
                diagnostics.push(d);
            }
        }
    }
    diagnostics
}
