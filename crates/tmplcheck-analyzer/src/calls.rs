//! Macro declaration and call-site checks.

use tmplcheck_types::ast::MacroCall;
use tmplcheck_types::{Diagnostic, DiagnosticCode, Location};

use crate::config::{AnalyzerConfig, Inspection};
use crate::macros::MacroSignature;

/// Check a call against the signature it resolved to: argument count and
/// named-argument validity. Messages use the name as written at the call
/// site, which differs from `sig.name` under a `from ... import x as y` alias.
pub fn validate_call(
    call: &MacroCall,
    sig: &MacroSignature,
    config: &AnalyzerConfig,
    location: &Location,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let n = call.arguments.len();

    if config.is_enabled(Inspection::BadArgumentCount) {
        if !sig.accepts_varargs && n > sig.param_count() {
            out.push(Diagnostic::error(
                DiagnosticCode::TOO_MANY_ARGUMENTS,
                format!("Too many arguments ({n}) for macro '{}' (at {location})", call.name),
                location.clone(),
            ));
        }
        if n < sig.required_count() {
            out.push(Diagnostic::error(
                DiagnosticCode::TOO_FEW_ARGUMENTS,
                format!("Too few arguments ({n}) for macro '{}' (at {location})", call.name),
                location.clone(),
            ));
        }
    }

    if config.is_enabled(Inspection::InvalidNamedArgument) {
        let invalid: Vec<&str> = call
            .arguments
            .iter()
            .filter_map(|a| a.name.as_deref())
            .filter(|name| !sig.declares(name))
            .collect();
        if !invalid.is_empty() {
            out.push(Diagnostic::error(
                DiagnosticCode::INVALID_NAMED_ARGUMENT,
                format!(
                    "Invalid named macro argument(s) {} (at {location})",
                    invalid.join(", ")
                ),
                location.clone(),
            ));
        }
    }

    out
}

/// A positional argument after a named one, reported once per call.
pub fn check_argument_order(call: &MacroCall, location: &Location) -> Option<Diagnostic> {
    let mut named_seen = false;
    for arg in &call.arguments {
        if arg.is_named() {
            named_seen = true;
        } else if named_seen {
            return Some(Diagnostic::error(
                DiagnosticCode::POSITIONAL_AFTER_NAMED,
                format!("Positional macro argument after named (at {location})"),
                location.clone(),
            ));
        }
    }
    None
}

/// A required parameter declared after an optional one. Only the first
/// offender is reported.
pub fn check_declaration(sig: &MacroSignature, location: &Location) -> Option<Diagnostic> {
    let param = sig.first_required_after_optional()?;
    Some(Diagnostic::warning(
        DiagnosticCode::REQUIRED_AFTER_OPTIONAL,
        format!(
            "Macro '{}' argument '{}' is required, but previous isn't (at {location})",
            sig.name, param.name
        ),
        location.clone(),
    ))
}
