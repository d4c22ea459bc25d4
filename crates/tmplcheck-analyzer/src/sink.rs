//! Logger-backed diagnostic reporting.

use tmplcheck_types::{Diagnostic, DiagnosticSink, Severity};

/// Emits every diagnostic as a `tracing` event, then hands it to `inner`.
///
/// Errors log at `error`, warnings at `warn`, deprecations at `info`.
#[derive(Debug, Default)]
pub struct TracingSink<S> {
    inner: S,
}

impl<S: DiagnosticSink> TracingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for TracingSink<S> {
    fn report(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code;
        let location = &diagnostic.location;
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(%code, %location, "{}", diagnostic.message);
            }
            Severity::Warning => {
                tracing::warn!(%code, %location, "{}", diagnostic.message);
            }
            Severity::Deprecation => {
                tracing::info!(%code, %location, "{}", diagnostic.message);
            }
        }
        self.inner.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmplcheck_types::{DiagnosticCode, Diagnostics, Location};

    #[test]
    fn test_forwards_in_order() {
        let mut sink = TracingSink::new(Diagnostics::empty());
        let loc = Location::new("page.twig", 1);
        sink.report(Diagnostic::deprecation(DiagnosticCode::DEPRECATED_TYPE, "a", loc.clone()));
        sink.report(Diagnostic::error(DiagnosticCode::UNKNOWN_MACRO, "b", loc.clone()));
        sink.report(Diagnostic::warning(DiagnosticCode::UNDECLARED_VARIABLE, "c", loc));
        assert_eq!(sink.inner().len(), 3);
        let diags = sink.into_inner();
        assert_eq!(diags.messages(), vec!["a", "b", "c"]);
        assert_eq!(diags.total_errors, 1);
    }

    #[test]
    fn test_wraps_borrowed_sink() {
        let mut diags = Diagnostics::empty();
        {
            let mut sink = TracingSink::new(&mut diags);
            sink.report(Diagnostic::error(
                DiagnosticCode::TOO_FEW_ARGUMENTS,
                "x",
                Location::unknown(),
            ));
        }
        assert!(diags.has_errors());
    }
}
