//! Template contract checker: walks a template AST and validates it.
//!
//! Entry point: [`Analyzer::analyze_into`].
//!
//! Each module is handled in two passes. The pre-pass collects the macros
//! the module declares, publishes them to the run's import cache and
//! resolves its imports (recursively analyzing imported templates). The
//! validating walk then runs with a complete macro registry, so calls may
//! appear before the macros they target.
//!
//! Diagnostics emitted:
//! - Q100–Q102: declared types
//! - Q200–Q205: macro calls and declarations
//! - Q300: undeclared variable inside a macro
//! - Q400–Q402: attribute access, enum cases, `constant()`
//! - Q500: unresolved import

use std::rc::Rc;

use tmplcheck_types::ast::*;
use tmplcheck_types::{Diagnostic, DiagnosticCode, DiagnosticSink, Location, Span};

use crate::attribute;
use crate::calls;
use crate::config::{AnalyzerConfig, Inspection};
use crate::env::{ScopeKind, TypeEnv};
use crate::guard;
use crate::imports::{Cached, ImportCache, ImportSource, TemplateLoader};
use crate::macros::{
    collect_macros, ImportedMacro, ImportedNamespace, MacroRegistry, MacroSignature, MacroTable,
    Resolution, VARARGS,
};
use crate::metadata::TypeMetadataProvider;
use crate::ty::{TypeExpr, TypeParser};

// ══════════════════════════════════════════════════════════════════════════════
// Analyzer
// ══════════════════════════════════════════════════════════════════════════════

/// Runs analyses. Per-run state is reset at the start of every top-level
/// analysis; nothing carries over between runs.
pub struct Analyzer<'a> {
    config: AnalyzerConfig,
    loader: &'a dyn TemplateLoader,
    provider: &'a dyn TypeMetadataProvider,
    cache: ImportCache,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        config: AnalyzerConfig,
        loader: &'a dyn TemplateLoader,
        provider: &'a dyn TypeMetadataProvider,
    ) -> Self {
        Self {
            config,
            loader,
            provider,
            cache: ImportCache::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze `module` (and everything it imports), reporting into `sink`.
    ///
    /// Returns the module as the compiler should see it: instrumented with
    /// guards when type assertions are enabled, unchanged otherwise.
    pub fn analyze_into(&mut self, module: &Module, sink: &mut dyn DiagnosticSink) -> Module {
        self.cache.reset();
        self.check_module(&module.name, module, sink);
        tracing::debug!(
            template = %module.name,
            visited = self.cache.visited(),
            "analysis finished"
        );

        if self.config.is_enabled(Inspection::TypeAssertions) {
            guard::instrument(module)
        } else {
            module.clone()
        }
    }

    #[tracing::instrument(skip(self, module, sink), fields(path = %module.name))]
    fn check_module(
        &mut self,
        name: &str,
        module: &Module,
        sink: &mut dyn DiagnosticSink,
    ) -> Rc<MacroTable> {
        let local = Rc::new(collect_macros(&module.body));
        tracing::trace!(macros = local.len(), "collected macros");

        self.cache.publish(name, Rc::clone(&local));
        self.cache.begin(name);

        let mut registry = MacroRegistry::new(Rc::clone(&local));
        self.resolve_imports(module, &module.body, &mut registry, sink);

        let mut checker = ModuleChecker::new(&self.config, self.provider, registry, &module.name);
        checker.check_body(&module.body);
        for diagnostic in checker.finish() {
            sink.report(diagnostic);
        }

        self.cache.finish(name);
        local
    }

    /// Register every import found in `body`, at any depth.
    fn resolve_imports(
        &mut self,
        module: &Module,
        body: &[Stmt],
        registry: &mut MacroRegistry,
        sink: &mut dyn DiagnosticSink,
    ) {
        for stmt in body {
            match stmt {
                Stmt::Import(import) => self.resolve_import(module, import, registry, sink),
                Stmt::For(l) => {
                    self.resolve_imports(module, &l.body, registry, sink);
                    self.resolve_imports(module, &l.else_body, registry, sink);
                }
                Stmt::If(i) => {
                    for branch in &i.branches {
                        self.resolve_imports(module, &branch.body, registry, sink);
                    }
                    self.resolve_imports(module, &i.else_body, registry, sink);
                }
                Stmt::Macro(m) => self.resolve_imports(module, &m.body, registry, sink),
                _ => {}
            }
        }
    }

    fn resolve_import(
        &mut self,
        module: &Module,
        import: &Import,
        registry: &mut MacroRegistry,
        sink: &mut dyn DiagnosticSink,
    ) {
        let table = match ImportSource::of(&import.template) {
            ImportSource::Named(name) => {
                let location = import.span.at(module.name.as_str());
                self.import_template(&name, &location, sink)
            }
            ImportSource::SelfRef => Some(Rc::clone(registry.local())),
            ImportSource::Dynamic => {
                tracing::trace!(line = import.span.line, "dynamic import, treated as opaque");
                None
            }
        };

        match &import.kind {
            ImportKind::Namespace(alias) => {
                let namespace = match table {
                    Some(table) => ImportedNamespace::Resolved(table),
                    None => ImportedNamespace::Opaque,
                };
                registry.import_namespace(&alias.name, namespace);
            }
            ImportKind::Names(names) => {
                for imported in names {
                    let entry = match &table {
                        None => Some(ImportedMacro::Opaque),
                        Some(table) => table
                            .get(&imported.name.name)
                            .map(|sig| ImportedMacro::Resolved(sig.clone())),
                    };
                    if let Some(entry) = entry {
                        registry.import_macro(imported.local_name(), entry);
                    }
                }
            }
        }
    }

    /// Macro table of an imported template, analyzing it on first use.
    fn import_template(
        &mut self,
        name: &str,
        location: &Location,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Rc<MacroTable>> {
        let failure = match self.cache.get(name) {
            Cached::Ready(table) => {
                if self.cache.is_in_flight(name) {
                    tracing::trace!(template = name, "import cycle, reusing published macros");
                } else {
                    tracing::trace!(template = name, "import cache hit");
                }
                return Some(table);
            }
            Cached::Failed(err) => err,
            Cached::Missing => {
                tracing::debug!(template = name, "loading imported template");
                match self.loader.load(name) {
                    Ok(imported) => return Some(self.check_module(name, &imported, sink)),
                    Err(err) => {
                        tracing::warn!(template = name, error = %err, "import failed");
                        self.cache.record_failure(name, err.clone());
                        err
                    }
                }
            }
        };

        sink.report(Diagnostic::warning(
            DiagnosticCode::UNRESOLVED_IMPORT,
            format!("Unable to load imported template '{name}': {failure} (at {location})"),
            location.clone(),
        ));
        None
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ModuleChecker
// ══════════════════════════════════════════════════════════════════════════════

/// Validating walk over a single module.
struct ModuleChecker<'a> {
    config: &'a AnalyzerConfig,
    provider: &'a dyn TypeMetadataProvider,
    registry: MacroRegistry,
    path: &'a str,
    env: TypeEnv,
    /// Name of the macro being walked.
    current_macro: Option<String>,
    out: Vec<Diagnostic>,
}

impl<'a> ModuleChecker<'a> {
    fn new(
        config: &'a AnalyzerConfig,
        provider: &'a dyn TypeMetadataProvider,
        registry: MacroRegistry,
        path: &'a str,
    ) -> Self {
        Self {
            config,
            provider,
            registry,
            path,
            env: TypeEnv::new(),
            current_macro: None,
            out: Vec::new(),
        }
    }

    fn finish(self) -> Vec<Diagnostic> {
        self.out
    }

    fn enabled(&self, inspection: Inspection) -> bool {
        self.config.is_enabled(inspection)
    }

    fn loc(&self, span: Span) -> Location {
        span.at(self.path)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn check_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Text { .. } => {}
            Stmt::Print { expr, .. } => self.check_expr(expr),
            Stmt::Types(annotation) => self.check_types(annotation),
            Stmt::Guarded(guarded) => self.check_types(&guarded.types),
            Stmt::Set(assignment) => {
                // A name counts as declared inside its own value.
                for name in &assignment.names {
                    if !self.env.is_declared(&name.name) {
                        self.env.add(&name.name, TypeExpr::mixed());
                    }
                }
                for value in &assignment.values {
                    self.check_expr(value);
                }
                for name in &assignment.names {
                    self.env.add(&name.name, TypeExpr::mixed());
                }
            }
            Stmt::For(l) => self.check_loop(l),
            Stmt::If(i) => {
                for branch in &i.branches {
                    self.check_expr(&branch.condition);
                    self.check_body(&branch.body);
                }
                self.check_body(&i.else_body);
            }
            Stmt::Macro(m) => self.check_macro(m),
            Stmt::Import(import) => self.check_expr(&import.template),
        }
    }

    fn check_types(&mut self, annotation: &TypeAnnotation) {
        let location = self.loc(annotation.span);
        for decl in &annotation.mapping {
            let mut parser = TypeParser::new(&decl.type_text);
            let parsed = parser.parse();

            if self.enabled(Inspection::InvalidTypes) {
                let invalid = |code| {
                    Diagnostic::error(
                        code,
                        format!(
                            "Invalid type '{}' for variable '{}' (at {location})",
                            decl.type_text, decl.name.name
                        ),
                        location.clone(),
                    )
                };
                match &parsed {
                    Ok(ty) => {
                        for d in parser.deprecations() {
                            self.out.push(Diagnostic::deprecation(
                                DiagnosticCode::DEPRECATED_TYPE,
                                format!(
                                    "Deprecated type '{}' used (at {location}). Use '{}' instead.",
                                    d.alias, d.replacement
                                ),
                                location.clone(),
                            ));
                        }
                        if !ty.is_structurally_valid(self.provider) {
                            self.out.push(invalid(DiagnosticCode::UNKNOWN_TYPE));
                        }
                    }
                    Err(err) => {
                        tracing::trace!(variable = %decl.name.name, error = %err, "type syntax error");
                        self.out.push(invalid(DiagnosticCode::INVALID_TYPE_SYNTAX));
                    }
                }
            }

            let ty = parsed.unwrap_or_else(|_| TypeExpr::mixed());
            self.env.add(&decl.name.name, ty);
        }
    }

    fn check_loop(&mut self, l: &Loop) {
        self.check_expr(&l.source);

        let key = l.key_target.as_ref().map_or("_key", |k| k.name.as_str());
        let targets = ["loop", key, l.value_target.name.as_str()];
        for name in targets {
            self.env.push(name, TypeExpr::mixed());
        }
        self.check_body(&l.body);
        for name in targets.iter().rev() {
            self.env.pop(name);
        }

        self.check_body(&l.else_body);
    }

    fn check_macro(&mut self, m: &MacroDecl) {
        if self.enabled(Inspection::RequiredAfterOptional) {
            let sig = MacroSignature::from_decl(m);
            if let Some(d) = calls::check_declaration(&sig, &self.loc(m.span)) {
                self.out.push(d);
            }
        }

        for default in m.params.iter().filter_map(|p| p.default.as_ref()) {
            self.check_expr(default);
        }

        let outer = self.current_macro.replace(m.name.name.clone());
        self.env.push_scope(ScopeKind::Macro);
        for param in &m.params {
            self.env.push(&param.name.name, TypeExpr::mixed());
        }
        self.check_body(&m.body);
        self.env.pop_scope();
        self.current_macro = outer;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Null | ExprKind::Bool(_) | ExprKind::Number(_) | ExprKind::String(_) => {}
            ExprKind::Array(items) => {
                for item in items {
                    self.check_expr(item);
                }
            }
            ExprKind::Hash(pairs) => {
                for (key, value) in pairs {
                    self.check_expr(key);
                    self.check_expr(value);
                }
            }
            ExprKind::Name(name) => self.check_name(name, expr.span),
            ExprKind::GetAttr {
                receiver,
                attribute,
                access,
                arguments,
            } => {
                self.check_get_attr(receiver, attribute, *access, expr.span);
                self.check_expr(receiver);
                self.check_args(arguments);
            }
            ExprKind::MacroCall(call) => self.check_macro_call(call, expr.span),
            ExprKind::Function { name, arguments } => {
                self.check_function(name, arguments, expr.span, false);
            }
            ExprKind::Filter {
                input, arguments, ..
            } => {
                self.check_expr(input);
                self.check_args(arguments);
            }
            ExprKind::Test {
                input,
                name,
                arguments,
            } => self.check_test(input, name, arguments, expr.span),
            ExprKind::Lambda { params, body } => {
                for param in params {
                    self.env.push(&param.name, TypeExpr::mixed());
                }
                self.check_expr(body);
                for param in params.iter().rev() {
                    self.env.pop(&param.name);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                self.check_expr(condition);
                self.check_expr(then);
                self.check_expr(otherwise);
            }
        }
    }

    fn check_args(&mut self, arguments: &[Argument]) {
        for arg in arguments {
            self.check_expr(&arg.value);
        }
    }

    /// Variable references are only checked inside macro bodies.
    fn check_name(&mut self, name: &str, span: Span) {
        if !self.enabled(Inspection::UndeclaredVariableInMacro) {
            return;
        }
        let Some(macro_name) = &self.current_macro else {
            return;
        };
        let declared = self.env.is_declared(name)
            || self.config.is_global(name)
            || name == VARARGS
            || name == "_self"
            || name.starts_with("__internal");
        if !declared {
            let message = format!(
                "The macro \"{macro_name}\" ({}:{}) uses an undeclared variable named \"{name}\".",
                self.path, span.line
            );
            let location = self.loc(span);
            self.out.push(Diagnostic::warning(
                DiagnosticCode::UNDECLARED_VARIABLE,
                message,
                location,
            ));
        }
    }

    fn check_get_attr(&mut self, receiver: &Expr, attribute: &str, access: AccessKind, span: Span) {
        if self.enabled(Inspection::InvalidEnumCase) {
            if let Some(enum_name) = enum_function_target(receiver) {
                if let Err(err) = attribute::check_enum_case(enum_name, attribute, self.provider) {
                    self.report_access(DiagnosticCode::INVALID_ENUM_CASE, err, span);
                }
            }
        }

        if !self.enabled(Inspection::InvalidDotOperation) {
            return;
        }
        let Some(name) = receiver.as_name() else {
            return;
        };
        let Some(declared) = self.env.lookup(name) else {
            return;
        };
        if let Err(err) = attribute::check_access(declared, attribute, access, self.provider) {
            self.report_access(DiagnosticCode::INVALID_ATTRIBUTE_ACCESS, err, span);
        }
    }

    fn report_access(&mut self, code: DiagnosticCode, err: attribute::AccessError, span: Span) {
        let location = self.loc(span);
        self.out.push(Diagnostic::error(
            code,
            format!("{err} (at {location})"),
            location,
        ));
    }

    fn check_macro_call(&mut self, call: &MacroCall, span: Span) {
        let location = self.loc(span);

        if self.enabled(Inspection::PositionalAfterNamed) {
            if let Some(d) = calls::check_argument_order(call, &location) {
                self.out.push(d);
            }
        }

        let found = match self.registry.resolve(&call.target, &call.name) {
            Resolution::Resolved(sig) => calls::validate_call(call, sig, self.config, &location),
            Resolution::Opaque => {
                tracing::trace!(name = %call.name, "call into opaque import, skipped");
                Vec::new()
            }
            Resolution::Unknown if self.enabled(Inspection::UnknownMacro) => {
                vec![Diagnostic::error(
                    DiagnosticCode::UNKNOWN_MACRO,
                    format!("Unknown macro '{}' (at {location})", call.name),
                    location.clone(),
                )]
            }
            Resolution::Unknown => Vec::new(),
        };
        self.out.extend(found);

        self.check_args(&call.arguments);
    }

    /// `exempt` is set for `constant(...) is defined`.
    fn check_function(&mut self, name: &str, arguments: &[Argument], span: Span, exempt: bool) {
        if name == "constant" && !exempt && self.enabled(Inspection::InvalidConstant) {
            self.check_constant(arguments, span);
        }
        self.check_args(arguments);
    }

    fn check_test(&mut self, input: &Expr, name: &str, arguments: &[Argument], span: Span) {
        if name == "defined" {
            match &input.kind {
                // `is defined` exists to test names that may be undeclared.
                ExprKind::Name(_) => {}
                ExprKind::Function {
                    name: function,
                    arguments: function_args,
                } => self.check_function(function, function_args, input.span, true),
                _ => self.check_expr(input),
            }
        } else {
            self.check_expr(input);
            if name == "constant" && self.enabled(Inspection::InvalidConstant) {
                self.check_constant(arguments, span);
            }
        }
        self.check_args(arguments);
    }

    fn check_constant(&mut self, arguments: &[Argument], span: Span) {
        let reason = match arguments {
            [] => Some("missing constant name".to_string()),
            [single] => match &single.value.kind {
                ExprKind::String(constant) if self.provider.constant_exists(constant) => None,
                ExprKind::String(constant) => Some(format!("invalid constant: '{constant}'")),
                kind => match literal_text(kind) {
                    Some(text) => Some(format!("invalid constant: '{text}'")),
                    None => Some("single argument must be string".to_string()),
                },
            },
            [constant, object] => {
                if !matches!(constant.value.kind, ExprKind::String(_)) {
                    Some("first argument must be string".to_string())
                } else if object.value.as_name().is_none() {
                    Some("second argument must be a variable name".to_string())
                } else {
                    None
                }
            }
            _ => Some("too many arguments".to_string()),
        };

        if let Some(reason) = reason {
            let location = self.loc(span);
            self.out.push(Diagnostic::error(
                DiagnosticCode::INVALID_CONSTANT,
                format!("Invalid constant() call: {reason} (at {location})"),
                location,
            ));
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `'App\Suit'` for `enum('App\Suit')`.
fn enum_function_target(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Function { name, arguments } if name == "enum" => match arguments.as_slice() {
            [arg] => arg.value.as_str(),
            _ => None,
        },
        _ => None,
    }
}

/// String form of a non-string scalar literal, as the runtime would print it.
fn literal_text(kind: &ExprKind) -> Option<String> {
    match kind {
        ExprKind::Null => Some(String::new()),
        ExprKind::Bool(true) => Some("1".to_string()),
        ExprKind::Bool(false) => Some(String::new()),
        ExprKind::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{}", *n as i64)),
        ExprKind::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
