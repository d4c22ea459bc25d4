//! AST node types for templates, as handed over by the parser.
//!
//! Every node carries a [`Span`]; the template path lives on [`Module`].
//! Sequences preserve source order.
//!
//! The constructors at the bottom of each `impl` block exist so tooling and
//! tests can assemble trees without a parser. They only know lines.

use serde::{Deserialize, Serialize};

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Template path, as the loader knows it.
    pub name: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            body,
            span: Span::line(1),
        }
    }
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    pub fn at(name: impl Into<String>, line: u32) -> Self {
        Self::new(name, Span::line(line))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Raw template text.
    Text { text: String, span: Span },
    /// `{{ expr }}`
    Print { expr: Expr, span: Span },
    /// `{% types {name: 'type', other?: 'type'} %}`
    Types(TypeAnnotation),
    /// A `types` statement with its render-time guards attached.
    Guarded(GuardedTypes),
    /// `{% set a, b = x, y %}`
    Set(Assignment),
    /// `{% for key, value in source %}...{% else %}...{% endfor %}`
    For(Loop),
    /// `{% if %}...{% elseif %}...{% else %}...{% endif %}`
    If(IfStmt),
    /// `{% macro name(params) %}...{% endmacro %}`
    Macro(MacroDecl),
    /// `{% import "x" as ns %}` or `{% from "x" import a as b %}`
    Import(Import),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Text { span, .. } | Stmt::Print { span, .. } => *span,
            Stmt::Types(t) => t.span,
            Stmt::Guarded(g) => g.types.span,
            Stmt::Set(s) => s.span,
            Stmt::For(f) => f.span,
            Stmt::If(i) => i.span,
            Stmt::Macro(m) => m.span,
            Stmt::Import(i) => i.span,
        }
    }

    /// Returns true if `pred` holds for any expression in this statement's
    /// subtree, nested statements included.
    pub fn any_expr(&self, pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
        fn block(stmts: &[Stmt], pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
            stmts.iter().any(|s| s.any_expr(pred))
        }

        match self {
            Stmt::Text { .. } | Stmt::Types(_) | Stmt::Guarded(_) => false,
            Stmt::Print { expr, .. } => expr.any(pred),
            Stmt::Set(s) => s.values.iter().any(|v| v.any(pred)),
            Stmt::For(f) => f.source.any(pred) || block(&f.body, pred) || block(&f.else_body, pred),
            Stmt::If(i) => {
                i.branches
                    .iter()
                    .any(|b| b.condition.any(pred) || block(&b.body, pred))
                    || block(&i.else_body, pred)
            }
            Stmt::Macro(m) => {
                m.params
                    .iter()
                    .filter_map(|p| p.default.as_ref())
                    .any(|d| d.any(pred))
                    || block(&m.body, pred)
            }
            Stmt::Import(i) => i.template.any(pred),
        }
    }

    // ── Constructors ──

    pub fn text(text: impl Into<String>, line: u32) -> Self {
        Stmt::Text {
            text: text.into(),
            span: Span::line(line),
        }
    }

    pub fn print(expr: Expr) -> Self {
        let span = expr.span;
        Stmt::Print { expr, span }
    }

    /// Build a `types` statement. A trailing `?` on a name marks it optional,
    /// as in the template syntax.
    pub fn types(mapping: &[(&str, &str)], line: u32) -> Self {
        let mapping = mapping
            .iter()
            .map(|(name, type_text)| {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(stripped) => (stripped, true),
                    None => (*name, false),
                };
                TypeDecl {
                    name: Ident::at(name, line),
                    type_text: (*type_text).to_string(),
                    optional,
                }
            })
            .collect();
        Stmt::Types(TypeAnnotation {
            mapping,
            span: Span::line(line),
        })
    }

    pub fn set(names: &[&str], values: Vec<Expr>, line: u32) -> Self {
        Stmt::Set(Assignment {
            names: names.iter().map(|n| Ident::at(*n, line)).collect(),
            values,
            span: Span::line(line),
        })
    }

    pub fn for_loop(
        key: Option<&str>,
        value: &str,
        source: Expr,
        body: Vec<Stmt>,
        line: u32,
    ) -> Self {
        Stmt::For(Loop {
            key_target: key.map(|k| Ident::at(k, line)),
            value_target: Ident::at(value, line),
            source,
            body,
            else_body: Vec::new(),
            span: Span::line(line),
        })
    }

    pub fn if_then(condition: Expr, body: Vec<Stmt>, line: u32) -> Self {
        Stmt::If(IfStmt {
            branches: vec![IfBranch { condition, body }],
            else_body: Vec::new(),
            span: Span::line(line),
        })
    }

    pub fn macro_decl(name: &str, params: Vec<MacroParam>, body: Vec<Stmt>, line: u32) -> Self {
        Stmt::Macro(MacroDecl {
            name: Ident::at(name, line),
            params,
            body,
            span: Span::line(line),
        })
    }

    /// `{% import "template" as alias %}`
    pub fn import(template: &str, alias: &str, line: u32) -> Self {
        Stmt::Import(Import {
            template: Expr::string(template, line),
            kind: ImportKind::Namespace(Ident::at(alias, line)),
            span: Span::line(line),
        })
    }

    /// `{% from "template" import name, other as alias %}`
    pub fn from_import(template: &str, names: &[(&str, Option<&str>)], line: u32) -> Self {
        Self::from_import_expr(Expr::string(template, line), names, line)
    }

    /// `{% from <expr> import ... %}`, for imports whose template is computed.
    pub fn from_import_expr(template: Expr, names: &[(&str, Option<&str>)], line: u32) -> Self {
        Stmt::Import(Import {
            template,
            kind: ImportKind::Names(
                names
                    .iter()
                    .map(|(name, alias)| ImportedName {
                        name: Ident::at(*name, line),
                        alias: alias.map(|a| Ident::at(a, line)),
                    })
                    .collect(),
            ),
            span: Span::line(line),
        })
    }
}

// ── Type annotations ──────────────────────────────────────────────────────────

/// `{% types {...} %}`: declared contracts for template variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub mapping: Vec<TypeDecl>,
    pub span: Span,
}

/// One `name: 'type'` entry. The type text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Ident,
    pub type_text: String,
    pub optional: bool,
}

/// A type annotation plus the guards the compiler must emit for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardedTypes {
    pub types: TypeAnnotation,
    pub guards: Vec<Guard>,
}

/// A single render-time assertion on a context variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub variable: String,
    pub check: GuardCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardCheck {
    /// The variable must be present in the context.
    Exists,
    /// If present, the variable must not be null.
    NotNull,
    /// If present and not null, the value must match the type.
    Matches { type_text: String },
}

// ── Assignment, control flow ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub names: Vec<Ident>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    /// `None` when only the value is bound; the runtime then binds `_key`.
    pub key_target: Option<Ident>,
    pub value_target: Ident,
    pub source: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub branches: Vec<IfBranch>,
    pub else_body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

// ── Macros & imports ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDecl {
    pub name: Ident,
    pub params: Vec<MacroParam>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroParam {
    pub name: Ident,
    pub default: Option<Expr>,
}

impl MacroParam {
    pub fn required(name: &str, line: u32) -> Self {
        Self {
            name: Ident::at(name, line),
            default: None,
        }
    }

    pub fn optional(name: &str, default: Expr) -> Self {
        let line = default.span.line;
        Self {
            name: Ident::at(name, line),
            default: Some(default),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    /// Usually a string literal; anything else is a dynamic import.
    pub template: Expr,
    pub kind: ImportKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import "x" as ns`: macros are called as `ns.name()`.
    Namespace(Ident),
    /// `from "x" import a, b as c`: macros are called by bare (local) name.
    Names(Vec<ImportedName>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: Ident,
    pub alias: Option<Ident>,
}

impl ImportedName {
    /// The name the importing template uses.
    pub fn local_name(&self) -> &str {
        self.alias.as_ref().unwrap_or(&self.name).name.as_str()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // ── Literals ──
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Expr>),
    Hash(Vec<(Expr, Expr)>),

    /// A context variable reference.
    Name(String),

    /// `receiver.attribute`, `receiver.attribute(args)` or `receiver[key]`.
    GetAttr {
        receiver: Box<Expr>,
        attribute: String,
        access: AccessKind,
        arguments: Vec<Argument>,
    },

    MacroCall(MacroCall),

    /// `name(args)` for non-macro functions (`constant`, `enum`, `max`, ...).
    Function {
        name: String,
        arguments: Vec<Argument>,
    },

    /// `input|name(args)`
    Filter {
        input: Box<Expr>,
        name: String,
        arguments: Vec<Argument>,
    },

    /// `input is name(args)`
    Test {
        input: Box<Expr>,
        name: String,
        arguments: Vec<Argument>,
    },

    /// `(a, b) => body`
    Lambda {
        params: Vec<Ident>,
        body: Box<Expr>,
    },

    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Unary {
        op: String,
        operand: Box<Expr>,
    },

    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// How an attribute was accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    /// `a.b`: property, method or array key.
    Any,
    /// `a.b()`
    Method,
    /// `a[b]`
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroCall {
    pub target: MacroTarget,
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// Where a called macro comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroTarget {
    /// `_self.name()`
    SelfRef,
    /// `ns.name()` after `import "x" as ns`
    Namespace(String),
    /// `name()` after `from "x" import name`
    Imported,
}

/// A call argument; `name` is set for `name: value` / `name = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

impl Argument {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: &str, value: Expr) -> Self {
        Self {
            name: Some(name.to_string()),
            value,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl From<Expr> for Argument {
    fn from(value: Expr) -> Self {
        Self::positional(value)
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if `pred` holds for this expression or any descendant.
    pub fn any(&self, pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
        fn args(arguments: &[Argument], pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
            arguments.iter().any(|a| a.value.any(pred))
        }

        if pred(self) {
            return true;
        }
        match &self.kind {
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Name(_) => false,
            ExprKind::Array(items) => items.iter().any(|i| i.any(pred)),
            ExprKind::Hash(pairs) => pairs.iter().any(|(k, v)| k.any(pred) || v.any(pred)),
            ExprKind::GetAttr {
                receiver,
                arguments,
                ..
            } => receiver.any(pred) || args(arguments, pred),
            ExprKind::MacroCall(call) => args(&call.arguments, pred),
            ExprKind::Function { arguments, .. } => args(arguments, pred),
            ExprKind::Filter {
                input, arguments, ..
            }
            | ExprKind::Test {
                input, arguments, ..
            } => input.any(pred) || args(arguments, pred),
            ExprKind::Lambda { body, .. } => body.any(pred),
            ExprKind::Binary { left, right, .. } => left.any(pred) || right.any(pred),
            ExprKind::Unary { operand, .. } => operand.any(pred),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => condition.any(pred) || then.any(pred) || otherwise.any(pred),
        }
    }

    /// The variable name if this is a bare variable reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The string value if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Null | ExprKind::Bool(_) | ExprKind::Number(_) | ExprKind::String(_)
        )
    }

    // ── Constructors ──

    pub fn null(line: u32) -> Self {
        Self::new(ExprKind::Null, Span::line(line))
    }

    pub fn boolean(value: bool, line: u32) -> Self {
        Self::new(ExprKind::Bool(value), Span::line(line))
    }

    pub fn number(value: f64, line: u32) -> Self {
        Self::new(ExprKind::Number(value), Span::line(line))
    }

    pub fn string(value: impl Into<String>, line: u32) -> Self {
        Self::new(ExprKind::String(value.into()), Span::line(line))
    }

    pub fn array(items: Vec<Expr>, line: u32) -> Self {
        Self::new(ExprKind::Array(items), Span::line(line))
    }

    pub fn hash(pairs: Vec<(Expr, Expr)>, line: u32) -> Self {
        Self::new(ExprKind::Hash(pairs), Span::line(line))
    }

    pub fn name(name: impl Into<String>, line: u32) -> Self {
        Self::new(ExprKind::Name(name.into()), Span::line(line))
    }

    /// `receiver.attribute`
    pub fn attr(receiver: Expr, attribute: &str) -> Self {
        Self::get_attr(receiver, attribute, AccessKind::Any, Vec::new())
    }

    /// `receiver.attribute(args)`
    pub fn method(receiver: Expr, attribute: &str, arguments: Vec<Argument>) -> Self {
        Self::get_attr(receiver, attribute, AccessKind::Method, arguments)
    }

    /// `receiver[key]`
    pub fn item(receiver: Expr, key: &str) -> Self {
        Self::get_attr(receiver, key, AccessKind::Array, Vec::new())
    }

    fn get_attr(receiver: Expr, attribute: &str, access: AccessKind, arguments: Vec<Argument>) -> Self {
        let span = receiver.span;
        Self::new(
            ExprKind::GetAttr {
                receiver: Box::new(receiver),
                attribute: attribute.to_string(),
                access,
                arguments,
            },
            span,
        )
    }

    fn macro_call(target: MacroTarget, name: &str, arguments: Vec<Argument>, line: u32) -> Self {
        Self::new(
            ExprKind::MacroCall(MacroCall {
                target,
                name: name.to_string(),
                arguments,
            }),
            Span::line(line),
        )
    }

    /// `_self.name(args)`
    pub fn self_call(name: &str, arguments: Vec<Argument>, line: u32) -> Self {
        Self::macro_call(MacroTarget::SelfRef, name, arguments, line)
    }

    /// `namespace.name(args)`
    pub fn namespace_call(namespace: &str, name: &str, arguments: Vec<Argument>, line: u32) -> Self {
        Self::macro_call(
            MacroTarget::Namespace(namespace.to_string()),
            name,
            arguments,
            line,
        )
    }

    /// `name(args)` for a macro brought in with `from ... import`.
    pub fn imported_call(name: &str, arguments: Vec<Argument>, line: u32) -> Self {
        Self::macro_call(MacroTarget::Imported, name, arguments, line)
    }

    pub fn function(name: &str, arguments: Vec<Argument>, line: u32) -> Self {
        Self::new(
            ExprKind::Function {
                name: name.to_string(),
                arguments,
            },
            Span::line(line),
        )
    }

    pub fn filter(input: Expr, name: &str, arguments: Vec<Argument>) -> Self {
        let span = input.span;
        Self::new(
            ExprKind::Filter {
                input: Box::new(input),
                name: name.to_string(),
                arguments,
            },
            span,
        )
    }

    pub fn test(input: Expr, name: &str, arguments: Vec<Argument>) -> Self {
        let span = input.span;
        Self::new(
            ExprKind::Test {
                input: Box::new(input),
                name: name.to_string(),
                arguments,
            },
            span,
        )
    }

    pub fn lambda(params: &[&str], body: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Lambda {
                params: params.iter().map(|p| Ident::at(*p, line)).collect(),
                body: Box::new(body),
            },
            Span::line(line),
        )
    }

    pub fn binary(op: &str, left: Expr, right: Expr) -> Self {
        let span = left.span;
        Self::new(
            ExprKind::Binary {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn unary(op: &str, operand: Expr) -> Self {
        let span = operand.span;
        Self::new(
            ExprKind::Unary {
                op: op.to_string(),
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        let span = condition.span;
        Self::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        )
    }
}
