//! Macro signatures and the per-module macro registry.

use std::collections::HashMap;
use std::rc::Rc;

use tmplcheck_types::ast::{MacroDecl, MacroTarget, Stmt};

/// Reserved binding through which a macro reads surplus positional arguments.
pub const VARARGS: &str = "varargs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroParamSig {
    pub name: String,
    /// True iff the parameter has no default.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSignature {
    pub name: String,
    /// Declared parameters in order, plus a trailing optional `varargs`
    /// parameter when the body reads it.
    pub params: Vec<MacroParamSig>,
    pub accepts_varargs: bool,
}

impl MacroSignature {
    pub fn from_decl(decl: &MacroDecl) -> Self {
        let mut params: Vec<MacroParamSig> = decl
            .params
            .iter()
            .map(|p| MacroParamSig {
                name: p.name.name.clone(),
                required: !p.has_default(),
            })
            .collect();

        let accepts_varargs = reads_varargs(&decl.body);
        if accepts_varargs && !params.iter().any(|p| p.name == VARARGS) {
            params.push(MacroParamSig {
                name: VARARGS.to_string(),
                required: false,
            });
        }

        Self {
            name: decl.name.name.clone(),
            params,
            accepts_varargs,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    /// Whether `name` is an explicitly declared parameter. The implicit
    /// `varargs` parameter cannot be passed by name.
    pub fn declares(&self, name: &str) -> bool {
        self.params
            .iter()
            .any(|p| p.name == name && !(self.accepts_varargs && p.name == VARARGS))
    }

    /// The first required parameter that follows an optional one.
    pub fn first_required_after_optional(&self) -> Option<&MacroParamSig> {
        let mut seen_optional = false;
        for param in &self.params {
            if param.required && seen_optional {
                return Some(param);
            }
            seen_optional |= !param.required;
        }
        None
    }
}

fn reads_varargs(body: &[Stmt]) -> bool {
    body.iter()
        .any(|s| s.any_expr(&mut |e| e.as_name() == Some(VARARGS)))
}

/// Macros declared by one template, keyed by name.
pub type MacroTable = HashMap<String, MacroSignature>;

/// Build the table of macros declared anywhere in `body`.
pub fn collect_macros(body: &[Stmt]) -> MacroTable {
    let mut table = MacroTable::new();
    collect_into(body, &mut table);
    table
}

fn collect_into(body: &[Stmt], table: &mut MacroTable) {
    for stmt in body {
        match stmt {
            Stmt::Macro(decl) => {
                table
                    .entry(decl.name.name.clone())
                    .or_insert_with(|| MacroSignature::from_decl(decl));
            }
            Stmt::For(l) => {
                collect_into(&l.body, table);
                collect_into(&l.else_body, table);
            }
            Stmt::If(i) => {
                for branch in &i.branches {
                    collect_into(&branch.body, table);
                }
                collect_into(&i.else_body, table);
            }
            _ => {}
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// A single macro brought in with `from ... import`.
#[derive(Debug, Clone)]
pub enum ImportedMacro {
    Resolved(MacroSignature),
    /// The source template is dynamic or failed to load.
    Opaque,
}

/// A template bound to a namespace with `import ... as`.
#[derive(Debug, Clone)]
pub enum ImportedNamespace {
    Resolved(Rc<MacroTable>),
    Opaque,
}

/// Outcome of looking up a call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a MacroSignature),
    /// Known to come from somewhere we cannot see into; skip all checks.
    Opaque,
    Unknown,
}

/// Everything a template can call, built fresh for every module.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    local: Rc<MacroTable>,
    imported: HashMap<String, ImportedMacro>,
    namespaces: HashMap<String, ImportedNamespace>,
}

impl MacroRegistry {
    pub fn new(local: Rc<MacroTable>) -> Self {
        Self {
            local,
            imported: HashMap::new(),
            namespaces: HashMap::new(),
        }
    }

    pub fn local(&self) -> &Rc<MacroTable> {
        &self.local
    }

    /// Bind `alias` to an imported macro. A second import of the same alias
    /// replaces the first.
    pub fn import_macro(&mut self, alias: &str, imported: ImportedMacro) {
        self.imported.insert(alias.to_string(), imported);
    }

    pub fn import_namespace(&mut self, alias: &str, namespace: ImportedNamespace) {
        self.namespaces.insert(alias.to_string(), namespace);
    }

    /// Resolve a call target. A local macro shadows an imported one of the
    /// same name.
    pub fn resolve(&self, target: &MacroTarget, name: &str) -> Resolution<'_> {
        match target {
            MacroTarget::SelfRef => match self.local.get(name) {
                Some(sig) => Resolution::Resolved(sig),
                None => Resolution::Unknown,
            },
            MacroTarget::Namespace(alias) => match self.namespaces.get(alias) {
                Some(ImportedNamespace::Resolved(table)) => match table.get(name) {
                    Some(sig) => Resolution::Resolved(sig),
                    None => Resolution::Unknown,
                },
                Some(ImportedNamespace::Opaque) => Resolution::Opaque,
                None => Resolution::Unknown,
            },
            MacroTarget::Imported => {
                if let Some(sig) = self.local.get(name) {
                    return Resolution::Resolved(sig);
                }
                match self.imported.get(name) {
                    Some(ImportedMacro::Resolved(sig)) => Resolution::Resolved(sig),
                    Some(ImportedMacro::Opaque) => Resolution::Opaque,
                    None => Resolution::Unknown,
                }
            }
        }
    }
}
