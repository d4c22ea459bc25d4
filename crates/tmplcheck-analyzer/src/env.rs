//! Variable environment with lexically scoped bindings.
//!
//! [`TypeEnv`] is a stack of frames. The bottom frame belongs to the module
//! being analyzed; each macro body gets a fresh frame of its own. Lookups
//! only consult the innermost frame, so a macro never sees module variables.
//!
//! Within a frame, a name carries an ordered stack of bindings. Block-scoped
//! entries (loop targets, lambda parameters, macro parameters) come and go in
//! nested pairs; accumulated entries (assignments, `types` statements) stay
//! until the frame ends. The most recent entry of either kind wins, and
//! popping a block entry restores whatever was visible before it.

use std::collections::HashMap;

use crate::ty::TypeExpr;

// ══════════════════════════════════════════════════════════════════════════════
// Scope Kind
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Template top level.
    Module,
    /// Inside a macro body.
    Macro,
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Accumulated,
    Block,
}

#[derive(Debug)]
struct Entry {
    kind: EntryKind,
    ty: TypeExpr,
}

#[derive(Debug, Default)]
struct Binding {
    entries: Vec<Entry>,
}

impl Binding {
    fn current(&self) -> Option<&TypeExpr> {
        self.entries.last().map(|e| &e.ty)
    }
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: HashMap::new(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeEnv
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    /// Create an environment with an empty module frame.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Module)],
        }
    }

    /// Drop everything and start over with an empty module frame.
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scopes.push(Scope::new(ScopeKind::Module));
    }

    /// Start a fresh frame that inherits nothing.
    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    /// Leave the innermost frame. The module frame is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn current_mut(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new(ScopeKind::Module));
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Accumulating declaration: stays until the frame ends and becomes the
    /// most recent binding. A later `add` of the same name replaces it.
    pub fn add(&mut self, name: &str, ty: TypeExpr) {
        let binding = self
            .current_mut()
            .bindings
            .entry(name.to_string())
            .or_default();
        binding.entries.retain(|e| e.kind == EntryKind::Block);
        binding.entries.push(Entry {
            kind: EntryKind::Accumulated,
            ty,
        });
    }

    /// Add several accumulating declarations at once.
    pub fn add_all<'a>(&mut self, bindings: impl IntoIterator<Item = (&'a str, TypeExpr)>) {
        for (name, ty) in bindings {
            self.add(name, ty);
        }
    }

    /// Block-scoped declaration; pair with [`pop`](Self::pop).
    pub fn push(&mut self, name: &str, ty: TypeExpr) {
        self.current_mut()
            .bindings
            .entry(name.to_string())
            .or_default()
            .entries
            .push(Entry {
                kind: EntryKind::Block,
                ty,
            });
    }

    /// Undo the most recent [`push`](Self::push) of `name`. Accumulated
    /// entries made since then stay in place.
    pub fn pop(&mut self, name: &str) -> Option<TypeExpr> {
        let scope = self.current_mut();
        let binding = scope.bindings.get_mut(name)?;
        let index = binding
            .entries
            .iter()
            .rposition(|e| e.kind == EntryKind::Block)?;
        let popped = binding.entries.remove(index).ty;
        if binding.entries.is_empty() {
            scope.bindings.remove(name);
        }
        Some(popped)
    }

    /// Look up a binding in the innermost frame.
    pub fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.scopes.last()?.bindings.get(name)?.current()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// The declared type, or `mixed` for anything undeclared.
    pub fn type_of(&self, name: &str) -> TypeExpr {
        self.lookup(name).cloned().unwrap_or_else(TypeExpr::mixed)
    }

    pub fn current_scope_kind(&self) -> ScopeKind {
        self.scopes.last().map_or(ScopeKind::Module, |s| s.kind)
    }

    pub fn in_macro(&self) -> bool {
        self.current_scope_kind() == ScopeKind::Macro
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}
