//! Template loading and the per-run import cache.
//!
//! Handles:
//! - Handing out already-parsed templates by name
//! - Classifying import sources (literal, `_self`, dynamic)
//! - Caching the macro tables of analyzed templates
//! - Tracking templates whose analysis is in flight

use std::collections::HashMap;
use std::rc::Rc;

use tmplcheck_types::ast::{Expr, ExprKind, Module};

use crate::error::LoadError;
use crate::macros::MacroTable;

/// Supplies parsed templates by name.
pub trait TemplateLoader {
    fn load(&self, name: &str) -> Result<Module, LoadError>;
}

/// Loader over an in-memory set of parsed templates.
#[derive(Debug, Clone, Default)]
pub struct ArrayLoader {
    templates: HashMap<String, Module>,
}

impl ArrayLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under its own name.
    pub fn insert(&mut self, module: Module) {
        self.templates.insert(module.name.clone(), module);
    }

    pub fn with(mut self, module: Module) -> Self {
        self.insert(module);
        self
    }
}

impl TemplateLoader for ArrayLoader {
    fn load(&self, name: &str) -> Result<Module, LoadError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

/// Loader over serialized ASTs, decoded on demand.
#[derive(Debug, Clone, Default)]
pub struct JsonLoader {
    sources: HashMap<String, String>,
}

impl JsonLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, json: impl Into<String>) -> Self {
        self.sources.insert(name.to_string(), json.into());
        self
    }
}

impl TemplateLoader for JsonLoader {
    fn load(&self, name: &str) -> Result<Module, LoadError> {
        let json = self
            .sources
            .get(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        let mut module: Module = serde_json::from_str(json).map_err(|e| LoadError::Parse {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        module.name = name.to_string();
        Ok(module)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Import sources
// ══════════════════════════════════════════════════════════════════════════════

/// What an import statement points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// A literal template name.
    Named(String),
    /// `_self`: the importing template itself.
    SelfRef,
    /// Computed at render time; cannot be followed.
    Dynamic,
}

impl ImportSource {
    pub fn of(template: &Expr) -> Self {
        match &template.kind {
            ExprKind::String(name) => ImportSource::Named(name.clone()),
            ExprKind::Name(name) if name == "_self" => ImportSource::SelfRef,
            _ => ImportSource::Dynamic,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Run state
// ══════════════════════════════════════════════════════════════════════════════

/// Cache lookup result.
#[derive(Debug, Clone)]
pub enum Cached {
    /// Macro table of a template already analyzed (or currently being
    /// analyzed; tables are published before imports are followed).
    Ready(Rc<MacroTable>),
    /// Failed to load earlier in this run.
    Failed(LoadError),
    Missing,
}

/// State shared by every module of one top-level analysis, and only by them.
#[derive(Debug, Default)]
pub struct ImportCache {
    exports: HashMap<String, Rc<MacroTable>>,
    failures: HashMap<String, LoadError>,
    in_flight: Vec<String>,
}

impl ImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.exports.clear();
        self.failures.clear();
        self.in_flight.clear();
    }

    pub fn get(&self, name: &str) -> Cached {
        if let Some(table) = self.exports.get(name) {
            return Cached::Ready(Rc::clone(table));
        }
        match self.failures.get(name) {
            Some(err) => Cached::Failed(err.clone()),
            None => Cached::Missing,
        }
    }

    /// Publish a template's macros. The first table published for a name wins.
    pub fn publish(&mut self, name: &str, table: Rc<MacroTable>) {
        self.exports.entry(name.to_string()).or_insert(table);
    }

    pub fn record_failure(&mut self, name: &str, err: LoadError) {
        self.failures.insert(name.to_string(), err);
    }

    pub fn begin(&mut self, name: &str) {
        self.in_flight.push(name.to_string());
    }

    pub fn finish(&mut self, name: &str) {
        if let Some(pos) = self.in_flight.iter().rposition(|n| n == name) {
            self.in_flight.remove(pos);
        }
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.in_flight.iter().any(|n| n == name)
    }

    /// Number of distinct templates analyzed in this run.
    pub fn visited(&self) -> usize {
        self.exports.len()
    }
}
