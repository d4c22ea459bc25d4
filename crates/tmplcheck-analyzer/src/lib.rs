//! tmplcheck analyzer: static contract checks for template ASTs.
//!
//! ```text
//! parsed Module → pre-pass (macros, imports) → validating walk → diagnostics
//!                                                              → instrumented Module
//! ```
//!
//! The analyzer validates declared variable types, macro call signatures,
//! variable declarations inside macros and attribute access, and attaches
//! render-time guards to every `types` statement. [`guard::check_template`]
//! runs those guards against a render context.

pub mod attribute;
pub mod calls;
pub mod checker;
pub mod config;
pub mod env;
pub mod error;
pub mod guard;
pub mod imports;
pub mod macros;
pub mod metadata;
pub mod sink;
pub mod ty;
pub mod value;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tmplcheck_types::ast::Module;
use tmplcheck_types::Diagnostics;

pub use checker::Analyzer;
pub use config::{AnalyzerConfig, Inspection};
pub use env::TypeEnv;
pub use error::{ConfigError, LoadError, MetadataError, TypeSyntaxError};
pub use imports::{ArrayLoader, JsonLoader, TemplateLoader};
pub use macros::{MacroRegistry, MacroSignature};
pub use metadata::{ClassRegistry, TypeInfo, TypeMetadataProvider};
pub use sink::TracingSink;
pub use ty::{TypeExpr, TypeParser};
pub use value::{Context, Value};

/// Result of analyzing one template.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Name of the analyzed template.
    pub template: String,
    /// SHA-256 of the input module's JSON form, lowercase hex.
    pub fingerprint: String,
    pub diagnostics: Diagnostics,
    /// The module to hand to the compiler.
    pub module: Module,
}

impl AnalysisReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Analyzer<'_> {
    /// Analyze `module`, logging every diagnostic through `tracing`.
    pub fn analyze(&mut self, module: &Module) -> AnalysisReport {
        let mut sink = TracingSink::new(Diagnostics::empty());
        let instrumented = self.analyze_into(module, &mut sink);
        AnalysisReport {
            template: module.name.clone(),
            fingerprint: fingerprint(module),
            diagnostics: sink.into_inner(),
            module: instrumented,
        }
    }
}

/// Analyze a template with the default configuration.
pub fn analyze(
    module: &Module,
    loader: &dyn TemplateLoader,
    provider: &dyn TypeMetadataProvider,
) -> AnalysisReport {
    Analyzer::new(AnalyzerConfig::default(), loader, provider).analyze(module)
}

/// Content hash of a module, stable across runs.
pub fn fingerprint(module: &Module) -> String {
    let bytes = serde_json::to_vec(module).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}
