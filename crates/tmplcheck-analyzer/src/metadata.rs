//! Type metadata: what the analyzer may know about host-language types.
//!
//! Reflection stays behind [`TypeMetadataProvider`]. [`ClassRegistry`] is
//! the in-memory implementation, filled by hand or from a JSON reflection
//! dump.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

// ══════════════════════════════════════════════════════════════════════════════
// Descriptions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Trait,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// A property or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Member {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Everything the analyzer needs to know about one named type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Fully-qualified name, without the leading `\`.
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    /// Parent class and implemented interfaces.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Used traits.
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub properties: Vec<Member>,
    /// Properties documented on the type but served by magic accessors.
    #[serde(default)]
    pub virtual_properties: Vec<String>,
    #[serde(default)]
    pub methods: Vec<Member>,
    /// Enum case names.
    #[serde(default)]
    pub cases: Vec<String>,
    #[serde(default)]
    pub constants: Vec<String>,
}

impl TypeInfo {
    fn of_kind(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.trim_start_matches('\\').to_string(),
            kind,
            parents: Vec::new(),
            traits: Vec::new(),
            properties: Vec::new(),
            virtual_properties: Vec::new(),
            methods: Vec::new(),
            cases: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn class(name: &str) -> Self {
        Self::of_kind(name, TypeKind::Class)
    }

    pub fn interface(name: &str) -> Self {
        Self::of_kind(name, TypeKind::Interface)
    }

    pub fn trait_named(name: &str) -> Self {
        Self::of_kind(name, TypeKind::Trait)
    }

    pub fn enumeration(name: &str, cases: &[&str]) -> Self {
        let mut info = Self::of_kind(name, TypeKind::Enum);
        info.cases = cases.iter().map(|c| c.to_string()).collect();
        info
    }

    // ── Builder helpers ──

    pub fn extends(mut self, parent: &str) -> Self {
        self.parents.push(parent.trim_start_matches('\\').to_string());
        self
    }

    pub fn uses(mut self, trait_name: &str) -> Self {
        self.traits.push(trait_name.trim_start_matches('\\').to_string());
        self
    }

    pub fn property(mut self, name: &str, visibility: Visibility) -> Self {
        self.properties.push(Member {
            name: name.to_string(),
            visibility,
        });
        self
    }

    pub fn virtual_property(mut self, name: &str) -> Self {
        self.virtual_properties.push(name.to_string());
        self
    }

    pub fn method(mut self, name: &str, visibility: Visibility) -> Self {
        self.methods.push(Member {
            name: name.to_string(),
            visibility,
        });
        self
    }

    pub fn constant(mut self, name: &str) -> Self {
        self.constants.push(name.to_string());
        self
    }
}

/// Registry key for a type name: no leading `\`, lowercase.
pub fn normalize_type_name(fqn: &str) -> String {
    fqn.trim_start_matches('\\').to_ascii_lowercase()
}

// ══════════════════════════════════════════════════════════════════════════════
// Provider
// ══════════════════════════════════════════════════════════════════════════════

/// Source of type metadata for attribute, class-reference, enum and
/// constant checks.
///
/// Implementors only answer [`describe`](Self::describe) and
/// [`constant_exists`](Self::constant_exists); hierarchy queries are
/// derived from those.
pub trait TypeMetadataProvider {
    /// Look up a type by fully-qualified name (leading `\` optional,
    /// case-insensitive).
    fn describe(&self, fqn: &str) -> Option<&TypeInfo>;

    /// Whether a global constant `NAME` or class constant `Class::NAME` exists.
    fn constant_exists(&self, name: &str) -> bool;

    fn type_exists(&self, fqn: &str) -> bool {
        self.describe(fqn).is_some()
    }

    /// The type itself followed by all its ancestors and used traits,
    /// breadth-first. Undescribed ancestors are skipped.
    fn lineage(&self, fqn: &str) -> Vec<&TypeInfo> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([fqn.to_string()]);
        let mut out = Vec::new();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(normalize_type_name(&name)) {
                continue;
            }
            if let Some(info) = self.describe(&name) {
                queue.extend(info.parents.iter().cloned());
                queue.extend(info.traits.iter().cloned());
                out.push(info);
            }
        }
        out
    }

    /// Whether `fqn` is `target`, or extends, implements or uses it.
    fn is_subtype(&self, fqn: &str, target: &str) -> bool {
        let target = normalize_type_name(target);
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([fqn.to_string()]);
        while let Some(name) = queue.pop_front() {
            let key = normalize_type_name(&name);
            if key == target {
                return true;
            }
            if !seen.insert(key) {
                continue;
            }
            if let Some(info) = self.describe(&name) {
                queue.extend(info.parents.iter().cloned());
                queue.extend(info.traits.iter().cloned());
            }
        }
        false
    }

    /// Whether instances convert to string.
    fn is_stringable(&self, fqn: &str) -> bool {
        self.is_subtype(fqn, "Stringable") || self.find_method(fqn, "__toString").is_some()
    }

    fn find_property(&self, fqn: &str, name: &str) -> Option<&Member> {
        self.lineage(fqn)
            .into_iter()
            .find_map(|info| info.properties.iter().find(|p| p.name == name))
    }

    fn has_virtual_property(&self, fqn: &str, name: &str) -> bool {
        self.lineage(fqn)
            .iter()
            .any(|info| info.virtual_properties.iter().any(|p| p == name))
    }

    /// Method names are case-insensitive.
    fn find_method(&self, fqn: &str, name: &str) -> Option<&Member> {
        self.lineage(fqn).into_iter().find_map(|info| {
            info.methods
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name))
        })
    }

    /// Case names of an enum, or `None` if `fqn` is not a known enum.
    fn enum_cases(&self, fqn: &str) -> Option<&[String]> {
        self.describe(fqn)
            .filter(|info| info.kind == TypeKind::Enum)
            .map(|info| info.cases.as_slice())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ClassRegistry
// ══════════════════════════════════════════════════════════════════════════════

/// In-memory [`TypeMetadataProvider`].
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    types: HashMap<String, TypeInfo>,
    constants: HashSet<String>,
}

/// Shape of a JSON reflection dump.
#[derive(Deserialize)]
struct Dump {
    #[serde(default)]
    types: Vec<TypeInfo>,
    #[serde(default)]
    constants: Vec<String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dump of the form `{"types": [...], "constants": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let dump: Dump = serde_json::from_str(json)?;
        let mut reg = Self::new();
        for info in dump.types {
            let key = normalize_type_name(&info.name);
            if reg.types.contains_key(&key) {
                return Err(MetadataError::Duplicate(info.name));
            }
            reg.types.insert(key, info);
        }
        reg.constants.extend(dump.constants);
        Ok(reg)
    }

    /// Register a type, replacing any previous description of it.
    pub fn insert(&mut self, info: TypeInfo) {
        self.types.insert(normalize_type_name(&info.name), info);
    }

    pub fn with(mut self, info: TypeInfo) -> Self {
        self.insert(info);
        self
    }

    /// Register a global constant.
    pub fn with_constant(mut self, name: &str) -> Self {
        self.constants.insert(name.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeMetadataProvider for ClassRegistry {
    fn describe(&self, fqn: &str) -> Option<&TypeInfo> {
        self.types.get(&normalize_type_name(fqn))
    }

    fn constant_exists(&self, name: &str) -> bool {
        match name.split_once("::") {
            Some((class, constant)) => self.describe(class).is_some_and(|info| {
                info.constants.iter().any(|c| c == constant)
                    || info.cases.iter().any(|c| c == constant)
            }),
            None => self.constants.contains(name.trim_start_matches('\\')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClassRegistry {
        ClassRegistry::new()
            .with(TypeInfo::trait_named("App\\Traet").method("traitMethod", Visibility::Public))
            .with(
                TypeInfo::class("App\\Base")
                    .property("baseProp", Visibility::Public)
                    .method("__toString", Visibility::Public),
            )
            .with(
                TypeInfo::class("App\\Child")
                    .extends("App\\Base")
                    .extends("Countable")
                    .uses("App\\Traet")
                    .constant("LIMIT"),
            )
            .with(TypeInfo::enumeration("App\\Enom", &["First", "Second"]))
            .with_constant("PHP_EOL")
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_ignores_leading_backslash() {
        let reg = registry();
        assert!(reg.type_exists("\\app\\child"));
        assert!(reg.type_exists("App\\Child"));
        assert!(!reg.type_exists("App\\Nope"));
    }

    #[test]
    fn test_subtype_follows_parents_and_traits() {
        let reg = registry();
        assert!(reg.is_subtype("App\\Child", "\\App\\Base"));
        assert!(reg.is_subtype("App\\Child", "App\\Traet"));
        assert!(reg.is_subtype("App\\Child", "Countable"));
        assert!(!reg.is_subtype("App\\Base", "App\\Child"));
    }

    #[test]
    fn test_subtype_survives_cycles() {
        let reg = ClassRegistry::new()
            .with(TypeInfo::class("A").extends("B"))
            .with(TypeInfo::class("B").extends("A"));
        assert!(!reg.is_subtype("A", "C"));
        assert!(reg.is_subtype("A", "B"));
        assert_eq!(reg.lineage("A").len(), 2);
    }

    #[test]
    fn test_inherited_members() {
        let reg = registry();
        assert!(reg.find_property("App\\Child", "baseProp").is_some());
        assert!(reg.find_property("App\\Child", "baseprop").is_none());
        assert!(reg.find_method("App\\Child", "TRAITMETHOD").is_some());
        assert!(reg.is_stringable("App\\Child"));
    }

    #[test]
    fn test_constants() {
        let reg = registry();
        assert!(reg.constant_exists("PHP_EOL"));
        assert!(reg.constant_exists("App\\Child::LIMIT"));
        assert!(reg.constant_exists("\\App\\Enom::First"));
        assert!(!reg.constant_exists("App\\Child::NOPE"));
        assert!(!reg.constant_exists("NOPE"));
    }

    #[test]
    fn test_enum_cases_only_for_enums() {
        let reg = registry();
        assert_eq!(
            reg.enum_cases("App\\Enom"),
            Some(&["First".to_string(), "Second".to_string()][..])
        );
        assert_eq!(reg.enum_cases("App\\Child"), None);
    }

    #[test]
    fn test_from_json() {
        let reg = ClassRegistry::from_json(
            r#"{
                "types": [
                    {"name": "App\\Widget", "properties": [{"name": "attr"}]},
                    {"name": "App\\Suit", "kind": "enum", "cases": ["Hearts"]}
                ],
                "constants": ["E_ALL"]
            }"#,
        )
        .unwrap();
        assert_eq!(reg.len(), 2);
        assert!(reg.find_property("App\\Widget", "attr").unwrap().is_public());
        assert!(reg.enum_cases("App\\Suit").is_some());
        assert!(reg.constant_exists("E_ALL"));
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let err = ClassRegistry::from_json(r#"{"types": [{"name": "A"}, {"name": "\\a"}]}"#)
            .unwrap_err();
        assert!(matches!(err, MetadataError::Duplicate(_)));
    }
}
