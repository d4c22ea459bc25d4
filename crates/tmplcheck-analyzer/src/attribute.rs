//! Attribute-access validation against declared types.
//!
//! Only accesses whose receiver is a declared variable are checked; the
//! caller decides that. Unknown classes and loosely typed receivers
//! (`iterable`, `object`, `mixed`) are never reported.

use thiserror::Error;
use tmplcheck_types::ast::AccessKind;

use crate::metadata::TypeMetadataProvider;
use crate::ty::TypeExpr;

/// Why an access is invalid. Display gives the message without location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Invalid dot operation on unsupported type '{0}'")]
    UnsupportedType(String),
    #[error("Invalid attribute '{attribute}' for type '{ty}'")]
    InvalidAttribute { attribute: String, ty: String },
    #[error("Invalid enum case '{0}'")]
    InvalidEnumCase(String),
}

/// Check `receiver.attribute` where the receiver was declared as `declared`.
pub fn check_access(
    declared: &TypeExpr,
    attribute: &str,
    access: AccessKind,
    provider: &dyn TypeMetadataProvider,
) -> Result<(), AccessError> {
    if access == AccessKind::Array {
        return Ok(());
    }

    let ty = declared.non_null();
    if ty.is_scalar() {
        return Err(AccessError::UnsupportedType(ty.to_string()));
    }

    if let TypeExpr::ClassRef(class) = ty {
        if provider.type_exists(class) && !has_attribute(class, attribute, access, provider) {
            return Err(AccessError::InvalidAttribute {
                attribute: attribute.to_string(),
                ty: ty.to_string(),
            });
        }
    }
    Ok(())
}

/// Resolve an attribute the way the runtime does: public property, then
/// documented virtual property, then the first existing method among
/// `name`, `getName`, `isName`, `hasName`. Method calls only look at methods.
fn has_attribute(
    class: &str,
    attribute: &str,
    access: AccessKind,
    provider: &dyn TypeMetadataProvider,
) -> bool {
    if access != AccessKind::Method {
        if provider
            .find_property(class, attribute)
            .is_some_and(|p| p.is_public())
        {
            return true;
        }
        if provider.has_virtual_property(class, attribute) {
            return true;
        }
    }

    let candidates = [
        attribute.to_string(),
        format!("get{attribute}"),
        format!("is{attribute}"),
        format!("has{attribute}"),
    ];
    candidates
        .iter()
        .find_map(|name| provider.find_method(class, name))
        .is_some_and(|m| m.is_public())
}

/// Check `enum('Fqn').case`. Unknown enums are not reported.
pub fn check_enum_case(
    enum_name: &str,
    case: &str,
    provider: &dyn TypeMetadataProvider,
) -> Result<(), AccessError> {
    if case == "cases" {
        return Ok(());
    }
    match provider.enum_cases(enum_name) {
        Some(cases) if !cases.iter().any(|c| c == case) => {
            Err(AccessError::InvalidEnumCase(case.to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClassRegistry, TypeInfo, Visibility};

    fn registry() -> ClassRegistry {
        ClassRegistry::new()
            .with(
                TypeInfo::class("App\\Dummy")
                    .property("pubProp", Visibility::Public)
                    .property("protProp", Visibility::Protected)
                    .property("privProp", Visibility::Private)
                    .virtual_property("magic")
                    .method("pubMeth", Visibility::Public)
                    .method("protMeth", Visibility::Protected)
                    .method("getGit", Visibility::Public)
                    .method("isIz", Visibility::Public)
                    .method("hasHaz", Visibility::Public)
                    .method("secret", Visibility::Private)
                    .method("getSecret", Visibility::Public),
            )
            .with(TypeInfo::enumeration("App\\Enom", &["First", "Second"]))
    }

    fn check(ty: &str, attr: &str, access: AccessKind) -> Result<(), AccessError> {
        check_access(&TypeExpr::parse(ty).unwrap(), attr, access, &registry())
    }

    #[test]
    fn test_scalars_reject_dot_access() {
        for ty in ["string", "number", "boolean", "?string"] {
            let err = check(ty, "attr", AccessKind::Any).unwrap_err();
            assert!(matches!(err, AccessError::UnsupportedType(_)), "{ty}");
        }
        assert_eq!(
            check("?number", "x", AccessKind::Any).unwrap_err().to_string(),
            "Invalid dot operation on unsupported type 'number'"
        );
    }

    #[test]
    fn test_array_access_is_never_checked() {
        assert!(check("string", "0", AccessKind::Array).is_ok());
        assert!(check("\\App\\Dummy", "nope", AccessKind::Array).is_ok());
    }

    #[test]
    fn test_loose_types_pass() {
        for ty in ["iterable", "object", "mixed", "string[]", "\\App\\Unknown"] {
            assert!(check(ty, "anything", AccessKind::Any).is_ok(), "{ty}");
        }
    }

    #[test]
    fn test_class_members() {
        for attr in ["pubProp", "magic", "pubMeth", "git", "iz", "haz", "Git"] {
            assert!(check("\\App\\Dummy", attr, AccessKind::Any).is_ok(), "{attr}");
        }
        for attr in ["protProp", "privProp", "protMeth", "nope"] {
            assert!(check("\\App\\Dummy", attr, AccessKind::Any).is_err(), "{attr}");
        }
    }

    #[test]
    fn test_first_existing_method_decides() {
        // `secret` exists but is private, so `getSecret` is never consulted.
        let err = check("?\\App\\Dummy", "secret", AccessKind::Any).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid attribute 'secret' for type '\\App\\Dummy'"
        );
    }

    #[test]
    fn test_method_calls_ignore_properties() {
        assert!(check("\\App\\Dummy", "pubProp", AccessKind::Method).is_err());
        assert!(check("\\App\\Dummy", "pubMeth", AccessKind::Method).is_ok());
        assert!(check("\\App\\Dummy", "git", AccessKind::Method).is_ok());
    }

    #[test]
    fn test_enum_cases() {
        let reg = registry();
        assert!(check_enum_case("App\\Enom", "First", &reg).is_ok());
        assert!(check_enum_case("\\App\\Enom", "cases", &reg).is_ok());
        assert_eq!(
            check_enum_case("App\\Enom", "Third", &reg),
            Err(AccessError::InvalidEnumCase("Third".into()))
        );
        assert!(check_enum_case("App\\Unknown", "Third", &reg).is_ok());
    }
}
