// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Runtime-type abstraction and resolver seams.
//!
//! The engine never inspects language metadata directly.  Everything it needs
//! to know about a live type arrives through these traits: a [`MemberSource`]
//! turns a runtime type into an ordered persistable field description, a
//! [`TypeResolver`] maps persisted type names back to runtime types, and a
//! [`FieldLengthResolver`] supplies the persisted length bounds per value
//! type.  Production object models implement these; the in-memory fixtures
//! here back the tests and embedded use.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::member::{self, MemberDescriptor};

// ---------------------------------------------------------------------------
// RuntimeType
// ---------------------------------------------------------------------------

/// Kind of a runtime type, as far as persistence cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeTypeKind {
    /// Plain instance-bearing class or struct.
    Class,
    /// Primitive value type (persisted as a primitive definition).
    Primitive,
    /// Enum type with an ordered constant list.
    Enum,
    /// Abstract type: interfaces and abstract classes. Never has instances of
    /// exactly this type, so it gets no instance handler.
    Abstract,
}

/// One declared persistable field of a runtime type.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeField {
    /// Declaring type name (the field's qualifier).
    pub declaring_type_name: String,
    /// Simple field name.
    pub field_name: String,
    /// Persisted type name of the field's value type.
    pub type_name: String,
    /// Whether values are persisted by reference.
    pub is_reference: bool,
}

/// Owned description of a live type: the engine's entire view of the runtime
/// type system.  Identity is the fully qualified `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeType {
    pub name: String,
    pub kind: RuntimeTypeKind,
    /// Declared persistable fields in binary layout order (supertype fields
    /// first).
    pub fields: Vec<RuntimeField>,
    /// Enum constant names in ordinal order. Empty unless `kind` is `Enum`.
    pub enum_constants: Vec<String>,
    /// Direct superclass name, if any.
    pub supertype: Option<String>,
    /// Directly implemented interface names in declaration order.
    pub interfaces: Vec<String>,
}

/// Shared handle to a runtime type description.
pub type RuntimeTypeRef = Arc<RuntimeType>;

impl RuntimeType {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RuntimeTypeKind::Class,
            fields: Vec::new(),
            enum_constants: Vec::new(),
            supertype: None,
            interfaces: Vec::new(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            kind: RuntimeTypeKind::Primitive,
            ..Self::class(name)
        }
    }

    pub fn enumeration(name: impl Into<String>, constants: Vec<String>) -> Self {
        Self {
            kind: RuntimeTypeKind::Enum,
            enum_constants: constants,
            ..Self::class(name)
        }
    }

    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self {
            kind: RuntimeTypeKind::Abstract,
            ..Self::class(name)
        }
    }

    pub fn with_field(
        mut self,
        declaring_type_name: impl Into<String>,
        field_name: impl Into<String>,
        type_name: impl Into<String>,
        is_reference: bool,
    ) -> Self {
        self.fields.push(RuntimeField {
            declaring_type_name: declaring_type_name.into(),
            field_name: field_name.into(),
            type_name: type_name.into(),
            is_reference,
        });
        self
    }

    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertype = Some(name.into());
        self
    }

    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == RuntimeTypeKind::Abstract
    }
}

// ---------------------------------------------------------------------------
// Resolver seams
// ---------------------------------------------------------------------------

/// Maps persisted type names to runtime types.
///
/// Returning `None` means the type name is unresolvable in the current
/// runtime, which is a legitimate state (unreachable legacy types), never an
/// error by itself.
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, type_name: &str) -> Option<RuntimeTypeRef>;

    /// Resolve or fail with [`Error::MissingRuntimeType`].
    fn require_type(&self, type_name: &str) -> Result<RuntimeTypeRef> {
        self.resolve_type(type_name).ok_or_else(|| Error::MissingRuntimeType {
            type_name: type_name.to_string(),
        })
    }
}

/// Produces the ordered persistable member description of a runtime type.
pub trait MemberSource: Send + Sync {
    /// Full member sequence for the given runtime type, in persisted order.
    fn describe_members(&self, runtime_type: &RuntimeType) -> Result<Vec<MemberDescriptor>>;

    /// Whether the type can be persisted at all.  Object models veto e.g.
    /// types holding process-local resources.
    fn is_persistable(&self, _runtime_type: &RuntimeType) -> bool {
        true
    }
}

/// Supplies persisted length bounds per value type name.
pub trait FieldLengthResolver: Send + Sync {
    /// Fixed persisted length of a non-reference value of the named type.
    fn resolve_fixed_length(&self, type_name: &str) -> u64;

    /// Persisted length of a reference slot.
    fn reference_length(&self) -> u64 {
        8
    }

    /// Minimum persisted length of an inlined variable-length value.
    fn variable_min_length(&self, _type_name: &str) -> u64 {
        0
    }

    /// Maximum persisted length of an inlined variable-length value.
    fn variable_max_length(&self, _type_name: &str) -> u64 {
        u64::MAX
    }
}

/// Optional renaming hook applied when resolving persisted type names, e.g.
/// for refactored package moves.
pub trait TypeNameMapper: Send + Sync {
    /// The current name for a persisted type name, or `None` to keep it.
    fn map_type_name(&self, type_name: &str) -> Option<String>;
}

/// A mapper that never renames.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTypeNameMapper;

impl TypeNameMapper for IdentityTypeNameMapper {
    fn map_type_name(&self, _type_name: &str) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// StandardLengthResolver
// ---------------------------------------------------------------------------

/// Default length resolver with the conventional primitive sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLengthResolver;

impl FieldLengthResolver for StandardLengthResolver {
    fn resolve_fixed_length(&self, type_name: &str) -> u64 {
        match type_name {
            "byte" | "boolean" => 1,
            "short" | "char" => 2,
            "int" | "float" => 4,
            "long" | "double" => 8,
            // non-primitive value types are persisted by reference
            _ => self.reference_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// StandardMemberSource
// ---------------------------------------------------------------------------

/// Derives member descriptors straight from a [`RuntimeType`] description.
pub struct StandardMemberSource<L: FieldLengthResolver = StandardLengthResolver> {
    length_resolver: L,
}

impl Default for StandardMemberSource<StandardLengthResolver> {
    fn default() -> Self {
        Self::new(StandardLengthResolver)
    }
}

impl<L: FieldLengthResolver> StandardMemberSource<L> {
    pub fn new(length_resolver: L) -> Self {
        Self { length_resolver }
    }

    fn describe_field(&self, field: &RuntimeField) -> MemberDescriptor {
        if member::is_variable_length_type(&field.type_name) {
            return MemberDescriptor::variable_length_field(
                field.type_name.clone(),
                Some(field.declaring_type_name.clone()),
                field.field_name.clone(),
                self.length_resolver.variable_min_length(&field.type_name),
                self.length_resolver.variable_max_length(&field.type_name),
            );
        }
        let length = if field.is_reference {
            self.length_resolver.reference_length()
        } else {
            self.length_resolver.resolve_fixed_length(&field.type_name)
        };
        MemberDescriptor::reflective_field(
            field.type_name.clone(),
            field.declaring_type_name.clone(),
            field.field_name.clone(),
            field.is_reference,
            length,
            length,
        )
    }
}

impl<L: FieldLengthResolver> MemberSource for StandardMemberSource<L> {
    fn describe_members(&self, runtime_type: &RuntimeType) -> Result<Vec<MemberDescriptor>> {
        match runtime_type.kind {
            RuntimeTypeKind::Primitive => {
                let length = self.length_resolver.resolve_fixed_length(&runtime_type.name);
                Ok(vec![MemberDescriptor::primitive(runtime_type.name.clone(), length)])
            }
            RuntimeTypeKind::Enum => {
                let mut members: Vec<MemberDescriptor> = runtime_type
                    .enum_constants
                    .iter()
                    .map(|c| MemberDescriptor::enum_constant(c.clone()))
                    .collect();
                members.extend(runtime_type.fields.iter().map(|f| self.describe_field(f)));
                Ok(members)
            }
            RuntimeTypeKind::Class | RuntimeTypeKind::Abstract => {
                Ok(runtime_type.fields.iter().map(|f| self.describe_field(f)).collect())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryTypeResolver
// ---------------------------------------------------------------------------

/// Map-backed resolver for embedded use and tests, with an optional name
/// mapper applied before lookup.
pub struct InMemoryTypeResolver {
    types: BTreeMap<String, RuntimeTypeRef>,
    name_mapper: Box<dyn TypeNameMapper>,
}

impl Default for InMemoryTypeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTypeResolver {
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
            name_mapper: Box::new(IdentityTypeNameMapper),
        }
    }

    pub fn with_name_mapper(mut self, mapper: impl TypeNameMapper + 'static) -> Self {
        self.name_mapper = Box::new(mapper);
        self
    }

    pub fn register(&mut self, runtime_type: RuntimeType) -> RuntimeTypeRef {
        let handle: RuntimeTypeRef = Arc::new(runtime_type);
        self.types.insert(handle.name.clone(), Arc::clone(&handle));
        handle
    }
}

impl TypeResolver for InMemoryTypeResolver {
    fn resolve_type(&self, type_name: &str) -> Option<RuntimeTypeRef> {
        let mapped = self.name_mapper.map_type_name(type_name);
        let effective = mapped.as_deref().unwrap_or(type_name);
        self.types.get(effective).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> RuntimeType {
        RuntimeType::class("com.app.Person")
            .with_field("com.app.Person", "name", "java.lang.String", true)
            .with_field("com.app.Person", "age", "int", false)
    }

    #[test]
    fn member_source_orders_fields_and_sizes_them() {
        let source = StandardMemberSource::default();
        let members = source.describe_members(&person()).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].identifier(), "com.app.Person#name");
        assert_eq!(members[0].persistent_max_length(), 8);
        assert!(members[0].is_reference());
        assert_eq!(members[1].persistent_max_length(), 4);
        assert!(!members[1].is_reference());
    }

    #[test]
    fn member_source_emits_enum_constants_before_fields() {
        let source = StandardMemberSource::default();
        let color = RuntimeType::enumeration(
            "com.app.Color",
            vec!["RED".into(), "GREEN".into()],
        )
        .with_field("com.app.Color", "rgb", "int", false);
        let members = source.describe_members(&color).unwrap();
        assert!(members[0].is_enum_constant());
        assert!(members[1].is_enum_constant());
        assert!(members[2].is_instance_member());
    }

    #[test]
    fn primitive_type_gets_single_definition_member() {
        let source = StandardMemberSource::default();
        let members = source.describe_members(&RuntimeType::primitive("int")).unwrap();
        assert_eq!(members.len(), 1);
        assert!(members[0].is_primitive_definition());
        assert_eq!(members[0].persistent_min_length(), 4);
    }

    #[test]
    fn resolver_applies_name_mapper() {
        struct Renamer;
        impl TypeNameMapper for Renamer {
            fn map_type_name(&self, type_name: &str) -> Option<String> {
                (type_name == "old.Person").then(|| "com.app.Person".to_string())
            }
        }
        let mut resolver = InMemoryTypeResolver::new().with_name_mapper(Renamer);
        resolver.register(person());
        assert!(resolver.resolve_type("old.Person").is_some());
        assert!(resolver.resolve_type("other.Gone").is_none());
    }

    #[test]
    fn require_type_reports_missing() {
        let resolver = InMemoryTypeResolver::new();
        let err = resolver.require_type("a.B").unwrap_err();
        assert!(matches!(err, Error::MissingRuntimeType { .. }));
    }
}
