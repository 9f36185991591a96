// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Member descriptor model.
//!
//! A [`MemberDescriptor`] describes one persisted field or slot of a type
//! layout: its type name, its (optionally qualified) name and its length
//! bounds in the persisted form.  The set of shapes is closed; the dictionary
//! text grammar and the schema-evolution matcher operate over this enum only.
//!
//! Two independent equality notions exist:
//!
//! - **structural** equality considers only the shape (type name + simple
//!   name, nested members for complex fields).  Qualifiers are ignored since
//!   they only serve intra-type identification.
//! - **description** equality additionally compares the qualifier and, for
//!   primitive definitions and enum constants, the literal definition data.

use std::fmt;

// ---------------------------------------------------------------------------
// Dictionary symbols
// ---------------------------------------------------------------------------

/// Separator between a member's qualifier and its simple name.
pub const FIELD_QUALIFIER_SEPARATOR: char = '#';
/// Keyword introducing a primitive definition member.
pub const KEYWORD_PRIMITIVE: &str = "primitive";
/// Keyword introducing an enum constant member.
pub const KEYWORD_ENUM: &str = "enum";
/// Inlined variable-length byte blob type.
pub const TYPE_BYTES: &str = "[byte]";
/// Inlined variable-length char blob type.
pub const TYPE_CHARS: &str = "[char]";
/// Inlined complex (nested member list) type.
pub const TYPE_COMPLEX: &str = "[list]";

/// Whether the given type name denotes an inlined variable-length type.
pub fn is_variable_length_type(type_name: &str) -> bool {
    matches!(type_name, TYPE_BYTES | TYPE_CHARS | TYPE_COMPLEX)
}

/// Whether the given type name denotes the inlined complex type.
pub fn is_complex_type(type_name: &str) -> bool {
    type_name == TYPE_COMPLEX
}

/// Whether the given type name is a primitive value type name.
pub fn is_primitive_type_name(type_name: &str) -> bool {
    matches!(
        type_name,
        "byte" | "boolean" | "short" | "char" | "int" | "float" | "long" | "double"
    )
}

/// Render the full qualified field name (`qualifier#name` or just `name`).
pub fn full_qualified_field_name(qualifier: Option<&str>, name: &str) -> String {
    match qualifier {
        Some(q) => format!("{}{}{}", q, FIELD_QUALIFIER_SEPARATOR, name),
        None => name.to_string(),
    }
}

/// Split a full qualified field name into `(qualifier, simple name)`.
pub fn split_full_qualified_field_name(identifier: &str) -> (Option<&str>, &str) {
    match identifier.rfind(FIELD_QUALIFIER_SEPARATOR) {
        Some(idx) => (
            Some(identifier[..idx].trim()),
            identifier[idx + 1..].trim(),
        ),
        None => (None, identifier),
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// Common data of all field-shaped members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Persisted type name of the field's value.
    pub type_name: String,
    /// Intra-type qualifier (declaring type for reflective fields), if any.
    pub qualifier: Option<String>,
    /// Simple field name.
    pub field_name: String,
    /// Whether the persisted value is a reference to another object.
    pub is_reference: bool,
    /// Lowest possible persisted length of this member.
    pub min_length: u64,
    /// Highest possible persisted length of this member.
    pub max_length: u64,
}

impl FieldDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        qualifier: Option<String>,
        field_name: impl Into<String>,
        is_reference: bool,
        min_length: u64,
        max_length: u64,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier,
            field_name: field_name.into(),
            is_reference,
            min_length,
            max_length,
        }
    }
}

// ---------------------------------------------------------------------------
// MemberDescriptor
// ---------------------------------------------------------------------------

/// Description of one persisted member (field, slot, constant or primitive
/// definition) of a type layout.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberDescriptor {
    /// A primitive value definition, e.g. `primitive int`.  Not an instance
    /// member; describes the sole value of a primitive type entry.
    PrimitiveDefinition {
        /// The literal definition string, e.g. `"int"`.
        definition: String,
        /// Fixed persisted length of the primitive value.
        length: u64,
    },
    /// An enum constant name slot.  Not an instance member.
    EnumConstant {
        /// The name as persisted in the dictionary.
        persisted_name: String,
        /// The current runtime name, if the constant still exists.
        runtime_name: Option<String>,
        /// Whether the constant was deleted in the current runtime type.
        is_deleted: bool,
    },
    /// A field bound to a runtime type's declared field (qualifier is the
    /// declaring type name and is always present).
    ReflectiveField(FieldDescriptor),
    /// A generic fixed-or-reference field not bound to runtime reflection.
    GenericSimpleField(FieldDescriptor),
    /// A generic variable-length field (`[byte]` / `[char]` blobs).
    GenericVariableLengthField(FieldDescriptor),
    /// A generic complex field: an inlined list of nested members.
    GenericComplexField {
        qualifier: Option<String>,
        field_name: String,
        nested: Vec<MemberDescriptor>,
        min_length: u64,
        max_length: u64,
    },
}

impl MemberDescriptor {
    // -- constructors -------------------------------------------------------

    pub fn primitive(definition: impl Into<String>, length: u64) -> Self {
        MemberDescriptor::PrimitiveDefinition {
            definition: definition.into(),
            length,
        }
    }

    pub fn enum_constant(persisted_name: impl Into<String>) -> Self {
        let name = persisted_name.into();
        MemberDescriptor::EnumConstant {
            runtime_name: Some(name.clone()),
            persisted_name: name,
            is_deleted: false,
        }
    }

    pub fn deleted_enum_constant(persisted_name: impl Into<String>) -> Self {
        MemberDescriptor::EnumConstant {
            persisted_name: persisted_name.into(),
            runtime_name: None,
            is_deleted: true,
        }
    }

    pub fn reflective_field(
        type_name: impl Into<String>,
        declaring_type_name: impl Into<String>,
        field_name: impl Into<String>,
        is_reference: bool,
        min_length: u64,
        max_length: u64,
    ) -> Self {
        MemberDescriptor::ReflectiveField(FieldDescriptor::new(
            type_name,
            Some(declaring_type_name.into()),
            field_name,
            is_reference,
            min_length,
            max_length,
        ))
    }

    pub fn simple_field(
        type_name: impl Into<String>,
        qualifier: Option<String>,
        field_name: impl Into<String>,
        is_reference: bool,
        min_length: u64,
        max_length: u64,
    ) -> Self {
        MemberDescriptor::GenericSimpleField(FieldDescriptor::new(
            type_name,
            qualifier,
            field_name,
            is_reference,
            min_length,
            max_length,
        ))
    }

    pub fn variable_length_field(
        type_name: impl Into<String>,
        qualifier: Option<String>,
        field_name: impl Into<String>,
        min_length: u64,
        max_length: u64,
    ) -> Self {
        MemberDescriptor::GenericVariableLengthField(FieldDescriptor::new(
            type_name, qualifier, field_name, false, min_length, max_length,
        ))
    }

    pub fn complex_field(
        qualifier: Option<String>,
        field_name: impl Into<String>,
        nested: Vec<MemberDescriptor>,
        min_length: u64,
        max_length: u64,
    ) -> Self {
        MemberDescriptor::GenericComplexField {
            qualifier,
            field_name: field_name.into(),
            nested,
            min_length,
            max_length,
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Persisted type name of this member.
    pub fn type_name(&self) -> &str {
        match self {
            MemberDescriptor::PrimitiveDefinition { .. } => KEYWORD_PRIMITIVE,
            MemberDescriptor::EnumConstant { .. } => KEYWORD_ENUM,
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f)
            | MemberDescriptor::GenericVariableLengthField(f) => &f.type_name,
            MemberDescriptor::GenericComplexField { .. } => TYPE_COMPLEX,
        }
    }

    /// Intra-type qualifier, if any.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            MemberDescriptor::PrimitiveDefinition { .. }
            | MemberDescriptor::EnumConstant { .. } => None,
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f)
            | MemberDescriptor::GenericVariableLengthField(f) => f.qualifier.as_deref(),
            MemberDescriptor::GenericComplexField { qualifier, .. } => qualifier.as_deref(),
        }
    }

    /// Simple ("primary") name, if applicable.
    pub fn name(&self) -> Option<&str> {
        match self {
            MemberDescriptor::PrimitiveDefinition { .. } => None,
            MemberDescriptor::EnumConstant { persisted_name, .. } => Some(persisted_name),
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f)
            | MemberDescriptor::GenericVariableLengthField(f) => Some(&f.field_name),
            MemberDescriptor::GenericComplexField { field_name, .. } => Some(field_name),
        }
    }

    /// The name uniquely identifying this member inside its parent member
    /// group.  Never empty.
    pub fn identifier(&self) -> String {
        match self {
            MemberDescriptor::PrimitiveDefinition { definition, .. } => definition.clone(),
            MemberDescriptor::EnumConstant { persisted_name, .. } => persisted_name.clone(),
            _ => full_qualified_field_name(
                self.qualifier(),
                self.name().unwrap_or_default(),
            ),
        }
    }

    pub fn is_primitive_definition(&self) -> bool {
        matches!(self, MemberDescriptor::PrimitiveDefinition { .. })
    }

    pub fn is_enum_constant(&self) -> bool {
        matches!(self, MemberDescriptor::EnumConstant { .. })
    }

    /// Whether this member occupies a slot in instance data.  Primitive
    /// definitions and enum constant names are type-level metadata only.
    pub fn is_instance_member(&self) -> bool {
        !self.is_primitive_definition() && !self.is_enum_constant()
    }

    /// Whether this member directly is a reference.
    pub fn is_reference(&self) -> bool {
        match self {
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f) => f.is_reference,
            _ => false,
        }
    }

    /// Whether this member is or contains references (complex fields check
    /// their nested members).
    pub fn has_references(&self) -> bool {
        match self {
            MemberDescriptor::GenericComplexField { nested, .. } => {
                nested.iter().any(MemberDescriptor::has_references)
            }
            other => other.is_reference(),
        }
    }

    /// Lowest possible persisted length of this member.
    pub fn persistent_min_length(&self) -> u64 {
        match self {
            MemberDescriptor::PrimitiveDefinition { length, .. } => *length,
            MemberDescriptor::EnumConstant { .. } => 0,
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f)
            | MemberDescriptor::GenericVariableLengthField(f) => f.min_length,
            MemberDescriptor::GenericComplexField { min_length, .. } => *min_length,
        }
    }

    /// Highest possible persisted length of this member.
    pub fn persistent_max_length(&self) -> u64 {
        match self {
            MemberDescriptor::PrimitiveDefinition { length, .. } => *length,
            MemberDescriptor::EnumConstant { .. } => 0,
            MemberDescriptor::ReflectiveField(f)
            | MemberDescriptor::GenericSimpleField(f)
            | MemberDescriptor::GenericVariableLengthField(f) => f.max_length,
            MemberDescriptor::GenericComplexField { max_length, .. } => *max_length,
        }
    }

    /// Fixed length iff minimum and maximum persisted length coincide.
    pub fn is_fixed_length(&self) -> bool {
        self.persistent_min_length() == self.persistent_max_length()
    }

    pub fn is_variable_length(&self) -> bool {
        !self.is_fixed_length()
    }

    // -- equality -----------------------------------------------------------

    /// Structural equality: same type name and simple name, deep over nested
    /// members for complex fields.  Qualifiers are ignored, as are the
    /// concrete variants (a reflective and a generic simple field with equal
    /// type and name are structure-equal).
    pub fn equals_structure(&self, other: &MemberDescriptor) -> bool {
        if self.type_name() != other.type_name() || self.name() != other.name() {
            return false;
        }
        match (self, other) {
            (
                MemberDescriptor::GenericComplexField { nested: n1, .. },
                MemberDescriptor::GenericComplexField { nested: n2, .. },
            ) => equal_structures(n1, n2),
            // type name equality already rules out complex-vs-non-complex
            _ => true,
        }
    }

    /// Description equality: structural equality plus qualifier equality,
    /// plus literal definition data for primitive definitions and the
    /// deletion state for enum constants.
    pub fn equals_description(&self, other: &MemberDescriptor) -> bool {
        if !self.equals_structure(other) || self.qualifier() != other.qualifier() {
            return false;
        }
        match (self, other) {
            (
                MemberDescriptor::PrimitiveDefinition { definition: d1, .. },
                MemberDescriptor::PrimitiveDefinition { definition: d2, .. },
            ) => d1 == d2,
            (
                MemberDescriptor::EnumConstant { is_deleted: x1, .. },
                MemberDescriptor::EnumConstant { is_deleted: x2, .. },
            ) => x1 == x2,
            (
                MemberDescriptor::GenericComplexField { nested: n1, .. },
                MemberDescriptor::GenericComplexField { nested: n2, .. },
            ) => equal_descriptions(n1, n2),
            _ => true,
        }
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberDescriptor::PrimitiveDefinition { definition, .. } => {
                write!(f, "{} {}", KEYWORD_PRIMITIVE, definition)
            }
            MemberDescriptor::EnumConstant { persisted_name, .. } => {
                write!(f, "{} {}", KEYWORD_ENUM, persisted_name)
            }
            other => write!(f, "{} {}", other.type_name(), other.identifier()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sequence equality
// ---------------------------------------------------------------------------

/// Element-wise member sequence comparison.
///
/// Never short-circuits on a size mismatch: the equalator is called with
/// `None` on the exhausted side so that mismatches remain attributable to a
/// specific position.
pub fn equal_members<F>(
    members1: &[MemberDescriptor],
    members2: &[MemberDescriptor],
    mut equalator: F,
) -> bool
where
    F: FnMut(Option<&MemberDescriptor>, Option<&MemberDescriptor>) -> bool,
{
    let mut it1 = members1.iter();
    let mut it2 = members2.iter();
    loop {
        match (it1.next(), it2.next()) {
            (None, None) => return true,
            (m1, m2) => {
                if !equalator(m1, m2) {
                    return false;
                }
            }
        }
    }
}

/// Whether two member sequences are position-wise structure-equal.
pub fn equal_structures(members1: &[MemberDescriptor], members2: &[MemberDescriptor]) -> bool {
    equal_members(members1, members2, |m1, m2| match (m1, m2) {
        (Some(a), Some(b)) => a.equals_structure(b),
        _ => false,
    })
}

/// Whether two member sequences are position-wise description-equal.
pub fn equal_descriptions(members1: &[MemberDescriptor], members2: &[MemberDescriptor]) -> bool {
    equal_members(members1, members2, |m1, m2| match (m1, m2) {
        (Some(a), Some(b)) => a.equals_description(b),
        _ => false,
    })
}

/// Whether any member of the sequence is or contains a reference.
pub fn determine_has_references(members: &[MemberDescriptor]) -> bool {
    members.iter().any(MemberDescriptor::has_references)
}

/// Whether the sequence describes a primitive type (exactly one primitive
/// definition member).
pub fn determine_is_primitive(members: &[MemberDescriptor]) -> bool {
    members.len() == 1 && members[0].is_primitive_definition()
}

/// Sum of minimum persisted lengths, saturating.
pub fn calculate_min_length(start: u64, members: &[MemberDescriptor]) -> u64 {
    members
        .iter()
        .fold(start, |acc, m| acc.saturating_add(m.persistent_min_length()))
}

/// Sum of maximum persisted lengths, saturating.
pub fn calculate_max_length(start: u64, members: &[MemberDescriptor]) -> u64 {
    members
        .iter()
        .fold(start, |acc, m| acc.saturating_add(m.persistent_max_length()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
