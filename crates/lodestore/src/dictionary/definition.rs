// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type definitions and per-name lineages.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConsistencyError;
use crate::member::{self, MemberDescriptor};

// ---------------------------------------------------------------------------
// TypeDefinition
// ---------------------------------------------------------------------------

/// One immutable version of a type's persisted layout: a type id, a type
/// name and an ordered member sequence.
///
/// Type id 0 means "not yet assigned"; such definitions can be described and
/// compared but never registered in a dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    type_id: u64,
    type_name: String,
    /// All members, including primitive definitions and enum constants.
    all_members: Vec<MemberDescriptor>,
    /// Cached: whether any member is or contains a reference.
    has_references: bool,
    /// Cached: whether this definition describes a primitive type.
    is_primitive: bool,
    min_length: u64,
    max_length: u64,
}

/// Shared handle to an immutable type definition.
pub type TypeDefinitionRef = Arc<TypeDefinition>;

impl TypeDefinition {
    pub fn new(type_id: u64, type_name: impl Into<String>, all_members: Vec<MemberDescriptor>) -> Self {
        let has_references = member::determine_has_references(&all_members);
        let is_primitive = member::determine_is_primitive(&all_members);
        let min_length = member::calculate_min_length(0, instance_members(&all_members));
        let max_length = member::calculate_max_length(0, instance_members(&all_members));
        Self {
            type_id,
            type_name: type_name.into(),
            all_members,
            has_references,
            is_primitive,
            min_length,
            max_length,
        }
    }

    pub fn type_id(&self) -> u64 {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All members including type-level metadata members.
    pub fn all_members(&self) -> &[MemberDescriptor] {
        &self.all_members
    }

    /// Only members occupying instance data slots.
    pub fn instance_members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.all_members.iter().filter(|m| m.is_instance_member())
    }

    /// Enum constant members in persisted ordinal order.
    pub fn enum_constants(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.all_members.iter().filter(|m| m.is_enum_constant())
    }

    pub fn is_enum(&self) -> bool {
        self.all_members.iter().any(|m| m.is_enum_constant())
    }

    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    pub fn has_references(&self) -> bool {
        self.has_references
    }

    pub fn has_assigned_type_id(&self) -> bool {
        self.type_id != 0
    }

    /// Minimum persisted instance length (sum over instance members).
    pub fn min_persisted_length(&self) -> u64 {
        self.min_length
    }

    /// Maximum persisted instance length (sum over instance members).
    pub fn max_persisted_length(&self) -> u64 {
        self.max_length
    }

    pub fn is_fixed_length(&self) -> bool {
        self.min_length == self.max_length
    }

    /// Same type name and position-wise structure-equal member sequence.
    pub fn equals_structure(&self, other: &TypeDefinition) -> bool {
        self.type_name == other.type_name
            && member::equal_structures(&self.all_members, &other.all_members)
    }

    /// Structure equality plus equal type ids and description-equal members.
    pub fn equals_description(&self, other: &TypeDefinition) -> bool {
        self.type_id == other.type_id
            && self.type_name == other.type_name
            && member::equal_descriptions(&self.all_members, &other.all_members)
    }
}

fn instance_members(members: &[MemberDescriptor]) -> &[MemberDescriptor] {
    // metadata members report length 0, so summing over all members is
    // equivalent; kept as a named seam for readability at call sites
    members
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_id, self.type_name)
    }
}

// ---------------------------------------------------------------------------
// TypeLineage
// ---------------------------------------------------------------------------

/// All known versions of one type name, ordered by ascending type id, with
/// at most one version marked as the current runtime definition.
#[derive(Debug, Default)]
pub struct TypeLineage {
    type_name: String,
    /// Versions by type id, ascending. The latest entry is the newest layout.
    entries: BTreeMap<u64, TypeDefinitionRef>,
    runtime_definition: Option<TypeDefinitionRef>,
}

impl TypeLineage {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: BTreeMap::new(),
            runtime_definition: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn entries(&self) -> &BTreeMap<u64, TypeDefinitionRef> {
        &self.entries
    }

    pub fn latest(&self) -> Option<&TypeDefinitionRef> {
        self.entries.values().next_back()
    }

    /// The newest version not marked as the runtime definition, i.e. the
    /// most recent superseded layout. Equals [`latest`](Self::latest) while
    /// no runtime definition is set.
    pub fn latest_persisted(&self) -> Option<&TypeDefinitionRef> {
        let runtime_id = self.runtime_definition.as_ref().map(|d| d.type_id());
        self.entries
            .values()
            .rev()
            .find(move |d| Some(d.type_id()) != runtime_id)
    }

    /// The definition matching the current runtime layout, if initialized.
    pub fn runtime_definition(&self) -> Option<&TypeDefinitionRef> {
        self.runtime_definition.as_ref()
    }

    /// Register a definition version. Re-registering a description-equal
    /// definition under the same id is a no-op returning `false`; a
    /// different definition under an occupied id is a consistency error.
    pub fn register(&mut self, definition: TypeDefinitionRef) -> Result<bool, ConsistencyError> {
        debug_assert_eq!(definition.type_name(), self.type_name);
        if !definition.has_assigned_type_id() {
            return Err(ConsistencyError::UnassignedTypeId {
                type_name: definition.type_name().to_string(),
            });
        }
        match self.entries.get(&definition.type_id()) {
            Some(existing) if existing.equals_description(&definition) => Ok(false),
            Some(existing) => Err(ConsistencyError::DuplicateTypeId {
                type_id: definition.type_id(),
                existing: existing.type_name().to_string(),
                conflicting: definition.type_name().to_string(),
            }),
            None => {
                self.entries.insert(definition.type_id(), definition);
                Ok(true)
            }
        }
    }

    /// Mark the given registered version as the current runtime definition.
    ///
    /// Setting the same definition again is a no-op returning `false`;
    /// setting a different one after initialization is a consistency error.
    pub fn set_runtime_definition(
        &mut self,
        definition: TypeDefinitionRef,
    ) -> Result<bool, ConsistencyError> {
        match &self.runtime_definition {
            Some(current) if Arc::ptr_eq(current, &definition)
                || current.equals_description(&definition) =>
            {
                Ok(false)
            }
            Some(_) => Err(ConsistencyError::RuntimeDefinitionConflict {
                type_name: self.type_name.clone(),
            }),
            None => {
                self.runtime_definition = Some(definition);
                Ok(true)
            }
        }
    }

    /// Versions other than the runtime definition, i.e. the legacy layouts.
    pub fn legacy_entries(&self) -> impl Iterator<Item = &TypeDefinitionRef> {
        let runtime_id = self.runtime_definition.as_ref().map(|d| d.type_id());
        self.entries
            .values()
            .filter(move |d| Some(d.type_id()) != runtime_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
