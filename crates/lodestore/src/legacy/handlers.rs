// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Handler derivation for legacy layout versions.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::dictionary::definition::TypeDefinitionRef;
use crate::error::{ConsistencyError, Error, Result};
use crate::handler::{Instance, TypeHandler, TypeHandlerRef, TypeIdHolder};
use crate::legacy::result::MappingResult;
use crate::member::{self, MemberDescriptor};
use crate::resolving::RuntimeTypeRef;

// ---------------------------------------------------------------------------
// UnreachableTypeHandler
// ---------------------------------------------------------------------------

/// Handler for a persisted type with no runtime counterpart.  It preserves
/// the type's identity and layout so stored data stays readable as data, but
/// it can never create instances.
pub struct UnreachableTypeHandler {
    type_id: TypeIdHolder,
    definition: TypeDefinitionRef,
}

impl UnreachableTypeHandler {
    pub fn new(definition: TypeDefinitionRef) -> Self {
        Self {
            type_id: TypeIdHolder::assigned(definition.type_id()),
            definition,
        }
    }

    pub fn definition(&self) -> &TypeDefinitionRef {
        &self.definition
    }
}

impl TypeHandler for UnreachableTypeHandler {
    fn type_id(&self) -> u64 {
        self.type_id.get()
    }

    fn type_name(&self) -> &str {
        self.definition.type_name()
    }

    fn runtime_type(&self) -> Option<RuntimeTypeRef> {
        None
    }

    fn all_members(&self) -> &[MemberDescriptor] {
        self.definition.all_members()
    }

    fn initialize_type_id(&self, type_id: u64) -> Result<()> {
        self.type_id.initialize(self.type_name(), type_id)
    }

    fn create(&self) -> Result<Instance> {
        Err(Error::InstanceCreation {
            type_name: self.type_name().to_string(),
        })
    }

    fn is_legacy(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// LegacyWrapperHandler
// ---------------------------------------------------------------------------

/// Thin wrapper for a legacy version whose layout is structure-identical to
/// the current one: reading delegates straight to the current handler, only
/// the reported type id differs.
pub struct LegacyWrapperHandler {
    type_id: TypeIdHolder,
    legacy_definition: TypeDefinitionRef,
    current: TypeHandlerRef,
}

impl LegacyWrapperHandler {
    pub fn new(legacy_definition: TypeDefinitionRef, current: TypeHandlerRef) -> Self {
        Self {
            type_id: TypeIdHolder::assigned(legacy_definition.type_id()),
            legacy_definition,
            current,
        }
    }

    pub fn current_handler(&self) -> &TypeHandlerRef {
        &self.current
    }
}

impl TypeHandler for LegacyWrapperHandler {
    fn type_id(&self) -> u64 {
        self.type_id.get()
    }

    fn type_name(&self) -> &str {
        self.legacy_definition.type_name()
    }

    fn runtime_type(&self) -> Option<RuntimeTypeRef> {
        self.current.runtime_type()
    }

    fn all_members(&self) -> &[MemberDescriptor] {
        self.legacy_definition.all_members()
    }

    fn initialize_type_id(&self, type_id: u64) -> Result<()> {
        self.type_id.initialize(self.type_name(), type_id)
    }

    fn create(&self) -> Result<Instance> {
        self.current.create()
    }

    fn is_legacy(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// LegacyEnumHandler
// ---------------------------------------------------------------------------

/// Legacy enum handler carrying the persisted-to-current ordinal remapping.
/// `None` entries are constants deleted in the current runtime type.
pub struct LegacyEnumHandler {
    type_id: TypeIdHolder,
    legacy_definition: TypeDefinitionRef,
    current: TypeHandlerRef,
    ordinal_map: Vec<Option<usize>>,
}

impl LegacyEnumHandler {
    pub fn new(result: &MappingResult, current: TypeHandlerRef) -> Self {
        let ordinal_map = derive_ordinal_map(result);
        Self {
            type_id: TypeIdHolder::assigned(result.legacy_definition().type_id()),
            legacy_definition: TypeDefinitionRef::clone(result.legacy_definition()),
            current,
            ordinal_map,
        }
    }

    /// Current ordinal for a persisted legacy ordinal.
    pub fn map_ordinal(&self, legacy_ordinal: usize) -> Option<usize> {
        self.ordinal_map.get(legacy_ordinal).copied().flatten()
    }

    pub fn ordinal_map(&self) -> &[Option<usize>] {
        &self.ordinal_map
    }
}

/// Legacy enum ordinal -> current enum ordinal, from the member pairings.
fn derive_ordinal_map(result: &MappingResult) -> Vec<Option<usize>> {
    let legacy_constant_indices: Vec<usize> = result
        .legacy_definition()
        .all_members()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_enum_constant())
        .map(|(i, _)| i)
        .collect();
    let current_constant_ordinals: Vec<usize> = result
        .current_members()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_enum_constant())
        .map(|(i, _)| i)
        .collect();
    legacy_constant_indices
        .iter()
        .map(|&legacy_index| {
            result
                .current_of(legacy_index)
                .and_then(|current_index| {
                    current_constant_ordinals.iter().position(|&i| i == current_index)
                })
        })
        .collect()
}

impl TypeHandler for LegacyEnumHandler {
    fn type_id(&self) -> u64 {
        self.type_id.get()
    }

    fn type_name(&self) -> &str {
        self.legacy_definition.type_name()
    }

    fn runtime_type(&self) -> Option<RuntimeTypeRef> {
        self.current.runtime_type()
    }

    fn all_members(&self) -> &[MemberDescriptor] {
        self.legacy_definition.all_members()
    }

    fn initialize_type_id(&self, type_id: u64) -> Result<()> {
        self.type_id.initialize(self.type_name(), type_id)
    }

    fn create(&self) -> Result<Instance> {
        self.current.create()
    }

    fn is_legacy(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// MappedLegacyHandler
// ---------------------------------------------------------------------------

/// General legacy handler: reads the legacy layout and transposes values
/// into the current layout according to the stored mapping result.
pub struct MappedLegacyHandler {
    type_id: TypeIdHolder,
    result: MappingResult,
    current: TypeHandlerRef,
}

impl MappedLegacyHandler {
    pub fn new(result: MappingResult, current: TypeHandlerRef) -> Self {
        Self {
            type_id: TypeIdHolder::assigned(result.legacy_definition().type_id()),
            result,
            current,
        }
    }

    pub fn mapping_result(&self) -> &MappingResult {
        &self.result
    }

    pub fn current_handler(&self) -> &TypeHandlerRef {
        &self.current
    }
}

impl TypeHandler for MappedLegacyHandler {
    fn type_id(&self) -> u64 {
        self.type_id.get()
    }

    fn type_name(&self) -> &str {
        self.result.legacy_definition().type_name()
    }

    fn runtime_type(&self) -> Option<RuntimeTypeRef> {
        self.current.runtime_type()
    }

    fn all_members(&self) -> &[MemberDescriptor] {
        self.result.legacy_definition().all_members()
    }

    fn initialize_type_id(&self, type_id: u64) -> Result<()> {
        self.type_id.initialize(self.type_name(), type_id)
    }

    fn create(&self) -> Result<Instance> {
        self.current.create()
    }

    fn is_legacy(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Handler derivation
// ---------------------------------------------------------------------------

/// Derive the cheapest correct handler for a mapping result.
///
/// Enum lineages always get the ordinal-carrying handler since constant
/// identity must survive even a pure reorder.  Structure-identical layouts
/// of non-enum types get the thin wrapper; everything else gets the full
/// mapped handler.
pub fn derive_legacy_handler(result: MappingResult, current: TypeHandlerRef) -> TypeHandlerRef {
    if result.legacy_definition().is_enum() {
        log::debug!(
            "deriving enum legacy handler for {} ({})",
            result.legacy_definition().type_id(),
            result.legacy_definition().type_name()
        );
        return Arc::new(LegacyEnumHandler::new(&result, current));
    }
    if result.is_structure_identical() {
        return Arc::new(LegacyWrapperHandler::new(
            TypeDefinitionRef::clone(result.legacy_definition()),
            current,
        ));
    }
    Arc::new(MappedLegacyHandler::new(result, current))
}

// ---------------------------------------------------------------------------
// Custom handler registry
// ---------------------------------------------------------------------------

/// User-supplied legacy handlers, consulted before any derivation.
///
/// Lookup goes by type id first, then by member structure.  A handler that
/// claims a legacy type id but disagrees with the stored layout is a fatal
/// inconsistency, never silently skipped.
#[derive(Default)]
pub struct CustomLegacyHandlerRegistry {
    handlers: RwLock<Vec<TypeHandlerRef>>,
}

impl CustomLegacyHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: TypeHandlerRef) {
        self.handlers.write().push(handler);
    }

    pub fn lookup(&self, legacy_definition: &TypeDefinitionRef) -> Result<Option<TypeHandlerRef>> {
        let handlers = self.handlers.read();
        for handler in handlers.iter() {
            if handler.type_id() == legacy_definition.type_id() {
                if !member::equal_structures(
                    handler.all_members(),
                    legacy_definition.all_members(),
                ) {
                    return Err(ConsistencyError::CustomHandlerStructureMismatch {
                        type_id: legacy_definition.type_id(),
                        type_name: legacy_definition.type_name().to_string(),
                    }
                    .into());
                }
                return Ok(Some(TypeHandlerRef::clone(handler)));
            }
        }
        // fall back to structural identification for id-less handlers
        for handler in handlers.iter() {
            if handler.type_id() == 0
                && handler.type_name() == legacy_definition.type_name()
                && member::equal_structures(handler.all_members(), legacy_definition.all_members())
            {
                return Ok(Some(TypeHandlerRef::clone(handler)));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
