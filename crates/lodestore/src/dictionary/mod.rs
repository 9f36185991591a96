// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type dictionary: the authoritative catalog of all persisted type layouts.
//!
//! Definitions are grouped into per-name [`TypeLineage`]s and indexed
//! globally by type id.  Both mappings are biunique: one name per lineage,
//! one definition per id, forever.  All mutation goes through one internal
//! monitor, so a dictionary can be shared freely.

pub mod assembler;
pub mod builder;
pub mod definition;
pub mod parser;
pub mod storage;

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{ConsistencyError, Result};

pub use definition::{TypeDefinition, TypeDefinitionRef, TypeLineage};

// ---------------------------------------------------------------------------
// TypeDictionary
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DictionaryState {
    lineages: BTreeMap<String, TypeLineage>,
    all_by_id: BTreeMap<u64, TypeDefinitionRef>,
}

/// Thread-safe type definition catalog.
#[derive(Debug, Default)]
pub struct TypeDictionary {
    state: Mutex<DictionaryState>,
}

impl TypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one definition.
    ///
    /// Returns `Ok(true)` if the dictionary changed, `Ok(false)` if an
    /// identical definition was already registered.  A different definition
    /// under an occupied type id is a consistency error and leaves the
    /// dictionary untouched.
    pub fn register_definition(&self, definition: TypeDefinitionRef) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_locked(&mut state, definition)
    }

    /// Register a batch of definitions.  Returns `true` if any of them
    /// changed the dictionary.  Fails on the first conflicting definition;
    /// prior entries of the batch stay registered, matching single-call
    /// semantics.
    pub fn register_definitions<I>(&self, definitions: I) -> Result<bool>
    where
        I: IntoIterator<Item = TypeDefinitionRef>,
    {
        let mut state = self.state.lock();
        let mut changed = false;
        for definition in definitions {
            changed |= Self::register_locked(&mut state, definition)?;
        }
        Ok(changed)
    }

    fn register_locked(state: &mut DictionaryState, definition: TypeDefinitionRef) -> Result<bool> {
        if !definition.has_assigned_type_id() {
            return Err(ConsistencyError::UnassignedTypeId {
                type_name: definition.type_name().to_string(),
            }
            .into());
        }
        if let Some(existing) = state.all_by_id.get(&definition.type_id()) {
            if existing.type_name() != definition.type_name() {
                return Err(ConsistencyError::DuplicateTypeId {
                    type_id: definition.type_id(),
                    existing: existing.type_name().to_string(),
                    conflicting: definition.type_name().to_string(),
                }
                .into());
            }
        }
        let lineage = state
            .lineages
            .entry(definition.type_name().to_string())
            .or_insert_with(|| TypeLineage::new(definition.type_name()));
        let changed = lineage.register(TypeDefinitionRef::clone(&definition))?;
        if changed {
            log::debug!(
                "registered type definition {} {}",
                definition.type_id(),
                definition.type_name()
            );
            state.all_by_id.insert(definition.type_id(), definition);
        }
        Ok(changed)
    }

    /// Mark the given registered definition as its lineage's runtime
    /// definition.  The definition is registered first if necessary.
    pub fn set_runtime_definition(&self, definition: TypeDefinitionRef) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_locked(&mut state, TypeDefinitionRef::clone(&definition))?;
        let lineage = state
            .lineages
            .get_mut(definition.type_name())
            .ok_or_else(|| ConsistencyError::UnassignedTypeId {
                type_name: definition.type_name().to_string(),
            })?;
        Ok(lineage.set_runtime_definition(definition)?)
    }

    pub fn lookup_by_id(&self, type_id: u64) -> Option<TypeDefinitionRef> {
        self.state.lock().all_by_id.get(&type_id).cloned()
    }

    /// The latest definition version registered under the given name.
    pub fn lookup_latest_by_name(&self, type_name: &str) -> Option<TypeDefinitionRef> {
        self.state
            .lock()
            .lineages
            .get(type_name)
            .and_then(|l| l.latest().cloned())
    }

    /// The runtime definition of the given name's lineage, if initialized.
    pub fn lookup_runtime_definition(&self, type_name: &str) -> Option<TypeDefinitionRef> {
        self.state
            .lock()
            .lineages
            .get(type_name)
            .and_then(|l| l.runtime_definition().cloned())
    }

    /// Legacy (non-runtime) definition versions of the given name.
    pub fn legacy_definitions(&self, type_name: &str) -> Vec<TypeDefinitionRef> {
        self.state
            .lock()
            .lineages
            .get(type_name)
            .map(|l| l.legacy_entries().cloned().collect())
            .unwrap_or_default()
    }

    /// All definitions ordered by ascending type id.
    pub fn all_definitions(&self) -> Vec<TypeDefinitionRef> {
        self.state.lock().all_by_id.values().cloned().collect()
    }

    pub fn lineage_names(&self) -> Vec<String> {
        self.state.lock().lineages.keys().cloned().collect()
    }

    pub fn contains_type_id(&self, type_id: u64) -> bool {
        self.state.lock().all_by_id.contains_key(&type_id)
    }

    /// Highest registered type id, 0 if the dictionary is empty.
    pub fn highest_type_id(&self) -> u64 {
        self.state
            .lock()
            .all_by_id
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
    }

    pub fn definition_count(&self) -> usize {
        self.state.lock().all_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().all_by_id.is_empty()
    }

    /// Canonical dictionary text of the current contents, id-ordered.
    pub fn assemble(&self) -> String {
        let definitions = self.all_definitions();
        assembler::assemble_dictionary(definitions.iter().map(|d| d.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::member::MemberDescriptor;

    fn person(type_id: u64) -> TypeDefinitionRef {
        Arc::new(TypeDefinition::new(
            type_id,
            "com.app.Person",
            vec![MemberDescriptor::simple_field(
                "java.lang.String",
                Some("com.app.Person".to_string()),
                "name",
                true,
                8,
                8,
            )],
        ))
    }

    #[test]
    fn register_is_idempotent_for_identical_definitions() {
        let dict = TypeDictionary::new();
        assert!(dict.register_definition(person(35)).unwrap());
        assert!(!dict.register_definition(person(35)).unwrap());
        assert_eq!(dict.definition_count(), 1);
    }

    #[test]
    fn type_id_cannot_be_reused_across_names() {
        let dict = TypeDictionary::new();
        dict.register_definition(person(35)).unwrap();
        let other = Arc::new(TypeDefinition::new(35, "com.app.Other", vec![]));
        let err = dict.register_definition(other).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(ConsistencyError::DuplicateTypeId { type_id: 35, .. })
        ));
    }

    #[test]
    fn lineage_collects_versions_and_reports_latest() {
        let dict = TypeDictionary::new();
        dict.register_definition(person(35)).unwrap();
        dict.register_definition(person(48)).unwrap();
        assert_eq!(dict.lookup_latest_by_name("com.app.Person").unwrap().type_id(), 48);
        assert_eq!(dict.highest_type_id(), 48);
        assert!(dict.contains_type_id(35));
    }

    #[test]
    fn runtime_definition_separates_legacy_versions() {
        let dict = TypeDictionary::new();
        dict.register_definition(person(35)).unwrap();
        let current = person(48);
        dict.set_runtime_definition(Arc::clone(&current)).unwrap();
        assert_eq!(
            dict.lookup_runtime_definition("com.app.Person").unwrap().type_id(),
            48
        );
        let legacy = dict.legacy_definitions("com.app.Person");
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].type_id(), 35);
    }

    #[test]
    fn assemble_orders_entries_by_type_id() {
        let dict = TypeDictionary::new();
        dict.register_definition(person(48)).unwrap();
        dict.register_definition(Arc::new(TypeDefinition::new(
            6,
            "int",
            vec![MemberDescriptor::primitive("int", 4)],
        )))
        .unwrap();
        let text = dict.assemble();
        let int_pos = text.find("6 int").unwrap();
        let person_pos = text.find("48 com.app.Person").unwrap();
        assert!(int_pos < person_pos);
    }
}
