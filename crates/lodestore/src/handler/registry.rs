// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Biunique handler registry: one handler per type id, one current handler
//! per type name.  Legacy handlers register by id only, since many versions
//! of one name coexist.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{ConsistencyError, Result};
use crate::handler::TypeHandlerRef;

#[derive(Default)]
struct RegistryState {
    by_id: BTreeMap<u64, TypeHandlerRef>,
    /// Current (non-legacy) handler per type name.
    by_name: BTreeMap<String, TypeHandlerRef>,
}

#[derive(Default)]
pub struct TypeHandlerRegistry {
    state: RwLock<RegistryState>,
}

impl TypeHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an initialized handler.  Re-registering the same handler is
    /// a no-op returning `false`; binding an occupied id to a different
    /// handler is a consistency error.
    pub fn register(&self, handler: TypeHandlerRef) -> Result<bool> {
        let type_id = handler.type_id();
        if type_id == 0 {
            return Err(ConsistencyError::UnassignedTypeId {
                type_name: handler.type_name().to_string(),
            }
            .into());
        }
        let mut state = self.state.write();
        if let Some(existing) = state.by_id.get(&type_id) {
            if TypeHandlerRef::ptr_eq(existing, &handler) {
                return Ok(false);
            }
            return Err(ConsistencyError::TypeIdRebind {
                type_id,
                existing: existing.type_name().to_string(),
                conflicting: handler.type_name().to_string(),
            }
            .into());
        }
        if !handler.is_legacy() {
            if let Some(existing) = state.by_name.get(handler.type_name()) {
                if !TypeHandlerRef::ptr_eq(existing, &handler) {
                    // two competing current handlers for one type name
                    return Err(ConsistencyError::RuntimeDefinitionConflict {
                        type_name: handler.type_name().to_string(),
                    }
                    .into());
                }
            }
            state
                .by_name
                .insert(handler.type_name().to_string(), TypeHandlerRef::clone(&handler));
        }
        log::debug!(
            "registered {}type handler {} ({})",
            if handler.is_legacy() { "legacy " } else { "" },
            type_id,
            handler.type_name()
        );
        state.by_id.insert(type_id, handler);
        Ok(true)
    }

    pub fn lookup_by_id(&self, type_id: u64) -> Option<TypeHandlerRef> {
        self.state.read().by_id.get(&type_id).cloned()
    }

    /// Current handler for the given type name.
    pub fn lookup_by_name(&self, type_name: &str) -> Option<TypeHandlerRef> {
        self.state.read().by_name.get(type_name).cloned()
    }

    pub fn contains_id(&self, type_id: u64) -> bool {
        self.state.read().by_id.contains_key(&type_id)
    }

    pub fn handler_count(&self) -> usize {
        self.state.read().by_id.len()
    }

    /// Snapshot of all registered handlers, id-ordered.
    pub fn all_handlers(&self) -> Vec<TypeHandlerRef> {
        self.state.read().by_id.values().cloned().collect()
    }
}
