// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type registry: the biunique type id <-> type name table.
//!
//! Constant registrations (native and platform types bound at startup)
//! survive [`TypeRegistry::clear`] the same way object constants do in the
//! object registry.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{ConsistencyError, Result};
use crate::registry::id_provider::TypeIdProvider;

const DEFAULT_HASH_DENSITY: f32 = 1.0;
const MIN_HASH_DENSITY: f32 = 0.1;
const MAX_HASH_DENSITY: f32 = 16.0;
const MIN_CAPACITY: usize = 16;

#[derive(Default)]
struct TypeTables {
    id_by_name: HashMap<String, u64>,
    name_by_id: HashMap<u64, String>,
    constant_id_by_name: HashMap<String, u64>,
    constant_name_by_id: HashMap<u64, String>,
}

struct TypeState {
    tables: TypeTables,
    hash_density: f32,
    /// Requested minimum capacity, kept across clears.
    capacity: usize,
}

/// Thread-safe biunique type id registry.
pub struct TypeRegistry {
    state: Mutex<TypeState>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TypeState {
                tables: TypeTables::default(),
                hash_density: DEFAULT_HASH_DENSITY,
                capacity: MIN_CAPACITY,
            }),
        }
    }

    // -- registration -------------------------------------------------------

    /// Register a known id/name pair.  Identical re-registration is a no-op
    /// returning `false`; a conflict on either side is a consistency error.
    pub fn register(&self, type_id: u64, type_name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_in(&mut state.tables, type_id, type_name, false)
    }

    /// Register a constant pair that survives [`TypeRegistry::clear`].
    pub fn register_constant(&self, type_id: u64, type_name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_in(&mut state.tables, type_id, type_name, true)
    }

    fn register_in(
        tables: &mut TypeTables,
        type_id: u64,
        type_name: &str,
        constant: bool,
    ) -> Result<bool> {
        let existing_id = tables
            .constant_id_by_name
            .get(type_name)
            .or_else(|| tables.id_by_name.get(type_name))
            .copied();
        let existing_name = tables
            .constant_name_by_id
            .get(&type_id)
            .or_else(|| tables.name_by_id.get(&type_id))
            .cloned();
        match (existing_id, &existing_name) {
            (Some(id), Some(name)) if id == type_id && name == type_name => Ok(false),
            (None, None) => {
                if constant {
                    tables.constant_id_by_name.insert(type_name.to_string(), type_id);
                    tables.constant_name_by_id.insert(type_id, type_name.to_string());
                } else {
                    tables.id_by_name.insert(type_name.to_string(), type_id);
                    tables.name_by_id.insert(type_id, type_name.to_string());
                }
                Ok(true)
            }
            _ => Err(ConsistencyError::TypeIdRebind {
                type_id,
                existing: existing_name.unwrap_or_else(|| type_name.to_string()),
                conflicting: type_name.to_string(),
            }
            .into()),
        }
    }

    /// Look up the id for a name, assigning a fresh one if absent.  Lookup
    /// and assignment happen under one lock acquisition.
    pub fn ensure_type_id(&self, type_name: &str, provider: &dyn TypeIdProvider) -> u64 {
        let mut state = self.state.lock();
        if let Some(&id) = state.tables.constant_id_by_name.get(type_name) {
            return id;
        }
        if let Some(&id) = state.tables.id_by_name.get(type_name) {
            return id;
        }
        let id = provider.provide_type_id();
        state.tables.id_by_name.insert(type_name.to_string(), id);
        state.tables.name_by_id.insert(id, type_name.to_string());
        id
    }

    // -- lookup -------------------------------------------------------------

    pub fn lookup_type_id(&self, type_name: &str) -> Option<u64> {
        let state = self.state.lock();
        state
            .tables
            .constant_id_by_name
            .get(type_name)
            .or_else(|| state.tables.id_by_name.get(type_name))
            .copied()
    }

    pub fn lookup_type_name(&self, type_id: u64) -> Option<String> {
        let state = self.state.lock();
        state
            .tables
            .constant_name_by_id
            .get(&type_id)
            .or_else(|| state.tables.name_by_id.get(&type_id))
            .cloned()
    }

    /// Total registered pairs, constants included.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.tables.id_by_name.len() + state.tables.constant_id_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Highest registered type id, 0 if empty.
    pub fn highest_type_id(&self) -> u64 {
        let state = self.state.lock();
        state
            .tables
            .name_by_id
            .keys()
            .chain(state.tables.constant_name_by_id.keys())
            .max()
            .copied()
            .unwrap_or(0)
    }

    // -- maintenance --------------------------------------------------------

    /// Drop every non-constant entry whose type name the probe reports dead.
    /// Returns the number of removed entries.
    pub fn consolidate(&self, is_live: &dyn Fn(&str) -> bool) -> usize {
        let mut state = self.state.lock();
        let dead: Vec<(String, u64)> = state
            .tables
            .id_by_name
            .iter()
            .filter(|(name, _)| !is_live(name))
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        for (name, id) in &dead {
            state.tables.id_by_name.remove(name);
            state.tables.name_by_id.remove(id);
        }
        if !dead.is_empty() {
            log::debug!("consolidated type registry, removed {} entries", dead.len());
        }
        dead.len()
    }

    /// Remove all non-constant entries. Constant registrations and the
    /// configured capacity and hash density survive.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tables.id_by_name.clear();
        state.tables.name_by_id.clear();
    }

    /// Remove everything, constant registrations included.
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        state.tables = TypeTables::default();
    }

    /// Reset the tables to their initial minimum capacity, dropping all
    /// entries including constants.
    pub fn truncate(&self) {
        let mut state = self.state.lock();
        state.tables = TypeTables::default();
        state.capacity = MIN_CAPACITY;
    }

    /// Pre-size the tables for at least `capacity` entries.  Returns whether
    /// a grow actually happened.  Existing mappings are never disturbed.
    pub fn ensure_capacity(&self, capacity: usize) -> bool {
        let mut state = self.state.lock();
        if capacity <= state.capacity {
            return false;
        }
        state.capacity = capacity;
        Self::resize_tables(&mut state);
        true
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Adjust the entries-per-slot density, clamped to a sane range, and
    /// re-size the tables for the new threshold. Survives clears.
    pub fn set_hash_density(&self, density: f32) {
        let mut state = self.state.lock();
        state.hash_density = density.clamp(MIN_HASH_DENSITY, MAX_HASH_DENSITY);
        Self::resize_tables(&mut state);
    }

    pub fn hash_density(&self) -> f32 {
        self.state.lock().hash_density
    }

    /// Reserve enough slots that `capacity` entries stay below the density
    /// threshold.
    fn resize_tables(state: &mut TypeState) {
        let slots = (state.capacity as f32 / state.hash_density).ceil() as usize;
        let additional = slots.saturating_sub(state.tables.id_by_name.len());
        state.tables.id_by_name.reserve(additional);
        state.tables.name_by_id.reserve(additional);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
