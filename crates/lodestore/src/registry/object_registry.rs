// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Object registry: the biunique object id <-> identity table.
//!
//! Identities are opaque keys supplied by the object model (an address, a
//! handle slot, whatever identifies one live object).  The registry
//! guarantees that an identity never changes its id and an id never changes
//! its identity.  Constant registrations (well-known instances like enum
//! constants) survive [`ObjectRegistry::clear`].

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{ConsistencyError, Result};
use crate::registry::id_provider::ObjectIdProvider;

/// Opaque identity key of one live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity(pub u64);

/// Default ratio of entries to table capacity before a grow is requested.
pub const DEFAULT_HASH_DENSITY: f32 = 1.0;
const MIN_HASH_DENSITY: f32 = 0.1;
const MAX_HASH_DENSITY: f32 = 16.0;
const MIN_CAPACITY: usize = 16;

#[derive(Default)]
struct RegistryTables {
    id_by_identity: HashMap<ObjectIdentity, u64>,
    identity_by_id: HashMap<u64, ObjectIdentity>,
    constant_id_by_identity: HashMap<ObjectIdentity, u64>,
    constant_identity_by_id: HashMap<u64, ObjectIdentity>,
}

struct RegistryState {
    tables: RegistryTables,
    hash_density: f32,
    /// Requested minimum capacity, kept across clears and rebuilds.
    capacity: usize,
}

/// Thread-safe biunique object id registry.
pub struct ObjectRegistry {
    state: Mutex<RegistryState>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                tables: RegistryTables::default(),
                hash_density: DEFAULT_HASH_DENSITY,
                capacity: MIN_CAPACITY,
            }),
        }
    }

    // -- registration -------------------------------------------------------

    /// Look up the id for an identity, assigning a fresh one from the
    /// provider if absent.  Lookup and assignment happen under one lock
    /// acquisition, so concurrent callers always converge on the same id.
    pub fn ensure_object_id(
        &self,
        identity: ObjectIdentity,
        provider: &dyn ObjectIdProvider,
    ) -> u64 {
        let mut state = self.state.lock();
        if let Some(&id) = state.tables.constant_id_by_identity.get(&identity) {
            return id;
        }
        if let Some(&id) = state.tables.id_by_identity.get(&identity) {
            return id;
        }
        let id = provider.provide_object_id();
        state.tables.id_by_identity.insert(identity, id);
        state.tables.identity_by_id.insert(id, identity);
        id
    }

    /// Register a known id/identity pair, e.g. while loading stored data.
    ///
    /// Returns `true` if the pair is new, `false` if it was already
    /// registered identically.  Either side conflicting with an existing
    /// entry is a consistency error.
    pub fn register(&self, id: u64, identity: ObjectIdentity) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_in(&mut state.tables, id, identity, false)
    }

    /// Register a constant pair that survives [`ObjectRegistry::clear`].
    pub fn register_constant(&self, id: u64, identity: ObjectIdentity) -> Result<bool> {
        let mut state = self.state.lock();
        Self::register_in(&mut state.tables, id, identity, true)
    }

    fn register_in(
        tables: &mut RegistryTables,
        id: u64,
        identity: ObjectIdentity,
        constant: bool,
    ) -> Result<bool> {
        let existing_id = tables
            .constant_id_by_identity
            .get(&identity)
            .or_else(|| tables.id_by_identity.get(&identity))
            .copied();
        let existing_identity = tables
            .constant_identity_by_id
            .get(&id)
            .or_else(|| tables.identity_by_id.get(&id))
            .copied();
        match (existing_id, existing_identity) {
            (Some(eid), Some(eidentity)) if eid == id && eidentity == identity => Ok(false),
            (None, None) => {
                if constant {
                    tables.constant_id_by_identity.insert(identity, id);
                    tables.constant_identity_by_id.insert(id, identity);
                } else {
                    tables.id_by_identity.insert(identity, id);
                    tables.identity_by_id.insert(id, identity);
                }
                Ok(true)
            }
            _ => Err(ConsistencyError::IdentityRebind { id }.into()),
        }
    }

    // -- lookup -------------------------------------------------------------

    pub fn lookup_object_id(&self, identity: ObjectIdentity) -> Option<u64> {
        let state = self.state.lock();
        state
            .tables
            .constant_id_by_identity
            .get(&identity)
            .or_else(|| state.tables.id_by_identity.get(&identity))
            .copied()
    }

    pub fn lookup_identity(&self, id: u64) -> Option<ObjectIdentity> {
        let state = self.state.lock();
        state
            .tables
            .constant_identity_by_id
            .get(&id)
            .or_else(|| state.tables.identity_by_id.get(&id))
            .copied()
    }

    pub fn contains_identity(&self, identity: ObjectIdentity) -> bool {
        self.lookup_object_id(identity).is_some()
    }

    /// Total registered pairs, constants included.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.tables.id_by_identity.len() + state.tables.constant_id_by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // -- maintenance --------------------------------------------------------

    /// Drop every non-constant entry whose identity the probe reports dead.
    /// Returns the number of removed entries.
    pub fn consolidate(&self, is_live: &dyn Fn(ObjectIdentity) -> bool) -> usize {
        let mut state = self.state.lock();
        let dead: Vec<(ObjectIdentity, u64)> = state
            .tables
            .id_by_identity
            .iter()
            .filter(|(identity, _)| !is_live(**identity))
            .map(|(identity, id)| (*identity, *id))
            .collect();
        for (identity, id) in &dead {
            state.tables.id_by_identity.remove(identity);
            state.tables.identity_by_id.remove(id);
        }
        if !dead.is_empty() {
            log::debug!("consolidated object registry, removed {} entries", dead.len());
        }
        dead.len()
    }

    /// Remove all non-constant entries. Constant registrations and the
    /// configured capacity and hash density survive.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tables.id_by_identity.clear();
        state.tables.identity_by_id.clear();
    }

    /// Remove everything, constant registrations included.
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        state.tables = RegistryTables::default();
    }

    /// Reset the tables to their initial minimum capacity, dropping all
    /// entries including constants.
    pub fn truncate(&self) {
        let mut state = self.state.lock();
        state.tables = RegistryTables::default();
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
    fn resize_tables(state: &mut RegistryState) {
        let slots = (state.capacity as f32 / state.hash_density).ceil() as usize;
        let additional = slots.saturating_sub(state.tables.id_by_identity.len());
        state.tables.id_by_identity.reserve(additional);
        state.tables.identity_by_id.reserve(additional);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
