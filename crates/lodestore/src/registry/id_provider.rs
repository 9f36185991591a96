// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Id provisioning for types and objects.
//!
//! Type ids and object ids draw from disjoint ranges so an id's kind is
//! recognizable from its value alone.

use std::sync::atomic::{AtomicU64, Ordering};

/// First valid type id.
pub const START_TYPE_ID: u64 = 1;
/// First valid object id. Everything below is reserved for type ids and
/// constant identifiers.
pub const START_OBJECT_ID: u64 = 1_000_000_000_000;

/// Whether the id value lies in the type id range.
pub fn is_type_id(id: u64) -> bool {
    (START_TYPE_ID..START_OBJECT_ID).contains(&id)
}

/// Whether the id value lies in the object id range.
pub fn is_object_id(id: u64) -> bool {
    id >= START_OBJECT_ID
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

pub trait TypeIdProvider: Send + Sync {
    /// Hand out the next unused type id.
    fn provide_type_id(&self) -> u64;

    /// Raise the provider's floor so it never hands out `type_id` or below.
    fn update_type_id(&self, type_id: u64);

    /// Highest id handed out or adopted so far.
    fn current_type_id(&self) -> u64;
}

pub trait ObjectIdProvider: Send + Sync {
    fn provide_object_id(&self) -> u64;
    fn update_object_id(&self, object_id: u64);
    fn current_object_id(&self) -> u64;
}

// ---------------------------------------------------------------------------
// Transient implementations
// ---------------------------------------------------------------------------

/// In-memory monotonic type id source.
#[derive(Debug)]
pub struct TransientTypeIdProvider {
    current: AtomicU64,
}

impl Default for TransientTypeIdProvider {
    fn default() -> Self {
        Self::starting_after(START_TYPE_ID - 1)
    }
}

impl TransientTypeIdProvider {
    /// Provider whose first handed-out id is `last + 1`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            current: AtomicU64::new(last),
        }
    }
}

impl TypeIdProvider for TransientTypeIdProvider {
    fn provide_type_id(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn update_type_id(&self, type_id: u64) {
        self.current.fetch_max(type_id, Ordering::AcqRel);
    }

    fn current_type_id(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

/// In-memory monotonic object id source.
#[derive(Debug)]
pub struct TransientObjectIdProvider {
    current: AtomicU64,
}

impl Default for TransientObjectIdProvider {
    fn default() -> Self {
        Self {
            current: AtomicU64::new(START_OBJECT_ID - 1),
        }
    }
}

impl TransientObjectIdProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectIdProvider for TransientObjectIdProvider {
    fn provide_object_id(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn update_object_id(&self, object_id: u64) {
        self.current.fetch_max(object_id, Ordering::AcqRel);
    }

    fn current_object_id(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_are_monotonic_and_adoptable() {
        let provider = TransientTypeIdProvider::default();
        assert_eq!(provider.provide_type_id(), 1);
        assert_eq!(provider.provide_type_id(), 2);
        provider.update_type_id(100);
        assert_eq!(provider.provide_type_id(), 101);
        // stale update never lowers the floor
        provider.update_type_id(5);
        assert_eq!(provider.provide_type_id(), 102);
    }

    #[test]
    fn object_ids_start_in_their_range() {
        let provider = TransientObjectIdProvider::new();
        let id = provider.provide_object_id();
        assert_eq!(id, START_OBJECT_ID);
        assert!(is_object_id(id));
        assert!(!is_type_id(id));
        assert!(is_type_id(42));
    }
}
