// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Identity registries: biunique id tables for objects and types.

pub mod id_provider;
pub mod object_registry;
pub mod type_registry;

pub use id_provider::{
    is_object_id, is_type_id, ObjectIdProvider, TransientObjectIdProvider,
    TransientTypeIdProvider, TypeIdProvider, START_OBJECT_ID, START_TYPE_ID,
};
pub use object_registry::{ObjectIdentity, ObjectRegistry, DEFAULT_HASH_DENSITY};
pub use type_registry::TypeRegistry;
