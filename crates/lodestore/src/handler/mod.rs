// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type handlers: the binding between a type definition and live instances.
//!
//! A [`TypeHandler`] owns the persisted layout of one type and knows how to
//! produce fresh instances of it.  Handlers are created uninitialized (type
//! id 0) and bound to their dictionary type id exactly once; re-binding to a
//! different id is a consistency error.

pub mod manager;
pub mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ConsistencyError, Error, Result};
use crate::member::MemberDescriptor;
use crate::resolving::{MemberSource, RuntimeTypeRef};

pub use manager::{SupertypePrecedence, TypeHandlerManager};
pub use registry::TypeHandlerRegistry;

/// Opaque live instance produced by a handler.  The type system core never
/// looks inside; codecs downcast to their concrete object model.
pub type Instance = Box<dyn std::any::Any + Send>;

/// Shared handler handle.
pub type TypeHandlerRef = Arc<dyn TypeHandler>;

// ---------------------------------------------------------------------------
// TypeHandler
// ---------------------------------------------------------------------------

pub trait TypeHandler: Send + Sync {
    /// Bound type id, 0 while uninitialized.
    fn type_id(&self) -> u64;

    fn type_name(&self) -> &str;

    /// The runtime type this handler operates on, absent for unreachable
    /// legacy types.
    fn runtime_type(&self) -> Option<RuntimeTypeRef>;

    /// Full persisted member sequence, including metadata members.
    fn all_members(&self) -> &[MemberDescriptor];

    /// Bind the handler to its dictionary type id. Binding the already
    /// assigned id again is a no-op; a different id is a consistency error.
    fn initialize_type_id(&self, type_id: u64) -> Result<()>;

    /// Create a fresh blank instance.
    fn create(&self) -> Result<Instance>;

    /// Whether instances of this type hold references to other objects.
    fn has_instance_references(&self) -> bool {
        self.all_members().iter().any(MemberDescriptor::has_references)
    }

    /// Invoke `f` with the type name of every member value type, for
    /// transitive handler ensuring.
    fn iterate_member_types(&self, f: &mut dyn FnMut(&str)) {
        for m in self.all_members() {
            iterate_member_type_names(m, f);
        }
    }

    /// Invoke `f` with the object id of every reference held by the given
    /// instance.  The core cannot see into opaque instances, so the default
    /// does nothing; codec-bound handlers override it.
    fn iterate_instance_references(&self, _instance: &Instance, _f: &mut dyn FnMut(u64)) {}

    /// Whether this handler serves a superseded layout version.
    fn is_legacy(&self) -> bool {
        false
    }

    /// Access to the concrete handler for downcasting.
    fn as_any(&self) -> &dyn std::any::Any;
}

impl std::fmt::Debug for dyn TypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandler")
            .field("type_id", &self.type_id())
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

fn iterate_member_type_names(m: &MemberDescriptor, f: &mut dyn FnMut(&str)) {
    match m {
        MemberDescriptor::GenericComplexField { nested, .. } => {
            for n in nested {
                iterate_member_type_names(n, f);
            }
        }
        _ if m.is_instance_member() => f(m.type_name()),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// TypeIdHolder
// ---------------------------------------------------------------------------

/// Write-once atomic type id cell shared by handler implementations.
#[derive(Debug, Default)]
pub struct TypeIdHolder {
    type_id: AtomicU64,
}

impl TypeIdHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assigned(type_id: u64) -> Self {
        Self {
            type_id: AtomicU64::new(type_id),
        }
    }

    pub fn get(&self) -> u64 {
        self.type_id.load(Ordering::Acquire)
    }

    /// Bind once. Succeeds if unbound or already bound to the same id.
    pub fn initialize(&self, type_name: &str, type_id: u64) -> Result<()> {
        if type_id == 0 {
            return Err(ConsistencyError::UnassignedTypeId {
                type_name: type_name.to_string(),
            }
            .into());
        }
        match self
            .type_id
            .compare_exchange(0, type_id, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current == type_id => Ok(()),
            Err(current) => Err(ConsistencyError::HandlerAlreadyInitialized {
                type_name: type_name.to_string(),
                assigned: current,
                requested: type_id,
            }
            .into()),
        }
    }
}

// ---------------------------------------------------------------------------
// GenericTypeHandler
// ---------------------------------------------------------------------------

/// Instantiation strategy for a handled type.
pub trait Instantiator: Send + Sync {
    fn instantiate(&self) -> Result<Instance>;
}

impl<F> Instantiator for F
where
    F: Fn() -> Instance + Send + Sync,
{
    fn instantiate(&self) -> Result<Instance> {
        Ok(self())
    }
}

/// Standard handler for a live runtime type.
pub struct GenericTypeHandler {
    type_id: TypeIdHolder,
    runtime_type: RuntimeTypeRef,
    all_members: Vec<MemberDescriptor>,
    instantiator: Option<Box<dyn Instantiator>>,
}

impl GenericTypeHandler {
    pub fn new(runtime_type: RuntimeTypeRef, all_members: Vec<MemberDescriptor>) -> Self {
        Self {
            type_id: TypeIdHolder::new(),
            runtime_type,
            all_members,
            instantiator: None,
        }
    }

    pub fn with_instantiator(mut self, instantiator: impl Instantiator + 'static) -> Self {
        self.instantiator = Some(Box::new(instantiator));
        self
    }
}

impl TypeHandler for GenericTypeHandler {
    fn type_id(&self) -> u64 {
        self.type_id.get()
    }

    fn type_name(&self) -> &str {
        &self.runtime_type.name
    }

    fn runtime_type(&self) -> Option<RuntimeTypeRef> {
        Some(Arc::clone(&self.runtime_type))
    }

    fn all_members(&self) -> &[MemberDescriptor] {
        &self.all_members
    }

    fn initialize_type_id(&self, type_id: u64) -> Result<()> {
        self.type_id.initialize(self.type_name(), type_id)
    }

    fn create(&self) -> Result<Instance> {
        match &self.instantiator {
            Some(i) => i.instantiate(),
            None => Err(Error::InstanceCreation {
                type_name: self.type_name().to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// TypeHandlerCreator
// ---------------------------------------------------------------------------

/// Creates handlers for runtime types on demand.
pub trait TypeHandlerCreator: Send + Sync {
    fn create_type_handler(&self, runtime_type: RuntimeTypeRef) -> Result<TypeHandlerRef>;
}

/// Creator deriving the member sequence from a [`MemberSource`].
pub struct StandardTypeHandlerCreator<S: MemberSource> {
    member_source: S,
}

impl<S: MemberSource> StandardTypeHandlerCreator<S> {
    pub fn new(member_source: S) -> Self {
        Self { member_source }
    }
}

impl<S: MemberSource> TypeHandlerCreator for StandardTypeHandlerCreator<S> {
    fn create_type_handler(&self, runtime_type: RuntimeTypeRef) -> Result<TypeHandlerRef> {
        if !self.member_source.is_persistable(&runtime_type) {
            return Err(Error::NotPersistable {
                type_name: runtime_type.name.clone(),
            });
        }
        let members = self.member_source.describe_members(&runtime_type)?;
        Ok(Arc::new(GenericTypeHandler::new(runtime_type, members)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
