// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type handler lifecycle: ensure, validate, initialize, update.
//!
//! The manager is the single entry point tying the dictionary, the handler
//! registry, the legacy mapper and the id provisioning together.  Ensuring a
//! handler for a type name either finds the registered one, revives the
//! type's dictionary identity, or mints a new type id, and always leaves the
//! dictionary, the registry and the handler in agreement.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dictionary::definition::{TypeDefinition, TypeDefinitionRef};
use crate::dictionary::storage::DictionaryManager;
use crate::error::{ConsistencyError, Error, Result};
use crate::handler::registry::TypeHandlerRegistry;
use crate::handler::{TypeHandlerCreator, TypeHandlerRef};
use crate::legacy::{
    derive_legacy_handler, CustomLegacyHandlerRegistry, LegacyTypeMapper, UnreachableTypeHandler,
};
use crate::member::{self, MemberDescriptor};
use crate::registry::{TransientTypeIdProvider, TypeIdProvider};
use crate::resolving::{RuntimeType, TypeResolver};

/// Lookup order when searching the supertype hierarchy for a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupertypePrecedence {
    /// Superclass chain first, then interfaces in declaration order.
    #[default]
    SuperclassFirst,
    /// Interfaces in declaration order first, then the superclass chain.
    InterfacesFirst,
}

// ---------------------------------------------------------------------------
// TypeHandlerManager
// ---------------------------------------------------------------------------

pub struct TypeHandlerManager {
    /// Serializes whole ensure runs so concurrent callers for the same type
    /// converge on one handler and one type id.  The ensure path recurses
    /// internally below this lock.
    ensure_lock: Mutex<()>,
    dictionary_manager: DictionaryManager,
    registry: TypeHandlerRegistry,
    creator: Box<dyn TypeHandlerCreator>,
    resolver: Box<dyn TypeResolver>,
    legacy_mapper: LegacyTypeMapper,
    custom_legacy: CustomLegacyHandlerRegistry,
    type_id_provider: Box<dyn TypeIdProvider>,
    supertype_precedence: SupertypePrecedence,
}

impl TypeHandlerManager {
    pub fn new(
        dictionary_manager: DictionaryManager,
        creator: impl TypeHandlerCreator + 'static,
        resolver: impl TypeResolver + 'static,
    ) -> Self {
        let provider = TransientTypeIdProvider::default();
        provider.update_type_id(dictionary_manager.dictionary().highest_type_id());
        Self {
            ensure_lock: Mutex::new(()),
            dictionary_manager,
            registry: TypeHandlerRegistry::new(),
            creator: Box::new(creator),
            resolver: Box::new(resolver),
            legacy_mapper: LegacyTypeMapper::default(),
            custom_legacy: CustomLegacyHandlerRegistry::new(),
            type_id_provider: Box::new(provider),
            supertype_precedence: SupertypePrecedence::default(),
        }
    }

    pub fn with_legacy_mapper(mut self, mapper: LegacyTypeMapper) -> Self {
        self.legacy_mapper = mapper;
        self
    }

    pub fn with_type_id_provider(mut self, provider: impl TypeIdProvider + 'static) -> Self {
        provider.update_type_id(self.dictionary_manager.dictionary().highest_type_id());
        self.type_id_provider = Box::new(provider);
        self
    }

    pub fn with_supertype_precedence(mut self, precedence: SupertypePrecedence) -> Self {
        self.supertype_precedence = precedence;
        self
    }

    pub fn registry(&self) -> &TypeHandlerRegistry {
        &self.registry
    }

    pub fn dictionary_manager(&self) -> &DictionaryManager {
        &self.dictionary_manager
    }

    pub fn custom_legacy_handlers(&self) -> &CustomLegacyHandlerRegistry {
        &self.custom_legacy
    }

    // -- ensure -------------------------------------------------------------

    /// Get or build the current handler for a type name, wiring up its
    /// dictionary identity, its legacy versions and its member types.
    pub fn ensure_type_handler(&self, type_name: &str) -> Result<TypeHandlerRef> {
        if let Some(handler) = self.registry.lookup_by_name(type_name) {
            return Ok(handler);
        }
        let _guard = self.ensure_lock.lock();
        self.ensure_type_handler_locked(type_name)
    }

    /// Ensure handlers for a batch of type names.
    pub fn ensure_type_handlers<'a, I>(&self, type_names: I) -> Result<Vec<TypeHandlerRef>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        type_names
            .into_iter()
            .map(|name| self.ensure_type_handler(name))
            .collect()
    }

    fn ensure_type_handler_locked(&self, type_name: &str) -> Result<TypeHandlerRef> {
        // re-check under the lock: a concurrent caller may have finished
        if let Some(handler) = self.registry.lookup_by_name(type_name) {
            return Ok(handler);
        }
        let runtime_type = self.resolver.require_type(type_name)?;
        let handler = self.creator.create_type_handler(Arc::clone(&runtime_type))?;

        // revive the dictionary identity or mint a fresh one
        let dictionary = self.dictionary_manager.dictionary();
        let definition = match dictionary.lookup_latest_by_name(type_name) {
            Some(latest)
                if member::equal_structures(latest.all_members(), handler.all_members()) =>
            {
                latest
            }
            _ => {
                self.type_id_provider.update_type_id(dictionary.highest_type_id());
                let type_id = self.type_id_provider.provide_type_id();
                log::info!("assigned type id {} to new type {}", type_id, type_name);
                Arc::new(TypeDefinition::new(
                    type_id,
                    type_name,
                    handler.all_members().to_vec(),
                ))
            }
        };
        handler.initialize_type_id(definition.type_id())?;
        self.validate_handler_against(&definition, &handler)?;
        self.dictionary_manager
            .set_runtime_definition(TypeDefinitionRef::clone(&definition))?;
        self.registry.register(TypeHandlerRef::clone(&handler))?;

        // superseded layout versions of this lineage
        for legacy in dictionary.legacy_definitions(type_name) {
            self.ensure_legacy_handler_locked(&legacy, &handler)?;
        }

        // transitive member value types
        let mut member_types = Vec::new();
        handler.iterate_member_types(&mut |name| member_types.push(name.to_string()));
        for name in member_types {
            if member::is_primitive_type_name(&name)
                || member::is_variable_length_type(&name)
                || self.registry.lookup_by_name(&name).is_some()
            {
                continue;
            }
            if self.resolver.resolve_type(&name).is_some() {
                self.ensure_type_handler_locked(&name)?;
            }
        }

        Ok(handler)
    }

    /// Registered handler for a type id, legacy handlers included.
    pub fn lookup_type_handler_by_id(&self, type_id: u64) -> Option<TypeHandlerRef> {
        self.registry.lookup_by_id(type_id)
    }

    /// Registered current handler for a type name.
    pub fn lookup_type_handler(&self, type_name: &str) -> Option<TypeHandlerRef> {
        self.registry.lookup_by_name(type_name)
    }

    /// Get or derive the handler for one legacy layout version.
    pub fn ensure_legacy_handler(
        &self,
        legacy_definition: &TypeDefinitionRef,
        current_handler: &TypeHandlerRef,
    ) -> Result<TypeHandlerRef> {
        if let Some(handler) = self.registry.lookup_by_id(legacy_definition.type_id()) {
            return Ok(handler);
        }
        let _guard = self.ensure_lock.lock();
        self.ensure_legacy_handler_locked(legacy_definition, current_handler)
    }

    fn ensure_legacy_handler_locked(
        &self,
        legacy_definition: &TypeDefinitionRef,
        current_handler: &TypeHandlerRef,
    ) -> Result<TypeHandlerRef> {
        if let Some(handler) = self.registry.lookup_by_id(legacy_definition.type_id()) {
            return Ok(handler);
        }
        let handler = match self.custom_legacy.lookup(legacy_definition)? {
            Some(custom) => {
                custom.initialize_type_id(legacy_definition.type_id())?;
                custom
            }
            None => {
                let result = self
                    .legacy_mapper
                    .map(legacy_definition, current_handler.all_members())?;
                derive_legacy_handler(result, TypeHandlerRef::clone(current_handler))
            }
        };
        self.registry.register(TypeHandlerRef::clone(&handler))?;
        Ok(handler)
    }

    // -- validate -----------------------------------------------------------

    /// Check a handler against the dictionary definition it claims to
    /// implement: equal type id, position-wise structure-equal members.
    pub fn validate_handler_against(
        &self,
        definition: &TypeDefinitionRef,
        handler: &TypeHandlerRef,
    ) -> Result<()> {
        if handler.type_id() != definition.type_id() {
            return Err(ConsistencyError::TypeIdMismatch {
                type_name: definition.type_name().to_string(),
                dictionary_type_id: definition.type_id(),
                handler_type_id: handler.type_id(),
            }
            .into());
        }
        if let Some(position) =
            first_structure_mismatch(definition.all_members(), handler.all_members())
        {
            return Err(ConsistencyError::MemberMismatch {
                type_name: definition.type_name().to_string(),
                position,
                registered: definition.all_members().get(position).map(|m| m.identifier()),
                conflicting: handler.all_members().get(position).map(|m| m.identifier()),
            }
            .into());
        }
        Ok(())
    }

    // -- initialize / update ------------------------------------------------

    /// Bring the whole stored dictionary to life: ensure handlers for every
    /// resolvable lineage and register unreachable-type handlers for the
    /// rest.  Idempotent.
    pub fn initialize(&self) -> Result<()> {
        let dictionary = self.dictionary_manager.dictionary();
        for type_name in dictionary.lineage_names() {
            if self.resolver.resolve_type(&type_name).is_none() {
                continue;
            }
            match self.ensure_type_handler(&type_name) {
                Ok(_) => {}
                // fatal for this lineage only, siblings still get handlers
                Err(Error::NotPersistable { type_name }) => {
                    log::warn!("skipping non-persistable type {}", type_name);
                }
                Err(e) => return Err(e),
            }
        }
        // everything still without a handler has no runtime counterpart
        for definition in dictionary.all_definitions() {
            if !self.registry.contains_id(definition.type_id()) {
                log::info!(
                    "registering unreachable type handler for {} ({})",
                    definition.type_id(),
                    definition.type_name()
                );
                self.registry
                    .register(Arc::new(UnreachableTypeHandler::new(definition)))?;
            }
        }
        Ok(())
    }

    /// Import externally supplied definitions, raise the type id floor to
    /// the given highest known id and persist the dictionary.
    pub fn update<I>(&self, definitions: I, highest_type_id: u64) -> Result<()>
    where
        I: IntoIterator<Item = TypeDefinitionRef>,
    {
        self.dictionary_manager.register_definitions(definitions)?;
        self.type_id_provider.update_type_id(highest_type_id);
        self.dictionary_manager.store()
    }

    // -- polymorphic lookup -------------------------------------------------

    /// Find a registered handler along the supertype hierarchy of the given
    /// runtime type, honoring the configured precedence.
    pub fn lookup_polymorphic(&self, runtime_type: &RuntimeType) -> Option<TypeHandlerRef> {
        let super_chain = |rt: &RuntimeType| -> Option<TypeHandlerRef> {
            let mut current = rt.supertype.clone();
            while let Some(name) = current {
                if let Some(handler) = self.registry.lookup_by_name(&name) {
                    return Some(handler);
                }
                current = self
                    .resolver
                    .resolve_type(&name)
                    .and_then(|t| t.supertype.clone());
            }
            None
        };
        let interfaces = |rt: &RuntimeType| -> Option<TypeHandlerRef> {
            rt.interfaces
                .iter()
                .find_map(|name| self.registry.lookup_by_name(name))
        };
        match self.supertype_precedence {
            SupertypePrecedence::SuperclassFirst => {
                super_chain(runtime_type).or_else(|| interfaces(runtime_type))
            }
            SupertypePrecedence::InterfacesFirst => {
                interfaces(runtime_type).or_else(|| super_chain(runtime_type))
            }
        }
    }
}

/// First position at which the sequences disagree structurally, if any.
/// Length mismatches report the first exhausted position.
fn first_structure_mismatch(
    registered: &[MemberDescriptor],
    conflicting: &[MemberDescriptor],
) -> Option<usize> {
    let mut position = 0usize;
    let mut mismatch = None;
    member::equal_members(registered, conflicting, |a, b| {
        let ok = matches!((a, b), (Some(x), Some(y)) if x.equals_structure(y));
        if !ok && mismatch.is_none() {
            mismatch = Some(position);
        }
        position += 1;
        ok
    });
    mismatch
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::storage::InMemoryDictionaryStorage;
    use crate::handler::StandardTypeHandlerCreator;
    use crate::resolving::{
        InMemoryTypeResolver, MemberSource, StandardLengthResolver, StandardMemberSource,
    };

    fn manager_with(resolver: InMemoryTypeResolver) -> TypeHandlerManager {
        let dm = DictionaryManager::load(
            Box::new(InMemoryDictionaryStorage::new()),
            &StandardLengthResolver,
        )
        .unwrap();
        TypeHandlerManager::new(
            dm,
            StandardTypeHandlerCreator::new(StandardMemberSource::default()),
            resolver,
        )
    }

    fn person_type() -> RuntimeType {
        RuntimeType::class("com.app.Person")
            .with_field("com.app.Person", "name", "java.lang.String", true)
            .with_field("com.app.Person", "age", "int", false)
    }

    #[test]
    fn ensure_assigns_fresh_type_id_and_registers_definition() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(person_type());
        resolver.register(RuntimeType::class("java.lang.String"));
        let manager = manager_with(resolver);

        let handler = manager.ensure_type_handler("com.app.Person").unwrap();
        assert!(handler.type_id() >= 1);
        let dictionary = manager.dictionary_manager().dictionary();
        assert_eq!(
            dictionary
                .lookup_runtime_definition("com.app.Person")
                .unwrap()
                .type_id(),
            handler.type_id()
        );
        // member value type got a handler too
        assert!(manager.registry().lookup_by_name("java.lang.String").is_some());
        // ensuring again returns the same handler
        let again = manager.ensure_type_handler("com.app.Person").unwrap();
        assert!(TypeHandlerRef::ptr_eq(&handler, &again));
    }

    #[test]
    fn ensure_revives_stored_type_id_for_identical_structure() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(person_type());
        resolver.register(RuntimeType::class("java.lang.String"));
        let manager = manager_with(resolver);
        let text = "35 com.app.Person {\n\
            \tjava.lang.String com.app.Person#name,\n\
            \tint com.app.Person#age,\n\
            }\n";
        manager
            .dictionary_manager()
            .register_definitions(crate::dictionary::builder::build_definitions(
                crate::dictionary::parser::parse_type_dictionary(text, &StandardLengthResolver)
                    .unwrap(),
            ))
            .unwrap();

        let handler = manager.ensure_type_handler("com.app.Person").unwrap();
        assert_eq!(handler.type_id(), 35);
    }

    #[test]
    fn changed_structure_gets_new_id_and_legacy_handler() {
        let mut resolver = InMemoryTypeResolver::new();
        // current Person dropped the "age" field and renamed nothing
        resolver.register(
            RuntimeType::class("com.app.Person").with_field(
                "com.app.Person",
                "name",
                "java.lang.String",
                true,
            ),
        );
        resolver.register(RuntimeType::class("java.lang.String"));
        let manager = manager_with(resolver);
        let text = "35 com.app.Person {\n\
            \tjava.lang.String com.app.Person#name,\n\
            \tint com.app.Person#age,\n\
            }\n";
        manager
            .dictionary_manager()
            .register_definitions(crate::dictionary::builder::build_definitions(
                crate::dictionary::parser::parse_type_dictionary(text, &StandardLengthResolver)
                    .unwrap(),
            ))
            .unwrap();

        let handler = manager.ensure_type_handler("com.app.Person").unwrap();
        assert_eq!(handler.type_id(), 36);

        let legacy = manager.registry().lookup_by_id(35).unwrap();
        assert!(legacy.is_legacy());
        assert_eq!(legacy.type_name(), "com.app.Person");
    }

    #[test]
    fn initialize_registers_unreachable_handlers() {
        let resolver = InMemoryTypeResolver::new();
        let manager = manager_with(resolver);
        let text = "99 com.gone.Widget {\n\tint x,\n}\n";
        manager
            .dictionary_manager()
            .register_definitions(crate::dictionary::builder::build_definitions(
                crate::dictionary::parser::parse_type_dictionary(text, &StandardLengthResolver)
                    .unwrap(),
            ))
            .unwrap();

        manager.initialize().unwrap();
        let handler = manager.registry().lookup_by_id(99).unwrap();
        assert!(handler.is_legacy());
        assert!(handler.runtime_type().is_none());

        // idempotent
        manager.initialize().unwrap();
        assert_eq!(manager.registry().handler_count(), 1);
    }

    struct SelectiveSource {
        inner: StandardMemberSource,
        veto: &'static str,
    }

    impl MemberSource for SelectiveSource {
        fn describe_members(&self, runtime_type: &RuntimeType) -> Result<Vec<MemberDescriptor>> {
            self.inner.describe_members(runtime_type)
        }

        fn is_persistable(&self, runtime_type: &RuntimeType) -> bool {
            runtime_type.name != self.veto
        }
    }

    #[test]
    fn initialize_tolerates_non_persistable_lineages() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(person_type());
        resolver.register(RuntimeType::class("java.lang.String"));
        resolver.register(RuntimeType::class("com.app.Cursed"));
        let dm = DictionaryManager::load(
            Box::new(InMemoryDictionaryStorage::new()),
            &StandardLengthResolver,
        )
        .unwrap();
        let manager = TypeHandlerManager::new(
            dm,
            StandardTypeHandlerCreator::new(SelectiveSource {
                inner: StandardMemberSource::default(),
                veto: "com.app.Cursed",
            }),
            resolver,
        );
        let text = "35 com.app.Person {\n\
            \tjava.lang.String com.app.Person#name,\n\
            \tint com.app.Person#age,\n\
            }\n\
            40 com.app.Cursed {\n\tint x,\n}\n";
        manager
            .dictionary_manager()
            .register_definitions(crate::dictionary::builder::build_definitions(
                crate::dictionary::parser::parse_type_dictionary(text, &StandardLengthResolver)
                    .unwrap(),
            ))
            .unwrap();

        // the vetoed lineage must not abort its siblings
        manager.initialize().unwrap();
        let person = manager.lookup_type_handler("com.app.Person").unwrap();
        assert_eq!(person.type_id(), 35);
        // the vetoed lineage stays readable as data
        let cursed = manager.lookup_type_handler_by_id(40).unwrap();
        assert!(cursed.is_legacy());
        assert!(cursed.runtime_type().is_none());
    }

    #[test]
    fn update_imports_definitions_and_raises_id_floor() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(person_type());
        resolver.register(RuntimeType::class("java.lang.String"));
        let manager = manager_with(resolver);

        let imported = Arc::new(TypeDefinition::new(
            77,
            "com.ext.Imported",
            vec![MemberDescriptor::simple_field("int", None, "x", false, 4, 4)],
        ));
        manager.update(vec![imported], 100).unwrap();

        let dictionary = manager.dictionary_manager().dictionary();
        assert!(dictionary.contains_type_id(77));
        // fresh ids are assigned above the imported floor
        let handler = manager.ensure_type_handler("com.app.Person").unwrap();
        assert_eq!(handler.type_id(), 101);
    }

    #[test]
    fn concurrent_ensure_converges_on_one_handler() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(person_type());
        resolver.register(RuntimeType::class("java.lang.String"));
        let manager = manager_with(resolver);

        let handlers: Vec<TypeHandlerRef> = std::thread::scope(|s| {
            let threads: Vec<_> = (0..8)
                .map(|_| s.spawn(|| manager.ensure_type_handler("com.app.Person").unwrap()))
                .collect();
            threads.into_iter().map(|t| t.join().unwrap()).collect()
        });

        let first = &handlers[0];
        for handler in &handlers {
            assert!(TypeHandlerRef::ptr_eq(first, handler));
        }
        assert_eq!(
            manager
                .dictionary_manager()
                .dictionary()
                .lookup_runtime_definition("com.app.Person")
                .unwrap()
                .type_id(),
            first.type_id()
        );
        // Person + java.lang.String, each registered exactly once
        assert_eq!(manager.registry().handler_count(), 2);
    }

    #[test]
    fn missing_runtime_type_is_reported() {
        let manager = manager_with(InMemoryTypeResolver::new());
        let err = manager.ensure_type_handler("no.such.Type").unwrap_err();
        assert!(matches!(err, crate::error::Error::MissingRuntimeType { .. }));
    }

    #[test]
    fn polymorphic_lookup_honors_precedence() {
        let mut resolver = InMemoryTypeResolver::new();
        resolver.register(RuntimeType::abstract_type("com.app.Base"));
        resolver.register(RuntimeType::abstract_type("com.app.Marker"));
        resolver.register(
            RuntimeType::class("com.app.Impl")
                .with_supertype("com.app.Base")
                .with_interface("com.app.Marker"),
        );
        let manager = manager_with(resolver);
        manager.ensure_type_handler("com.app.Base").unwrap();
        manager.ensure_type_handler("com.app.Marker").unwrap();

        let impl_type = RuntimeType::class("com.app.Impl")
            .with_supertype("com.app.Base")
            .with_interface("com.app.Marker");
        let found = manager.lookup_polymorphic(&impl_type).unwrap();
        assert_eq!(found.type_name(), "com.app.Base");

        let manager = manager
            .with_supertype_precedence(SupertypePrecedence::InterfacesFirst);
        let found = manager.lookup_polymorphic(&impl_type).unwrap();
        assert_eq!(found.type_name(), "com.app.Marker");
    }
}
