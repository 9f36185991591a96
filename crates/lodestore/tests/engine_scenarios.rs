// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! End-to-end scenarios across dictionary, mapping and handler lifecycle.

use lodestore::dictionary::storage::{
    DictionaryManager, FileDictionaryStorage, InMemoryDictionaryStorage,
};
use lodestore::handler::{StandardTypeHandlerCreator, TypeHandlerManager};
use lodestore::legacy::{ExplicitMappings, LegacyTypeMapper, MappedLegacyHandler};
use lodestore::resolving::{
    InMemoryTypeResolver, RuntimeType, StandardLengthResolver, StandardMemberSource,
};

const PERSON_V1: &str = "35 com.app.Person {\n\
    \tjava.lang.String com.app.Person#firstname,\n\
    \tjava.lang.String com.app.Person#lastname,\n\
    \tint com.app.Person#age,\n\
    }\n";

fn evolved_person() -> RuntimeType {
    // "firstname" renamed, "age" widened, "email" added, "lastname" kept
    RuntimeType::class("com.app.Person")
        .with_field("com.app.Person", "firstName", "java.lang.String", true)
        .with_field("com.app.Person", "lastname", "java.lang.String", true)
        .with_field("com.app.Person", "age", "long", false)
        .with_field("com.app.Person", "email", "java.lang.String", true)
}

fn resolver_with(types: Vec<RuntimeType>) -> InMemoryTypeResolver {
    let mut resolver = InMemoryTypeResolver::new();
    for t in types {
        resolver.register(t);
    }
    resolver.register(RuntimeType::class("java.lang.String"));
    resolver
}

fn in_memory_manager(resolver: InMemoryTypeResolver) -> TypeHandlerManager {
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

#[test]
fn schema_evolution_end_to_end() {
    let manager = in_memory_manager(resolver_with(vec![evolved_person()]));
    manager
        .dictionary_manager()
        .register_definitions(lodestore::dictionary::builder::build_definitions(
            lodestore::dictionary::parser::parse_type_dictionary(
                PERSON_V1,
                &StandardLengthResolver,
            )
            .unwrap(),
        ))
        .unwrap();

    let handler = manager.ensure_type_handler("com.app.Person").unwrap();
    // layout changed, so the lineage grew a new version
    assert_eq!(handler.type_id(), 36);

    let legacy = manager.registry().lookup_by_id(35).unwrap();
    assert!(legacy.is_legacy());
    // not structure-identical, so the full mapped handler was derived
    let mapped = legacy
        .as_any()
        .downcast_ref::<MappedLegacyHandler>()
        .expect("expected a mapped legacy handler");
    let result = mapped.mapping_result();
    // firstname -> firstName, lastname -> lastname, age -> age
    assert_eq!(result.current_of(0), Some(0));
    assert_eq!(result.current_of(1), Some(1));
    assert_eq!(result.current_of(2), Some(2));
    // email is new, nothing legacy was discarded
    assert_eq!(result.new_current(), &[3]);
    assert!(result.discarded_legacy().is_empty());
    assert!(result.is_complete());

    // dictionary now carries both versions of the lineage
    let dictionary = manager.dictionary_manager().dictionary();
    assert_eq!(dictionary.legacy_definitions("com.app.Person").len(), 1);
    assert_eq!(
        dictionary
            .lookup_runtime_definition("com.app.Person")
            .unwrap()
            .type_id(),
        36
    );
}

#[test]
fn explicit_mapping_outranks_heuristics_end_to_end() {
    // heuristically "firstname" would pair with "firstName"; the explicit
    // rule forces it onto "email" instead
    let mut mappings = ExplicitMappings::new();
    mappings
        .type_mapping_mut("com.app.Person")
        .map_member("com.app.Person#firstname", "com.app.Person#email")
        .unwrap();

    let manager = in_memory_manager(resolver_with(vec![evolved_person()]))
        .with_legacy_mapper(LegacyTypeMapper::new(mappings));
    manager
        .dictionary_manager()
        .register_definitions(lodestore::dictionary::builder::build_definitions(
            lodestore::dictionary::parser::parse_type_dictionary(
                PERSON_V1,
                &StandardLengthResolver,
            )
            .unwrap(),
        ))
        .unwrap();

    manager.ensure_type_handler("com.app.Person").unwrap();
    let legacy = manager.registry().lookup_by_id(35).unwrap();
    let mapped = legacy
        .as_any()
        .downcast_ref::<MappedLegacyHandler>()
        .expect("expected a mapped legacy handler");
    let result = mapped.mapping_result();
    assert_eq!(result.current_of(0), Some(3));
    assert!(result.pairings().iter().any(|p| p.is_explicit()));
    // "firstName" is left to default-initialize
    assert!(result.new_current().contains(&0));
}

#[test]
fn dictionary_survives_restart_and_revives_type_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dictionary.ltd");

    let first_id = {
        let dm = DictionaryManager::load(
            Box::new(FileDictionaryStorage::new(&path)),
            &StandardLengthResolver,
        )
        .unwrap();
        let manager = TypeHandlerManager::new(
            dm,
            StandardTypeHandlerCreator::new(StandardMemberSource::default()),
            resolver_with(vec![evolved_person()]),
        );
        manager.ensure_type_handler("com.app.Person").unwrap().type_id()
    };

    // same runtime types after a restart: identities must be stable
    let dm = DictionaryManager::load(
        Box::new(FileDictionaryStorage::new(&path)),
        &StandardLengthResolver,
    )
    .unwrap();
    assert!(dm.dictionary().contains_type_id(first_id));
    let manager = TypeHandlerManager::new(
        dm,
        StandardTypeHandlerCreator::new(StandardMemberSource::default()),
        resolver_with(vec![evolved_person()]),
    );
    let handler = manager.ensure_type_handler("com.app.Person").unwrap();
    assert_eq!(handler.type_id(), first_id);
}

#[test]
fn enum_reorder_preserves_constant_identity() {
    let manager = in_memory_manager(resolver_with(vec![RuntimeType::enumeration(
        "com.app.Color",
        vec!["GREEN".into(), "RED".into(), "BLUE".into()],
    )]));
    let legacy_text = "40 com.app.Color {\n\
        \tenum RED,\n\
        \tenum GREEN,\n\
        \tenum BLUE,\n\
        }\n";
    manager
        .dictionary_manager()
        .register_definitions(lodestore::dictionary::builder::build_definitions(
            lodestore::dictionary::parser::parse_type_dictionary(
                legacy_text,
                &StandardLengthResolver,
            )
            .unwrap(),
        ))
        .unwrap();

    manager.ensure_type_handler("com.app.Color").unwrap();
    let legacy = manager.registry().lookup_by_id(40).unwrap();
    let enum_handler = legacy
        .as_any()
        .downcast_ref::<lodestore::legacy::LegacyEnumHandler>()
        .expect("expected an enum legacy handler");
    assert_eq!(enum_handler.map_ordinal(0), Some(1));
    assert_eq!(enum_handler.map_ordinal(1), Some(0));
    assert_eq!(enum_handler.map_ordinal(2), Some(2));
}

#[test]
fn unresolvable_types_stay_readable_after_initialize() {
    let manager = in_memory_manager(resolver_with(vec![evolved_person()]));
    let text = format!("{}99 com.gone.Widget {{\n\tint x,\n}}\n", PERSON_V1);
    manager
        .dictionary_manager()
        .register_definitions(lodestore::dictionary::builder::build_definitions(
            lodestore::dictionary::parser::parse_type_dictionary(
                &text,
                &StandardLengthResolver,
            )
            .unwrap(),
        ))
        .unwrap();

    manager.initialize().unwrap();
    // Person (both versions) is alive, Widget is preserved as unreachable
    assert!(manager.registry().lookup_by_name("com.app.Person").is_some());
    let widget = manager.registry().lookup_by_id(99).unwrap();
    assert!(widget.runtime_type().is_none());
    assert!(widget.create().is_err());
    assert_eq!(widget.type_name(), "com.gone.Widget");
}
