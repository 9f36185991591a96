// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! # lodestore - persistent type system core
//!
//! The type dictionary, schema evolution and identity registry engine of an
//! embedded object-graph persistence layer.  It answers three questions:
//!
//! - **What shape does stored data have?**  Every persisted layout version
//!   of every type lives in the [`dictionary::TypeDictionary`], keyed by an
//!   immutable type id and rendered to a human-readable canonical text.
//! - **How does old data map onto today's types?**  The [`legacy`] module
//!   pairs legacy members with current members, explicit refactoring rules
//!   first, validated heuristics for the rest, and derives the cheapest
//!   correct [`handler::TypeHandler`] for each superseded version.
//! - **Which object is which?**  The [`registry`] module keeps the biunique
//!   object id and type id tables that make references stable across runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use lodestore::dictionary::storage::{DictionaryManager, InMemoryDictionaryStorage};
//! use lodestore::handler::{StandardTypeHandlerCreator, TypeHandler, TypeHandlerManager};
//! use lodestore::resolving::{
//!     InMemoryTypeResolver, RuntimeType, StandardLengthResolver, StandardMemberSource,
//! };
//!
//! fn main() -> lodestore::Result<()> {
//!     let mut resolver = InMemoryTypeResolver::new();
//!     resolver.register(
//!         RuntimeType::class("com.app.Person")
//!             .with_field("com.app.Person", "name", "java.lang.String", true),
//!     );
//!     resolver.register(RuntimeType::class("java.lang.String"));
//!
//!     let dictionary = DictionaryManager::load(
//!         Box::new(InMemoryDictionaryStorage::new()),
//!         &StandardLengthResolver,
//!     )?;
//!     let manager = TypeHandlerManager::new(
//!         dictionary,
//!         StandardTypeHandlerCreator::new(StandardMemberSource::default()),
//!         resolver,
//!     );
//!
//!     let handler = manager.ensure_type_handler("com.app.Person")?;
//!     assert!(handler.type_id() > 0);
//!     Ok(())
//! }
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`dictionary::TypeDictionary`] | Catalog of all persisted type layouts |
//! | [`member::MemberDescriptor`] | One persisted field, constant or definition |
//! | [`handler::TypeHandlerManager`] | Handler lifecycle: ensure, validate, initialize |
//! | [`legacy::LegacyTypeMapper`] | Legacy-to-current member mapping |
//! | [`registry::ObjectRegistry`] | Biunique object id <-> identity table |

pub mod dictionary;
pub mod error;
pub mod handler;
pub mod legacy;
pub mod matching;
pub mod member;
pub mod registry;
pub mod resolving;

pub use error::{ConsistencyError, Error, Result};
