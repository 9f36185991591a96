// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Dictionary compilation: parsed entries into a populated [`TypeDictionary`].

use std::sync::Arc;

use crate::dictionary::definition::{TypeDefinition, TypeDefinitionRef};
use crate::dictionary::parser::{self, TypeDictionaryEntry};
use crate::dictionary::TypeDictionary;
use crate::error::Result;
use crate::resolving::FieldLengthResolver;

/// Convert parsed entries into shared definitions, preserving entry order.
pub fn build_definitions(entries: Vec<TypeDictionaryEntry>) -> Vec<TypeDefinitionRef> {
    entries
        .into_iter()
        .map(|e| Arc::new(TypeDefinition::new(e.type_id, e.type_name, e.members)))
        .collect()
}

/// Parse dictionary text and register every entry into a fresh dictionary.
///
/// Exactly duplicated entries collapse silently (registration is idempotent);
/// conflicting duplicates fail the whole compilation.
pub fn compile_dictionary(
    input: &str,
    length_resolver: &dyn FieldLengthResolver,
) -> Result<TypeDictionary> {
    let entries = parser::parse_type_dictionary(input, length_resolver)?;
    let dictionary = TypeDictionary::new();
    dictionary.register_definitions(build_definitions(entries))?;
    log::info!(
        "compiled type dictionary with {} definitions",
        dictionary.definition_count()
    );
    Ok(dictionary)
}
