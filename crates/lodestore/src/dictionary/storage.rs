// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Durable dictionary storage and the store-on-change manager.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dictionary::builder;
use crate::dictionary::definition::TypeDefinitionRef;
use crate::dictionary::TypeDictionary;
use crate::error::{Error, Result};
use crate::resolving::FieldLengthResolver;

// ---------------------------------------------------------------------------
// DictionaryStorage
// ---------------------------------------------------------------------------

/// Storage medium for the canonical dictionary text.
pub trait DictionaryStorage: Send + Sync {
    /// Load the stored text, `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;

    /// Store the full text, replacing any previous content.
    fn store(&self, text: &str) -> Result<()>;
}

/// File-backed storage. Writes go through a sibling temp file and an atomic
/// rename so a crash never leaves a half-written dictionary.
pub struct FileDictionaryStorage {
    path: PathBuf,
}

impl FileDictionaryStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DictionaryStorage for FileDictionaryStorage {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "reading {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn store(&self, text: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            Error::Storage(format!("writing {}: {}", self.path.display(), e))
        })?;
        log::debug!("stored type dictionary to {}", self.path.display());
        Ok(())
    }
}

/// In-memory storage for embedded use and tests.
#[derive(Default)]
pub struct InMemoryDictionaryStorage {
    text: parking_lot::Mutex<Option<String>>,
}

impl InMemoryDictionaryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DictionaryStorage for InMemoryDictionaryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.text.lock().clone())
    }

    fn store(&self, text: &str) -> Result<()> {
        *self.text.lock() = Some(text.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DictionaryManager
// ---------------------------------------------------------------------------

/// Couples a [`TypeDictionary`] with a storage medium: every mutating call
/// that actually changes the dictionary re-stores the full canonical text.
pub struct DictionaryManager {
    dictionary: Arc<TypeDictionary>,
    storage: Box<dyn DictionaryStorage>,
}

impl DictionaryManager {
    /// Load the stored dictionary (if any) and wrap it for store-on-change
    /// operation.
    pub fn load(
        storage: Box<dyn DictionaryStorage>,
        length_resolver: &dyn FieldLengthResolver,
    ) -> Result<Self> {
        let dictionary = match storage.load()? {
            Some(text) => builder::compile_dictionary(&text, length_resolver)?,
            None => {
                log::info!("no stored type dictionary found, starting empty");
                TypeDictionary::new()
            }
        };
        Ok(Self {
            dictionary: Arc::new(dictionary),
            storage,
        })
    }

    pub fn dictionary(&self) -> &Arc<TypeDictionary> {
        &self.dictionary
    }

    /// Register one definition, persisting the dictionary if it changed.
    pub fn register_definition(&self, definition: TypeDefinitionRef) -> Result<bool> {
        let changed = self.dictionary.register_definition(definition)?;
        if changed {
            self.store()?;
        }
        Ok(changed)
    }

    /// Register a batch, persisting once at the end if anything changed.
    pub fn register_definitions<I>(&self, definitions: I) -> Result<bool>
    where
        I: IntoIterator<Item = TypeDefinitionRef>,
    {
        let changed = self.dictionary.register_definitions(definitions)?;
        if changed {
            self.store()?;
        }
        Ok(changed)
    }

    /// Set a lineage's runtime definition, persisting on change.
    pub fn set_runtime_definition(&self, definition: TypeDefinitionRef) -> Result<bool> {
        let changed = self.dictionary.set_runtime_definition(definition)?;
        if changed {
            self.store()?;
        }
        Ok(changed)
    }

    /// Unconditionally persist the current dictionary contents.
    pub fn store(&self) -> Result<()> {
        self.storage.store(&self.dictionary.assemble())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::definition::TypeDefinition;
    use crate::member::MemberDescriptor;
    use crate::resolving::StandardLengthResolver;

    fn person(type_id: u64) -> TypeDefinitionRef {
        Arc::new(TypeDefinition::new(
            type_id,
            "com.app.Person",
            vec![MemberDescriptor::simple_field(
                "java.lang.String",
                Some("com.app.Person".to_string()),
                "name",
                true,
                8,
                8,
            )],
        ))
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileDictionaryStorage::new(dir.path().join("dictionary.ltd"));
        assert!(storage.load().unwrap().is_none());
        storage.store("6 int {\n\tprimitive int,\n}\n").unwrap();
        assert_eq!(
            storage.load().unwrap().unwrap(),
            "6 int {\n\tprimitive int,\n}\n"
        );
    }

    #[test]
    fn manager_stores_on_change_only() {
        let storage = Box::new(InMemoryDictionaryStorage::new());
        let manager = DictionaryManager::load(storage, &StandardLengthResolver).unwrap();
        assert!(manager.register_definition(person(35)).unwrap());
        let stored = manager.storage.load().unwrap().unwrap();
        assert!(stored.contains("35 com.app.Person"));

        // identical re-registration leaves storage untouched
        assert!(!manager.register_definition(person(35)).unwrap());
    }

    #[test]
    fn manager_reloads_persisted_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictionary.ltd");
        {
            let manager = DictionaryManager::load(
                Box::new(FileDictionaryStorage::new(&path)),
                &StandardLengthResolver,
            )
            .unwrap();
            manager.register_definition(person(35)).unwrap();
        }
        let reloaded = DictionaryManager::load(
            Box::new(FileDictionaryStorage::new(&path)),
            &StandardLengthResolver,
        )
        .unwrap();
        assert_eq!(reloaded.dictionary().definition_count(), 1);
        assert_eq!(
            reloaded
                .dictionary()
                .lookup_latest_by_name("com.app.Person")
                .unwrap()
                .type_id(),
            35
        );
    }
}
