// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

use std::fmt;

use crate::dictionary::parser::ParseError;

// ---------------------------------------------------------------------------
// ConsistencyError
// ---------------------------------------------------------------------------

/// Structural consistency violation.
///
/// These errors indicate either a corrupt type dictionary or a caller bug.
/// They are never retried or auto-healed: the operation that triggered them
/// must stop.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyError {
    /// Two different type definitions were registered under the same type id.
    DuplicateTypeId {
        type_id: u64,
        existing: String,
        conflicting: String,
    },
    /// A type definition or handler with type id 0 was passed to registration.
    UnassignedTypeId { type_name: String },
    /// The registered member sequence disagrees with the dictionary entry at
    /// the given position (`None` side means sequence length mismatch).
    MemberMismatch {
        type_name: String,
        position: usize,
        registered: Option<String>,
        conflicting: Option<String>,
    },
    /// A handler's type id disagrees with the dictionary entry of the same name.
    TypeIdMismatch {
        type_name: String,
        dictionary_type_id: u64,
        handler_type_id: u64,
    },
    /// A lineage's runtime definition was re-set to a structurally different value.
    RuntimeDefinitionConflict { type_name: String },
    /// Two different legacy members were explicitly mapped to the same target.
    DuplicateMappingTarget { type_name: String, target: String },
    /// One legacy member carries two explicit mapping rules.
    DuplicateMappingSource { type_name: String, source: String },
    /// A registered custom legacy handler matches by type id but disagrees in
    /// member structure with the stored legacy definition.
    CustomHandlerStructureMismatch { type_id: u64, type_name: String },
    /// A type id was re-bound to a different runtime type (or vice versa).
    TypeIdRebind {
        type_id: u64,
        existing: String,
        conflicting: String,
    },
    /// An object id was re-bound to a different identity.
    IdentityRebind { id: u64 },
    /// A handler was initialized twice with different type ids.
    HandlerAlreadyInitialized {
        type_name: String,
        assigned: u64,
        requested: u64,
    },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::DuplicateTypeId {
                type_id,
                existing,
                conflicting,
            } => write!(
                f,
                "duplicate type id {} for \"{}\", already bound to \"{}\"",
                type_id, conflicting, existing
            ),
            ConsistencyError::UnassignedTypeId { type_name } => {
                write!(f, "unassigned type id (0) for type \"{}\"", type_name)
            }
            ConsistencyError::MemberMismatch {
                type_name,
                position,
                registered,
                conflicting,
            } => write!(
                f,
                "member mismatch for type \"{}\" at position {}: registered {:?} != {:?}",
                type_name, position, registered, conflicting
            ),
            ConsistencyError::TypeIdMismatch {
                type_name,
                dictionary_type_id,
                handler_type_id,
            } => write!(
                f,
                "type id inconsistency for \"{}\": dictionary type id = {}, handler type id = {}",
                type_name, dictionary_type_id, handler_type_id
            ),
            ConsistencyError::RuntimeDefinitionConflict { type_name } => write!(
                f,
                "conflicting runtime definition re-initialization for type \"{}\"",
                type_name
            ),
            ConsistencyError::DuplicateMappingTarget { type_name, target } => write!(
                f,
                "duplicate mapping target \"{}\" for type \"{}\"",
                target, type_name
            ),
            ConsistencyError::DuplicateMappingSource { type_name, source } => write!(
                f,
                "duplicate member mapping for legacy member \"{}\" of type \"{}\"",
                source, type_name
            ),
            ConsistencyError::CustomHandlerStructureMismatch { type_id, type_name } => write!(
                f,
                "custom legacy handler structure mismatch for type \"{}\" (type id {})",
                type_name, type_id
            ),
            ConsistencyError::TypeIdRebind {
                type_id,
                existing,
                conflicting,
            } => write!(
                f,
                "type id {} rebind attempted: \"{}\" -> \"{}\"",
                type_id, existing, conflicting
            ),
            ConsistencyError::IdentityRebind { id } => {
                write!(f, "id {} is already bound to a different identity", id)
            }
            ConsistencyError::HandlerAlreadyInitialized {
                type_name,
                assigned,
                requested,
            } => write!(
                f,
                "handler for \"{}\" already initialized with type id {}, re-initialization with {} rejected",
                type_name, assigned, requested
            ),
        }
    }
}

impl std::error::Error for ConsistencyError {}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Top-level error of the type system core.
#[derive(Debug)]
pub enum Error {
    /// Malformed dictionary text. Always fatal to the parse call.
    Parse(ParseError),
    /// Structural consistency violation. Always fatal, never coerced.
    Consistency(ConsistencyError),
    /// A type failed the persistability predicate. Fatal for that type only.
    NotPersistable { type_name: String },
    /// An explicit refactoring mapping names a target that cannot be resolved.
    MappingAmbiguity {
        legacy_type: String,
        member: String,
        target: String,
    },
    /// A required runtime type is missing for a definition that is not
    /// marked unreachable.
    MissingRuntimeType { type_name: String },
    /// Creating an instance through a handler that cannot produce instances.
    InstanceCreation { type_name: String },
    /// Dictionary storage I/O failure.
    Storage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "dictionary parse error: {}", e),
            Error::Consistency(e) => write!(f, "consistency error: {}", e),
            Error::NotPersistable { type_name } => {
                write!(f, "type \"{}\" is not persistable", type_name)
            }
            Error::MappingAmbiguity {
                legacy_type,
                member,
                target,
            } => write!(
                f,
                "unresolvable mapping target \"{}\" for member \"{}\" of legacy type \"{}\"",
                target, member, legacy_type
            ),
            Error::MissingRuntimeType { type_name } => {
                write!(f, "missing runtime type for required type handler: {}", type_name)
            }
            Error::InstanceCreation { type_name } => {
                write!(f, "cannot create instances of type \"{}\"", type_name)
            }
            Error::Storage(msg) => write!(f, "dictionary storage error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Consistency(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<ConsistencyError> for Error {
    fn from(e: ConsistencyError) -> Self {
        Error::Consistency(e)
    }
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_error_display() {
        let err = ConsistencyError::DuplicateTypeId {
            type_id: 7,
            existing: "a.B".to_string(),
            conflicting: "a.C".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("duplicate type id 7"));
        assert!(msg.contains("a.B"));
        assert!(msg.contains("a.C"));
    }

    #[test]
    fn error_wraps_consistency() {
        let err: Error = ConsistencyError::IdentityRebind { id: 42 }.into();
        assert!(matches!(err, Error::Consistency(_)));
        assert!(err.to_string().contains("42"));
    }
}
