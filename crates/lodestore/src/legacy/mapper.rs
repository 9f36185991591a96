// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Legacy member mapping: explicit rules first, heuristics for the rest.

use std::collections::BTreeMap;

use crate::dictionary::definition::TypeDefinitionRef;
use crate::error::{ConsistencyError, Error, Result};
use crate::legacy::result::{MappingResult, MemberPairing, EXPLICIT_MATCH_SCORE};
use crate::matching::{MemberSimilator, MultiMatcher};
use crate::member::MemberDescriptor;

// ---------------------------------------------------------------------------
// Explicit mappings
// ---------------------------------------------------------------------------

/// Explicit member mapping rules for one legacy type version, keyed by the
/// legacy member identifier.  A `None` target is an explicit deletion.
#[derive(Debug, Default, Clone)]
pub struct TypeMemberMapping {
    rules: BTreeMap<String, Option<String>>,
}

impl TypeMemberMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a legacy member to a current member by identifier.
    pub fn map_member(
        &mut self,
        legacy_identifier: impl Into<String>,
        current_identifier: impl Into<String>,
    ) -> Result<&mut Self> {
        self.insert(legacy_identifier.into(), Some(current_identifier.into()))?;
        Ok(self)
    }

    /// Explicitly drop a legacy member, suppressing heuristic matching.
    pub fn delete_member(&mut self, legacy_identifier: impl Into<String>) -> Result<&mut Self> {
        self.insert(legacy_identifier.into(), None)?;
        Ok(self)
    }

    fn insert(&mut self, source: String, target: Option<String>) -> Result<()> {
        if self.rules.contains_key(&source) {
            return Err(ConsistencyError::DuplicateMappingSource {
                type_name: String::new(),
                source,
            }
            .into());
        }
        self.rules.insert(source, target);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

/// All explicit mapping rules, keyed by legacy type name.
#[derive(Debug, Default, Clone)]
pub struct ExplicitMappings {
    by_type: BTreeMap<String, TypeMemberMapping>,
}

impl ExplicitMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_mapping_mut(&mut self, legacy_type_name: impl Into<String>) -> &mut TypeMemberMapping {
        self.by_type.entry(legacy_type_name.into()).or_default()
    }

    pub fn lookup(&self, legacy_type_name: &str) -> Option<&TypeMemberMapping> {
        self.by_type.get(legacy_type_name)
    }
}

// ---------------------------------------------------------------------------
// MappingResultor
// ---------------------------------------------------------------------------

/// Finalization hook applied to every mapping result before it becomes
/// immutable.  Implementations may validate, log or veto a result.
pub trait MappingResultor: Send + Sync {
    fn finalize(&self, result: MappingResult) -> Result<MappingResult>;
}

/// Default resultor: passes the result through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResultor;

impl MappingResultor for StandardResultor {
    fn finalize(&self, result: MappingResult) -> Result<MappingResult> {
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// LegacyTypeMapper
// ---------------------------------------------------------------------------

/// Maps a legacy layout version onto the current member sequence.
pub struct LegacyTypeMapper {
    similator: MemberSimilator,
    explicit: ExplicitMappings,
    resultor: Box<dyn MappingResultor>,
}

impl Default for LegacyTypeMapper {
    fn default() -> Self {
        Self::new(ExplicitMappings::new())
    }
}

impl LegacyTypeMapper {
    pub fn new(explicit: ExplicitMappings) -> Self {
        Self {
            similator: MemberSimilator::default(),
            explicit,
            resultor: Box::new(StandardResultor),
        }
    }

    pub fn with_similator(mut self, similator: MemberSimilator) -> Self {
        self.similator = similator;
        self
    }

    pub fn with_resultor(mut self, resultor: impl MappingResultor + 'static) -> Self {
        self.resultor = Box::new(resultor);
        self
    }

    pub fn explicit_mappings(&self) -> &ExplicitMappings {
        &self.explicit
    }

    /// Produce the complete mapping of one legacy definition onto the
    /// current member sequence.
    pub fn map(
        &self,
        legacy_definition: &TypeDefinitionRef,
        current_members: &[MemberDescriptor],
    ) -> Result<MappingResult> {
        let legacy_members = legacy_definition.all_members();
        let mapping = self.explicit.lookup(legacy_definition.type_name());

        // explicit pass
        let mut explicit_pairings = Vec::new();
        let mut explicit_deletions = Vec::new();
        let mut legacy_taken = vec![false; legacy_members.len()];
        let mut current_taken = vec![false; current_members.len()];
        if let Some(mapping) = mapping {
            self.apply_explicit_rules(
                legacy_definition,
                current_members,
                mapping,
                &mut explicit_pairings,
                &mut explicit_deletions,
                &mut legacy_taken,
                &mut current_taken,
            )?;
        }

        // heuristic pass over the leftovers of both sides
        let leftover_legacy: Vec<usize> =
            (0..legacy_members.len()).filter(|i| !legacy_taken[*i]).collect();
        let leftover_current: Vec<usize> =
            (0..current_members.len()).filter(|i| !current_taken[*i]).collect();
        let sources: Vec<MemberDescriptor> = leftover_legacy
            .iter()
            .map(|&i| legacy_members[i].clone())
            .collect();
        let targets: Vec<MemberDescriptor> = leftover_current
            .iter()
            .map(|&i| current_members[i].clone())
            .collect();

        let similator = &self.similator;
        let matcher = MultiMatcher::new(move |a: &MemberDescriptor, b: &MemberDescriptor| {
            similator.score(a, b)
        })
        .with_validator(move |_, _, score| similator.validate(score));
        let matched = matcher.match_items(&sources, &targets);

        let heuristic_pairings: Vec<MemberPairing> = matched
            .pairs()
            .iter()
            .map(|p| MemberPairing {
                legacy_index: leftover_legacy[p.source],
                current_index: leftover_current[p.target],
                score: p.score,
            })
            .collect();

        log::debug!(
            "mapped legacy type {} ({}): {} explicit, {} heuristic pairings",
            legacy_definition.type_id(),
            legacy_definition.type_name(),
            explicit_pairings.len(),
            heuristic_pairings.len()
        );

        self.resultor.finalize(MappingResult::combine(
            TypeDefinitionRef::clone(legacy_definition),
            current_members.to_vec(),
            explicit_pairings,
            heuristic_pairings,
            explicit_deletions,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_explicit_rules(
        &self,
        legacy_definition: &TypeDefinitionRef,
        current_members: &[MemberDescriptor],
        mapping: &TypeMemberMapping,
        explicit_pairings: &mut Vec<MemberPairing>,
        explicit_deletions: &mut Vec<usize>,
        legacy_taken: &mut [bool],
        current_taken: &mut [bool],
    ) -> Result<()> {
        let legacy_members = legacy_definition.all_members();
        for (source, target) in mapping.rules() {
            let Some(legacy_index) = find_member(legacy_members, source) else {
                // the rule may belong to a different version of this lineage
                log::warn!(
                    "explicit mapping source \"{}\" not present in legacy type {} ({})",
                    source,
                    legacy_definition.type_id(),
                    legacy_definition.type_name()
                );
                continue;
            };
            match target {
                None => {
                    legacy_taken[legacy_index] = true;
                    explicit_deletions.push(legacy_index);
                }
                Some(target) => {
                    let current_index =
                        find_member(current_members, target).ok_or_else(|| {
                            Error::MappingAmbiguity {
                                legacy_type: legacy_definition.type_name().to_string(),
                                member: source.to_string(),
                                target: target.to_string(),
                            }
                        })?;
                    if current_taken[current_index] {
                        return Err(ConsistencyError::DuplicateMappingTarget {
                            type_name: legacy_definition.type_name().to_string(),
                            target: target.to_string(),
                        }
                        .into());
                    }
                    legacy_taken[legacy_index] = true;
                    current_taken[current_index] = true;
                    explicit_pairings.push(MemberPairing {
                        legacy_index,
                        current_index,
                        score: EXPLICIT_MATCH_SCORE,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Find a member by identifier, falling back to the simple name when the
/// identifier carries no qualifier.
fn find_member(members: &[MemberDescriptor], identifier: &str) -> Option<usize> {
    if let Some(i) = members.iter().position(|m| m.identifier() == identifier) {
        return Some(i);
    }
    if !identifier.contains(crate::member::FIELD_QUALIFIER_SEPARATOR) {
        return members.iter().position(|m| m.name() == Some(identifier));
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
