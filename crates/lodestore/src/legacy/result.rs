// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Legacy member mapping results.
//!
//! A [`MappingResult`] is the complete verdict over one legacy layout
//! version against the current layout: every legacy member is either paired
//! with a current member or discarded, and every current member is either
//! paired or new.  Explicit pairings outrank every heuristic pairing via
//! their fixed score.

use crate::dictionary::definition::TypeDefinitionRef;
use crate::member::MemberDescriptor;

/// Score assigned to explicitly mapped pairs. Heuristic scores never exceed
/// 1.0, so explicit rules always outrank them.
pub const EXPLICIT_MATCH_SCORE: f64 = 2.0;

/// One resolved legacy-to-current member pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberPairing {
    /// Index into the legacy definition's member sequence.
    pub legacy_index: usize,
    /// Index into the current member sequence.
    pub current_index: usize,
    /// [`EXPLICIT_MATCH_SCORE`] for explicit rules, else the heuristic score.
    pub score: f64,
}

impl MemberPairing {
    pub fn is_explicit(&self) -> bool {
        self.score >= EXPLICIT_MATCH_SCORE
    }
}

/// Complete mapping of a legacy layout onto the current layout.
#[derive(Debug, Clone)]
pub struct MappingResult {
    legacy_definition: TypeDefinitionRef,
    current_members: Vec<MemberDescriptor>,
    /// Pairings ordered by ascending legacy index.
    pairings: Vec<MemberPairing>,
    /// Legacy member indices without a current counterpart (dropped data).
    discarded_legacy: Vec<usize>,
    /// Current member indices without a legacy counterpart (default-valued).
    new_current: Vec<usize>,
}

impl MappingResult {
    /// Combine explicit and heuristic pairings into one complete result.
    ///
    /// Callers guarantee the two pairing sets are disjoint in both index
    /// spaces; the unmatched sets are derived here, never passed in.
    pub fn combine(
        legacy_definition: TypeDefinitionRef,
        current_members: Vec<MemberDescriptor>,
        explicit_pairings: Vec<MemberPairing>,
        heuristic_pairings: Vec<MemberPairing>,
        explicit_deletions: Vec<usize>,
    ) -> Self {
        let mut pairings = explicit_pairings;
        pairings.extend(heuristic_pairings);
        pairings.sort_by_key(|p| p.legacy_index);

        let legacy_count = legacy_definition.all_members().len();
        let current_count = current_members.len();
        let discarded_legacy: Vec<usize> = (0..legacy_count)
            .filter(|i| pairings.iter().all(|p| p.legacy_index != *i))
            .collect();
        debug_assert!(explicit_deletions.iter().all(|i| discarded_legacy.contains(i)));
        let new_current: Vec<usize> = (0..current_count)
            .filter(|i| pairings.iter().all(|p| p.current_index != *i))
            .collect();

        Self {
            legacy_definition,
            current_members,
            pairings,
            discarded_legacy,
            new_current,
        }
    }

    pub fn legacy_definition(&self) -> &TypeDefinitionRef {
        &self.legacy_definition
    }

    pub fn current_members(&self) -> &[MemberDescriptor] {
        &self.current_members
    }

    pub fn pairings(&self) -> &[MemberPairing] {
        &self.pairings
    }

    pub fn discarded_legacy(&self) -> &[usize] {
        &self.discarded_legacy
    }

    pub fn new_current(&self) -> &[usize] {
        &self.new_current
    }

    /// Current index paired with the given legacy index, if any.
    pub fn current_of(&self, legacy_index: usize) -> Option<usize> {
        self.pairings
            .iter()
            .find(|p| p.legacy_index == legacy_index)
            .map(|p| p.current_index)
    }

    /// Whether every member is paired with its positional counterpart and
    /// nothing is discarded or new, i.e. the layouts are interchangeable.
    pub fn is_structure_identical(&self) -> bool {
        self.discarded_legacy.is_empty()
            && self.new_current.is_empty()
            && self.legacy_definition.all_members().len() == self.current_members.len()
            && self
                .pairings
                .iter()
                .all(|p| p.legacy_index == p.current_index)
    }

    /// Completeness check: every index of both sides appears exactly once
    /// across the pairing and unmatched sets.
    pub fn is_complete(&self) -> bool {
        let legacy_total = self.pairings.len() + self.discarded_legacy.len();
        let current_total = self.pairings.len() + self.new_current.len();
        legacy_total == self.legacy_definition.all_members().len()
            && current_total == self.current_members.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dictionary::definition::TypeDefinition;

    fn field(name: &str) -> MemberDescriptor {
        MemberDescriptor::simple_field("int", None, name, false, 4, 4)
    }

    fn legacy(members: Vec<MemberDescriptor>) -> TypeDefinitionRef {
        Arc::new(TypeDefinition::new(35, "com.app.Person", members))
    }

    #[test]
    fn combine_derives_unmatched_sets() {
        let result = MappingResult::combine(
            legacy(vec![field("a"), field("b"), field("c")]),
            vec![field("a"), field("d")],
            vec![MemberPairing {
                legacy_index: 0,
                current_index: 0,
                score: EXPLICIT_MATCH_SCORE,
            }],
            vec![],
            vec![],
        );
        assert!(result.is_complete());
        assert_eq!(result.discarded_legacy(), &[1, 2]);
        assert_eq!(result.new_current(), &[1]);
        assert!(result.pairings()[0].is_explicit());
        assert!(!result.is_structure_identical());
    }

    #[test]
    fn structure_identical_requires_positional_pairings() {
        let result = MappingResult::combine(
            legacy(vec![field("a"), field("b")]),
            vec![field("a"), field("b")],
            vec![],
            vec![
                MemberPairing {
                    legacy_index: 0,
                    current_index: 0,
                    score: 1.0,
                },
                MemberPairing {
                    legacy_index: 1,
                    current_index: 1,
                    score: 1.0,
                },
            ],
            vec![],
        );
        assert!(result.is_structure_identical());
        assert_eq!(result.current_of(1), Some(1));
    }

    #[test]
    fn crossed_pairings_are_not_structure_identical() {
        let result = MappingResult::combine(
            legacy(vec![field("a"), field("b")]),
            vec![field("b"), field("a")],
            vec![],
            vec![
                MemberPairing {
                    legacy_index: 0,
                    current_index: 1,
                    score: 1.0,
                },
                MemberPairing {
                    legacy_index: 1,
                    current_index: 0,
                    score: 1.0,
                },
            ],
            vec![],
        );
        assert!(result.is_complete());
        assert!(!result.is_structure_identical());
    }
}
