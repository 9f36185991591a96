// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Member similarity scoring.
//!
//! Heuristic scores are always in `0.0..=1.0`.  A member pair's score is the
//! arithmetic mean of its name similarity and its type similarity, so a
//! renamed field with an unchanged type still scores well and vice versa.

use crate::member::MemberDescriptor;

/// Minimum heuristic score for a pair to count as a match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Score penalty factor applied to the name similarity when the two members
/// carry different qualifiers.
const QUALIFIER_MISMATCH_FACTOR: f64 = 0.5;

// ---------------------------------------------------------------------------
// Levenshtein
// ---------------------------------------------------------------------------

/// Edit distance over unicode scalar values, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized name similarity: `1 - distance / max_len`, 1.0 for two empty
/// strings.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

// ---------------------------------------------------------------------------
// Type similarity
// ---------------------------------------------------------------------------

/// Similarity of two persisted type names.
///
/// Identical names score 1.0.  Primitive widening and boxing-style pairs
/// score from a fixed table.  Everything else is 0.0: a changed reference
/// type must be carried by the name similarity alone.
pub fn type_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let (x, y) = if a <= b { (a, b) } else { (b, a) };
    match (x, y) {
        ("int", "long") | ("float", "int") | ("double", "long") => 0.75,
        ("double", "float") | ("int", "short") | ("long", "short") => 0.75,
        ("byte", "int") | ("byte", "short") | ("byte", "long") => 0.6,
        ("char", "int") | ("char", "short") => 0.6,
        ("double", "int") | ("float", "long") => 0.6,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Member similarity
// ---------------------------------------------------------------------------

/// Heuristic score for a legacy/runtime member pair, using the built-in
/// primitive widening table.
pub fn member_similarity(legacy: &MemberDescriptor, runtime: &MemberDescriptor) -> f64 {
    member_similarity_with(legacy, runtime, &type_similarity)
}

fn member_similarity_with(
    legacy: &MemberDescriptor,
    runtime: &MemberDescriptor,
    type_score: &dyn Fn(&str, &str) -> f64,
) -> f64 {
    // metadata members never match instance members
    if legacy.is_instance_member() != runtime.is_instance_member() {
        return 0.0;
    }
    if legacy.is_enum_constant() || runtime.is_enum_constant() {
        return if legacy.is_enum_constant() && runtime.is_enum_constant() {
            name_similarity(
                legacy.name().unwrap_or_default(),
                runtime.name().unwrap_or_default(),
            )
        } else {
            0.0
        };
    }
    let mut name_score = name_similarity(
        legacy.name().unwrap_or_default(),
        runtime.name().unwrap_or_default(),
    );
    if legacy.qualifier() != runtime.qualifier() {
        name_score *= QUALIFIER_MISMATCH_FACTOR;
    }
    (name_score + type_score(legacy.type_name(), runtime.type_name())) / 2.0
}

/// Configurable member pair scorer with a validation threshold and optional
/// user-supplied related-type scores layered over the built-in table.
#[derive(Debug, Clone)]
pub struct MemberSimilator {
    threshold: f64,
    /// Unordered type-name pairs with their score, consulted before the
    /// built-in widening table.
    type_scores: Vec<(String, String, f64)>,
}

impl Default for MemberSimilator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            type_scores: Vec::new(),
        }
    }
}

impl MemberSimilator {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Declare two type names as related with the given score, e.g. a class
    /// that replaced another across a refactoring.  Order is irrelevant.
    pub fn with_type_score(
        mut self,
        a: impl Into<String>,
        b: impl Into<String>,
        score: f64,
    ) -> Self {
        let (a, b) = (a.into(), b.into());
        let (x, y) = if a <= b { (a, b) } else { (b, a) };
        self.type_scores.push((x, y, score));
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, legacy: &MemberDescriptor, runtime: &MemberDescriptor) -> f64 {
        member_similarity_with(legacy, runtime, &|a, b| self.type_score(a, b))
    }

    fn type_score(&self, a: &str, b: &str) -> f64 {
        let (x, y) = if a <= b { (a, b) } else { (b, a) };
        self.type_scores
            .iter()
            .find(|(sa, sb, _)| sa == x && sb == y)
            .map(|(_, _, score)| *score)
            .unwrap_or_else(|| type_similarity(a, b))
    }

    /// Whether a score passes the match threshold.
    pub fn validate(&self, score: f64) -> bool {
        score >= self.threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn field(type_name: &str, name: &str) -> MemberDescriptor {
        MemberDescriptor::simple_field(type_name, None, name, false, 4, 4)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("name", "name"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn identical_member_scores_one() {
        let m = field("int", "age");
        assert!((member_similarity(&m, &m) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn renamed_field_keeps_type_score() {
        let legacy = field("int", "age");
        let runtime = field("int", "ageYears");
        let score = member_similarity(&legacy, &runtime);
        // type carries 0.5 of the weight, name adds a partial match on top
        assert!(score > 0.5 && score < 1.0);
    }

    #[test]
    fn widened_primitive_scores_below_identical() {
        let legacy = field("int", "count");
        let runtime = field("long", "count");
        let score = member_similarity(&legacy, &runtime);
        assert!(score > 0.8 && score < 1.0);
    }

    #[test]
    fn qualifier_mismatch_halves_name_contribution() {
        let legacy = MemberDescriptor::simple_field(
            "int",
            Some("com.app.A".to_string()),
            "age",
            false,
            4,
            4,
        );
        let runtime = MemberDescriptor::simple_field(
            "int",
            Some("com.app.B".to_string()),
            "age",
            false,
            4,
            4,
        );
        let score = member_similarity(&legacy, &runtime);
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn metadata_members_never_match_instance_members() {
        let constant = MemberDescriptor::enum_constant("RED");
        let instance = field("int", "RED");
        assert_eq!(member_similarity(&constant, &instance), 0.0);
    }

    #[test]
    fn enum_constants_match_by_name() {
        let a = MemberDescriptor::enum_constant("RED");
        let b = MemberDescriptor::enum_constant("REDDISH");
        assert!(member_similarity(&a, &b) > 0.0);
        assert!((member_similarity(&a, &a.clone()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn user_supplied_type_score_overrides_builtin_table() {
        let legacy = field("java.util.Date", "created");
        let runtime = field("java.time.Instant", "created");
        // unrelated by the built-in table: type contributes nothing
        let plain = MemberSimilator::default();
        assert!((plain.score(&legacy, &runtime) - 0.5).abs() < 1e-9);

        let tuned = MemberSimilator::default()
            .with_type_score("java.time.Instant", "java.util.Date", 0.8);
        assert!((tuned.score(&legacy, &runtime) - 0.9).abs() < 1e-9);
        // order of declaration is irrelevant
        let reversed = MemberSimilator::default()
            .with_type_score("java.util.Date", "java.time.Instant", 0.8);
        assert!((reversed.score(&legacy, &runtime) - 0.9).abs() < 1e-9);
        // the built-in widening table still applies to unlisted pairs
        assert!(tuned.score(&field("int", "n"), &field("long", "n")) > 0.8);
    }

    #[test]
    fn validator_applies_threshold() {
        let similator = MemberSimilator::default();
        assert!(similator.validate(0.5));
        assert!(!similator.validate(0.49));
        assert!(MemberSimilator::with_threshold(0.9).threshold() > 0.5);
    }
}
