// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Best-pair assignment between two element sequences.
//!
//! The matcher scores every source/target pair, discards pairs the validator
//! rejects, then assigns pairs by repeated global maximum so that each
//! element is used at most once.  Ties resolve to the earliest source, then
//! the earliest target, which keeps results deterministic.

use std::fmt;

// ---------------------------------------------------------------------------
// MultiMatch
// ---------------------------------------------------------------------------

/// One assigned pair: source index, target index, score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub source: usize,
    pub target: usize,
    pub score: f64,
}

/// Result of a matching run over `source_count` x `target_count` elements.
#[derive(Debug, Clone)]
pub struct MultiMatch {
    source_count: usize,
    target_count: usize,
    /// Assigned pairs ordered by ascending source index.
    pairs: Vec<MatchedPair>,
}

impl MultiMatch {
    pub fn pairs(&self) -> &[MatchedPair] {
        &self.pairs
    }

    /// Target index matched to the given source, if any.
    pub fn target_of(&self, source: usize) -> Option<usize> {
        self.pairs
            .iter()
            .find(|p| p.source == source)
            .map(|p| p.target)
    }

    /// Source index matched to the given target, if any.
    pub fn source_of(&self, target: usize) -> Option<usize> {
        self.pairs
            .iter()
            .find(|p| p.target == target)
            .map(|p| p.source)
    }

    /// Source indices left without a target.
    pub fn unmatched_sources(&self) -> Vec<usize> {
        (0..self.source_count)
            .filter(|i| self.target_of(*i).is_none())
            .collect()
    }

    /// Target indices left without a source.
    pub fn unmatched_targets(&self) -> Vec<usize> {
        (0..self.target_count)
            .filter(|i| self.source_of(*i).is_none())
            .collect()
    }

    /// Sum of all assigned pair scores.
    pub fn total_similarity(&self) -> f64 {
        self.pairs.iter().map(|p| p.score).sum()
    }

    /// Whether there was nothing to match at all (one side empty).  Distinct
    /// from a run that scored every pair and still assigned none.
    pub fn is_vacuous(&self) -> bool {
        self.source_count == 0 || self.target_count == 0
    }
}

impl fmt::Display for MultiMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pairs over {}x{} (total similarity {:.3})",
            self.pairs.len(),
            self.source_count,
            self.target_count,
            self.total_similarity()
        )
    }
}

// ---------------------------------------------------------------------------
// MultiMatcher
// ---------------------------------------------------------------------------

/// Generic matcher parameterized over a scoring and a validation closure.
pub struct MultiMatcher<'a, T> {
    similator: Box<dyn Fn(&T, &T) -> f64 + 'a>,
    validator: Box<dyn Fn(&T, &T, f64) -> bool + 'a>,
}

impl<'a, T> MultiMatcher<'a, T> {
    pub fn new(similator: impl Fn(&T, &T) -> f64 + 'a) -> Self {
        Self {
            similator: Box::new(similator),
            validator: Box::new(|_, _, score| score > 0.0),
        }
    }

    /// Replace the default accept-positive validator.
    pub fn with_validator(mut self, validator: impl Fn(&T, &T, f64) -> bool + 'a) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Run the assignment over the given sequences.
    pub fn match_items(&self, sources: &[T], targets: &[T]) -> MultiMatch {
        // candidate matrix of validated scores
        let mut candidates: Vec<MatchedPair> = Vec::new();
        for (si, s) in sources.iter().enumerate() {
            for (ti, t) in targets.iter().enumerate() {
                let score = (self.similator)(s, t);
                if (self.validator)(s, t, score) {
                    candidates.push(MatchedPair {
                        source: si,
                        target: ti,
                        score,
                    });
                }
            }
        }

        let mut source_used = vec![false; sources.len()];
        let mut target_used = vec![false; targets.len()];
        let mut pairs = Vec::new();
        loop {
            let best = candidates
                .iter()
                .filter(|p| !source_used[p.source] && !target_used[p.target])
                .fold(None::<MatchedPair>, |best, p| match best {
                    None => Some(*p),
                    Some(b) if p.score > b.score => Some(*p),
                    Some(b) => Some(b),
                });
            match best {
                Some(p) => {
                    source_used[p.source] = true;
                    target_used[p.target] = true;
                    pairs.push(p);
                }
                None => break,
            }
        }
        pairs.sort_by_key(|p| p.source);

        log::trace!(
            "matched {} of {} sources against {} targets",
            pairs.len(),
            sources.len(),
            targets.len()
        );
        MultiMatch {
            source_count: sources.len(),
            target_count: targets.len(),
            pairs,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::{member_similarity, MemberSimilator};
    use crate::member::MemberDescriptor;

    fn field(type_name: &str, name: &str) -> MemberDescriptor {
        MemberDescriptor::simple_field(type_name, None, name, false, 4, 4)
    }

    fn member_matcher<'a>(
        similator: &'a MemberSimilator,
    ) -> MultiMatcher<'a, MemberDescriptor> {
        MultiMatcher::new(|a: &MemberDescriptor, b: &MemberDescriptor| member_similarity(a, b))
            .with_validator(move |_, _, score| similator.validate(score))
    }

    #[test]
    fn each_element_used_at_most_once() {
        let similator = MemberSimilator::default();
        let sources = vec![field("int", "age"), field("int", "age2")];
        let targets = vec![field("int", "age")];
        let result = member_matcher(&similator).match_items(&sources, &targets);
        assert_eq!(result.pairs().len(), 1);
        // the exact-name source wins the single target
        assert_eq!(result.target_of(0), Some(0));
        assert_eq!(result.unmatched_sources(), vec![1]);
        assert!(result.unmatched_targets().is_empty());
    }

    #[test]
    fn global_best_pair_wins_over_greedy_row_order() {
        // source 0 scores decently on target 0, but source 1 scores better
        // there; the global pass must give target 0 to source 1
        let sources = vec![field("int", "ab"), field("int", "abcd")];
        let targets = vec![field("int", "abcd"), field("int", "ab")];
        let matcher = MultiMatcher::new(|a: &MemberDescriptor, b: &MemberDescriptor| {
            member_similarity(a, b)
        });
        let result = matcher.match_items(&sources, &targets);
        assert_eq!(result.target_of(0), Some(1));
        assert_eq!(result.target_of(1), Some(0));
        assert!((result.total_similarity() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn validator_filters_low_scores() {
        let similator = MemberSimilator::default();
        let sources = vec![field("java.lang.String", "alpha")];
        let targets = vec![field("int", "zzz")];
        let result = member_matcher(&similator).match_items(&sources, &targets);
        assert!(result.pairs().is_empty());
        assert_eq!(result.unmatched_sources(), vec![0]);
        assert_eq!(result.unmatched_targets(), vec![0]);
    }

    #[test]
    fn empty_inputs_yield_empty_match() {
        let matcher: MultiMatcher<MemberDescriptor> = MultiMatcher::new(|_, _| 1.0);
        let result = matcher.match_items(&[], &[]);
        assert!(result.pairs().is_empty());
        assert_eq!(result.total_similarity(), 0.0);
    }

    #[test]
    fn vacuous_run_is_distinct_from_matching_nothing() {
        let matcher: MultiMatcher<MemberDescriptor> = MultiMatcher::new(|_, _| 0.0);
        // one side empty: there was nothing to match at all
        let vacuous = matcher.match_items(&[], &[field("int", "a")]);
        assert!(vacuous.is_vacuous());
        assert!(vacuous.pairs().is_empty());
        // both sides populated but nothing validated: a real empty result
        let unmatched = matcher.match_items(&[field("int", "a")], &[field("int", "b")]);
        assert!(!unmatched.is_vacuous());
        assert!(unmatched.pairs().is_empty());
        assert_eq!(unmatched.unmatched_sources(), vec![0]);
    }
}
