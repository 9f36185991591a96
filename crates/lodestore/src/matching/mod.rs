// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Heuristic matching of legacy members against runtime members.

pub mod multi_match;
pub mod similarity;

pub use multi_match::{MultiMatch, MultiMatcher};
pub use similarity::{
    levenshtein, member_similarity, name_similarity, type_similarity, MemberSimilator,
    DEFAULT_MATCH_THRESHOLD,
};
