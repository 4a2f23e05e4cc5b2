//! Similarity scoring for fuzzy assignee-name matching.
//!
//! Both measures return a score in `[0, 1]` and operate on normalized names.
//! `TokenSet` is the default: it tolerates extra descriptor words
//! ("GRAIL" vs "GRAIL BIO" scores 0.5) but not shared prefixes inside a word
//! ("GRAIL" vs "GRAILWAY" scores 0.0). `JaroWinkler` rewards shared
//! prefixes and suits thresholds around 0.9.

use std::collections::BTreeSet;

use crate::config::FuzzyStrategy;
use crate::normalize::tokens;

/// Similarity of two normalized names under `strategy`.
pub fn similarity(strategy: FuzzyStrategy, a: &str, b: &str) -> f64 {
    match strategy {
        FuzzyStrategy::TokenSet => token_set(a, b),
        FuzzyStrategy::JaroWinkler => strsim::jaro_winkler(a, b),
    }
}

/// Jaccard overlap of the two names' word sets.
pub fn token_set(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = tokens(a).into_iter().collect();
    let right: BTreeSet<&str> = tokens(b).into_iter().collect();
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let total = left.union(&right).count();
    shared as f64 / total as f64
}

/// Candidates scoring at least `threshold` against `name`, best first.
/// Ties keep candidate order, so sorted input gives deterministic output.
pub fn rank_candidates<'a>(
    strategy: FuzzyStrategy,
    threshold: f64,
    name: &str,
    candidates: &'a [String],
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = candidates
        .iter()
        .map(|candidate| (candidate.as_str(), similarity(strategy, name, candidate)))
        .filter(|(_, score)| *score >= threshold)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
