//! Ordering of search-history candidates against the current query.
//!
//! Ranking is a stable sort by descending similarity score: candidates with equal
//! scores keep their input order, so repeated ranking never shuffles ties and
//! `rank(rank(xs, q), q) == rank(xs, q)`. Selecting the top N for display is left
//! to the caller.

use std::cmp::Reverse;

use crate::similarity::similarity_score;

/// A candidate paired with its score for one ranking pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub word: String,
    pub score: u32,
}

/// Score every candidate against `query`, preserving input order.
pub fn score_candidates<S: AsRef<str>>(candidates: &[S], query: &str) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .map(|c| ScoredCandidate {
            word: c.as_ref().to_string(),
            score: similarity_score(c.as_ref(), query),
        })
        .collect()
}

/// Rank candidates by similarity to `query`, best first.
pub fn rank<S: AsRef<str>>(candidates: &[S], query: &str) -> Vec<String> {
    let mut scored = score_candidates(candidates, query);
    // sort_by_key is stable; ties keep their input order.
    scored.sort_by_key(|c| Reverse(c.score));
    scored.into_iter().map(|c| c.word).collect()
}
