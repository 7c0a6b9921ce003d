//! Fuzzy similarity scoring for search-history candidates.
//!
//! Each query character consumes the first unconsumed matching character in the
//! candidate. Matches close to the previous match score higher, matching the
//! candidate's first character earns a small bonus, and candidates that are mostly
//! (or entirely) consumed by the query get a ratio bonus. This is what makes `"gg"`
//! prefer `"Doggo"` over `"Greetings"`.

/// Base points for a match adjacent to the previous one.
const MATCH_POINTS: u32 = 10;
/// Floor for a single match regardless of distance.
const MIN_MATCH_POINTS: u32 = 1;
/// Extra point when the candidate's first character is matched.
const FIRST_CHAR_POINTS: u32 = 1;
/// Scale applied to the consumed-character ratio.
const RATIO_SCALE: f32 = 15.0;
/// Ratio skew applied when the first character was matched.
const FIRST_CHAR_SKEW: f32 = 6.0;
/// Upper bound of the ratio bonus.
const MAX_RATIO_BONUS: u32 = 15;
/// Bonus when every candidate character was consumed.
const FULL_MATCH_POINTS: u32 = 8;

/// Score `candidate` against `query`. Higher is better; an empty query scores 0.
///
/// Comparison is case-insensitive. The result is deterministic and depends only on
/// the two inputs.
pub fn similarity_score(candidate: &str, query: &str) -> u32 {
    // `None` marks a consumed position so it can never match again.
    let mut buffer: Vec<Option<char>> = candidate.to_lowercase().chars().map(Some).collect();
    let candidate_len = buffer.len();

    let mut score: u32 = 0;
    let mut last_matched_index: usize = 0;
    let mut match_count: usize = 0;
    let mut distance_penalty: usize = 0;
    let mut matched_first_char = false;

    for c in query.to_lowercase().chars() {
        let Some(j) = buffer.iter().position(|slot| *slot == Some(c)) else {
            continue;
        };

        if j == 0 {
            score += FIRST_CHAR_POINTS;
            matched_first_char = true;
        }

        let distance = j.abs_diff(last_matched_index) * distance_penalty;
        score += (MATCH_POINTS as usize)
            .saturating_sub(distance)
            .max(MIN_MATCH_POINTS as usize) as u32;

        buffer[j] = None;
        last_matched_index = j + 1;
        distance_penalty = 1;
        match_count += 1;
    }

    if match_count > 0 {
        score += ratio_bonus(match_count, candidate_len, matched_first_char);
        if match_count == candidate_len {
            score += FULL_MATCH_POINTS;
        }
    }

    score
}

/// Bonus for how much of the candidate the query consumed. Computed in `f32` and
/// truncated, so scores stay identical to the host application's implementation.
fn ratio_bonus(match_count: usize, candidate_len: usize, matched_first_char: bool) -> u32 {
    let skew = if matched_first_char { FIRST_CHAR_SKEW } else { 0.0 };
    let raw = match_count as f32 / candidate_len as f32 * RATIO_SCALE + skew;
    (raw as u32).min(MAX_RATIO_BONUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doggo_beats_greetings_for_gg() {
        let doggo = similarity_score("Doggo", "gg");
        let greetings = similarity_score("Greetings", "gg");
        assert_eq!(doggo, 26);
        assert_eq!(greetings, 24);
        assert!(doggo > greetings);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        for candidate in ["", "a", "Hello", "Greetings", "ünïcödé"] {
            assert_eq!(similarity_score(candidate, ""), 0, "candidate {candidate:?}");
        }
    }

    #[test]
    fn test_empty_candidate_scores_zero() {
        assert_eq!(similarity_score("", "abc"), 0);
    }

    #[test]
    fn test_case_insensitive() {
        for (candidate, query) in [("Doggo", "GG"), ("Welcome", "wEl"), ("beep", "PEE")] {
            assert_eq!(
                similarity_score(candidate, query),
                similarity_score(&candidate.to_uppercase(), &query.to_lowercase()),
            );
        }
    }

    #[test]
    fn test_full_match_value_is_pinned() {
        // 1 (first char) + 3 * 10 (adjacent matches) + 15 (capped ratio) + 8 (full)
        assert_eq!(similarity_score("cat", "cat"), 54);
        assert_eq!(similarity_score("CAT", "cat"), 54);
    }

    #[test]
    fn test_unmatched_query_chars_cost_nothing() {
        assert_eq!(similarity_score("cat", "cxat"), similarity_score("cat", "cat"));
        assert_eq!(similarity_score("cat", "xyz"), 0);
    }

    #[test]
    fn test_consumed_positions_do_not_rematch() {
        // Second 'o' has nothing left to consume in "go".
        assert_eq!(similarity_score("go", "goo"), similarity_score("go", "go"));
        // "foo" can consume both of its o's.
        assert!(similarity_score("foo", "oo") > similarity_score("fo", "oo"));
    }

    #[test]
    fn test_distance_penalty_has_floor() {
        // 'z' sits 25 positions after the first match; it still earns one point.
        let candidate = "abcdefghijklmnopqrstuvwxyz";
        let score = similarity_score(candidate, "az");
        // a: 1 + 10, z: max(10 - 24, 1) = 1, ratio: 2/26*15 + 6 = 7.15 -> 7
        assert_eq!(score, 19);
    }

    #[test]
    fn test_first_match_is_not_penalised_by_distance() {
        // The first match always earns full points wherever it lands.
        assert_eq!(similarity_score("xxxxxa", "a"), 10 + 2);
    }

    #[test]
    fn test_ratio_bonus_is_capped() {
        assert_eq!(ratio_bonus(3, 3, true), 15);
        assert_eq!(ratio_bonus(2, 5, false), 6);
        assert_eq!(ratio_bonus(2, 9, true), 9);
    }
}
