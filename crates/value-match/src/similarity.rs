//! Bigram similarity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Scores below this are not considered a match.
pub const DEFAULT_CUTOFF: f64 = 0.4;

/// Minimum blended score when one string contains the other.
pub const CONTAINMENT_FLOOR: f64 = 0.6;

/// A chosen candidate and its blended score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub text: String,
    pub score: f64,
}

/// Case-insensitive Dice coefficient over character bigram multisets.
///
/// Identical strings (after lowercasing) score 1.0; a string shorter than
/// two characters scores 0 against anything else.
pub fn score(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut pool: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *pool.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    let mut shared = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = pool.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let total = (a.len() - 1) + (b.len() - 1);
    (2 * shared) as f64 / total as f64
}

fn contains_either(target_lower: &str, candidate: &str) -> bool {
    let candidate_lower = candidate.to_lowercase();
    candidate_lower.contains(target_lower) || target_lower.contains(&candidate_lower)
}

/// Picks the highest-scoring candidate.
///
/// Plain bigram scores are ranked over every candidate first; containment
/// (either string holding the other) then lifts a candidate to at least
/// [`CONTAINMENT_FLOOR`], replacing the leader only on a strictly higher
/// score. The earliest candidate wins an exact tie within a pass. Returns
/// `None` when nothing scores above zero or the best score is below
/// `cutoff`.
pub fn best_match<I, S>(target: &str, candidates: I, cutoff: f64) -> Option<Match>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let candidates: Vec<S> = candidates.into_iter().collect();
    let target_lower = target.to_lowercase();

    fn consider<'a>(best: &mut Option<(&'a str, f64)>, candidate: &'a str, value: f64) {
        if value > best.map_or(0.0, |(_, score)| score) {
            *best = Some((candidate, value));
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for candidate in &candidates {
        let candidate = candidate.as_ref();
        consider(&mut best, candidate, score(target, candidate));
    }
    for candidate in &candidates {
        let candidate = candidate.as_ref();
        if contains_either(&target_lower, candidate) {
            let value = score(target, candidate).max(CONTAINMENT_FLOOR);
            consider(&mut best, candidate, value);
        }
    }

    best.filter(|(_, score)| *score >= cutoff)
        .map(|(text, score)| Match {
            text: text.to_string(),
            score,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_case_insensitive() {
        assert_eq!(score("Texas", "texas"), 1.0);
        assert_eq!(score("", ""), 1.0);
    }

    #[test]
    fn short_strings_score_zero() {
        assert_eq!(score("a", "ab"), 0.0);
        assert_eq!(score("", "ab"), 0.0);
    }

    #[test]
    fn symmetric_and_bounded() {
        let pairs = [
            ("Washington", "Wash"),
            ("night", "nacht"),
            ("One Family", "Single Family"),
            ("aaaa", "aa"),
        ];
        for (a, b) in pairs {
            let ab = score(a, b);
            assert_eq!(ab, score(b, a));
            assert!((0.0..=1.0).contains(&ab), "{a} / {b} => {ab}");
        }
    }

    #[test]
    fn dice_counts_multisets() {
        // "aaaa" has bigrams {aa x3}; "aa" has {aa x1}: 2*1 / (3+1)
        assert!((score("aaaa", "aa") - 0.5).abs() < 1e-9);
        // night/nacht share only "ht": 2*1 / (4+4)
        assert!((score("night", "nacht") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn best_match_prefers_exact() {
        let m = best_match("Texas", ["Tennessee", "Texas", "Utah"], DEFAULT_CUTOFF).unwrap();
        assert_eq!(m.text, "Texas");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn containment_floor_applies() {
        let m = best_match("Honda", ["HONDA MOTOR CO", "Toyota"], DEFAULT_CUTOFF).unwrap();
        assert_eq!(m.text, "HONDA MOTOR CO");
        assert!(m.score >= CONTAINMENT_FLOOR);
    }

    #[test]
    fn cutoff_filters_weak_matches() {
        assert!(best_match("Zebra", ["Apple", "Mango"], DEFAULT_CUTOFF).is_none());
        assert!(best_match("Zebra", Vec::<String>::new(), 0.0).is_none());
    }

    #[test]
    fn plain_score_beats_an_equal_containment_floor() {
        // "abcdefzzzzzzzzzz" bigram-scores 0.5 and reaches 0.6 only through
        // containment; "abcdxy" scores 0.6 outright and keeps the lead.
        let m = best_match("abcdef", ["abcdefzzzzzzzzzz", "abcdxy"], DEFAULT_CUTOFF).unwrap();
        assert_eq!(m.text, "abcdxy");
        assert!((m.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn first_seen_wins_ties() {
        let m = best_match("ab", ["ab", "AB"], DEFAULT_CUTOFF).unwrap();
        assert_eq!(m.text, "ab");
    }
}
