//! Similarity Metric
//!
//! Bounded [0, 1] similarity between two response bodies.
//!
//! # Strategies
//! - `LengthRatio`: `min(len) / max(len)`, O(1)
//! - `Content`: longest-matching-blocks ratio over the full texts, O(n*m) worst case
//!
//! Both return exactly 1.0 for identical bodies and are symmetric.
//! Content scoring is time-boxed by `SimilarityMetric`: one call over budget
//! switches the metric to `LengthRatio` for good.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::snapshot::Snapshot;
use crate::constants::SCORE_PRECISION;

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LengthRatio,
    Content,
}

impl Strategy {
    /// Size-based choice made from the reference body
    pub fn for_body_len(len: usize, length_limit: usize) -> Self {
        if len > length_limit {
            Strategy::LengthRatio
        } else {
            Strategy::Content
        }
    }

    pub fn score(self, reference: &Snapshot, candidate: &Snapshot) -> f64 {
        if reference.same_body(candidate) {
            return 1.0;
        }
        match self {
            Strategy::LengthRatio => length_ratio(reference.len(), candidate.len()),
            Strategy::Content => content_ratio(reference.body(), candidate.body()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::LengthRatio => "length ratio",
            Strategy::Content => "content",
        }
    }
}

// ============================================================================
// TIME-BOXED METRIC
// ============================================================================

/// Strategy holder that enforces the content-scoring time budget
#[derive(Debug, Clone)]
pub struct SimilarityMetric {
    strategy: Strategy,
    budget: Duration,
    downgraded: bool,
}

impl SimilarityMetric {
    pub fn new(strategy: Strategy, budget: Duration) -> Self {
        Self { strategy, budget, downgraded: false }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// True once a content computation ran over budget
    pub fn downgraded(&self) -> bool {
        self.downgraded
    }

    /// Time one full block match on a real pair, equal bodies included.
    /// Over budget downgrades the metric like `score` does.
    pub fn calibrate(&mut self, reference: &Snapshot, sample: &Snapshot) {
        if self.strategy == Strategy::LengthRatio {
            return;
        }

        let started = Instant::now();
        std::hint::black_box(match_ratio(reference.body(), sample.body()));
        self.enforce_budget(started.elapsed());
    }

    /// Score a pair. A content computation slower than the budget downgrades
    /// the metric and the pair is re-scored by length.
    pub fn score(&mut self, reference: &Snapshot, candidate: &Snapshot) -> f64 {
        if self.strategy == Strategy::LengthRatio {
            return Strategy::LengthRatio.score(reference, candidate);
        }

        let started = Instant::now();
        let score = Strategy::Content.score(reference, candidate);

        if self.enforce_budget(started.elapsed()) {
            return Strategy::LengthRatio.score(reference, candidate);
        }

        score
    }

    fn enforce_budget(&mut self, elapsed: Duration) -> bool {
        if elapsed <= self.budget {
            return false;
        }

        log::warn!(
            "Content similarity took {:?} (budget {:?}), switching to length ratio for the rest of the run",
            elapsed, self.budget
        );
        self.strategy = Strategy::LengthRatio;
        self.downgraded = true;
        true
    }
}

// ============================================================================
// SCORING FUNCTIONS
// ============================================================================

/// Round to the shared score precision (3 digits)
pub fn round_score(score: f64) -> f64 {
    let factor = 10f64.powi(SCORE_PRECISION);
    (score * factor).round() / factor
}

/// `min(a, b) / max(a, b)`; two empty bodies are identical
pub fn length_ratio(a_len: usize, b_len: usize) -> f64 {
    let max = a_len.max(b_len);
    if max == 0 {
        return 1.0;
    }
    a_len.min(b_len) as f64 / max as f64
}

/// `2 * M / (len(a) + len(b))` where M counts characters covered by the
/// recursively found longest common blocks.
pub fn content_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    match_ratio(a, b)
}

/// Block matching without the equal-input shortcut
fn match_ratio(a: &str, b: &str) -> f64 {

    // Fixed argument order keeps the block search (and so the score) symmetric
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = BlockMatcher::new(&a, &b).matched_chars();
    (2 * matched) as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b_index: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b_index.entry(*c).or_default().push(j);
        }
        Self { a, b, b_index }
    }

    /// Total size of all matching blocks
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            matched += size;

            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                queue.push((i + size, ahi, j + size, bhi));
            }
        }

        matched
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` inside the given ranges,
    /// earliest in `a` (then `b`) on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut run_len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b_index.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j.checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0) + 1;
                    next_run.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            run_len = next_run;
        }

        (best_i, best_j, best_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::headers::HeaderSet;
    use crate::transport::RawResponse;

    fn snap(body: &str) -> Snapshot {
        Snapshot::new(
            RawResponse { status: 200, body: body.to_string() },
            HeaderSet::new(),
        )
    }

    const PAIRS: &[(&str, &str)] = &[
        ("Hello World", "Hello World!"),
        ("abcd", "bcde"),
        ("<html>token=81f2</html>", "<html>token=a9c0</html>"),
        ("", "something"),
        ("aaaa", "ab"),
        ("Bienvenue", "Welcome"),
    ];

    #[test]
    fn test_identity_both_strategies() {
        for body in ["", "Hello World", "Bienvenue à tous", "<p>x</p>"] {
            let s = snap(body);
            assert_eq!(Strategy::LengthRatio.score(&s, &s), 1.0);
            assert_eq!(Strategy::Content.score(&s, &s), 1.0);
        }
    }

    #[test]
    fn test_symmetry_both_strategies() {
        for (a, b) in PAIRS {
            let (sa, sb) = (snap(a), snap(b));
            for strategy in [Strategy::LengthRatio, Strategy::Content] {
                assert_eq!(
                    strategy.score(&sa, &sb),
                    strategy.score(&sb, &sa),
                    "{:?} not symmetric for {:?} / {:?}", strategy, a, b
                );
            }
        }
    }

    #[test]
    fn test_scores_are_bounded() {
        for (a, b) in PAIRS {
            let (sa, sb) = (snap(a), snap(b));
            for strategy in [Strategy::LengthRatio, Strategy::Content] {
                let s = strategy.score(&sa, &sb);
                assert!((0.0..=1.0).contains(&s));
            }
        }
    }

    #[test]
    fn test_content_ratio_known_values() {
        // "abcd" vs "bcde": common block "bcd" -> 2*3/8
        assert_eq!(content_ratio("abcd", "bcde"), 0.75);
        assert_eq!(content_ratio("abc", "xyz"), 0.0);
        assert_eq!(content_ratio("", "abc"), 0.0);
    }

    #[test]
    fn test_content_ratio_ignores_length_only_equality() {
        // Same length, different content
        assert_eq!(length_ratio(4, 4), 1.0);
        assert!(content_ratio("aaaa", "bbbb") < 1.0);
    }

    #[test]
    fn test_length_ratio() {
        assert_eq!(length_ratio(50, 100), 0.5);
        assert_eq!(length_ratio(100, 50), 0.5);
        assert_eq!(length_ratio(0, 0), 1.0);
        assert_eq!(length_ratio(0, 10), 0.0);
    }

    #[test]
    fn test_strategy_for_body_len() {
        assert_eq!(Strategy::for_body_len(50_000, 10_000), Strategy::LengthRatio);
        assert_eq!(Strategy::for_body_len(10_000, 10_000), Strategy::Content);
        assert_eq!(Strategy::for_body_len(11, 10_000), Strategy::Content);
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.98765), 0.988);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0004), 0.0);
    }

    #[test]
    fn test_metric_downgrades_when_over_budget() {
        let mut metric = SimilarityMetric::new(Strategy::Content, Duration::ZERO);
        let a = snap(&"ab".repeat(200));
        let b = snap(&"ba".repeat(150));

        let score = metric.score(&a, &b);

        assert!(metric.downgraded());
        assert_eq!(metric.strategy(), Strategy::LengthRatio);
        assert_eq!(score, length_ratio(400, 300));
    }

    #[test]
    fn test_calibrate_measures_identical_bodies() {
        let body = "<p>static page</p>".repeat(100);
        let (a, b) = (snap(&body), snap(&body));

        let mut metric = SimilarityMetric::new(Strategy::Content, Duration::from_nanos(1));
        metric.calibrate(&a, &b);

        assert!(metric.downgraded());
        assert_eq!(metric.strategy(), Strategy::LengthRatio);
    }

    #[test]
    fn test_calibrate_within_budget_keeps_content() {
        let mut metric = SimilarityMetric::new(Strategy::Content, Duration::from_secs(60));
        metric.calibrate(&snap("Hello World"), &snap("Hello World"));

        assert!(!metric.downgraded());
        assert_eq!(metric.strategy(), Strategy::Content);
    }

    #[test]
    fn test_metric_keeps_content_within_budget() {
        let mut metric = SimilarityMetric::new(Strategy::Content, Duration::from_secs(60));
        let score = metric.score(&snap("abcd"), &snap("bcde"));

        assert!(!metric.downgraded());
        assert_eq!(metric.strategy(), Strategy::Content);
        assert_eq!(score, 0.75);
    }
}
