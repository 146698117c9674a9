//! Per-bucket distance between a control host and a test host, and the
//! time-weighted aggregate score used for nearest-neighbor selection.
//!
//! Bucket rules, first match wins:
//! 1. test value inside the acceptable range -> 0
//! 2. difference under the delta or ratio noise floor -> 0
//! 3. one side at least 10x the other -> matrix maximum
//! 4. discretized: directional symbol distance, with the pattern override
//! 5. not discretized: only presence mismatches count

use verdict_core::{DeviationType, MetricTemplate, ThresholdKind};

use crate::algorithms::alignment::align;
use crate::algorithms::pattern_index::PatternIndex;
use crate::symbols::{AnalysisContext, Symbol};

use super::discretize::SymbolSeries;

/// Ratio between two values beyond which they are treated as coming from
/// different distributions.
pub const HIGH_DEVIATION_RATIO: f64 = 10.0;

/// Scores are clipped at this multiple of the tolerance threshold.
pub const SCORE_CLIP_FACTOR: f64 = 3.0;

/// Scoring parameters of one (transaction, metric).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRules {
    pub deviation: DeviationType,
    pub min_delta: f64,
    pub min_ratio: f64,
    pub acceptable_range: Option<(f64, f64)>,
}

impl MetricRules {
    pub fn from_template(template: &dyn MetricTemplate, transaction: &str, metric: &str) -> Self {
        Self {
            deviation: template.deviation_type(metric),
            min_delta: template.deviation_threshold(metric, ThresholdKind::Delta),
            min_ratio: template.deviation_threshold(metric, ThresholdKind::Ratio),
            acceptable_range: template.acceptable_range(transaction, metric),
        }
    }

    /// Rule 1.
    pub fn in_acceptable_range(&self, test: Option<f64>) -> bool {
        match (test, self.acceptable_range) {
            (Some(t), Some((lo, hi))) => lo <= t && t <= hi,
            _ => false,
        }
    }

    /// Rule 2.
    pub fn is_low_deviation(&self, control: f64, test: f64) -> bool {
        let diff = (test - control).abs();
        diff < self.min_delta || diff < self.min_ratio * test.min(control)
    }

    /// Whether moving from control to test is a change in the bad direction.
    pub fn is_bad_direction(&self, control: f64, test: f64) -> bool {
        match self.deviation {
            DeviationType::Higher => test > control,
            DeviationType::Lower => test < control,
            DeviationType::Either => test != control,
        }
    }
}

/// Rule 3.
pub fn is_high_deviation(control: f64, test: f64) -> bool {
    let (c, t) = (control.abs(), test.abs());
    c != 0.0 && t != 0.0 && (t >= HIGH_DEVIATION_RATIO * c || c >= HIGH_DEVIATION_RATIO * t)
}

/// Sum `distances` with linearly increasing position weights (mean weight
/// one), divide by the number of valid test buckets and clip.
pub fn weighted_score(distances: &[f64], valid_test_buckets: usize, clip: f64) -> Option<f64> {
    if valid_test_buckets == 0 {
        return None;
    }
    let n = distances.len() as f64;
    let total: f64 = distances
        .iter()
        .enumerate()
        .map(|(k, d)| 2.0 * (k as f64 + 1.0) / (n + 1.0) * d)
        .sum();
    Some((total / valid_test_buckets as f64).min(clip))
}

/// One bucket's distance before any pattern adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketDistance {
    pub value: f64,
    /// The symbols disagree in the direction the metric cares about.
    pub bad_direction: bool,
}

impl BucketDistance {
    fn settled(value: f64) -> Self {
        Self {
            value,
            bad_direction: false,
        }
    }
}

/// Comparison of one control host against one test host.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub distances: Vec<f64>,
    pub score: f64,
    /// Test index at each position when the aligned comparison won.
    pub alignment: Option<Vec<Option<usize>>>,
}

/// Scores control/test pairs for one (transaction, metric).
pub struct DistanceScorer<'a> {
    ctx: &'a AnalysisContext,
    rules: &'a MetricRules,
    apply_sax: bool,
    comparison_window: usize,
    clip: f64,
}

impl<'a> DistanceScorer<'a> {
    pub fn new(
        ctx: &'a AnalysisContext,
        rules: &'a MetricRules,
        apply_sax: bool,
        comparison_window: usize,
        threshold: f64,
    ) -> Self {
        Self {
            ctx,
            rules,
            apply_sax,
            comparison_window: comparison_window.max(1),
            clip: SCORE_CLIP_FACTOR * threshold,
        }
    }

    /// Rules 1-5 for a single pair of buckets.
    pub fn bucket_distance(
        &self,
        control: (Option<f64>, Symbol),
        test: (Option<f64>, Symbol),
    ) -> BucketDistance {
        let matrix = &self.ctx.matrix;

        if self.rules.in_acceptable_range(test.0) {
            return BucketDistance::settled(0.0);
        }
        if let (Some(c), Some(t)) = (control.0, test.0) {
            if self.rules.is_low_deviation(c, t) {
                return BucketDistance::settled(0.0);
            }
            if is_high_deviation(c, t) {
                return BucketDistance::settled(matrix.max());
            }
        }

        if !self.apply_sax {
            return match (control.0, test.0) {
                (Some(_), None) | (None, Some(_)) => BucketDistance::settled(matrix.max()),
                _ => BucketDistance::settled(0.0),
            };
        }

        let raw = matrix.get(control.1, test.1);
        match (control.1.index(), test.1.index()) {
            (Some(c), Some(t)) => {
                let bad = self.rules.is_bad_direction(c as f64, t as f64);
                BucketDistance {
                    value: if bad { raw } else { 0.0 },
                    bad_direction: bad,
                }
            }
            _ => BucketDistance::settled(raw),
        }
    }

    /// Pair buckets by rank inside each comparison window. Entry `k` is the
    /// control position paired with test position `k`.
    fn rank_pairs(&self, control: &[Option<f64>], test: &[Option<f64>]) -> Vec<usize> {
        let n = control.len().min(test.len());
        let mut paired = vec![0; n];
        let mut start = 0;
        while start < n {
            let end = (start + self.comparison_window).min(n);
            let c_order = rank_order(&control[start..end]);
            let t_order = rank_order(&test[start..end]);
            for (c, t) in c_order.into_iter().zip(t_order) {
                paired[start + t] = start + c;
            }
            start = end;
        }
        paired
    }

    /// Per-bucket distances of `test` against `control`, in test order.
    pub fn distances(
        &self,
        control: &SymbolSeries,
        test_values: &[Option<f64>],
        test_symbols: &[Symbol],
        pattern: &PatternIndex,
    ) -> Vec<f64> {
        let pairs = self.rank_pairs(&control.buckets, test_values);
        pairs
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let d = self.bucket_distance(
                    (control.buckets[c], control.symbols[c]),
                    (test_values[k], test_symbols[k]),
                );
                if d.value == 0.0 && d.bad_direction && k >= 2 {
                    let window = [test_symbols[k - 2], test_symbols[k - 1], test_symbols[k]];
                    if pattern.is_surprising(&window) {
                        return self.ctx.matrix.min_nonzero();
                    }
                }
                d.value
            })
            .collect()
    }

    /// Compare one control host with one test host. `None` when either
    /// side has no valid bucket.
    pub fn score_pair(&self, control: &SymbolSeries, test: &SymbolSeries) -> Option<PairScore> {
        let valid = test.valid_count();
        if valid == 0 || control.valid_count() == 0 {
            return None;
        }

        let pattern = PatternIndex::build(&control.symbols);
        let straight = self.distances(control, &test.buckets, &test.symbols, &pattern);
        let straight_total: f64 = straight.iter().sum();

        let mut best = (straight, straight_total, None);
        if straight_total > 0.0 {
            let alignment = align(
                control.len(),
                test.len(),
                self.ctx.matrix.gap_distance(),
                |i, j| {
                    self.bucket_distance(
                        (control.buckets[i], control.symbols[i]),
                        (test.buckets[j], test.symbols[j]),
                    )
                    .value
                },
            );
            if !alignment.is_identity() {
                let values = alignment.reorder(&test.buckets, None);
                let symbols = alignment.reorder(&test.symbols, Symbol::GAP);
                let aligned = self.distances(control, &values, &symbols, &pattern);
                let aligned_total: f64 = aligned.iter().sum();
                if aligned_total < best.1 {
                    best = (aligned, aligned_total, Some(alignment.indices));
                }
            }
        }

        let (distances, _, alignment) = best;
        let score = weighted_score(&distances, valid, self.clip)?;
        Some(PairScore {
            distances,
            score,
            alignment,
        })
    }

    /// Control host minimizing the aggregate score against `test`; ties
    /// keep the earlier candidate.
    pub fn nearest_neighbor(
        &self,
        controls: &[&SymbolSeries],
        test: &SymbolSeries,
    ) -> Option<(usize, PairScore)> {
        let mut best: Option<(usize, PairScore)> = None;
        for (i, control) in controls.iter().enumerate() {
            if let Some(pair) = self.score_pair(control, test) {
                if best.as_ref().map_or(true, |(_, b)| pair.score < b.score) {
                    best = Some((i, pair));
                }
            }
        }
        best
    }
}

/// Positions of `values` sorted ascending, missing last, stable.
fn rank_order(values: &[Option<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| match (values[a], values[b]) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    order
}
