//! Cheap comparator for transactions with many hosts.
//!
//! Control hosts are collapsed into one baseline curve (per-bucket mean and
//! standard deviation) and each test host is z-scored against it, so cost
//! grows with the host count instead of its square.

use crate::symbols::AnalysisContext;

use super::discretize::bucket_means;
use super::distance::{is_high_deviation, weighted_score, MetricRules, PairScore, SCORE_CLIP_FACTOR};
use super::stats::{mean_std, safe_std};

#[derive(Debug, Clone, Copy, PartialEq)]
struct BaselinePoint {
    mean: f64,
    std: f64,
}

/// Baseline built from every control host of one (transaction, metric).
pub struct FastPathScorer<'a> {
    ctx: &'a AnalysisContext,
    rules: &'a MetricRules,
    smooth_window: usize,
    clip: f64,
    baseline: Vec<Option<BaselinePoint>>,
}

impl<'a> FastPathScorer<'a> {
    pub fn new(
        ctx: &'a AnalysisContext,
        rules: &'a MetricRules,
        control: &[&[Option<f64>]],
        smooth_window: usize,
        threshold: f64,
    ) -> Self {
        let rows: Vec<Vec<Option<f64>>> = control
            .iter()
            .map(|row| bucket_means(row, smooth_window))
            .collect();
        let len = rows.iter().map(Vec::len).max().unwrap_or(0);
        let baseline = (0..len)
            .map(|k| {
                let present: Vec<f64> = rows
                    .iter()
                    .filter_map(|r| r.get(k).copied().flatten())
                    .collect();
                mean_std(&present).map(|(mean, std)| BaselinePoint {
                    mean,
                    std: safe_std(std),
                })
            })
            .collect();
        Self {
            ctx,
            rules,
            smooth_window,
            clip: SCORE_CLIP_FACTOR * threshold,
            baseline,
        }
    }

    /// Baseline mean per bucket.
    pub fn baseline_curve(&self) -> Vec<Option<f64>> {
        self.baseline.iter().map(|p| p.map(|p| p.mean)).collect()
    }

    fn bucket_distance(&self, baseline: Option<BaselinePoint>, test: Option<f64>) -> f64 {
        let max = self.ctx.matrix.max();
        if self.rules.in_acceptable_range(test) {
            return 0.0;
        }
        match (baseline, test) {
            (None, None) => 0.0,
            (Some(_), None) | (None, Some(_)) => max,
            (Some(b), Some(t)) => {
                if self.rules.is_low_deviation(b.mean, t) {
                    0.0
                } else if is_high_deviation(b.mean, t) {
                    max
                } else if self.rules.is_bad_direction(b.mean, t) {
                    ((t - b.mean) / b.std).abs().min(max)
                } else {
                    0.0
                }
            }
        }
    }

    /// Score one test host against the baseline. `None` when either side
    /// has no valid bucket.
    pub fn score(&self, test: &[Option<f64>]) -> Option<PairScore> {
        if self.baseline.iter().all(Option::is_none) {
            return None;
        }
        let buckets = bucket_means(test, self.smooth_window);
        let valid = buckets.iter().filter(|b| b.is_some()).count();
        if valid == 0 {
            return None;
        }
        let distances: Vec<f64> = buckets
            .iter()
            .enumerate()
            .map(|(k, t)| self.bucket_distance(self.baseline.get(k).copied().flatten(), *t))
            .collect();
        let score = weighted_score(&distances, valid, self.clip)?;
        Some(PairScore {
            distances,
            score,
            alignment: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::DeviationType;

    fn rules(deviation: DeviationType) -> MetricRules {
        MetricRules {
            deviation,
            min_delta: 0.0,
            min_ratio: 0.0,
            acceptable_range: None,
        }
    }

    #[test]
    fn baseline_is_the_per_bucket_mean() {
        let ctx = AnalysisContext::new(7).unwrap();
        let r = rules(DeviationType::Either);
        let a = [Some(1.0), Some(4.0), None];
        let b = [Some(3.0), None, None];
        let s = FastPathScorer::new(&ctx, &r, &[&a[..], &b[..]], 1, 1.0);
        assert_eq!(s.baseline_curve(), vec![Some(2.0), Some(4.0), None]);
    }

    #[test]
    fn matching_host_scores_zero() {
        let ctx = AnalysisContext::new(7).unwrap();
        let r = rules(DeviationType::Either);
        let a = [Some(10.0); 4];
        let b = [Some(10.0); 4];
        let s = FastPathScorer::new(&ctx, &r, &[&a[..], &b[..]], 1, ctx.thresholds.get(2).unwrap());
        let pair = s.score(&[Some(10.0); 4]).unwrap();
        assert_eq!(pair.score, 0.0);
    }

    #[test]
    fn z_score_is_directional_and_capped() {
        let ctx = AnalysisContext::new(7).unwrap();
        let higher = rules(DeviationType::Higher);
        let a = [Some(10.0), Some(10.0)];
        let b = [Some(12.0), Some(12.0)];
        let s = FastPathScorer::new(&ctx, &higher, &[&a[..], &b[..]], 1, 10.0);
        let pair = s.score(&[Some(8.0), Some(50.0)]).unwrap();
        assert_eq!(pair.distances[0], 0.0);
        assert_eq!(pair.distances[1], ctx.matrix.max());
    }

    #[test]
    fn presence_mismatch_is_maximal() {
        let ctx = AnalysisContext::new(7).unwrap();
        let r = rules(DeviationType::Either);
        let a = [Some(5.0), None];
        let s = FastPathScorer::new(&ctx, &r, &[&a[..]], 1, 10.0);
        let pair = s.score(&[None, Some(5.0)]).unwrap();
        assert_eq!(pair.distances, vec![ctx.matrix.max(), ctx.matrix.max()]);
        assert!(s.score(&[None, None]).is_none());
    }
}
