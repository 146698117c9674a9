use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use verdict_core::{Comparator, TransactionResult};

/// Work done by one partition worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartitionMetrics {
    pub partition: usize,
    /// Transactions analysed.
    pub transactions: usize,
    /// (transaction, metric) pairs that produced a comparison.
    pub metrics_analysed: usize,
    /// Pairs scored by the fast-path comparator.
    pub fast_path: usize,
    /// Pairs skipped for lack of data.
    pub validation_skips: usize,
    pub elapsed_ms: u64,
}

impl PartitionMetrics {
    /// Derive counters from a partition's results.
    pub fn from_results(
        partition: usize,
        results: &[TransactionResult],
        elapsed: Duration,
    ) -> Self {
        let mut m = Self {
            partition,
            transactions: results.len(),
            elapsed_ms: elapsed.as_millis() as u64,
            ..Self::default()
        };
        for resp in results.iter().flat_map(|t| t.metrics.values()) {
            match resp.comparator {
                Comparator::None => m.validation_skips += 1,
                Comparator::FastPath => {
                    m.fast_path += 1;
                    m.metrics_analysed += 1;
                }
                Comparator::Sax => m.metrics_analysed += 1,
            }
        }
        m
    }
}

/// Batch-level dispatch metrics, updated as partitions report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchMetrics {
    /// Per-partition breakdown, ordered by partition id once finished.
    pub partitions: Vec<PartitionMetrics>,
    pub total_transactions: usize,
    pub total_metrics_analysed: usize,
    pub total_fast_path: usize,
    pub total_validation_skips: usize,
    /// Wall time from dispatch to merged result.
    pub elapsed_ms: u64,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DispatchMetrics {
    pub fn record_partition(&mut self, m: PartitionMetrics) {
        self.total_transactions += m.transactions;
        self.total_metrics_analysed += m.metrics_analysed;
        self.total_fast_path += m.fast_path;
        self.total_validation_skips += m.validation_skips;
        self.partitions.push(m);
    }

    /// Start a timer that stamps the batch when finished.
    pub fn timer(&self) -> BatchTimer {
        BatchTimer {
            start: Instant::now(),
        }
    }
}

/// A scoped timer for one dispatch.
pub struct BatchTimer {
    start: Instant,
}

impl BatchTimer {
    /// Finalize the timer and record elapsed time.
    pub fn finish(self, metrics: &mut DispatchMetrics) {
        metrics.partitions.sort_by_key(|p| p.partition);
        metrics.elapsed_ms = self.start.elapsed().as_millis() as u64;
        metrics.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::AnalysisResponse;

    fn txn(comparators: &[Comparator]) -> TransactionResult {
        let mut t = TransactionResult::default();
        for (i, c) in comparators.iter().enumerate() {
            let resp = AnalysisResponse {
                comparator: *c,
                ..AnalysisResponse::default()
            };
            t.metrics.insert(i as u32, resp);
        }
        t
    }

    #[test]
    fn partition_counters_follow_comparators() {
        let results = vec![
            txn(&[Comparator::Sax, Comparator::None]),
            txn(&[Comparator::FastPath]),
        ];
        let m = PartitionMetrics::from_results(3, &results, Duration::from_millis(12));
        assert_eq!(m.partition, 3);
        assert_eq!(m.transactions, 2);
        assert_eq!(m.metrics_analysed, 2);
        assert_eq!(m.fast_path, 1);
        assert_eq!(m.validation_skips, 1);
        assert_eq!(m.elapsed_ms, 12);
    }

    #[test]
    fn totals_accumulate_and_finish_sorts() {
        let mut d = DispatchMetrics::default();
        let timer = d.timer();
        d.record_partition(PartitionMetrics {
            partition: 1,
            transactions: 2,
            metrics_analysed: 4,
            ..Default::default()
        });
        d.record_partition(PartitionMetrics {
            partition: 0,
            transactions: 1,
            validation_skips: 1,
            ..Default::default()
        });
        timer.finish(&mut d);

        assert_eq!(d.total_transactions, 3);
        assert_eq!(d.total_metrics_analysed, 4);
        assert_eq!(d.total_validation_skips, 1);
        assert_eq!(d.partitions[0].partition, 0);
        assert!(d.finished_at.is_some());
    }
}
