use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use verdict_core::{AnalysisType, MetricTemplate, Result, RunConfig, TransactionResult};

use crate::pipeline::metrics::PartitionMetrics;
use crate::pipeline::TransactionAnalyzer;
use crate::symbols::AnalysisContext;

use super::partition::Partition;

/// The single message a partition worker sends back.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub partition: usize,
    /// Per-transaction results in local (name) order.
    pub results: Vec<TransactionResult>,
    pub metrics: PartitionMetrics,
}

/// Work run once per partition on a worker thread.
///
/// An `Err` is logged by the dispatcher and surfaces as a worker that
/// exited without reporting.
pub trait PartitionTask: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn execute(&self, partition: Partition) -> Result<WorkerReport>;
}

/// Runs the full per-transaction pipeline over a partition.
pub struct AnalyzePartition {
    config: RunConfig,
    analysis_type: AnalysisType,
    template: Arc<dyn MetricTemplate>,
}

impl AnalyzePartition {
    pub fn new(
        config: RunConfig,
        analysis_type: AnalysisType,
        template: Arc<dyn MetricTemplate>,
    ) -> Self {
        Self {
            config,
            analysis_type,
            template,
        }
    }
}

impl PartitionTask for AnalyzePartition {
    fn name(&self) -> &str {
        "analyze_partition"
    }

    fn execute(&self, partition: Partition) -> Result<WorkerReport> {
        let start = Instant::now();
        // Rebuilt per worker; nothing is shared across threads.
        let ctx = AnalysisContext::new(self.config.alphabet_size)?;
        let analyzer = TransactionAnalyzer::new(
            &ctx,
            &self.config,
            self.template.as_ref(),
            self.analysis_type,
        )?;

        debug!(
            partition = partition.id,
            transactions = partition.transactions.len(),
            control = partition.control.len(),
            test = partition.test.len(),
            "partition started"
        );
        let results = analyzer.analyze_records(&partition.control, &partition.test);
        let metrics = PartitionMetrics::from_results(partition.id, &results, start.elapsed());
        info!(
            partition = partition.id,
            transactions = metrics.transactions,
            fast_path = metrics.fast_path,
            skipped = metrics.validation_skips,
            elapsed_ms = metrics.elapsed_ms,
            "partition done"
        );

        Ok(WorkerReport {
            partition: partition.id,
            results,
            metrics,
        })
    }
}
