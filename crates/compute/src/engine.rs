use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use verdict_core::{BatchResult, MetricRecord, MetricTemplate, Result, RunConfig};

use crate::dispatch::{merge, partition_records, AnalyzePartition, Dispatcher, PartitionTask};
use crate::pipeline::metrics::DispatchMetrics;
use crate::symbols::AnalysisContext;

/// Output of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub result: BatchResult,
    pub metrics: DispatchMetrics,
}

/// Entry point: validates the run configuration, fans the batch out to
/// partition workers and merges their reports.
pub struct VerifyEngine {
    config: RunConfig,
    template: Arc<dyn MetricTemplate>,
    task: Option<Arc<dyn PartitionTask>>,
}

impl VerifyEngine {
    pub fn new(config: RunConfig, template: Arc<dyn MetricTemplate>) -> Self {
        Self {
            config,
            template,
            task: None,
        }
    }

    /// Replace the per-partition work (defaults to [`AnalyzePartition`]).
    pub fn with_task(mut self, task: Arc<dyn PartitionTask>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Analyse one control/test batch. Configuration errors are returned
    /// before any worker starts; a worker timeout fails the whole batch.
    pub fn run(&self, control: Vec<MetricRecord>, test: Vec<MetricRecord>) -> Result<BatchReport> {
        let analysis_type = self.config.validate()?;
        let ctx = AnalysisContext::new(self.config.alphabet_size)?;
        let threshold = ctx.thresholds.get(self.config.tolerance)?;

        let batch_id = Uuid::new_v4().to_string();
        let mut metrics = DispatchMetrics::default();
        let timer = metrics.timer();

        let workers = self.config.resolved_parallel_processes();
        info!(
            batch_id = %batch_id,
            control = control.len(),
            test = test.len(),
            workers,
            threshold,
            "starting batch"
        );
        let partitions = partition_records(control, test, workers);

        let task: Arc<dyn PartitionTask> = match &self.task {
            Some(task) => Arc::clone(task),
            None => Arc::new(AnalyzePartition::new(
                self.config.clone(),
                analysis_type,
                Arc::clone(&self.template),
            )),
        };
        let reports =
            Dispatcher::new(task, self.config.worker_timeout()).run(&batch_id, partitions)?;

        for report in &reports {
            metrics.record_partition(report.metrics.clone());
        }
        let result = merge(batch_id, reports);
        timer.finish(&mut metrics);

        info!(
            batch_id = %result.batch_id,
            transactions = result.transactions.len(),
            max_risk = %result.max_risk,
            elapsed_ms = metrics.elapsed_ms,
            "batch complete"
        );
        Ok(BatchReport { result, metrics })
    }
}
