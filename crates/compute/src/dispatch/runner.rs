use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, warn};

use verdict_core::{BatchResult, Result, Risk, VerifyError};

use super::partition::Partition;
use super::task::{PartitionTask, WorkerReport};

/// Fans partitions out to one worker thread each and collects exactly one
/// report per partition within a shared deadline.
pub struct Dispatcher {
    task: Arc<dyn PartitionTask>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(task: Arc<dyn PartitionTask>, timeout: Duration) -> Self {
        Self { task, timeout }
    }

    /// Run every partition. Any worker missing the deadline fails the whole
    /// batch; in-flight workers are left to finish on their own.
    pub fn run(&self, batch_id: &str, partitions: Vec<Partition>) -> Result<Vec<WorkerReport>> {
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(partitions.len())
            .thread_name(|i| format!("verdict-worker-{i}"))
            .panic_handler(|_| error!("partition worker panicked"))
            .build()
            .map_err(|e| VerifyError::ThreadPool(e.to_string()))?;

        let mut receivers: Vec<(usize, Receiver<WorkerReport>)> =
            Vec::with_capacity(partitions.len());
        for partition in partitions {
            let (tx, rx) = mpsc::sync_channel(1);
            let task = Arc::clone(&self.task);
            let id = partition.id;
            let batch = batch_id.to_string();

            pool.spawn(move || match task.execute(partition) {
                Ok(report) => {
                    // Receiver is gone once the batch has timed out.
                    if tx.send(report).is_err() {
                        debug!(
                            batch_id = %batch,
                            partition = id,
                            "report arrived after batch ended"
                        );
                    }
                }
                Err(e) => {
                    error!(
                        batch_id = %batch,
                        partition = id,
                        task = task.name(),
                        error = %e,
                        "partition failed"
                    );
                }
            });
            receivers.push((id, rx));
        }

        let deadline = Instant::now() + self.timeout;
        let mut reports = Vec::with_capacity(receivers.len());
        for (pos, (id, rx)) in receivers.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(report) => reports.push(report),
                Err(RecvTimeoutError::Timeout) => {
                    let missing = 1 + receivers[pos + 1..]
                        .iter()
                        .filter(|(_, rx)| rx.try_recv().is_err())
                        .count();
                    warn!(batch_id, missing, "batch timed out");
                    return Err(VerifyError::WorkerTimeout {
                        batch_id: batch_id.to_string(),
                        waited_ms: self.timeout.as_millis() as u64,
                        missing,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(VerifyError::WorkerDisconnected {
                        batch_id: batch_id.to_string(),
                        partition: *id,
                    });
                }
            }
        }
        Ok(reports)
    }
}

/// Merge worker reports into one batch result. Reports are ordered by
/// partition id and then by local order; transaction ids are assigned
/// sequentially from 0 in that order.
pub fn merge(batch_id: String, mut reports: Vec<WorkerReport>) -> BatchResult {
    reports.sort_by_key(|r| r.partition);
    let transactions = reports
        .into_iter()
        .flat_map(|r| r.results)
        .enumerate()
        .map(|(id, txn)| (id as u32, txn))
        .collect::<std::collections::BTreeMap<_, _>>();
    let max_risk = transactions
        .values()
        .map(|t| t.max_risk)
        .max()
        .unwrap_or(Risk::NotApplicable);

    BatchResult {
        batch_id,
        analyzed_at: Utc::now(),
        max_risk,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::TransactionResult;

    struct Echo;

    impl PartitionTask for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn execute(&self, partition: Partition) -> Result<WorkerReport> {
            let results = partition
                .transactions
                .iter()
                .map(|name| TransactionResult {
                    txn_name: name.clone(),
                    ..TransactionResult::default()
                })
                .collect();
            Ok(WorkerReport {
                partition: partition.id,
                results,
                ..WorkerReport::default()
            })
        }
    }

    struct Failing;

    impl PartitionTask for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn execute(&self, _partition: Partition) -> Result<WorkerReport> {
            Err(VerifyError::InvalidConfig("boom".into()))
        }
    }

    fn partition(id: usize, names: &[&str]) -> Partition {
        Partition {
            id,
            transactions: names.iter().map(|s| s.to_string()).collect(),
            ..Partition::default()
        }
    }

    #[test]
    fn collects_one_report_per_partition() {
        let d = Dispatcher::new(Arc::new(Echo), Duration::from_secs(5));
        let reports = d
            .run("b1", vec![partition(0, &["a"]), partition(2, &["b", "c"])])
            .unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn failed_worker_is_a_disconnect() {
        let d = Dispatcher::new(Arc::new(Failing), Duration::from_secs(5));
        let err = d.run("b2", vec![partition(4, &["a"])]).unwrap_err();
        assert!(matches!(err, VerifyError::WorkerDisconnected { partition: 4, .. }));
    }

    #[test]
    fn no_partitions_no_threads() {
        let d = Dispatcher::new(Arc::new(Echo), Duration::from_millis(1));
        assert!(d.run("b3", Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn merge_orders_by_partition_then_local_order() {
        let report = |p: usize, names: &[&str], risk: Risk| WorkerReport {
            partition: p,
            results: names
                .iter()
                .map(|n| TransactionResult {
                    txn_name: n.to_string(),
                    max_risk: risk,
                    ..TransactionResult::default()
                })
                .collect(),
            ..WorkerReport::default()
        };
        let merged = merge(
            "b".into(),
            vec![report(1, &["x", "y"], Risk::Low), report(0, &["b"], Risk::None)],
        );
        let names: Vec<&str> = merged.transactions.values().map(|t| t.txn_name.as_str()).collect();
        assert_eq!(names, vec!["b", "x", "y"]);
        assert_eq!(merged.transactions.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(merged.max_risk, Risk::Low);
    }
}
