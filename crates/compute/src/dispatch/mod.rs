//! Partitioned, bounded-time fan-out of transactions to worker threads.
//!
//! Transactions are hashed into partitions, each partition runs a
//! [`PartitionTask`] on its own thread and sends back exactly one
//! [`WorkerReport`] over a dedicated channel. Reports are merged into a
//! single [`BatchResult`](verdict_core::BatchResult) with sequential ids.

pub mod partition;
pub mod runner;
pub mod task;

pub use partition::{partition_of, partition_records, stable_hash, Partition};
pub use runner::{merge, Dispatcher};
pub use task::{AnalyzePartition, PartitionTask, WorkerReport};
