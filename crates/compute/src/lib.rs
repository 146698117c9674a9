pub mod algorithms;
pub mod dispatch;
pub mod engine;
pub mod pipeline;
pub mod symbols;

pub use dispatch::{AnalyzePartition, Dispatcher, Partition, PartitionTask, WorkerReport};
pub use engine::{BatchReport, VerifyEngine};
pub use pipeline::metrics::{DispatchMetrics, PartitionMetrics};
pub use pipeline::TransactionAnalyzer;
pub use symbols::{AnalysisContext, Alphabet, Symbol, SymbolDistanceMatrix, ToleranceThresholds};
