pub mod config;
pub mod error;
pub mod record;
pub mod response;
pub mod series;
pub mod template;

pub use config::{load_dotenv, AnalysisType, RunConfig};
pub use error::{Result, VerifyError};
pub use record::MetricRecord;
pub use response::{
    AnalysisResponse, BatchResult, Comparator, HostAnalysis, Risk, TransactionResult,
};
pub use series::{sentinel, MetricKind, MetricSeries, MISSING_SENTINEL};
pub use template::{
    DeviationType, MetricDefinition, MetricTemplate, TemplateConfig, ThresholdKind, DEFAULT_TAG,
};
