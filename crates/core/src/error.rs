use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown analysis type: {0}")]
    UnknownAnalysisType(String),

    #[error("Unsupported tolerance level: {0} (expected 1-5)")]
    UnsupportedTolerance(u8),

    #[error("Batch {batch_id} timed out after {waited_ms}ms waiting for {missing} worker(s)")]
    WorkerTimeout {
        batch_id: String,
        waited_ms: u64,
        missing: usize,
    },

    #[error("Batch {batch_id}: worker for partition {partition} exited without reporting")]
    WorkerDisconnected { batch_id: String, partition: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl From<serde_json::Error> for VerifyError {
    fn from(e: serde_json::Error) -> Self {
        VerifyError::Serialize(e.to_string())
    }
}

impl From<serde_yaml::Error> for VerifyError {
    fn from(e: serde_yaml::Error) -> Self {
        VerifyError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
