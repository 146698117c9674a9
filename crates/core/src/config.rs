use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// How transactions are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Full discretize/align/score pipeline; cheap comparator only for
    /// transactions above `max_nodes_threshold` hosts.
    Comparative,
    /// Cheap baseline comparator for every transaction.
    FastPath,
}

impl FromStr for AnalysisType {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comparative" => Ok(AnalysisType::Comparative),
            "fast_path" | "fastpath" => Ok(AnalysisType::FastPath),
            other => Err(VerifyError::UnknownAnalysisType(other.to_string())),
        }
    }
}

/// Per-batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Acceptable drift level, 1 (strict) to 5 (lenient).
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    /// Raw minutes averaged into one bucket.
    #[serde(default = "default_smooth_window")]
    pub smooth_window: usize,
    /// Buckets rank-paired together before scoring.
    #[serde(default = "default_comparison_unit_window")]
    pub comparison_unit_window: usize,
    /// Host count above which the fast-path comparator is used.
    #[serde(default = "default_max_nodes_threshold")]
    pub max_nodes_threshold: usize,
    /// Worker partitions. 0 = available parallelism.
    #[serde(default = "default_parallel_processes")]
    pub parallel_processes: usize,
    /// Minimum summed throughput for a host to be compared at all.
    #[serde(default = "default_min_rpm")]
    pub min_rpm: f64,
    /// First minute (inclusive) of the analysis window.
    #[serde(default)]
    pub analysis_start_min: i64,
    /// Last minute (inclusive) of the analysis window.
    #[serde(default = "default_analysis_minute")]
    pub analysis_minute: i64,
    /// Number of non-gap symbols.
    #[serde(default = "default_alphabet_size")]
    pub alphabet_size: usize,
    /// Bound on the wait for all partitions to report.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
}

fn default_tolerance() -> u8 { 1 }
fn default_smooth_window() -> usize { 1 }
fn default_comparison_unit_window() -> usize { 5 }
fn default_max_nodes_threshold() -> usize { 20 }
fn default_parallel_processes() -> usize { 1 }
fn default_min_rpm() -> f64 { 10.0 }
fn default_analysis_minute() -> i64 { 14 }
fn default_alphabet_size() -> usize { 7 }
fn default_worker_timeout_secs() -> u64 { 600 }
fn default_analysis_type() -> String { "comparative".to_string() }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            smooth_window: default_smooth_window(),
            comparison_unit_window: default_comparison_unit_window(),
            max_nodes_threshold: default_max_nodes_threshold(),
            parallel_processes: default_parallel_processes(),
            min_rpm: default_min_rpm(),
            analysis_start_min: 0,
            analysis_minute: default_analysis_minute(),
            alphabet_size: default_alphabet_size(),
            worker_timeout_secs: default_worker_timeout_secs(),
            analysis_type: default_analysis_type(),
        }
    }
}

pub const MIN_ALPHABET_SIZE: usize = 3;
pub const MAX_ALPHABET_SIZE: usize = 20;

impl RunConfig {
    /// Build config from `VERDICT_*` environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            tolerance: env_parse("VERDICT_TOLERANCE", d.tolerance),
            smooth_window: env_parse("VERDICT_SMOOTH_WINDOW", d.smooth_window),
            comparison_unit_window: env_parse(
                "VERDICT_COMPARISON_UNIT_WINDOW",
                d.comparison_unit_window,
            ),
            max_nodes_threshold: env_parse("VERDICT_MAX_NODES_THRESHOLD", d.max_nodes_threshold),
            parallel_processes: env_parse("VERDICT_PARALLEL_PROCESSES", d.parallel_processes),
            min_rpm: env_parse("VERDICT_MIN_RPM", d.min_rpm),
            analysis_start_min: env_parse("VERDICT_ANALYSIS_START_MIN", d.analysis_start_min),
            analysis_minute: env_parse("VERDICT_ANALYSIS_MINUTE", d.analysis_minute),
            alphabet_size: env_parse("VERDICT_ALPHABET_SIZE", d.alphabet_size),
            worker_timeout_secs: env_parse("VERDICT_WORKER_TIMEOUT_SECS", d.worker_timeout_secs),
            analysis_type: env_opt("VERDICT_ANALYSIS_TYPE").unwrap_or(d.analysis_type),
        }
    }

    /// Check every field and return the parsed analysis type.
    pub fn validate(&self) -> Result<AnalysisType> {
        let analysis_type = self.analysis_type.parse::<AnalysisType>()?;
        if !(1..=5).contains(&self.tolerance) {
            return Err(VerifyError::UnsupportedTolerance(self.tolerance));
        }
        if self.smooth_window == 0 {
            return Err(VerifyError::InvalidConfig("smooth_window must be >= 1".into()));
        }
        if self.comparison_unit_window == 0 {
            return Err(VerifyError::InvalidConfig(
                "comparison_unit_window must be >= 1".into(),
            ));
        }
        if self.analysis_minute < self.analysis_start_min {
            return Err(VerifyError::InvalidConfig(format!(
                "analysis_minute ({}) precedes analysis_start_min ({})",
                self.analysis_minute, self.analysis_start_min
            )));
        }
        if !(MIN_ALPHABET_SIZE..=MAX_ALPHABET_SIZE).contains(&self.alphabet_size) {
            return Err(VerifyError::InvalidConfig(format!(
                "alphabet_size must be within {}..={}, got {}",
                MIN_ALPHABET_SIZE, MAX_ALPHABET_SIZE, self.alphabet_size
            )));
        }
        if !self.min_rpm.is_finite() || self.min_rpm < 0.0 {
            return Err(VerifyError::InvalidConfig("min_rpm must be a non-negative number".into()));
        }
        Ok(analysis_type)
    }

    /// Number of minutes in every series.
    pub fn series_len(&self) -> usize {
        (self.analysis_minute - self.analysis_start_min + 1).max(0) as usize
    }

    /// Resolve worker count (0 means use available parallelism).
    pub fn resolved_parallel_processes(&self) -> usize {
        if self.parallel_processes == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.parallel_processes
        }
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            tolerance = self.tolerance,
            smooth_window = self.smooth_window,
            comparison_unit_window = self.comparison_unit_window,
            max_nodes_threshold = self.max_nodes_threshold,
            parallel_processes = self.parallel_processes,
            min_rpm = self.min_rpm,
            window = %format!("{}..={}", self.analysis_start_min, self.analysis_minute),
            analysis_type = %self.analysis_type,
            "run config loaded"
        );
    }
}
