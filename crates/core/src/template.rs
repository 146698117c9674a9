//! Metric template collaborator: what each metric means and how far it
//! may drift before it counts as a deviation.
//!
//! The engine only talks to the [`MetricTemplate`] trait. [`TemplateConfig`]
//! is the file-backed implementation, parsed from a YAML document.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::series::MetricKind;

/// Tag used when a record's declared tag has no configured metric set.
pub const DEFAULT_TAG: &str = "default";

/// Which direction of change is considered bad for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationType {
    Higher,
    Lower,
    Either,
}

/// Noise-floor threshold flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdKind {
    /// Absolute difference below which a change is ignored.
    Delta,
    /// Relative difference (fraction of the smaller value) below which a change is ignored.
    Ratio,
}

/// Read-only view of metric definitions consumed by the engine.
pub trait MetricTemplate: Send + Sync {
    /// Metrics analysed for transactions carrying `tag`, or `None` if the tag is unknown.
    fn metrics_for_tag(&self, tag: &str) -> Option<&[String]>;

    fn metric_type(&self, metric: &str) -> MetricKind;

    fn deviation_type(&self, metric: &str) -> DeviationType;

    fn deviation_threshold(&self, metric: &str, kind: ThresholdKind) -> f64;

    /// Name of the first configured metric of the given kind.
    fn metric_name_for_type(&self, kind: MetricKind) -> Option<&str>;

    /// User-declared range of test values that are always acceptable.
    fn acceptable_range(&self, transaction: &str, metric: &str) -> Option<(f64, f64)>;
}

/// Definition of a single metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricDefinition {
    pub metric_type: MetricKind,
    #[serde(default = "default_deviation_type")]
    pub deviation_type: DeviationType,
    #[serde(default)]
    pub min_delta: f64,
    #[serde(default)]
    pub min_ratio: f64,
}

fn default_deviation_type() -> DeviationType {
    DeviationType::Either
}

/// Always-acceptable value range for one (transaction, metric).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AcceptableRange {
    pub transaction: String,
    pub metric: String,
    pub min: f64,
    pub max: f64,
}

/// File-backed metric template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Tag -> ordered metric names.
    #[serde(default)]
    pub tags: HashMap<String, Vec<String>>,
    /// Metric name -> definition.
    #[serde(default)]
    pub metrics: HashMap<String, MetricDefinition>,
    #[serde(default)]
    pub acceptable_ranges: Vec<AcceptableRange>,
}

impl TemplateConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading metric templates");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

impl MetricTemplate for TemplateConfig {
    fn metrics_for_tag(&self, tag: &str) -> Option<&[String]> {
        self.tags.get(tag).map(Vec::as_slice)
    }

    fn metric_type(&self, metric: &str) -> MetricKind {
        self.metrics
            .get(metric)
            .map(|d| d.metric_type)
            .unwrap_or(MetricKind::Other)
    }

    fn deviation_type(&self, metric: &str) -> DeviationType {
        self.metrics
            .get(metric)
            .map(|d| d.deviation_type)
            .unwrap_or(DeviationType::Either)
    }

    fn deviation_threshold(&self, metric: &str, kind: ThresholdKind) -> f64 {
        self.metrics
            .get(metric)
            .map(|d| match kind {
                ThresholdKind::Delta => d.min_delta,
                ThresholdKind::Ratio => d.min_ratio,
            })
            .unwrap_or(0.0)
    }

    fn metric_name_for_type(&self, kind: MetricKind) -> Option<&str> {
        // HashMap order is arbitrary; pick the lexicographically first name.
        self.metrics
            .iter()
            .filter(|(_, d)| d.metric_type == kind)
            .map(|(name, _)| name.as_str())
            .min()
    }

    fn acceptable_range(&self, transaction: &str, metric: &str) -> Option<(f64, f64)> {
        self.acceptable_ranges
            .iter()
            .find(|r| r.transaction == transaction && r.metric == metric)
            .map(|r| (r.min, r.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
tags:
  default: [averageResponseTime, callCount, error]
  API: [averageResponseTime]
metrics:
  averageResponseTime:
    metric_type: resp_time
    deviation_type: higher
    min_delta: 20
    min_ratio: 0.5
  callCount:
    metric_type: throughput
    deviation_type: lower
  error:
    metric_type: error
acceptable_ranges:
  - transaction: /health
    metric: averageResponseTime
    min: 0
    max: 50
"#;

    #[test]
    fn parse_template_yaml() {
        let t = TemplateConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(t.metrics_for_tag("API").unwrap(), &["averageResponseTime".to_string()]);
        assert!(t.metrics_for_tag("UNKNOWN").is_none());
        assert_eq!(t.metric_type("callCount"), MetricKind::Throughput);
        assert_eq!(t.deviation_type("averageResponseTime"), DeviationType::Higher);
        assert_eq!(t.deviation_type("error"), DeviationType::Either);
        assert_eq!(t.deviation_threshold("averageResponseTime", ThresholdKind::Delta), 20.0);
        assert_eq!(t.deviation_threshold("averageResponseTime", ThresholdKind::Ratio), 0.5);
    }

    #[test]
    fn lookups_for_unknown_metrics_fall_back() {
        let t = TemplateConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(t.metric_type("nope"), MetricKind::Other);
        assert_eq!(t.deviation_threshold("nope", ThresholdKind::Delta), 0.0);
    }

    #[test]
    fn metric_name_for_type_and_ranges() {
        let t = TemplateConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(t.metric_name_for_type(MetricKind::Throughput), Some("callCount"));
        assert_eq!(t.metric_name_for_type(MetricKind::Other), None);
        assert_eq!(t.acceptable_range("/health", "averageResponseTime"), Some((0.0, 50.0)));
        assert_eq!(t.acceptable_range("/login", "averageResponseTime"), None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let bad = "tags: {}\nbogus: 1\n";
        assert!(TemplateConfig::from_yaml_str(bad).is_err());
    }
}
