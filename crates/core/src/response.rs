//! Output handed to the external result collaborator.
//!
//! Missing values cross this boundary as [`MISSING_SENTINEL`](crate::series::MISSING_SENTINEL).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::series::sentinel;

/// Per-host risk band. Ordering is by severity with `NotApplicable` lowest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Risk {
    #[default]
    NotApplicable,
    None,
    Low,
    High,
}

impl From<Risk> for i8 {
    fn from(r: Risk) -> i8 {
        match r {
            Risk::NotApplicable => -1,
            Risk::None => 0,
            Risk::Low => 1,
            Risk::High => 2,
        }
    }
}

impl TryFrom<i8> for Risk {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Risk::NotApplicable),
            0 => Ok(Risk::None),
            1 => Ok(Risk::Low),
            2 => Ok(Risk::High),
            other => Err(format!("invalid risk level {}", other)),
        }
    }
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Risk::NotApplicable => write!(f, "NA"),
            Risk::None => write!(f, "NONE"),
            Risk::Low => write!(f, "LOW"),
            Risk::High => write!(f, "HIGH"),
        }
    }
}

/// Which comparator produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// No comparison ran (validation skip).
    #[default]
    None,
    Sax,
    FastPath,
}

/// Result for one test host of one (transaction, metric).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostAnalysis {
    #[serde(with = "sentinel::vec")]
    pub test_data: Vec<Option<f64>>,
    /// Raw values of the nearest-neighbor control host.
    #[serde(with = "sentinel::vec")]
    pub control_data: Vec<Option<f64>>,
    /// Per-bucket distances of the winning comparison.
    pub distance: Vec<f64>,
    pub score: f64,
    pub risk: Risk,
    /// Nearest-neighbor control host.
    pub nn: Option<String>,
    pub control_cuts: String,
    pub test_cuts: String,
    /// Host marked low-traffic.
    pub skip: bool,
    /// Test bucket index placed at each position, when alignment won.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Vec<Option<usize>>>,
}

/// Result for one (transaction, metric).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub metric_name: String,
    pub comparator: Comparator,
    pub apply_sax: bool,
    #[serde(with = "sentinel")]
    pub control_avg: Option<f64>,
    #[serde(with = "sentinel")]
    pub test_avg: Option<f64>,
    pub max_risk: Risk,
    pub results: BTreeMap<String, HostAnalysis>,
}

impl AnalysisResponse {
    /// Empty response used when a (transaction, metric) cannot be analysed.
    pub fn skipped(metric_name: &str) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            ..Self::default()
        }
    }

    pub fn recompute_max_risk(&mut self) {
        self.max_risk = self
            .results
            .values()
            .map(|h| h.risk)
            .max()
            .unwrap_or_default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub txn_name: String,
    pub txn_tag: String,
    pub max_risk: Risk,
    pub metrics: BTreeMap<u32, AnalysisResponse>,
}

impl TransactionResult {
    pub fn recompute_max_risk(&mut self) {
        self.max_risk = self
            .metrics
            .values()
            .map(|m| m.max_risk)
            .max()
            .unwrap_or_default();
    }
}

/// Merged output of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub max_risk: Risk,
    pub transactions: BTreeMap<u32, TransactionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_wire_encoding() {
        assert_eq!(serde_json::to_string(&Risk::NotApplicable).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Risk::High).unwrap(), "2");
        let r: Risk = serde_json::from_str("1").unwrap();
        assert_eq!(r, Risk::Low);
        assert!(serde_json::from_str::<Risk>("7").is_err());
    }

    #[test]
    fn risk_ordering_puts_not_applicable_lowest() {
        assert!(Risk::NotApplicable < Risk::None);
        assert!(Risk::None < Risk::Low);
        assert!(Risk::Low < Risk::High);
    }

    #[test]
    fn host_analysis_encodes_missing_as_sentinel() {
        let host = HostAnalysis {
            test_data: vec![Some(1.0), None],
            control_data: vec![None, Some(2.0)],
            risk: Risk::None,
            ..HostAnalysis::default()
        };
        let json = serde_json::to_value(&host).unwrap();
        assert_eq!(json["test_data"], serde_json::json!([1.0, -1.0]));
        assert_eq!(json["control_data"], serde_json::json!([-1.0, 2.0]));
        assert!(json.get("alignment").is_none());

        let back: HostAnalysis = serde_json::from_value(json).unwrap();
        assert_eq!(back, host);
    }

    #[test]
    fn max_risk_rolls_up() {
        let mut resp = AnalysisResponse::skipped("m");
        assert_eq!(resp.max_risk, Risk::NotApplicable);
        resp.results.insert("a".into(), HostAnalysis { risk: Risk::Low, ..Default::default() });
        let b = HostAnalysis {
            risk: Risk::NotApplicable,
            ..Default::default()
        };
        resp.results.insert("b".into(), b);
        resp.recompute_max_risk();
        assert_eq!(resp.max_risk, Risk::Low);

        let mut txn = TransactionResult::default();
        txn.metrics.insert(0, resp);
        txn.recompute_max_risk();
        assert_eq!(txn.max_risk, Risk::Low);
    }
}
