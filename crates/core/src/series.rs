//! Per-host metric series and the missing-value sentinel codec.
//!
//! Inside the engine a missing point is `None`. The external contract
//! encodes it as [`MISSING_SENTINEL`]; the [`sentinel`] module does that
//! translation at the serde boundary only.

use serde::{Deserialize, Serialize};

/// Transport encoding of a missing value.
pub const MISSING_SENTINEL: f64 = -1.0;

/// Role a metric plays in sanitization and fast-path decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RespTime,
    Throughput,
    Error,
    Other,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::RespTime => write!(f, "resp_time"),
            MetricKind::Throughput => write!(f, "throughput"),
            MetricKind::Error => write!(f, "error"),
            MetricKind::Other => write!(f, "other"),
        }
    }
}

/// Fixed-length series for one (transaction, metric, host), indexed by
/// minute offset from the start of the analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub values: Vec<Option<f64>>,
    pub kind: MetricKind,
    /// Host had too little traffic to trust a comparison.
    pub skip: bool,
}

impl MetricSeries {
    pub fn new(len: usize, kind: MetricKind) -> Self {
        Self {
            values: vec![None; len],
            kind,
            skip: false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterator over the present points.
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    pub fn has_data(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }

    /// Sum of present points.
    pub fn sum(&self) -> f64 {
        self.present().sum()
    }
}

/// Serde adapters that swap `None` for [`MISSING_SENTINEL`] on the wire.
///
/// Metric readings are non-negative. Negative or non-finite readings are
/// written as missing, and any negative number decodes back to `None`, so
/// a round trip never turns a reading into something else.
pub mod sentinel {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::MISSING_SENTINEL;

    pub fn encode(value: Option<f64>) -> f64 {
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => MISSING_SENTINEL,
        }
    }

    pub fn decode(raw: f64) -> Option<f64> {
        if raw.is_finite() && raw >= 0.0 {
            Some(raw)
        } else {
            None
        }
    }

    pub fn encode_all(values: &[Option<f64>]) -> Vec<f64> {
        values.iter().map(|v| encode(*v)).collect()
    }

    pub fn decode_all(raw: &[f64]) -> Vec<Option<f64>> {
        raw.iter().map(|v| decode(*v)).collect()
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        encode(*value).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(decode(f64::deserialize(d)?))
    }

    /// Same encoding for whole vectors: `#[serde(with = "sentinel::vec")]`.
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(values: &[Option<f64>], s: S) -> Result<S::Ok, S::Error> {
            super::encode_all(values).serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<f64>>, D::Error> {
            let raw = Vec::<f64>::deserialize(d)?;
            Ok(super::decode_all(&raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip_preserves_missing_positions() {
        let values = vec![Some(3.0), None, Some(0.0), None, None, Some(17.25)];
        let wire = sentinel::encode_all(&values);
        assert_eq!(wire, vec![3.0, -1.0, 0.0, -1.0, -1.0, 17.25]);

        let decoded = sentinel::decode_all(&wire);
        let missing: Vec<usize> = decoded
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(missing, vec![1, 3, 4]);
        assert_eq!(decoded, values);
    }

    #[test]
    fn non_finite_values_encode_as_missing() {
        assert_eq!(sentinel::encode(Some(f64::NAN)), MISSING_SENTINEL);
        assert_eq!(sentinel::encode(Some(f64::INFINITY)), MISSING_SENTINEL);
    }

    #[test]
    fn negative_readings_encode_as_missing() {
        assert_eq!(sentinel::encode(Some(-5.0)), MISSING_SENTINEL);
        let wire = sentinel::encode_all(&[Some(-0.5), Some(2.0)]);
        assert_eq!(sentinel::decode_all(&wire), vec![None, Some(2.0)]);
    }

    #[test]
    fn series_helpers() {
        let mut s = MetricSeries::new(4, MetricKind::Throughput);
        assert!(!s.has_data());
        s.values[1] = Some(2.0);
        s.values[3] = Some(5.0);
        assert!(s.has_data());
        assert_eq!(s.sum(), 7.0);
        assert_eq!(s.present().count(), 2);
        assert_eq!(s.len(), 4);
    }
}
