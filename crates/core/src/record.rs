use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One per-host, per-minute observation as delivered by the upstream
/// metric manager. `values` maps metric name to its reading; a `null`
/// reading means the collector had nothing for that minute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    /// Transaction name.
    pub name: String,
    pub host: String,
    #[serde(rename = "dataCollectionMinute")]
    pub data_collection_minute: i64,
    #[serde(default)]
    pub values: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl MetricRecord {
    /// Reading for `metric`, treating non-finite numbers as absent.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values
            .get(metric)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upstream_json_shape() {
        let json = r#"{
            "name": "/checkout",
            "host": "web-1",
            "dataCollectionMinute": 3,
            "values": {"averageResponseTime": 12.5, "callCount": null},
            "tag": "WEB"
        }"#;
        let rec: MetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.name, "/checkout");
        assert_eq!(rec.data_collection_minute, 3);
        assert_eq!(rec.value("averageResponseTime"), Some(12.5));
        assert_eq!(rec.value("callCount"), None);
        assert_eq!(rec.value("missing"), None);
        assert_eq!(rec.tag.as_deref(), Some("WEB"));
    }

    #[test]
    fn tag_and_values_are_optional() {
        let json = r#"{"name": "t", "host": "h", "dataCollectionMinute": 0}"#;
        let rec: MetricRecord = serde_json::from_str(json).unwrap();
        assert!(rec.values.is_empty());
        assert!(rec.tag.is_none());
    }

    #[test]
    fn nan_reading_is_absent() {
        let mut values = HashMap::new();
        values.insert("m".to_string(), Some(f64::NAN));
        let rec = MetricRecord {
            name: "t".into(),
            host: "h".into(),
            data_collection_minute: 0,
            values,
            tag: None,
        };
        assert_eq!(rec.value("m"), None);
    }
}
