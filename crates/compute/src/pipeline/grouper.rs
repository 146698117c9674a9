//! Turns flat per-host-per-minute records into per-transaction series
//! bundles and applies the traffic sanitization rules.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use verdict_core::{MetricKind, MetricRecord, MetricSeries, MetricTemplate, RunConfig, DEFAULT_TAG};

/// Host name -> series.
pub type HostSeries = BTreeMap<String, MetricSeries>;

/// All series of one transaction within one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSeries {
    /// Tag whose metric set was used.
    pub tag: String,
    /// Metric names in template order.
    pub metric_order: Vec<String>,
    /// Metric name -> host -> series.
    pub metrics: BTreeMap<String, HostSeries>,
}

impl TransactionSeries {
    pub fn hosts(&self, metric: &str) -> Option<&HostSeries> {
        self.metrics.get(metric)
    }
}

/// Transaction name -> series bundle for one window.
pub type GroupedWindow = BTreeMap<String, TransactionSeries>;

/// Resolve the metric set for a declared tag, falling back to the default tag.
fn resolve_tag<'t>(
    template: &'t dyn MetricTemplate,
    declared: Option<&str>,
) -> Option<(String, &'t [String])> {
    let declared = declared.unwrap_or(DEFAULT_TAG);
    if let Some(metrics) = template.metrics_for_tag(declared) {
        return Some((declared.to_string(), metrics));
    }
    if declared != DEFAULT_TAG {
        warn!(tag = declared, "tag not configured, falling back to default");
    }
    template
        .metrics_for_tag(DEFAULT_TAG)
        .map(|m| (DEFAULT_TAG.to_string(), m))
}

/// Group one window's records into fixed-length series and sanitize them.
pub fn group_records(
    records: &[MetricRecord],
    template: &dyn MetricTemplate,
    config: &RunConfig,
) -> GroupedWindow {
    let len = config.series_len();
    let mut grouped = GroupedWindow::new();
    // false marks a transaction dropped for having no metrics.
    let mut seen: HashMap<&str, bool> = HashMap::new();
    let mut out_of_range = 0usize;

    for rec in records {
        let keep = *seen.entry(rec.name.as_str()).or_insert_with(|| {
            match resolve_tag(template, rec.tag.as_deref()) {
                Some((tag, metrics)) if !metrics.is_empty() => {
                    grouped.insert(
                        rec.name.clone(),
                        TransactionSeries {
                            tag,
                            metric_order: metrics.to_vec(),
                            metrics: BTreeMap::new(),
                        },
                    );
                    true
                }
                _ => {
                    debug!(transaction = %rec.name, "no metrics configured, dropping transaction");
                    false
                }
            }
        });
        if !keep {
            continue;
        }

        let offset = rec.data_collection_minute - config.analysis_start_min;
        if offset < 0 || offset as usize >= len {
            out_of_range += 1;
            continue;
        }
        let offset = offset as usize;

        let Some(txn) = grouped.get_mut(&rec.name) else {
            continue;
        };
        for metric in &txn.metric_order {
            let series = txn
                .metrics
                .entry(metric.clone())
                .or_default()
                .entry(rec.host.clone())
                .or_insert_with(|| MetricSeries::new(len, template.metric_type(metric)));
            if let Some(v) = rec.value(metric) {
                series.values[offset] = Some(v);
            }
        }
    }

    if out_of_range > 0 {
        warn!(records = out_of_range, "records outside the analysis window ignored");
    }

    for (name, txn) in grouped.iter_mut() {
        sanitize(name, txn, template, config.min_rpm);
    }
    grouped
}

/// Apply the zero-throughput, low-traffic and known-zero-error rules.
pub fn sanitize(
    transaction: &str,
    txn: &mut TransactionSeries,
    template: &dyn MetricTemplate,
    min_rpm: f64,
) {
    let throughput = template
        .metric_name_for_type(MetricKind::Throughput)
        .and_then(|name| txn.metrics.get(name))
        .cloned();

    if let Some(throughput) = &throughput {
        let skipped: Vec<&String> = throughput
            .iter()
            .filter(|(_, s)| s.sum() < min_rpm)
            .map(|(host, _)| host)
            .collect();

        for hosts in txn.metrics.values_mut() {
            for (host, series) in hosts.iter_mut() {
                if let Some(tp) = throughput.get(host) {
                    if series.kind == MetricKind::RespTime {
                        for (v, t) in series.values.iter_mut().zip(&tp.values) {
                            if *t == Some(0.0) {
                                *v = None;
                            }
                        }
                    }
                }
                if skipped.contains(&host) {
                    series.skip = true;
                }
            }
        }

        if !skipped.is_empty() {
            debug!(transaction, hosts = skipped.len(), min_rpm, "hosts below throughput floor");
        }
    }

    for hosts in txn.metrics.values_mut() {
        for series in hosts.values_mut() {
            if series.kind == MetricKind::Error && !series.has_data() {
                series.values.iter_mut().for_each(|v| *v = Some(0.0));
            }
        }
    }
}
