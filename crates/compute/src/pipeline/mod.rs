//! Per-transaction analysis pipeline.
//!
//! For every (transaction, metric) the series bundle built by the
//! [`grouper`] is routed either through the full comparator
//! (discretize, align and score each test host against every control host)
//! or, for wide transactions, through the [`fast_path`] baseline comparator.
//! Scores are then banded by the [`risk`] classifier.

pub mod discretize;
pub mod distance;
pub mod fast_path;
pub mod grouper;
pub mod metrics;
pub mod risk;
pub mod stats;

use tracing::debug;

use verdict_core::{
    AnalysisResponse, AnalysisType, Comparator, HostAnalysis, MetricRecord, MetricTemplate, Result,
    Risk, RunConfig, TransactionResult,
};

use crate::symbols::AnalysisContext;

use self::discretize::{discretize, SymbolSeries};
use self::distance::{DistanceScorer, MetricRules};
use self::fast_path::FastPathScorer;
use self::grouper::{group_records, GroupedWindow, HostSeries, TransactionSeries};
use self::risk::RiskClassifier;

/// Runs the comparison for every transaction of one partition.
pub struct TransactionAnalyzer<'a> {
    ctx: &'a AnalysisContext,
    config: &'a RunConfig,
    template: &'a dyn MetricTemplate,
    analysis_type: AnalysisType,
    classifier: RiskClassifier,
}

impl<'a> TransactionAnalyzer<'a> {
    /// Fails with `UnsupportedTolerance` for a tolerance outside 1..=5.
    pub fn new(
        ctx: &'a AnalysisContext,
        config: &'a RunConfig,
        template: &'a dyn MetricTemplate,
        analysis_type: AnalysisType,
    ) -> Result<Self> {
        let threshold = ctx.thresholds.get(config.tolerance)?;
        Ok(Self {
            ctx,
            config,
            template,
            analysis_type,
            classifier: RiskClassifier::new(threshold),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.classifier.threshold()
    }

    /// Group both windows and analyse every transaction found in either.
    pub fn analyze_records(
        &self,
        control: &[MetricRecord],
        test: &[MetricRecord],
    ) -> Vec<TransactionResult> {
        let control = group_records(control, self.template, self.config);
        let test = group_records(test, self.template, self.config);
        self.analyze_windows(&control, &test)
    }

    /// One result per transaction name, in name order.
    pub fn analyze_windows(
        &self,
        control: &GroupedWindow,
        test: &GroupedWindow,
    ) -> Vec<TransactionResult> {
        let mut names: Vec<&String> = control.keys().chain(test.keys()).collect();
        names.sort();
        names.dedup();
        names
            .into_iter()
            .map(|name| self.analyze_transaction(name, control.get(name), test.get(name)))
            .collect()
    }

    pub fn analyze_transaction(
        &self,
        name: &str,
        control: Option<&TransactionSeries>,
        test: Option<&TransactionSeries>,
    ) -> TransactionResult {
        let empty = HostSeries::new();
        let primary = test.or(control);
        let mut result = TransactionResult {
            txn_name: name.to_string(),
            txn_tag: primary.map(|t| t.tag.clone()).unwrap_or_default(),
            ..TransactionResult::default()
        };

        let metric_order = primary.map(|t| t.metric_order.as_slice()).unwrap_or_default();
        for (id, metric) in metric_order.iter().enumerate() {
            let c = control.and_then(|t| t.hosts(metric)).unwrap_or(&empty);
            let t = test.and_then(|t| t.hosts(metric)).unwrap_or(&empty);
            result
                .metrics
                .insert(id as u32, self.analyze_metric(name, metric, c, t));
        }
        result.recompute_max_risk();
        result
    }

    /// Compare every test host of one (transaction, metric).
    pub fn analyze_metric(
        &self,
        transaction: &str,
        metric: &str,
        control: &HostSeries,
        test: &HostSeries,
    ) -> AnalysisResponse {
        let control_avg = stats::mean(control.values().flat_map(|s| s.present()));
        let test_avg = stats::mean(test.values().flat_map(|s| s.present()));
        if control_avg.is_none() || test_avg.is_none() {
            debug!(transaction, metric, "no data on one side, skipping");
            let mut response = AnalysisResponse::skipped(metric);
            for (host, series) in test.iter().filter(|(_, s)| s.skip) {
                response.results.insert(
                    host.clone(),
                    HostAnalysis {
                        test_data: series.values.clone(),
                        skip: true,
                        risk: Risk::NotApplicable,
                        ..HostAnalysis::default()
                    },
                );
            }
            response.control_avg = control_avg;
            response.recompute_max_risk();
            return response;
        }

        let rules = MetricRules::from_template(self.template, transaction, metric);
        let hosts = control.len().max(test.len());
        let fast = self.analysis_type == AnalysisType::FastPath
            || hosts > self.config.max_nodes_threshold;

        let mut response = if fast {
            debug!(transaction, metric, hosts, "using fast path");
            self.fast_path(&rules, control, test)
        } else {
            self.comparative(&rules, control, test)
        };
        response.metric_name = metric.to_string();
        response.control_avg = control_avg;
        response.test_avg = test_avg;
        response.recompute_max_risk();
        response
    }

    fn comparative(
        &self,
        rules: &MetricRules,
        control: &HostSeries,
        test: &HostSeries,
    ) -> AnalysisResponse {
        let alphabet = &self.ctx.alphabet;
        let control_rows: Vec<&[Option<f64>]> =
            control.values().map(|s| s.values.as_slice()).collect();
        let test_rows: Vec<&[Option<f64>]> =
            test.values().map(|s| s.values.as_slice()).collect();
        let disc = discretize(&control_rows, &test_rows, self.config.smooth_window, alphabet);

        let scorer = DistanceScorer::new(
            self.ctx,
            rules,
            disc.apply_sax,
            self.config.comparison_unit_window,
            self.threshold(),
        );
        let candidates: Vec<&SymbolSeries> = disc.control.iter().collect();
        let control_hosts: Vec<(&String, &[Option<f64>])> = control
            .iter()
            .map(|(h, s)| (h, s.values.as_slice()))
            .collect();

        let mut response = AnalysisResponse {
            comparator: Comparator::Sax,
            apply_sax: disc.apply_sax,
            ..AnalysisResponse::default()
        };
        for ((host, series), symbols) in test.iter().zip(&disc.test) {
            let mut analysis = HostAnalysis {
                test_data: series.values.clone(),
                test_cuts: alphabet.render(&symbols.symbols),
                skip: series.skip,
                ..HostAnalysis::default()
            };
            match scorer.nearest_neighbor(&candidates, symbols) {
                Some((idx, pair)) => {
                    let (nn, values) = control_hosts[idx];
                    analysis.nn = Some(nn.clone());
                    analysis.control_data = values.to_vec();
                    analysis.control_cuts = alphabet.render(&disc.control[idx].symbols);
                    analysis.risk = self.classifier.classify(pair.score, series.skip);
                    analysis.distance = pair.distances;
                    analysis.score = pair.score;
                    analysis.alignment = pair.alignment;
                }
                None => {
                    debug!(host = %host, "no valid buckets to compare");
                    analysis.risk = Risk::NotApplicable;
                }
            }
            response.results.insert(host.clone(), analysis);
        }
        response
    }

    fn fast_path(
        &self,
        rules: &MetricRules,
        control: &HostSeries,
        test: &HostSeries,
    ) -> AnalysisResponse {
        let control_rows: Vec<&[Option<f64>]> =
            control.values().map(|s| s.values.as_slice()).collect();
        let scorer = FastPathScorer::new(
            self.ctx,
            rules,
            &control_rows,
            self.config.smooth_window,
            self.threshold(),
        );
        let baseline = scorer.baseline_curve();

        let mut response = AnalysisResponse {
            comparator: Comparator::FastPath,
            ..AnalysisResponse::default()
        };
        for (host, series) in test {
            let mut analysis = HostAnalysis {
                test_data: series.values.clone(),
                control_data: baseline.clone(),
                skip: series.skip,
                ..HostAnalysis::default()
            };
            match scorer.score(&series.values) {
                Some(pair) => {
                    analysis.risk = self.classifier.classify(pair.score, series.skip);
                    analysis.distance = pair.distances;
                    analysis.score = pair.score;
                }
                None => analysis.risk = Risk::NotApplicable,
            }
            response.results.insert(host.clone(), analysis);
        }
        response
    }
}
