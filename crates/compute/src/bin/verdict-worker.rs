//! verdict-worker: run one control/test comparison batch from files.
//!
//! Reads both windows as JSON arrays of raw metric records, the metric
//! templates as YAML and the run configuration as TOML (or `VERDICT_*`
//! environment variables), then writes the merged batch result as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use verdict_compute::VerifyEngine;
use verdict_core::{load_dotenv, MetricRecord, RunConfig, TemplateConfig};

// ── CLI ─────────────────────────────────────────────────────────────

/// Compare a test window of per-host metrics against a control window.
#[derive(Parser, Debug)]
#[command(name = "verdict-worker", version, about)]
struct Cli {
    /// Control window records (JSON array).
    #[arg(long, env = "VERDICT_CONTROL")]
    control: PathBuf,

    /// Test window records (JSON array).
    #[arg(long, env = "VERDICT_TEST")]
    test: PathBuf,

    /// Metric template definitions (YAML).
    #[arg(long, env = "VERDICT_TEMPLATES")]
    templates: PathBuf,

    /// Run configuration (TOML). Falls back to VERDICT_* variables.
    #[arg(long, env = "VERDICT_CONFIG")]
    config: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "VERDICT_JSON_LOGS")]
    json_logs: bool,

    /// Include dispatch metrics alongside the result.
    #[arg(long)]
    with_metrics: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_records(path: &Path) -> anyhow::Result<Vec<MetricRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading records from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing records in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(RunConfig::from_env()),
    }
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    config.log_summary();
    let template = TemplateConfig::load(&cli.templates)
        .with_context(|| format!("loading templates {}", cli.templates.display()))?;

    let control = read_records(&cli.control)?;
    let test = read_records(&cli.test)?;
    info!(control = control.len(), test = test.len(), "records loaded");

    let engine = VerifyEngine::new(config, Arc::new(template));
    let report = match engine.run(control, test) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "batch failed");
            return Err(anyhow::Error::new(e).context("batch failed"));
        }
    };

    let json = if cli.with_metrics {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.result)?
    };
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
