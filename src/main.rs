//! header-probe
//!
//! Replays a request captured from the browser and finds which of its headers
//! actually change the server response, then checks how the server reacts to
//! other User-Agents.
//!
//! ```text
//! capture file -> reference -> baseline (threshold) -> minimizer -> identity probe
//!                                                          |             |
//!                                                          v             v
//!                                                   minimal headers  UA anomalies
//! ```

mod capture;
mod config;
mod constants;
mod error;
mod logic;
mod report;
mod transport;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::capture::CapturedRequest;
use crate::config::{AnalyzerConfig, StrategyChoice};
use crate::error::AnalyzerError;
use crate::logic::analyzer::Analyzer;
use crate::report::BodyWriter;
use crate::transport::UreqTransport;

#[derive(Debug, Parser)]
#[command(name = "header-probe")]
#[command(bin_name = "header-probe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Request copied as "fetch" from the browser developer tools (or plain JSON)
    capture: PathBuf,

    /// Text the response is expected to contain
    #[arg(long, value_name = "TEXT")]
    expect: Option<String>,

    /// A response without the expected text counts as different
    #[arg(long)]
    missing_text_anomaly: bool,

    /// Stop when the reference response lacks the expected text
    #[arg(long)]
    require_reference_text: bool,

    /// Repeated reference requests used to measure jitter
    #[arg(long, value_name = "N")]
    samples: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Bodies longer than this are compared by length only
    #[arg(long, value_name = "CHARS")]
    length_limit: Option<usize>,

    /// Time budget for one content comparison
    #[arg(long, value_name = "MS")]
    metric_budget_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = StrategyChoice::Auto)]
    strategy: StrategyChoice,

    /// Do not try alternate User-Agents
    #[arg(long)]
    skip_identity: bool,

    /// Do not write response bodies to disk
    #[arg(long)]
    no_save: bool,

    /// Write the full report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Directory for saved bodies (default: next to the capture file)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// CLI flags on top of the environment layer
    fn apply(&self, mut config: AnalyzerConfig) -> AnalyzerConfig {
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(secs) = self.timeout {
            config.timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(limit) = self.length_limit {
            config.length_limit = limit;
        }
        if let Some(ms) = self.metric_budget_ms {
            config.metric_budget = std::time::Duration::from_millis(ms);
        }
        if self.expect.is_some() {
            config.expected_text = self.expect.clone();
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir.clone();
        }
        if self.json.is_some() {
            config.json_report = self.json.clone();
        }

        config.missing_text_anomaly |= self.missing_text_anomaly;
        config.require_reference_text |= self.require_reference_text;
        config.skip_identity |= self.skip_identity;
        config.save_bodies &= !self.no_save;
        config.strategy = self.strategy;
        config
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    log::info!("{} v{}", constants::APP_NAME, constants::APP_VERSION);

    if let Err(err) = run(&cli) {
        log::error!("{:#}", err);
        if err.downcast_ref::<AnalyzerError>().is_some_and(AnalyzerError::is_network) {
            eprintln!("Network failure, the analysis was aborted (requests are never retried)");
        }
        eprintln!("exit with error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.apply(AnalyzerConfig::from_env());
    config.validate()?;

    let capture = CapturedRequest::load(&cli.capture)
        .with_context(|| format!("loading capture {}", cli.capture.display()))?;

    let transport = UreqTransport::new(config.timeout, config.max_redirects);
    let report = Analyzer::new(&transport, &config)
        .run(capture)
        .context("analysis failed")?;

    print!("{}", report::render_summary(&report));

    if config.save_bodies {
        let writer = BodyWriter::for_capture(&cli.capture, config.output_dir.as_deref());
        let saved = writer.save_report(&report).context("saving response bodies")?;
        log::info!("Saved {} response bodies", saved.len());
    }

    if let Some(path) = &config.json_report {
        report::write_json(&report, path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}
