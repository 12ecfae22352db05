//! Configuration module
//!
//! Defaults come from `constants.rs`, the environment (and `.env`) overrides
//! them, command line flags override both.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    self, DEFAULT_BASELINE_SAMPLES, DEFAULT_LENGTH_METRIC_LIMIT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_METRIC_BUDGET_MS, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logic::baseline::BaselineOptions;
use crate::logic::similarity::Strategy;

/// How the similarity strategy is picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StrategyChoice {
    /// By reference body size, then time-boxed
    #[default]
    Auto,
    /// Always compare body lengths
    Length,
    /// Always compare body content, never downgrade
    Content,
}

impl StrategyChoice {
    pub fn forced(self) -> Option<Strategy> {
        match self {
            StrategyChoice::Auto => None,
            StrategyChoice::Length => Some(Strategy::LengthRatio),
            StrategyChoice::Content => Some(Strategy::Content),
        }
    }
}

/// Analysis run configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Repeated reference requests for the baseline
    pub samples: usize,

    /// HTTP timeout per request
    pub timeout: Duration,

    /// Redirects followed per request
    pub max_redirects: u32,

    /// Reference bodies longer than this use the length ratio
    pub length_limit: usize,

    /// Budget for one content-similarity computation
    pub metric_budget: Duration,

    pub strategy: StrategyChoice,

    /// Text the response is expected to contain
    pub expected_text: Option<String>,

    /// A probe whose body lacks the expected text is an anomaly
    pub missing_text_anomaly: bool,

    /// Stop when the reference itself lacks the expected text
    pub require_reference_text: bool,

    pub skip_identity: bool,

    /// Persist response bodies next to the capture file
    pub save_bodies: bool,

    /// Where bodies are written (default: capture file directory)
    pub output_dir: Option<PathBuf>,

    /// JSON report destination
    pub json_report: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_BASELINE_SAMPLES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            length_limit: DEFAULT_LENGTH_METRIC_LIMIT,
            metric_budget: Duration::from_millis(DEFAULT_METRIC_BUDGET_MS),
            strategy: StrategyChoice::Auto,
            expected_text: None,
            missing_text_anomaly: false,
            require_reference_text: false,
            skip_identity: false,
            save_bodies: true,
            output_dir: None,
            json_report: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            samples: constants::env_number(constants::ENV_SAMPLES, DEFAULT_BASELINE_SAMPLES),
            timeout: Duration::from_secs(
                constants::env_number(constants::ENV_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS),
            ),
            length_limit: constants::env_number(constants::ENV_LENGTH_LIMIT, DEFAULT_LENGTH_METRIC_LIMIT),
            metric_budget: Duration::from_millis(
                constants::env_number(constants::ENV_METRIC_BUDGET_MS, DEFAULT_METRIC_BUDGET_MS),
            ),
            missing_text_anomaly: constants::env_flag(constants::ENV_EXPECTED_TEXT_ANOMALY, false),
            output_dir: constants::env_string(constants::ENV_OUTPUT_DIR).map(PathBuf::from),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.samples == 0 {
            return Err(AnalyzerError::Config("samples must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(AnalyzerError::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn baseline_options(&self) -> BaselineOptions {
        BaselineOptions {
            samples: self.samples,
            length_limit: self.length_limit,
            metric_budget: self.metric_budget,
            forced_strategy: self.strategy.forced(),
        }
    }

    /// Expected text, ignoring blank input
    pub fn expected_text(&self) -> Option<&str> {
        self.expected_text.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.samples, 10);
        assert_eq!(config.length_limit, 10_000);
        assert_eq!(config.metric_budget, Duration::from_millis(500));
        assert!(!config.missing_text_anomaly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = AnalyzerConfig { samples: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(AnalyzerError::Config(_))));

        let config = AnalyzerConfig { timeout: Duration::ZERO, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_expected_text_is_none() {
        let config = AnalyzerConfig { expected_text: Some(String::new()), ..Default::default() };
        assert_eq!(config.expected_text(), None);
    }

    #[test]
    fn test_strategy_choice() {
        assert_eq!(StrategyChoice::Auto.forced(), None);
        assert_eq!(StrategyChoice::Length.forced(), Some(Strategy::LengthRatio));

        let options = AnalyzerConfig { strategy: StrategyChoice::Content, ..Default::default() }
            .baseline_options();
        assert_eq!(options.forced_strategy, Some(Strategy::Content));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        std::env::set_var(constants::ENV_LENGTH_LIMIT, "2500");
        std::env::set_var(constants::ENV_EXPECTED_TEXT_ANOMALY, "true");

        let config = AnalyzerConfig::from_env();

        std::env::remove_var(constants::ENV_LENGTH_LIMIT);
        std::env::remove_var(constants::ENV_EXPECTED_TEXT_ANOMALY);

        assert_eq!(config.length_limit, 2500);
        assert!(config.missing_text_anomaly);
    }
}
