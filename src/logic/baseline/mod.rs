//! Baseline Module - Noise Floor Estimation
//!
//! Measures how much the reference endpoint varies across identical requests
//! (timestamps, nonces, ad slots...) so that natural jitter is not mistaken
//! for a header-induced change.
//!
//! # Algorithm
//! 1. One reference request with the full header set
//! 2. N more identical requests
//! 3. Strategy chosen from the reference body size, then time-boxed on a full
//!    comparison of the reference with the first sample
//! 4. Threshold = min(similarity(reference, sample_i)), rounded to 3 digits
//!
//! The threshold and the strategy are fixed from here on.


use std::time::Duration;

use serde::Serialize;

use super::headers::HeaderSet;
use super::similarity::{round_score, SimilarityMetric, Strategy};
use super::snapshot::Snapshot;
use super::types::Threshold;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::transport::{Endpoint, Transport};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct BaselineOptions {
    /// Repeated samples after the reference (N)
    pub samples: usize,
    /// Reference bodies longer than this use the length ratio
    pub length_limit: usize,
    /// Budget for one content-similarity computation
    pub metric_budget: Duration,
    /// Skip automatic selection and never downgrade
    pub forced_strategy: Option<Strategy>,
}

// ============================================================================
// BASELINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Baseline {
    reference: Snapshot,
    threshold: Threshold,
    strategy: Strategy,
    downgraded: bool,
    scores: Vec<f64>,
}

/// Serializable view of a baseline (without the reference body)
#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummary {
    pub threshold: Threshold,
    pub strategy: Strategy,
    pub downgraded: bool,
    pub scores: Vec<f64>,
}

impl Baseline {
    pub fn reference(&self) -> &Snapshot {
        &self.reference
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// True when the content metric ran over budget and was replaced
    pub fn downgraded(&self) -> bool {
        self.downgraded
    }

    /// Unrounded similarity of every sample to the reference
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    #[cfg(test)]
    pub(crate) fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn summary(&self) -> BaselineSummary {
        BaselineSummary {
            threshold: self.threshold,
            strategy: self.strategy,
            downgraded: self.downgraded,
            scores: self.scores.clone(),
        }
    }
}

// ============================================================================
// ESTIMATOR
// ============================================================================

pub struct BaselineEstimator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a Endpoint,
    headers: &'a HeaderSet,
    options: BaselineOptions,
}

impl<'a, T: Transport + ?Sized> BaselineEstimator<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoint: &'a Endpoint,
        headers: &'a HeaderSet,
        options: BaselineOptions,
    ) -> Self {
        Self { transport, endpoint, headers, options }
    }

    /// Step 1: the reference request
    pub fn fetch_reference(&self) -> AnalyzerResult<Snapshot> {
        let response = self.transport.send(self.endpoint, self.headers)?;
        let reference = Snapshot::new(response, self.headers.clone());

        log::info!("Status code of reference response: {}", reference.status());
        log::info!("Length of reference response text is {}", reference.len());
        Ok(reference)
    }

    /// Steps 2-4 against an already fetched reference
    pub fn estimate(&self, reference: Snapshot) -> AnalyzerResult<Baseline> {
        if self.options.samples == 0 {
            return Err(AnalyzerError::Config(
                "baseline needs at least one repeated sample".to_string(),
            ));
        }

        log::info!("Sampling {} identical requests for the noise floor...", self.options.samples);
        let mut samples = Vec::with_capacity(self.options.samples);
        for i in 0..self.options.samples {
            let response = self.transport.send(self.endpoint, self.headers)?;
            log::debug!("baseline sample {}: status {}, {} bytes", i + 1, response.status, response.body.len());
            samples.push(Snapshot::new(response, self.headers.clone()));
        }

        let mut metric = self.initial_metric(&reference);
        if let Some(first) = samples.first() {
            metric.calibrate(&reference, first);
        }
        log::info!("Using {} similarity", metric.strategy().name());

        let mut scores: Vec<f64> = samples.iter()
            .map(|sample| metric.score(&reference, sample))
            .collect();

        // Earlier samples may have been scored by content before the switch
        if metric.downgraded() {
            log::warn!("Too slow text distance function, will check length only");
            scores = samples.iter()
                .map(|sample| Strategy::LengthRatio.score(&reference, sample))
                .collect();
        }

        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let threshold = Threshold::new(round_score(min));

        if threshold.is_strict() {
            log::info!("Reference ratio is {} (no jitter observed, any change counts)", threshold);
        } else {
            log::info!("Reference ratio is {}", threshold);
        }

        Ok(Baseline {
            reference,
            threshold,
            strategy: metric.strategy(),
            downgraded: metric.downgraded(),
            scores,
        })
    }

    /// Reference request followed by the estimation
    #[cfg(test)]
    pub(crate) fn run(&self) -> AnalyzerResult<Baseline> {
        let reference = self.fetch_reference()?;
        self.estimate(reference)
    }

    fn initial_metric(&self, reference: &Snapshot) -> SimilarityMetric {
        if let Some(strategy) = self.options.forced_strategy {
            return SimilarityMetric::new(strategy, Duration::MAX);
        }

        let strategy = Strategy::for_body_len(reference.len(), self.options.length_limit);
        if strategy == Strategy::LengthRatio {
            log::info!(
                "Reference body is {} characters (> {}), automatically using length distance",
                reference.len(), self.options.length_limit
            );
        }
        SimilarityMetric::new(strategy, self.options.metric_budget)
    }
}
