//! Analysis Run
//!
//! Capture -> reference -> baseline -> header minimization -> identity probe.
//! Everything is sequential; the threshold is fixed before the first probe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::baseline::{BaselineEstimator, BaselineSummary};
use super::headers::HeaderSet;
use super::identity::{probe_identities, Exclusions, Identity, IdentityReport, CATALOG};
use super::minimizer::{minimize, Minimization};
use super::probe::{EquivalenceProbe, ExpectedText};
use super::snapshot::Snapshot;
use super::types::AnomalyMap;
use crate::capture::CapturedRequest;
use crate::config::AnalyzerConfig;
use crate::constants::DEFAULT_USER_AGENT;
use crate::error::AnalyzerResult;
use crate::transport::{Endpoint, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// No header could be removed, identity probing skipped
    AllLoadBearing,
    /// Reference response lacked the required text
    ReferenceRejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub endpoint: Endpoint,
    /// Headers of the reference request (after User-Agent injection)
    pub headers: HeaderSet,
    pub injected_user_agent: Option<String>,
    pub expected_text: Option<String>,
    pub reference: Snapshot,
    pub reference_has_text: Option<bool>,
    pub baseline: Option<BaselineSummary>,
    pub minimization: Option<Minimization>,
    pub identities: Option<IdentityReport>,
}

impl AnalysisReport {
    fn new(capture: &CapturedRequest, injected: Option<String>, expected: &ExpectedText, reference: Snapshot) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            outcome: Outcome::Completed,
            endpoint: capture.endpoint.clone(),
            headers: capture.headers.clone(),
            injected_user_agent: injected,
            expected_text: expected.text().map(str::to_string),
            reference_has_text: expected.check(&reference),
            reference,
            baseline: None,
            minimization: None,
            identities: None,
        }
    }

    pub fn minimal_headers(&self) -> Option<&HeaderSet> {
        self.minimization.as_ref().map(|m| &m.minimal)
    }

    pub fn header_anomalies(&self) -> Option<&AnomalyMap> {
        self.minimization.as_ref().map(|m| &m.anomalies)
    }

    pub fn identity_anomalies(&self) -> Option<&AnomalyMap> {
        self.identities.as_ref().map(|i| &i.anomalies)
    }

    /// Completed run where nothing made a difference
    pub fn no_distinguishing_weight(&self) -> bool {
        self.outcome == Outcome::Completed
            && self.header_anomalies().map_or(true, AnomalyMap::is_empty)
            && self.identity_anomalies().map_or(true, AnomalyMap::is_empty)
    }
}

pub struct Analyzer<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a AnalyzerConfig,
    catalog: &'a [Identity],
}

impl<'a, T: Transport + ?Sized> Analyzer<'a, T> {
    pub fn new(transport: &'a T, config: &'a AnalyzerConfig) -> Self {
        Self { transport, config, catalog: CATALOG }
    }

    pub fn with_catalog(mut self, catalog: &'a [Identity]) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn run(&self, mut capture: CapturedRequest) -> AnalyzerResult<AnalysisReport> {
        self.config.validate()?;
        log::info!("Analysis started: {} {}", capture.endpoint.method, capture.endpoint.url);

        let injected = capture.ensure_user_agent(DEFAULT_USER_AGENT);
        if injected.is_some() {
            log::info!("Add default User-Agent...");
        }

        let estimator = BaselineEstimator::new(
            self.transport,
            &capture.endpoint,
            &capture.headers,
            self.config.baseline_options(),
        );
        let reference = estimator.fetch_reference()?;
        log::info!("Response text beginning: {}...", reference.preview(100));

        let expected = ExpectedText::new(self.config.expected_text(), self.config.missing_text_anomaly);
        let mut report = AnalysisReport::new(&capture, injected.clone(), &expected, reference.clone());

        if report.reference_has_text == Some(false) {
            log::warn!("Can't find {:?} in reference response text", expected.text().unwrap_or_default());
            if self.config.require_reference_text {
                report.outcome = Outcome::ReferenceRejected;
                return Ok(report);
            }
        }

        let baseline = estimator.estimate(reference)?;
        log::debug!("Baseline scores: {:?}", baseline.scores());
        report.baseline = Some(baseline.summary());

        let probe = EquivalenceProbe::new(self.transport, &capture.endpoint, &baseline, &expected);

        let minimization = minimize(&probe, &capture.headers)?;
        let all_load_bearing = minimization.all_load_bearing();
        report.minimization = Some(minimization);

        if all_load_bearing {
            log::info!("All responses are different, every header is load-bearing");
            report.outcome = Outcome::AllLoadBearing;
            return Ok(report);
        }

        if self.config.skip_identity {
            log::info!("Identity probe skipped");
        } else {
            let exclusions = Exclusions::for_injected(injected.as_deref());
            if !exclusions.is_empty() {
                log::info!("{} catalog entries match the injected User-Agent and are skipped", exclusions.len());
            }
            let identities = probe_identities(&probe, &capture.headers, self.catalog, &exclusions)?;
            report.identities = Some(identities);
        }

        Ok(report)
    }
}
