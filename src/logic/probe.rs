//! Equivalence Probe
//!
//! Issues one request with a candidate header set and classifies the response
//! against the baseline: equivalent, or anomalous.

use super::baseline::Baseline;
use super::headers::HeaderSet;
use super::similarity::round_score;
use super::snapshot::Snapshot;
use super::types::{ProbeResult, Threshold};
use crate::error::AnalyzerResult;
use crate::transport::{Endpoint, Transport};

// ============================================================================
// EXPECTED TEXT POLICY
// ============================================================================

/// Text that must appear in the response, and whether its absence is an anomaly
#[derive(Debug, Clone, Default)]
pub struct ExpectedText {
    text: Option<String>,
    missing_is_anomaly: bool,
}

impl ExpectedText {
    /// Empty text disables the check
    pub fn new(text: Option<&str>, missing_is_anomaly: bool) -> Self {
        Self {
            text: text.filter(|t| !t.is_empty()).map(str::to_string),
            missing_is_anomaly,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// `None` when no text is configured
    pub fn check(&self, snapshot: &Snapshot) -> Option<bool> {
        self.text.as_deref().map(|t| snapshot.contains_text(t))
    }

    pub fn missing_is_anomaly(&self) -> bool {
        self.missing_is_anomaly && self.text.is_some()
    }
}

/// `similarity < threshold` OR (text configured AND missing AND policy on)
pub fn classify(threshold: Threshold, similarity: f64, text_present: Option<bool>, missing_is_anomaly: bool) -> bool {
    let too_different = !threshold.accepts(similarity);
    let text_missing = text_present == Some(false) && missing_is_anomaly;
    too_different || text_missing
}

// ============================================================================
// PROBE
// ============================================================================

pub struct EquivalenceProbe<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a Endpoint,
    baseline: &'a Baseline,
    expected: &'a ExpectedText,
}

impl<'a, T: Transport + ?Sized> EquivalenceProbe<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoint: &'a Endpoint,
        baseline: &'a Baseline,
        expected: &'a ExpectedText,
    ) -> Self {
        Self { transport, endpoint, baseline, expected }
    }

    pub fn threshold(&self) -> Threshold {
        self.baseline.threshold()
    }

    /// Exactly one request. The full record is returned whatever the verdict.
    pub fn probe(&self, headers: HeaderSet, label: &str) -> AnalyzerResult<(bool, ProbeResult)> {
        let response = self.transport.send(self.endpoint, &headers)?;
        let snapshot = Snapshot::new(response, headers);

        let reference = self.baseline.reference();
        let similarity = round_score(self.baseline.strategy().score(reference, &snapshot));
        let text_present = self.expected.check(&snapshot);
        let is_anomaly = classify(
            self.baseline.threshold(),
            similarity,
            text_present,
            self.expected.missing_is_anomaly(),
        );

        log::debug!(
            "{}: code={} len={} diff={} is_anomaly={} is_present_text={:?}",
            label, snapshot.status(), snapshot.len(), similarity, is_anomaly, text_present
        );

        let result = ProbeResult {
            status: snapshot.status(),
            reference_status: reference.status(),
            length: snapshot.len(),
            similarity,
            text_present,
            is_anomaly,
            snapshot,
        };

        Ok((is_anomaly, result))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::logic::baseline::{BaselineEstimator, BaselineOptions};
    use crate::logic::testing::{browser_headers, endpoint, response, ScriptedTransport};

    fn baseline_for(body: &str) -> Baseline {
        let transport = ScriptedTransport::fixed(200, body);
        let (ep, headers) = (endpoint(), browser_headers());
        let options = BaselineOptions {
            samples: 3,
            length_limit: 10_000,
            metric_budget: Duration::from_secs(60),
            forced_strategy: None,
        };
        BaselineEstimator::new(&transport, &ep, &headers, options).run().unwrap()
    }

    #[test]
    fn test_classify() {
        let t = Threshold::new(0.9);
        assert!(!classify(t, 0.95, None, true));
        assert!(classify(t, 0.85, None, false));
        assert!(classify(t, 0.95, Some(false), true));
        assert!(!classify(t, 0.95, Some(false), false));
        assert!(!classify(t, 0.9, Some(true), true));
    }

    #[test]
    fn test_empty_expected_text_disables_policy() {
        let expected = ExpectedText::new(Some(""), true);
        assert_eq!(expected.text(), None);
        assert!(!expected.missing_is_anomaly());
    }

    #[test]
    fn test_equivalent_response_is_not_anomaly() {
        let baseline = baseline_for("Hello World");
        let transport = ScriptedTransport::fixed(200, "Hello World");
        let ep = endpoint();
        let expected = ExpectedText::default();
        let probe = EquivalenceProbe::new(&transport, &ep, &baseline, &expected);

        let (is_anomaly, result) = probe.probe(browser_headers().without("Cookie"), "Cookie").unwrap();

        assert!(!is_anomaly);
        assert!(!result.is_anomaly);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.length, 11);
        assert_eq!(result.text_present, None);
        assert_eq!(transport.calls(), 1);
        assert!(!result.snapshot.headers().contains("Cookie"));
    }

    #[test]
    fn test_any_deviation_is_anomaly_under_strict_threshold() {
        let baseline = baseline_for("Hello World");
        let transport = ScriptedTransport::fixed(200, "Hello World!");
        let ep = endpoint();
        let expected = ExpectedText::default();
        let probe = EquivalenceProbe::new(&transport, &ep, &baseline, &expected);

        let (is_anomaly, result) = probe.probe(browser_headers(), "any").unwrap();

        assert!(is_anomaly);
        assert!(result.similarity < 1.0);
    }

    #[test]
    fn test_missing_expected_text_is_anomaly_when_policy_on() {
        // Removing Accept-Language drops the French greeting
        let baseline = baseline_for("<h1>Bienvenue</h1>");
        let transport = ScriptedTransport::new(|_, headers| {
            if headers.contains("accept-language") {
                Ok(response(200, "<h1>Bienvenue</h1>"))
            } else {
                Ok(response(200, "<h1>Welcome!!</h1>"))
            }
        });
        let ep = endpoint();
        let headers = browser_headers().without("Accept-Language");

        let lenient = ExpectedText::new(Some("Bienvenue"), false);
        let strict = ExpectedText::new(Some("Bienvenue"), true);

        // Force a threshold every response clears, so only the text decides
        let baseline = baseline.with_threshold(Threshold::new(0.0));

        let (lenient_anomaly, lenient_result) = EquivalenceProbe::new(&transport, &ep, &baseline, &lenient)
            .probe(headers.clone(), "Accept-Language")
            .unwrap();
        let (strict_anomaly, strict_result) = EquivalenceProbe::new(&transport, &ep, &baseline, &strict)
            .probe(headers, "Accept-Language")
            .unwrap();

        assert!(!lenient_anomaly);
        assert!(strict_anomaly);
        assert!(strict_result.similarity >= baseline.threshold().value());
        assert_eq!(lenient_result.text_present, Some(false));
        assert!(strict_result.text_missing());
    }

    #[test]
    fn test_status_is_preserved_in_record() {
        let baseline = baseline_for("Hello World");
        let transport = ScriptedTransport::fixed(403, "Hello World");
        let ep = endpoint();
        let expected = ExpectedText::default();
        let probe = EquivalenceProbe::new(&transport, &ep, &baseline, &expected);

        let (_, result) = probe.probe(browser_headers(), "curl").unwrap();

        assert_eq!(result.status, 403);
        assert_eq!(result.reference_status, 200);
        assert!(result.status_diverged());
    }
}
