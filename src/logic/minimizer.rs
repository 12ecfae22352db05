//! Header Minimizer
//!
//! Single-header-removal search: each header is removed in turn from the FULL
//! original set (never from a shrinking accumulator) and probed once, in
//! insertion order. O(n) probes.
//!
//! Headers are judged independently. Two headers that only matter together
//! can both be reported removable, and multi-header interactions are never
//! detected.

use serde::Serialize;

use super::headers::HeaderSet;
use super::probe::EquivalenceProbe;
use super::types::{AnomalyMap, AnomalyRecord, Dimension, ProbeResult};
use crate::error::AnalyzerResult;
use crate::transport::Transport;

/// Header whose removal left the response equivalent
#[derive(Debug, Clone, Serialize)]
pub struct RemovableHeader {
    pub name: String,
    pub result: ProbeResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct Minimization {
    /// Original headers minus every removable one
    pub minimal: HeaderSet,
    pub removable: Vec<RemovableHeader>,
    /// Non-removable headers with the probe that proved it
    pub anomalies: AnomalyMap,
}

impl Minimization {
    /// Nothing could be removed
    pub fn all_load_bearing(&self) -> bool {
        self.removable.is_empty()
    }

    pub fn removable_names(&self) -> Vec<&str> {
        self.removable.iter().map(|h| h.name.as_str()).collect()
    }
}

pub fn minimize<T: Transport + ?Sized>(
    probe: &EquivalenceProbe<'_, T>,
    headers: &HeaderSet,
) -> AnalyzerResult<Minimization> {
    log::info!(
        "Now trying to make requests without some headers ({} headers, threshold {})...",
        headers.len(), probe.threshold()
    );

    let mut removable = Vec::new();
    let mut anomalies = AnomalyMap::new();

    for (idx, name) in headers.names().into_iter().enumerate() {
        let (is_anomaly, result) = probe.probe(headers.without(&name), &name)?;

        log::info!(
            "[{}/{}] {}: code={} len={} diff={}{}",
            idx + 1, headers.len(), name, result.status, result.length, result.similarity,
            if is_anomaly { " -> required" } else { "" }
        );

        if is_anomaly {
            anomalies.push(AnomalyRecord {
                dimension: Dimension::Header(name),
                result,
            });
        } else {
            removable.push(RemovableHeader { name, result });
        }
    }

    let mut minimal = headers.clone();
    for header in &removable {
        minimal = minimal.without(&header.name);
    }

    Ok(Minimization { minimal, removable, anomalies })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::logic::baseline::{Baseline, BaselineEstimator, BaselineOptions};
    use crate::logic::probe::ExpectedText;
    use crate::logic::testing::{browser_headers, endpoint, response, ScriptedTransport};

    fn baseline(body: &str) -> Baseline {
        let transport = ScriptedTransport::fixed(200, body);
        let (ep, headers) = (endpoint(), browser_headers());
        let options = BaselineOptions {
            samples: 10,
            length_limit: 10_000,
            metric_budget: Duration::from_secs(60),
            forced_strategy: None,
        };
        BaselineEstimator::new(&transport, &ep, &headers, options).run().unwrap()
    }

    /// Server that needs a cookie and a French Accept-Language
    fn picky_server() -> ScriptedTransport {
        ScriptedTransport::new(|_, headers| {
            if !headers.contains("cookie") {
                return Ok(response(403, "Forbidden"));
            }
            if !headers.contains("accept-language") {
                return Ok(response(200, "Hello World"));
            }
            Ok(response(200, "Bonjour le monde, Bienvenue"))
        })
    }

    #[test]
    fn test_unused_header_is_removable() {
        let base = baseline("Hello World");
        let transport = ScriptedTransport::fixed(200, "Hello World");
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);

        let headers = browser_headers();
        let result = minimize(&probe, &headers).unwrap();

        assert_eq!(result.removable.len(), headers.len());
        assert!(result.minimal.is_empty());
        assert!(result.anomalies.is_empty());
        assert_eq!(transport.calls(), headers.len());
    }

    #[test]
    fn test_required_headers_are_kept() {
        let base = baseline("Bonjour le monde, Bienvenue");
        let transport = picky_server();
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);

        let result = minimize(&probe, &browser_headers()).unwrap();

        assert_eq!(result.minimal.names(), vec!["Accept-Language", "Cookie"]);
        assert_eq!(result.anomalies.names(), vec!["Accept-Language", "Cookie"]);
        assert_eq!(result.removable_names(), vec!["Accept", "User-Agent", "X-Requested-With"]);
        assert_eq!(result.anomalies.get("cookie").unwrap().status, 403);
        assert!(!result.all_load_bearing());
    }

    #[test]
    fn test_each_header_probed_against_full_set() {
        let base = baseline("Bonjour le monde, Bienvenue");
        let transport = picky_server();
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);
        let headers = browser_headers();

        minimize(&probe, &headers).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), headers.len());
        for (sent, name) in sent.iter().zip(headers.names()) {
            assert_eq!(*sent, headers.without(&name));
        }
    }

    #[test]
    fn test_removable_headers_cleared_threshold() {
        let base = baseline("Bonjour le monde, Bienvenue");
        let transport = picky_server();
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);

        let result = minimize(&probe, &browser_headers()).unwrap();

        for header in &result.removable {
            assert!(base.threshold().accepts(header.result.similarity));
            assert!(!header.result.is_anomaly);
        }
        for record in result.anomalies.iter() {
            assert!(record.result.is_anomaly);
        }
    }

    #[test]
    fn test_all_load_bearing() {
        let base = baseline("full");
        // Any missing header changes the body
        let transport = ScriptedTransport::new(|_, headers| {
            Ok(response(200, &format!("partial {}", headers.len())))
        });
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);
        let headers = browser_headers();

        let result = minimize(&probe, &headers).unwrap();

        assert!(result.all_load_bearing());
        assert_eq!(result.minimal, headers);
        assert_eq!(result.anomalies.len(), headers.len());
    }

    #[test]
    fn test_jointly_required_headers_both_reported_removable() {
        // Either Cookie or X-Requested-With is enough; removing one at a time
        // never changes the response
        let base = baseline("Hello World");
        let transport = ScriptedTransport::new(|_, headers| {
            if headers.contains("cookie") || headers.contains("x-requested-with") {
                Ok(response(200, "Hello World"))
            } else {
                Ok(response(401, "Login"))
            }
        });
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);

        let result = minimize(&probe, &browser_headers()).unwrap();

        let removable = result.removable_names();
        assert!(removable.contains(&"Cookie"));
        assert!(removable.contains(&"X-Requested-With"));
    }

    #[test]
    fn test_transport_failure_stops_minimization() {
        let base = baseline("Hello World");
        let transport = ScriptedTransport::new(|i, _| {
            if i == 2 {
                Err(crate::error::AnalyzerError::transport("https://example.test/page", "timed out"))
            } else {
                Ok(response(200, "Hello World"))
            }
        });
        let (ep, expected) = (endpoint(), ExpectedText::default());
        let probe = EquivalenceProbe::new(&transport, &ep, &base, &expected);

        assert!(minimize(&probe, &browser_headers()).is_err());
        assert_eq!(transport.calls(), 3);
    }
}
