//! Identity Probe - User-Agent substitution
//!
//! Replaces the User-Agent with each entry of a fixed catalog (browsers,
//! mobile, legacy, crawlers, tooling clients) while every other header keeps
//! its original value, and collects the entries that change the response.
//!
//! The catalog is immutable. A per-run exclusion set drops the entry that was
//! injected as the reference User-Agent.

use std::collections::HashSet;

use serde::Serialize;

use super::headers::HeaderSet;
use super::probe::EquivalenceProbe;
use super::types::{AnomalyMap, AnomalyRecord, Dimension};
use crate::constants::{DEFAULT_USER_AGENT, USER_AGENT_HEADER};
use crate::error::AnalyzerResult;
use crate::transport::Transport;

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Browser,
    Mobile,
    Legacy,
    Crawler,
    Tool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Identity {
    pub label: &'static str,
    pub kind: IdentityKind,
    pub user_agent: &'static str,
}

const fn identity(label: &'static str, kind: IdentityKind, user_agent: &'static str) -> Identity {
    Identity { label, kind, user_agent }
}

pub const CATALOG: &[Identity] = &[
    // Desktop browsers
    identity("Chrome (macOS)", IdentityKind::Browser, DEFAULT_USER_AGENT),
    identity("Chrome (Windows)", IdentityKind::Browser,
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"),
    identity("Firefox (Windows)", IdentityKind::Browser,
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0"),
    identity("Firefox (Linux)", IdentityKind::Browser,
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0"),
    identity("Safari (macOS)", IdentityKind::Browser,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15"),
    identity("Edge (Windows)", IdentityKind::Browser,
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67"),

    // Mobile
    identity("Chrome (Android)", IdentityKind::Mobile,
        "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.82 Mobile Safari/537.36"),
    identity("Safari (iPhone)", IdentityKind::Mobile,
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Mobile/15E148 Safari/604.1"),
    identity("Samsung Internet", IdentityKind::Mobile,
        "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/24.0 Chrome/117.0.0.0 Mobile Safari/537.36"),

    // Legacy
    identity("Internet Explorer 11", IdentityKind::Legacy,
        "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko"),
    identity("Internet Explorer 6", IdentityKind::Legacy,
        "Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1; SV1)"),
    identity("Opera 12 (Presto)", IdentityKind::Legacy,
        "Opera/9.80 (Windows NT 6.1; WOW64) Presto/2.12.388 Version/12.18"),

    // Crawlers
    identity("Googlebot", IdentityKind::Crawler,
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"),
    identity("Bingbot", IdentityKind::Crawler,
        "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)"),
    identity("YandexBot", IdentityKind::Crawler,
        "Mozilla/5.0 (compatible; YandexBot/3.0; +http://yandex.com/bots)"),

    // Tooling clients
    identity("curl", IdentityKind::Tool, "curl/8.7.1"),
    identity("Wget", IdentityKind::Tool, "Wget/1.21.4"),
    identity("python-requests", IdentityKind::Tool, "python-requests/2.31.0"),
    identity("Go http client", IdentityKind::Tool, "Go-http-client/1.1"),
];

// ============================================================================
// EXCLUSIONS
// ============================================================================

/// Catalog labels skipped for one run
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    labels: HashSet<&'static str>,
}

impl Exclusions {
    /// Entries equal to the User-Agent injected as the reference condition
    pub fn for_injected(injected: Option<&str>) -> Self {
        let labels = match injected {
            Some(ua) => CATALOG.iter()
                .filter(|entry| entry.user_agent == ua)
                .map(|entry| entry.label)
                .collect(),
            None => HashSet::new(),
        };
        Self { labels }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// PROBE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IdentityReport {
    /// Labels actually probed, in catalog order
    pub probed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub anomalies: AnomalyMap,
}

pub fn probe_identities<T: Transport + ?Sized>(
    probe: &EquivalenceProbe<'_, T>,
    headers: &HeaderSet,
    catalog: &[Identity],
    exclusions: &Exclusions,
) -> AnalyzerResult<IdentityReport> {
    let mut report = IdentityReport {
        probed: Vec::new(),
        skipped: Vec::new(),
        anomalies: AnomalyMap::new(),
    };

    let pending = catalog.iter().filter(|entry| !exclusions.contains(entry.label)).count();
    log::info!("Checking {} alternate User-Agents...", pending);

    for entry in catalog {
        if exclusions.contains(entry.label) {
            log::debug!("Skipping {} (reference User-Agent)", entry.label);
            report.skipped.push(entry.label);
            continue;
        }

        let (is_anomaly, result) = probe.probe(headers.with(USER_AGENT_HEADER, entry.user_agent), entry.label)?;
        report.probed.push(entry.label);

        log::info!(
            "{} ({:?}): code={} len={} diff={}{}",
            entry.label, entry.kind, result.status, result.length, result.similarity,
            if is_anomaly { " -> different" } else { "" }
        );

        if is_anomaly {
            report.anomalies.push(AnomalyRecord {
                dimension: Dimension::Identity(entry.label.to_string()),
                result,
            });
        }
    }

    Ok(report)
}
