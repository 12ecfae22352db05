//! Report Module
//!
//! Console summary of an analysis run. Body files and the JSON export live
//! in `persist`.

pub mod persist;

use std::fmt::Write;

use crate::logic::analyzer::{AnalysisReport, Outcome};
use crate::logic::types::{AnomalyRecord, Dimension};

pub use persist::{write_json, BodyWriter};

/// Human readable summary, one finding per line
pub fn render_summary(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Request: {} {}", report.endpoint.method, report.endpoint.url);
    let _ = writeln!(
        out,
        "Reference: status={} len={} sha256={}",
        report.reference.status(),
        report.reference.len(),
        report.reference.digest().get(..12).unwrap_or_default(),
    );
    if let Some(ua) = &report.injected_user_agent {
        let _ = writeln!(out, "Injected User-Agent: {}", ua);
    }

    if report.outcome == Outcome::ReferenceRejected {
        let _ = writeln!(
            out,
            "Can't find {:?} in reference response, stopping.",
            report.expected_text.as_deref().unwrap_or_default()
        );
        return out;
    }

    if let Some(baseline) = &report.baseline {
        let _ = writeln!(
            out,
            "Threshold: {} ({}{})",
            baseline.threshold,
            baseline.strategy.name(),
            if baseline.downgraded { ", downgraded" } else { "" }
        );
    }

    if let Some(minimization) = &report.minimization {
        let removable = minimization.removable_names();
        if !removable.is_empty() {
            let _ = writeln!(out, "Removable headers: {}", removable.join(", "));
        }
    }

    if let Some(minimal) = report.minimal_headers() {
        let json = serde_json::to_string_pretty(minimal).unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(out, "Minimal headers are:\n{}", json);
    }

    if let Some(anomalies) = report.header_anomalies() {
        for record in anomalies.iter() {
            let _ = writeln!(out, "{}", describe(record, report.expected_text.as_deref()));
        }
    }

    if report.outcome == Outcome::AllLoadBearing {
        let _ = writeln!(out, "All responses are different! Every header is required.");
        return out;
    }

    match &report.identities {
        Some(identities) => {
            for record in identities.anomalies.iter() {
                let _ = writeln!(out, "{}", describe(record, report.expected_text.as_deref()));
            }
            let _ = writeln!(
                out,
                "User-Agents: {} probed, {} different",
                identities.probed.len(),
                identities.anomalies.len()
            );
            if !identities.anomalies.is_empty() {
                let _ = writeln!(out, "Different User-Agents: {}", identities.anomalies.names().join(", "));
            }
        }
        None => {
            let _ = writeln!(out, "User-Agent check skipped");
        }
    }

    if report.no_distinguishing_weight() {
        let _ = writeln!(out, "Original headers carried no distinguishing weight.");
    }

    out
}

fn describe(record: &AnomalyRecord, expected_text: Option<&str>) -> String {
    let result = &record.result;
    let subject = match &record.dimension {
        Dimension::Header(name) => format!("Response without {} header", name),
        Dimension::Identity(label) => format!("Response with {} User-Agent", label),
    };

    let mut line = format!(
        "{} is different (diff {:.3}, len {}, status {}",
        subject, result.similarity, result.length, result.status
    );
    if result.status_diverged() {
        let _ = write!(line, " vs {}", result.reference_status);
    }
    if let (Some(text), Some(_)) = (expected_text, result.text_present) {
        let _ = write!(line, ", {:?} {}", text, if result.text_missing() { "missing" } else { "found" });
    }
    line.push(')');
    line
}
