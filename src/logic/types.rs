//! Probe Types
//!
//! Records produced by the equivalence probe and collected by the minimizer
//! and the identity probe.

use serde::Serialize;

use super::snapshot::Snapshot;

// ============================================================================
// THRESHOLD
// ============================================================================

/// Minimum similarity observed among repeated reference requests.
/// Computed once per run by the baseline, read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    pub(crate) fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// True when `score` clears the bar
    pub fn accepts(self, score: f64) -> bool {
        score >= self.0
    }

    /// Zero observed jitter: any deviation is an anomaly
    pub fn is_strict(self) -> bool {
        self.0 >= 1.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

// ============================================================================
// PROBE RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub snapshot: Snapshot,
    pub similarity: f64,
    pub status: u16,
    pub reference_status: u16,
    pub length: usize,
    /// `None` when no expected text is configured
    pub text_present: Option<bool>,
    pub is_anomaly: bool,
}

impl ProbeResult {
    /// Status code differs from the reference response
    pub fn status_diverged(&self) -> bool {
        self.status != self.reference_status
    }

    pub fn text_missing(&self) -> bool {
        self.text_present == Some(false)
    }
}

// ============================================================================
// ANOMALY RECORDS
// ============================================================================

/// Which dimension of the request was varied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Dimension {
    /// Header removed from the full set
    Header(String),
    /// User-Agent replaced by a catalog entry
    Identity(String),
}

impl Dimension {
    pub fn name(&self) -> &str {
        match self {
            Dimension::Header(name) | Dimension::Identity(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub dimension: Dimension,
    pub result: ProbeResult,
}

/// Anomalies keyed by dimension name, in probing order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AnomalyMap {
    records: Vec<AnomalyRecord>,
}

impl AnomalyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: AnomalyRecord) {
        self.records.push(record);
    }

    /// Lookup by header name (case-insensitive) or identity label
    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&ProbeResult> {
        self.records.iter()
            .find(|r| match &r.dimension {
                Dimension::Header(h) => h.eq_ignore_ascii_case(name),
                Dimension::Identity(label) => label == name,
            })
            .map(|r| &r.result)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.records.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.dimension.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_accepts_equal_score() {
        let t = Threshold::new(0.875);
        assert!(t.accepts(0.875));
        assert!(t.accepts(0.9));
        assert!(!t.accepts(0.874));
        assert!(!t.is_strict());
        assert_eq!(t.to_string(), "0.875");
    }

    #[test]
    fn test_strict_threshold() {
        let t = Threshold::new(1.0);
        assert!(t.is_strict());
        assert!(!t.accepts(0.999));
        assert_eq!(t.to_string(), "1.000");
    }

    #[test]
    fn test_dimension_serialization() {
        let json = serde_json::to_string(&Dimension::Header("Cookie".into())).unwrap();
        assert_eq!(json, r#"{"kind":"header","name":"Cookie"}"#);
    }
}
