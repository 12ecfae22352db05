//! Response persistence
//!
//! Bodies are written next to the capture file as `<capture>_<suffix>.txt`
//! so they can be diffed by hand: `ref`, `invalid`, `hdr_<header>` and
//! `ua_<label>`. The prefixes keep header names out of the other slots.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AnalyzerResult;
use crate::logic::analyzer::{AnalysisReport, Outcome};
use crate::logic::snapshot::Snapshot;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("file name regex"));

/// Replace anything outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

pub struct BodyWriter {
    dir: PathBuf,
    stem: String,
}

impl BodyWriter {
    pub fn for_capture(capture_path: &Path, output_dir: Option<&Path>) -> Self {
        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| capture_path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = capture_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture".to_string());

        Self { dir, stem }
    }

    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", self.stem, sanitize(suffix)))
    }

    pub fn save(&self, suffix: &str, snapshot: &Snapshot) -> AnalyzerResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(suffix);
        fs::write(&path, snapshot.body())?;
        log::debug!("Saved {} ({} chars)", path.display(), snapshot.len());
        Ok(path)
    }

    /// Reference (or rejected reference) plus every anomalous response
    pub fn save_report(&self, report: &AnalysisReport) -> AnalyzerResult<Vec<PathBuf>> {
        if report.outcome == Outcome::ReferenceRejected {
            return Ok(vec![self.save("invalid", &report.reference)?]);
        }

        let mut saved = vec![self.save("ref", &report.reference)?];

        if let Some(anomalies) = report.header_anomalies() {
            for record in anomalies.iter() {
                let suffix = format!("hdr_{}", record.dimension.name());
                saved.push(self.save(&suffix, &record.result.snapshot)?);
            }
        }

        if let Some(anomalies) = report.identity_anomalies() {
            for record in anomalies.iter() {
                let suffix = format!("ua_{}", record.dimension.name());
                saved.push(self.save(&suffix, &record.result.snapshot)?);
            }
        }

        Ok(saved)
    }
}

/// Write the whole report as pretty JSON
pub fn write_json(report: &AnalysisReport, path: &Path) -> AnalyzerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(report)?;
    fs::write(path, json)?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
