//! Captured Request Parsing
//!
//! Reads a request copied from the browser developer tools.
//!
//! # Formats
//! - "Copy as Node.js fetch": `fetch("<url>", { "headers": {...}, "body": null, "method": "GET" });`
//! - Plain JSON: `{ "url": "...", "method": "...", "headers": {...}, "body": ... }`
//!
//! Header order from the file is kept.


use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::constants::USER_AGENT_HEADER;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logic::headers::HeaderSet;
use crate::transport::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    pub endpoint: Endpoint,
    pub headers: HeaderSet,
}

impl CapturedRequest {
    pub fn load(path: &Path) -> AnalyzerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalyzerError::Capture(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> AnalyzerResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AnalyzerError::Capture("file is empty".to_string()));
        }

        if trimmed.starts_with('{') {
            parse_json(trimmed)
        } else {
            parse_fetch(trimmed)
        }
    }

    pub fn has_user_agent(&self) -> bool {
        self.headers.contains(USER_AGENT_HEADER)
    }

    /// Add `user_agent` when the capture has none.
    /// Returns the injected value.
    pub fn ensure_user_agent(&mut self, user_agent: &str) -> Option<String> {
        if self.has_user_agent() {
            return None;
        }
        self.headers.insert(USER_AGENT_HEADER, user_agent);
        Some(user_agent.to_string())
    }
}

// ============================================================================
// FORMATS
// ============================================================================

/// `fetch("<url>"[, {<init>}]);` with an optional leading `await`
static FETCH_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^(?:await\s+)?fetch\s*\(\s*(?P<url>"(?:[^"\\]|\\.)*")\s*(?:,\s*(?P<init>\{.*\}))?\s*\)\s*;?$"#)
        .expect("fetch call regex")
});

#[derive(Debug, Default, Deserialize)]
struct FetchInit {
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonCapture {
    url: String,
    #[serde(flatten)]
    init: FetchInit,
}

fn parse_fetch(text: &str) -> AnalyzerResult<CapturedRequest> {
    let caps = FETCH_CALL
        .captures(text)
        .ok_or_else(|| AnalyzerError::Capture("expected fetch(\"<url>\", {...}) call".to_string()))?;

    let url: String = serde_json::from_str(&caps["url"])
        .map_err(|e| AnalyzerError::Capture(format!("bad url literal: {}", e)))?;

    let init = match caps.name("init") {
        Some(init) => serde_json::from_str::<FetchInit>(init.as_str())
            .map_err(|e| AnalyzerError::Capture(format!("bad fetch options: {}", e)))?,
        None => FetchInit::default(),
    };

    build(url, init)
}

fn parse_json(text: &str) -> AnalyzerResult<CapturedRequest> {
    let capture: JsonCapture = serde_json::from_str(text)
        .map_err(|e| AnalyzerError::Capture(format!("bad json capture: {}", e)))?;
    build(capture.url, capture.init)
}

fn build(url: String, init: FetchInit) -> AnalyzerResult<CapturedRequest> {
    if url.trim().is_empty() {
        return Err(AnalyzerError::Capture("url is empty".to_string()));
    }

    let method = init.method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("GET")
        .to_uppercase();
    if !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AnalyzerError::Capture(format!("unsupported method {:?}", method)));
    }

    let mut headers = HeaderSet::new();
    for (name, value) in &init.headers {
        headers.insert(name, &value_text(value));
    }

    let body = match init.body {
        None | Some(Value::Null) => None,
        Some(value) => Some(value_text(&value)),
    };

    Ok(CapturedRequest {
        endpoint: Endpoint { url, method, body },
        headers,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
