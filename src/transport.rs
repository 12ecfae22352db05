//! Transport - issues the actual HTTP requests
//!
//! The analysis engine only needs `send(endpoint, headers) -> {status, body}`.
//! `UreqTransport` is the blocking production implementation; tests plug in
//! scripted doubles.

use std::time::Duration;

use serde::Serialize;

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logic::headers::HeaderSet;

/// The fixed part of a captured request: everything except headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
}

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// Issue exactly one request. Error statuses (4xx/5xx) are responses,
    /// not failures.
    fn send(&self, endpoint: &Endpoint, headers: &HeaderSet) -> AnalyzerResult<RawResponse>;
}

// ============================================================================
// UREQ TRANSPORT
// ============================================================================

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration, max_redirects: u32) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(max_redirects)
            .build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, endpoint: &Endpoint, headers: &HeaderSet) -> AnalyzerResult<RawResponse> {
        let mut request = self.agent.request(&endpoint.method, &endpoint.url);
        for (name, value) in headers.iter() {
            request = request.set(name, value);
        }

        let result = match &endpoint.body {
            Some(body) => request.send_string(body),
            None => request.call(),
        };

        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                let status = response.status();
                let body = response.into_string()
                    .map_err(|e| AnalyzerError::Body {
                        url: endpoint.url.clone(),
                        message: e.to_string(),
                    })?;

                log::trace!("{} {} -> {} ({} bytes)", endpoint.method, endpoint.url, status, body.len());
                Ok(RawResponse { status, body })
            }
            Err(ureq::Error::Transport(e)) => Err(AnalyzerError::transport(&endpoint.url, e)),
        }
    }
}
