//! Scripted transport used by the engine tests

use std::cell::RefCell;

use crate::error::AnalyzerResult;
use crate::logic::headers::HeaderSet;
use crate::transport::{Endpoint, RawResponse, Transport};

type Responder = Box<dyn Fn(usize, &HeaderSet) -> AnalyzerResult<RawResponse>>;

/// Answers each request from a closure of (call index, headers sent)
pub struct ScriptedTransport {
    responder: Responder,
    sent: RefCell<Vec<HeaderSet>>,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(usize, &HeaderSet) -> AnalyzerResult<RawResponse> + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Same response for every request
    pub fn fixed(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_, _| Ok(response(status, &body)))
    }

    pub fn calls(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn sent(&self) -> Vec<HeaderSet> {
        self.sent.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, _endpoint: &Endpoint, headers: &HeaderSet) -> AnalyzerResult<RawResponse> {
        let index = self.sent.borrow().len();
        self.sent.borrow_mut().push(headers.clone());
        (self.responder)(index, headers)
    }
}

pub fn response(status: u16, body: &str) -> RawResponse {
    RawResponse { status, body: body.to_string() }
}

pub fn endpoint() -> Endpoint {
    Endpoint {
        url: "https://example.test/page".to_string(),
        method: "GET".to_string(),
        body: None,
    }
}

pub fn browser_headers() -> HeaderSet {
    [
        ("Accept", "text/html"),
        ("Accept-Language", "fr-FR,fr;q=0.9"),
        ("Cookie", "session=abc"),
        ("User-Agent", "Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0"),
        ("X-Requested-With", "XMLHttpRequest"),
    ]
    .into_iter()
    .collect()
}
