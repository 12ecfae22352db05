//! Response Snapshot
//!
//! Immutable record of one HTTP exchange: status, body and the headers that
//! produced it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::headers::HeaderSet;
use crate::transport::RawResponse;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    status: u16,
    #[serde(skip)]
    body: String,
    /// Body length in characters
    length: usize,
    /// sha256 of the body, hex encoded
    digest: String,
    headers: HeaderSet,
}

impl Snapshot {
    pub fn new(response: RawResponse, headers: HeaderSet) -> Self {
        let RawResponse { status, body } = response;
        let length = body.chars().count();
        let digest = hex::encode(Sha256::digest(body.as_bytes()));

        Self { status, body, length, digest, headers }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    #[cfg(test)]
    pub(crate) fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// First `max_chars` characters of the body
    pub fn preview(&self, max_chars: usize) -> String {
        self.body.chars().take(max_chars).collect()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.body.contains(text)
    }

    /// Byte-identical bodies
    pub fn same_body(&self, other: &Snapshot) -> bool {
        self.digest == other.digest && self.body == other.body
    }
}
