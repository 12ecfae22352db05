//! Error handling

use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    // Input errors
    #[error("invalid capture file: {0}")]
    Capture(String),

    // Network errors (fatal for the run, never retried)
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not read response body from {url}: {message}")]
    Body { url: String, message: String },

    // Validation errors
    #[error("invalid configuration: {0}")]
    Config(String),

    // Report errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalyzerError {
    pub fn transport(url: &str, message: impl ToString) -> Self {
        AnalyzerError::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// True for failures that happened on the wire
    pub fn is_network(&self) -> bool {
        matches!(self, AnalyzerError::Transport { .. } | AnalyzerError::Body { .. })
    }
}
