//! Verification errors.

use thiserror::Error;

/// Why a single verification attempt did not produce a classification.
///
/// Every variant except `InvalidHeader` is a per-attempt failure that the
/// caller may retry through another proxy.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unusable proxy {0}")]
    InvalidProxy(String),

    #[error("Unexpected status: {status}")]
    Status { status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl VerifyError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, VerifyError::InvalidHeader(_))
    }
}
