//! Notification delivery errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Send failed: {0}")]
    SendFailed(String),
}
