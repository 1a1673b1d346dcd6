//! Session storage errors.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} already has a run in progress")]
    AlreadyRunning(String),

    #[error("No active session {0}")]
    NotFound(String),
}
