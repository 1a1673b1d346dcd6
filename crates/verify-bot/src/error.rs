//! Application error types.

use proxy_pool::PoolError;
use session_store::SessionError;
use thiserror::Error;

/// Why a single number's check ended without an outcome.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("No proxies configured")]
    PoolEmpty,

    #[error("Stop requested")]
    Cancelled,

    #[error("Proxy pool error: {0}")]
    Pool(PoolError),
}

impl From<PoolError> for CheckError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Empty => CheckError::PoolEmpty,
            other => CheckError::Pool(other),
        }
    }
}

/// Errors that prevent a batch run from starting.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No proxies configured")]
    PoolEmpty,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Proxy pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Verifier error: {0}")]
    Verify(#[from] phone_verifier::VerifyError),

    #[error("Notifier error: {0}")]
    Notify(#[from] notify_client::NotifyError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;
