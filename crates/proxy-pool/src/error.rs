//! Proxy pool errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("No proxies configured")]
    Empty,

    #[error("Invalid proxy: {0}")]
    InvalidProxy(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
