//! Rotating proxy pool for outbound verification traffic.
//!
//! Proxies are handed out in buckets: every proxy serves a fixed number of
//! fresh attempts before the pool moves on to the next one.

mod entry;
mod error;
mod pool;

pub use entry::{parse_lines, LoadReport, ProxyEntry, RejectedLine};
pub use error::PoolError;
pub use pool::{ProxyPool, Selection};
