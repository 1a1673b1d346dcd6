//! Rotating proxy pool.

use crate::entry::{parse_lines, LoadReport, ProxyEntry};
use crate::error::PoolError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// A proxy handed out by the pool, with the rotation bucket it came from.
#[derive(Debug, Clone)]
pub struct Selection {
    pub index: usize,
    pub proxy: ProxyEntry,
}

struct PoolState {
    entries: Vec<ProxyEntry>,
    /// Fresh attempts issued since the last replace.
    attempts: u64,
}

impl PoolState {
    fn select(&self, counter: u64, uses_per_proxy: u64) -> Result<Selection, PoolError> {
        if self.entries.is_empty() {
            return Err(PoolError::Empty);
        }
        let index = bucket(counter, uses_per_proxy, self.entries.len());
        Ok(Selection {
            index,
            proxy: self.entries[index].clone(),
        })
    }
}

/// Rotation bucket for an attempt counter value.
fn bucket(counter: u64, uses_per_proxy: u64, len: usize) -> usize {
    ((counter / uses_per_proxy) % len as u64) as usize
}

/// Ordered proxy list with a shared rotation counter.
///
/// The n-th fresh attempt (counting from zero) is served by proxy
/// `floor(n / uses_per_proxy) mod len`. The list and the counter live behind
/// one lock, so `replace` swaps both together and no caller ever indexes the
/// new list with the old counter.
#[derive(Clone)]
pub struct ProxyPool {
    state: Arc<Mutex<PoolState>>,
    uses_per_proxy: u64,
}

impl ProxyPool {
    /// Create a pool. `uses_per_proxy` below 1 is treated as 1.
    pub fn new(entries: Vec<ProxyEntry>, uses_per_proxy: u32) -> Self {
        info!(
            "Proxy pool initialized ({} proxies, {} uses per proxy)",
            entries.len(),
            uses_per_proxy.max(1)
        );

        Self {
            state: Arc::new(Mutex::new(PoolState {
                entries,
                attempts: 0,
            })),
            uses_per_proxy: u64::from(uses_per_proxy.max(1)),
        }
    }

    /// Create a pool from proxy-list text, returning the parse report alongside.
    pub fn from_lines(text: &str, uses_per_proxy: u32) -> (Self, LoadReport) {
        let report = parse_lines(text);
        let pool = Self::new(report.entries.clone(), uses_per_proxy);
        (pool, report)
    }

    pub fn uses_per_proxy(&self) -> u64 {
        self.uses_per_proxy
    }

    /// Select the proxy for a fresh attempt and advance the counter.
    pub async fn next(&self) -> Result<Selection, PoolError> {
        let mut state = self.state.lock().await;
        let selection = state.select(state.attempts, self.uses_per_proxy)?;
        state.attempts += 1;
        debug!("Fresh attempt {} -> proxy #{}", state.attempts, selection.index);
        Ok(selection)
    }

    /// Proxy for the bucket of the most recent fresh attempt, without advancing.
    ///
    /// Retries call this. If other fresh attempts have moved the counter into
    /// the next bucket in the meantime, the retry follows it.
    pub async fn current(&self) -> Result<Selection, PoolError> {
        let state = self.state.lock().await;
        state.select(state.attempts.saturating_sub(1), self.uses_per_proxy)
    }

    /// Bucket index `current()` would serve, or `None` for an empty pool.
    pub async fn current_index(&self) -> Option<usize> {
        let state = self.state.lock().await;
        if state.entries.is_empty() {
            return None;
        }
        Some(bucket(
            state.attempts.saturating_sub(1),
            self.uses_per_proxy,
            state.entries.len(),
        ))
    }

    /// Swap in a new list and reset the counter. Returns the previous size.
    #[instrument(skip(self, entries), fields(new_len = entries.len()))]
    pub async fn replace(&self, entries: Vec<ProxyEntry>) -> usize {
        let mut state = self.state.lock().await;
        let previous = state.entries.len();
        state.entries = entries;
        state.attempts = 0;
        info!(
            "Proxy pool replaced ({} -> {} proxies)",
            previous,
            state.entries.len()
        );
        previous
    }

    /// Remove every proxy. Returns how many were removed.
    pub async fn purge(&self) -> usize {
        self.replace(Vec::new()).await
    }

    /// Replace the list with the valid lines of `text`.
    pub async fn replace_from_lines(&self, text: &str) -> LoadReport {
        let report = parse_lines(text);
        self.replace(report.entries.clone()).await;
        report
    }

    /// Append the valid lines of `text` and reset the counter.
    #[instrument(skip(self, text))]
    pub async fn add_lines(&self, text: &str) -> LoadReport {
        let report = parse_lines(text);
        let mut state = self.state.lock().await;
        state.entries.extend(report.entries.iter().cloned());
        state.attempts = 0;
        info!(
            "Added {} proxies ({} rejected), pool size now {}",
            report.loaded(),
            report.rejected.len(),
            state.entries.len()
        );
        report
    }

    /// Re-read a proxy file and replace the list with its contents.
    pub async fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<LoadReport, PoolError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(self.replace_from_lines(&text).await)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Fresh attempts issued since the last replace.
    pub async fn attempts(&self) -> u64 {
        self.state.lock().await.attempts
    }

    /// Copy of the current list, in rotation order.
    pub async fn snapshot(&self) -> Vec<ProxyEntry> {
        self.state.lock().await.entries.clone()
    }
}
