//! Periodic progress updates for a running session.

use notify_client::{Notifier, NotifyError};
use proxy_pool::ProxyPool;
use session_store::{SessionRegistry, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Polls a session's tallies and publishes a status line.
///
/// Updates are best effort: a failed render or send is logged at debug
/// level and the next tick simply tries again.
pub struct StatusReporter {
    sessions: SessionRegistry,
    pool: ProxyPool,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(
        sessions: SessionRegistry,
        pool: ProxyPool,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            sessions,
            pool,
            notifier,
            interval,
        }
    }

    /// Run until `done` flips to true or its sender is dropped.
    pub fn spawn(
        self,
        session_id: String,
        destination: String,
        total: usize,
        mut done: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let started = Instant::now();
            loop {
                tokio::select! {
                    _ = sleep(self.interval) => {
                        if let Err(e) = self
                            .report_once(&session_id, &destination, total, started.elapsed())
                            .await
                        {
                            debug!("Status update for {} skipped: {}", session_id, e);
                        }
                    }
                    changed = done.changed() => {
                        if changed.is_err() || *done.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn report_once(
        &self,
        session_id: &str,
        destination: &str,
        total: usize,
        elapsed: Duration,
    ) -> Result<(), NotifyError> {
        let Some(snapshot) = self.sessions.snapshot(session_id).await else {
            return Ok(());
        };
        let bucket = self.pool.current_index().await;
        let pool_size = self.pool.len().await;

        let text = render_status(&snapshot, total, elapsed, bucket, pool_size);
        self.notifier.send_status(destination, &text).await
    }
}

/// Numbers processed per second.
pub fn throughput(processed: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        processed as f64 / secs
    } else {
        0.0
    }
}

/// Render a progress update.
pub fn render_status(
    snapshot: &SessionSnapshot,
    total: usize,
    elapsed: Duration,
    bucket: Option<usize>,
    pool_size: usize,
) -> String {
    let processed = snapshot.processed();
    let percent = if total > 0 {
        processed * 100 / total
    } else {
        100
    };
    let proxy = match bucket {
        Some(index) => format!("#{} of {}", index + 1, pool_size),
        None => "none".into(),
    };

    format!(
        "🔄 Progress: {}/{} ({}%)\n\
         ✅ Registered: {}\n\
         ❌ Unregistered: {}\n\
         ⚠️ Unresolved: {}\n\
         ⚡ Speed: {:.2} numbers/s\n\
         🌐 Proxy: {}",
        processed,
        total,
        percent,
        snapshot.registered,
        snapshot.unregistered,
        snapshot.unresolved,
        throughput(processed, elapsed),
        proxy
    )
}
