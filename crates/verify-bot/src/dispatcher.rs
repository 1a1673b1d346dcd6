//! Batch dispatch of verification runs.

use crate::checker::{RetryingChecker, RunContext};
use crate::error::{CheckError, DispatchError};
use crate::status::StatusReporter;
use futures::future::join_all;
use notify_client::Notifier;
use proxy_pool::ProxyPool;
use session_store::{SessionRecord, SessionRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Numbers checked concurrently per batch (values below 1 are treated as 1).
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
    /// How often the status reporter publishes progress.
    pub status_interval: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(2),
            status_interval: Duration::from_secs(5),
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Running,
    /// Halted early by the stop signal or an emptied pool.
    Stopped,
    Completed,
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session_id: String,
    pub state: DispatchState,
    /// Numbers submitted for the run.
    pub total: usize,
    /// Size of every batch that was started, in order.
    pub batch_sizes: Vec<usize>,
    /// Inter-batch delays taken.
    pub delays: usize,
    pub elapsed: Duration,
    /// Set when the pool was emptied mid-run.
    pub pool_exhausted: bool,
    pub record: SessionRecord,
}

impl RunReport {
    /// Numbers that never reached an outcome.
    pub fn unchecked(&self) -> usize {
        self.total.saturating_sub(self.record.processed())
    }
}

/// Splits a run into fixed-size batches and checks each batch concurrently.
///
/// Batches are strictly sequential: every check of batch N finishes before
/// batch N+1 starts.
pub struct BatchDispatcher {
    checker: RetryingChecker,
    sessions: SessionRegistry,
    pool: ProxyPool,
    notifier: Arc<dyn Notifier>,
    settings: DispatchSettings,
}

impl BatchDispatcher {
    pub fn new(
        checker: RetryingChecker,
        sessions: SessionRegistry,
        pool: ProxyPool,
        notifier: Arc<dyn Notifier>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            checker,
            sessions,
            pool,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Verify `phones` for one session.
    ///
    /// The session is opened here and closed before returning, whether the
    /// run completes or is stopped; its final record is in the report.
    #[instrument(skip(self, ctx, phones), fields(session = %ctx.session_id, total = phones.len()))]
    pub async fn run(&self, ctx: &RunContext, phones: Vec<String>) -> Result<RunReport, DispatchError> {
        if self.pool.is_empty().await {
            error!("Cannot start run: proxy pool is empty");
            return Err(DispatchError::PoolEmpty);
        }
        self.sessions.open(&ctx.session_id).await?;

        let started = Instant::now();
        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<&[String]> = phones.chunks(batch_size).collect();

        let mut state = DispatchState::Idle;
        transition(&mut state, DispatchState::Running);
        info!(
            "Checking {} numbers in {} batches of up to {}",
            phones.len(),
            batches.len(),
            batch_size
        );

        let (done_tx, done_rx) = watch::channel(false);
        let reporter = StatusReporter::new(
            self.sessions.clone(),
            self.pool.clone(),
            self.notifier.clone(),
            self.settings.status_interval,
        )
        .spawn(
            ctx.session_id.clone(),
            ctx.destination.clone(),
            phones.len(),
            done_rx,
        );

        let mut batch_sizes = Vec::with_capacity(batches.len());
        let mut delays = 0;
        let mut pool_exhausted = false;

        for (index, batch) in batches.iter().enumerate() {
            if ctx.stop.is_raised() {
                info!("Stop requested, not starting batch {}", index + 1);
                transition(&mut state, DispatchState::Stopped);
                break;
            }

            debug!("Starting batch {}/{} ({} numbers)", index + 1, batches.len(), batch.len());
            batch_sizes.push(batch.len());

            let results = join_all(batch.iter().map(|phone| self.checker.check(ctx, phone))).await;

            let mut cancelled = 0;
            for result in results {
                match result {
                    Ok(_) => {}
                    Err(CheckError::Cancelled) => cancelled += 1,
                    Err(CheckError::PoolEmpty) => pool_exhausted = true,
                    Err(CheckError::Pool(e)) => {
                        warn!("Proxy pool error: {}", e);
                        pool_exhausted = true;
                    }
                }
            }

            if pool_exhausted {
                error!("Proxy pool emptied during batch {}, halting run", index + 1);
                transition(&mut state, DispatchState::Stopped);
                break;
            }
            let more_batches = index + 1 < batches.len();
            if cancelled > 0 || (more_batches && ctx.stop.is_raised()) {
                info!("Stop observed during batch {} ({} numbers dropped)", index + 1, cancelled);
                transition(&mut state, DispatchState::Stopped);
                break;
            }

            if more_batches {
                sleep(self.settings.batch_delay).await;
                delays += 1;
            }
        }

        if state == DispatchState::Running {
            transition(&mut state, DispatchState::Completed);
        }

        let _ = done_tx.send(true);
        if let Err(e) = reporter.await {
            debug!("Status reporter ended abnormally: {}", e);
        }

        let record = self
            .sessions
            .close(&ctx.session_id)
            .await
            .unwrap_or_else(|| SessionRecord::new(ctx.session_id.as_str()));

        let report = RunReport {
            session_id: ctx.session_id.clone(),
            state,
            total: phones.len(),
            batch_sizes,
            delays,
            elapsed: started.elapsed(),
            pool_exhausted,
            record,
        };

        info!(
            "Run {:?}: {} registered, {} unregistered, {} unresolved, {} unchecked in {:?}",
            report.state,
            report.record.registered.len(),
            report.record.unregistered.len(),
            report.record.unresolved.len(),
            report.unchecked(),
            report.elapsed
        );

        Ok(report)
    }
}

fn transition(state: &mut DispatchState, next: DispatchState) {
    debug!("Dispatch state {:?} -> {:?}", state, next);
    *state = next;
}
