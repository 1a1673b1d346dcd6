//! Bounded-retry verification of a single phone number.

use crate::error::CheckError;
use crate::output::OutputSender;
use crate::stop::StopSignal;
use phone_verifier::{PhoneLookup, Presence};
use proxy_pool::ProxyPool;
use session_store::{CheckOutcome, SessionError, SessionRegistry};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Identifies one verification run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session_id: String,
    /// Where notifications for this run are delivered.
    pub destination: String,
    pub stop: StopSignal,
}

impl RunContext {
    pub fn new(session_id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            destination: destination.into(),
            stop: StopSignal::new(),
        }
    }
}

/// Runs the lookup for one number until it classifies, the retry cap is
/// hit, or the run is stopped.
///
/// Retries have no backoff: each one goes back to the pool's current bucket
/// right away, since proxies are plentiful and a failed attempt says more
/// about the proxy than about the target API.
#[derive(Clone)]
pub struct RetryingChecker {
    pool: ProxyPool,
    lookup: Arc<dyn PhoneLookup>,
    sessions: SessionRegistry,
    output: OutputSender,
    max_retries: u32,
}

impl RetryingChecker {
    /// Create a checker. `max_retries` below 1 is treated as 1.
    pub fn new(
        pool: ProxyPool,
        lookup: Arc<dyn PhoneLookup>,
        sessions: SessionRegistry,
        output: OutputSender,
        max_retries: u32,
    ) -> Self {
        Self {
            pool,
            lookup,
            sessions,
            output,
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Check one number and record its outcome in the run's session.
    ///
    /// `Unresolved` is returned (and recorded) when the retry cap runs out.
    /// Errors mean the number produced no outcome at all.
    #[instrument(skip(self, ctx), fields(session = %ctx.session_id))]
    pub async fn check(&self, ctx: &RunContext, phone: &str) -> Result<CheckOutcome, CheckError> {
        if ctx.stop.is_raised() {
            return Err(CheckError::Cancelled);
        }

        let mut selection = self.pool.next().await?;

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                if ctx.stop.is_raised() {
                    debug!("Stop observed before attempt {}", attempt);
                    return Err(CheckError::Cancelled);
                }
                selection = self.pool.current().await?;
            }

            match self.lookup.lookup(phone, &selection.proxy).await {
                Ok(presence) => {
                    let outcome = match presence {
                        Presence::Registered => CheckOutcome::Registered,
                        Presence::Unregistered => CheckOutcome::Unregistered,
                    };
                    debug!(
                        "Classified as {} on attempt {} via proxy #{}",
                        outcome.label(),
                        attempt,
                        selection.index
                    );
                    self.publish(ctx, phone, outcome).await;
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() => {
                    debug!(
                        "Attempt {}/{} via proxy #{} ({}) failed: {}",
                        attempt, self.max_retries, selection.index, selection.proxy, e
                    );
                }
                Err(e) => {
                    warn!("Giving up after non-retryable error: {}", e);
                    break;
                }
            }
        }

        warn!("No classification for {} after {} attempts", phone, self.max_retries);
        self.publish(ctx, phone, CheckOutcome::Unresolved).await;
        Ok(CheckOutcome::Unresolved)
    }

    /// Record the outcome and, for terminal classifications, notify the
    /// requester. Nothing is sent if the number was already recorded.
    async fn publish(&self, ctx: &RunContext, phone: &str, outcome: CheckOutcome) {
        match self.sessions.record(&ctx.session_id, phone, outcome).await {
            Ok(true) => {
                if outcome != CheckOutcome::Unresolved {
                    self.output.send(&ctx.destination, render_outcome(phone, outcome));
                }
            }
            Ok(false) => debug!("{} already recorded, not notifying again", phone),
            Err(SessionError::NotFound(id)) => {
                warn!("Session {} closed before {} was recorded", id, phone)
            }
            Err(e) => warn!("Failed to record {}: {}", phone, e),
        }
    }
}

/// Real-time notification text for one classified number.
pub fn render_outcome(phone: &str, outcome: CheckOutcome) -> String {
    match outcome {
        CheckOutcome::Registered => format!("✅ +{} is registered", phone),
        CheckOutcome::Unregistered => format!("❌ +{} is not registered", phone),
        CheckOutcome::Unresolved => format!("⚠️ +{} could not be checked", phone),
    }
}
