//! Common test utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use notify_client::{Notifier, NotifyError};
use phone_verifier::{PhoneLookup, Presence, VerifyError};
use proxy_pool::{ProxyEntry, ProxyPool};
use session_store::SessionRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use verify_bot::{
    BatchDispatcher, DispatchSettings, OutputQueue, RetryingChecker, StopSignal,
};

type Answer = Box<dyn Fn(&str) -> Result<Presence, VerifyError> + Send + Sync>;

/// Lookup whose answers come from a closure, with optional latency and
/// hooks that fire on the very first call.
pub struct ScriptedLookup {
    answer: Answer,
    latency: Duration,
    stop_after_first: Option<StopSignal>,
    purge_on_first: Option<ProxyPool>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedLookup {
    pub fn new(
        answer: impl Fn(&str) -> Result<Presence, VerifyError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            answer: Box::new(answer),
            latency: Duration::ZERO,
            stop_after_first: None,
            purge_on_first: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(presence: Presence) -> Self {
        Self::new(move |_| Ok(presence))
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(VerifyError::Status { status: 503 }))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Raise `stop` once the first lookup has finished waiting.
    pub fn raise_stop_after_first(mut self, stop: StopSignal) -> Self {
        self.stop_after_first = Some(stop);
        self
    }

    /// Empty `pool` during the first lookup.
    pub fn purge_on_first(mut self, pool: ProxyPool) -> Self {
        self.purge_on_first = Some(pool);
        self
    }

    pub async fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl PhoneLookup for ScriptedLookup {
    async fn lookup(&self, phone: &str, _proxy: &ProxyEntry) -> Result<Presence, VerifyError> {
        let first = {
            let mut calls = self.calls.lock().await;
            calls.push((phone.to_string(), Instant::now()));
            calls.len() == 1
        };

        if first {
            if let Some(pool) = &self.purge_on_first {
                pool.purge().await;
            }
        }
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if first {
            if let Some(stop) = &self.stop_after_first {
                stop.raise();
            }
        }

        (self.answer)(phone)
    }
}

/// Notifier that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub texts: Mutex<Vec<(String, String)>>,
    pub statuses: Mutex<Vec<(String, String)>>,
    pub documents: Mutex<Vec<(String, String, Option<String>)>>,
}

impl RecordingNotifier {
    pub async fn texts(&self) -> Vec<String> {
        self.texts.lock().await.iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        self.texts
            .lock()
            .await
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        destination: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), NotifyError> {
        let contents = tokio::fs::read_to_string(path).await?;
        self.documents.lock().await.push((
            destination.to_string(),
            contents,
            caption.map(String::from),
        ));
        Ok(())
    }

    async fn send_status(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        self.statuses
            .lock()
            .await
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

/// A pool of `n` distinct placeholder proxies.
pub fn test_pool(n: usize, uses_per_proxy: u32) -> ProxyPool {
    let entries = (0..n)
        .map(|i| ProxyEntry::parse(&format!("http://10.0.0.{}:3128", i + 1)).unwrap())
        .collect();
    ProxyPool::new(entries, uses_per_proxy)
}

/// `count` distinct phone numbers.
pub fn phones(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("1555000{:04}", i)).collect()
}

pub fn settings(batch_size: usize, batch_delay: Duration) -> DispatchSettings {
    DispatchSettings {
        batch_size,
        batch_delay,
        status_interval: Duration::from_secs(60),
    }
}

/// Everything a dispatch test needs, wired the way the binary wires it.
pub struct Harness {
    pub dispatcher: BatchDispatcher,
    pub sessions: SessionRegistry,
    pub pool: ProxyPool,
    pub notifier: Arc<RecordingNotifier>,
    queue: OutputQueue,
}

impl Harness {
    pub fn new(
        lookup: Arc<dyn PhoneLookup>,
        pool: ProxyPool,
        settings: DispatchSettings,
        max_retries: u32,
    ) -> Self {
        let sessions = SessionRegistry::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let (output, queue) = OutputQueue::spawn(notifier.clone(), Duration::ZERO);

        let checker = RetryingChecker::new(
            pool.clone(),
            lookup,
            sessions.clone(),
            output,
            max_retries,
        );
        let dispatcher = BatchDispatcher::new(
            checker,
            sessions.clone(),
            pool.clone(),
            notifier.clone(),
            settings,
        );

        Self {
            dispatcher,
            sessions,
            pool,
            notifier,
            queue,
        }
    }

    /// Drop the dispatcher and drain the output queue. Returns the number of
    /// real-time messages delivered.
    pub async fn finish(self) -> usize {
        let Harness {
            dispatcher, queue, ..
        } = self;
        drop(dispatcher);
        queue.shutdown().await
    }
}
