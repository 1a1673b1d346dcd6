//! Paced delivery of real-time notifications.

use notify_client::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// A rendered notification for one requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMessage {
    pub destination: String,
    pub text: String,
}

/// Producer handle. Enqueueing never blocks.
#[derive(Clone)]
pub struct OutputSender {
    tx: mpsc::UnboundedSender<OutputMessage>,
}

impl OutputSender {
    /// Enqueue a message. Returns false if the consumer has already shut down.
    pub fn send(&self, destination: impl Into<String>, text: impl Into<String>) -> bool {
        let message = OutputMessage {
            destination: destination.into(),
            text: text.into(),
        };

        match self.tx.send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!("Output queue closed, dropping message for {}", e.0.destination);
                false
            }
        }
    }
}

/// Single consumer that delivers queued messages at a minimum spacing.
///
/// The consumer runs until every `OutputSender` has been dropped and the
/// queue is drained.
pub struct OutputQueue {
    handle: JoinHandle<usize>,
}

impl OutputQueue {
    /// Start the consumer task.
    pub fn spawn(notifier: Arc<dyn Notifier>, spacing: Duration) -> (OutputSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::consume(rx, notifier, spacing));

        (OutputSender { tx }, Self { handle })
    }

    async fn consume(
        rx: mpsc::UnboundedReceiver<OutputMessage>,
        notifier: Arc<dyn Notifier>,
        spacing: Duration,
    ) -> usize {
        let stream = UnboundedReceiverStream::new(rx).throttle(spacing);
        tokio::pin!(stream);

        let mut delivered = 0;
        while let Some(message) = stream.next().await {
            match notifier.send_text(&message.destination, &message.text).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to deliver notification to {}: {}", message.destination, e),
            }
        }

        info!("Output queue drained ({} delivered)", delivered);
        delivered
    }

    /// Wait for the consumer to drain. Returns the number of messages delivered.
    pub async fn shutdown(self) -> usize {
        match self.handle.await {
            Ok(delivered) => delivered,
            Err(e) => {
                error!("Output queue task failed: {}", e);
                0
            }
        }
    }
}
