//! Delivery seam towards the requester.

use crate::error::NotifyError;
use async_trait::async_trait;
use std::path::Path;

/// Sink for everything a verification run tells its requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), NotifyError>;

    /// Upload a file, optionally with a caption.
    async fn send_document(
        &self,
        destination: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), NotifyError>;

    /// Publish a progress update. Sinks that can edit a pinned status
    /// message override this; the default sends a new message.
    async fn send_status(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        self.send_text(destination, text).await
    }
}
