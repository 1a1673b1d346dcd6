//! Webhook notification client.

use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::types::*;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Notifier that forwards messages and files to an HTTP webhook.
///
/// Endpoints, relative to the base URL:
/// - `POST /messages` with a JSON `SendTextRequest`
/// - `POST /status` with the same body, for progress updates
/// - `POST /documents` as multipart (`destination`, `caption`, `document`)
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    base_url: String,
}

impl WebhookNotifier {
    /// Create a new webhook notifier.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the webhook is reachable.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn post_text(&self, route: &str, destination: &str, text: &str) -> Result<(), NotifyError> {
        let request = SendTextRequest {
            destination: destination.to_string(),
            text: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, route))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Send failed: {}", msg);
            return Err(NotifyError::SendFailed(msg));
        }

        debug!("Sent {} to {}", route, destination);
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, text))]
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        self.post_text("messages", destination, text).await
    }

    #[instrument(skip(self))]
    async fn send_document(
        &self,
        destination: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.txt".into());

        let mut form = Form::new().text("destination", destination.to_string()).part(
            "document",
            Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("text/plain")?,
        );
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(format!("{}/documents", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Document upload failed: {}", msg);
            return Err(NotifyError::SendFailed(msg));
        }

        debug!("Uploaded {} to {}", path.display(), destination);
        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_status(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        self.post_text("status", destination, text).await
    }
}
