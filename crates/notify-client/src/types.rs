//! Webhook payload types.

use serde::Serialize;

/// Text message for a requester.
#[derive(Debug, Clone, Serialize)]
pub struct SendTextRequest {
    pub destination: String,
    pub text: String,
}
