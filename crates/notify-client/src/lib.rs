//! Requester-facing notification delivery.

mod client;
mod error;
mod notifier;
mod types;

pub use client::WebhookNotifier;
pub use error::NotifyError;
pub use notifier::Notifier;
pub use types::*;
