//! Application configuration loaded from environment variables.

use crate::dispatcher::DispatchSettings;
use crate::export::ExportSettings;
use anyhow::{Context, Result};
use phone_verifier::{VerifierSettings, DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Proxy pool configuration
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Existence-check API configuration
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Batch dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Notification pacing and export configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Notification webhook
    pub notifier: NotifierConfig,

    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy list, one per line
    #[serde(default = "default_proxy_file")]
    pub file: PathBuf,

    /// Fresh attempts served by each proxy before rotating
    #[serde(default = "default_uses_per_proxy")]
    pub uses_per_proxy: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    /// Existence-check endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Query parameter carrying the phone number
    #[serde(default = "default_query_param")]
    pub query_param: String,

    /// Per-attempt timeout
    #[serde(default = "default_verifier_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Sent as Origin and Referer when set
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Numbers checked concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches
    #[serde(default = "default_batch_delay", with = "humantime_serde")]
    pub batch_delay: Duration,

    /// Attempts per number before it is marked unresolved
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Progress update interval
    #[serde(default = "default_status_interval", with = "humantime_serde")]
    pub status_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Minimum spacing between real-time notifications
    #[serde(default = "default_spacing", with = "humantime_serde")]
    pub spacing: Duration,

    /// Directory for transient result files
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Also export numbers that exhausted their retries
    #[serde(default = "default_true")]
    pub export_unresolved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Webhook base URL
    pub url: String,

    /// Requester identifier; also used as the session id
    pub destination: String,

    /// Request timeout
    #[serde(default = "default_notifier_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Phone numbers to verify, one per line
    #[serde(default = "default_phones_file")]
    pub phones_file: PathBuf,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default implementations
impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            file: default_proxy_file(),
            uses_per_proxy: default_uses_per_proxy(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            query_param: default_query_param(),
            timeout: default_verifier_timeout(),
            user_agent: default_user_agent(),
            origin: None,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay: default_batch_delay(),
            max_retries: default_max_retries(),
            status_interval: default_status_interval(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            spacing: default_spacing(),
            export_dir: default_export_dir(),
            export_unresolved: default_true(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            phones_file: default_phones_file(),
            log_level: default_log_level(),
        }
    }
}

impl VerifierConfig {
    pub fn settings(&self) -> VerifierSettings {
        VerifierSettings {
            endpoint: self.endpoint.clone(),
            query_param: self.query_param.clone(),
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            origin: self.origin.clone(),
        }
    }
}

impl DispatchConfig {
    pub fn settings(&self) -> DispatchSettings {
        DispatchSettings {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay,
            status_interval: self.status_interval,
        }
    }
}

impl OutputConfig {
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            dir: self.export_dir.clone(),
            include_unresolved: self.export_unresolved,
        }
    }
}

// Default value functions
fn default_proxy_file() -> PathBuf {
    "proxies.txt".into()
}

fn default_uses_per_proxy() -> u32 {
    5
}

fn default_endpoint() -> String {
    "https://api.example.invalid/v1/phone/exists".into()
}

fn default_query_param() -> String {
    "phone".into()
}

fn default_verifier_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_retries() -> u32 {
    30
}

fn default_status_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_spacing() -> Duration {
    Duration::from_millis(500)
}

fn default_export_dir() -> PathBuf {
    "exports".into()
}

fn default_notifier_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_phones_file() -> PathBuf {
    "phones.txt".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Keep phone-like destinations such as +15551234567 as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
