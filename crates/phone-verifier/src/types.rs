//! Verification types and phone-number input handling.

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Terminal classification of a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Registered,
    Unregistered,
}

impl Presence {
    pub fn from_exists(exists: bool) -> Self {
        if exists {
            Presence::Registered
        } else {
            Presence::Unregistered
        }
    }
}

/// Body returned by the existence-check endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// Settings for `HttpVerifier`.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Existence-check endpoint.
    pub endpoint: String,
    /// Query parameter carrying the phone number.
    pub query_param: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent as both `Origin` and `Referer` when set.
    pub origin: Option<String>,
}

impl VerifierSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query_param: "phone".into(),
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.into(),
            origin: None,
        }
    }
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Normalize one input line to digits only.
///
/// Leading `+` and all spaces are stripped. Returns `None` when anything
/// other than digits remains.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ' ')
        .collect();

    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Parse newline-separated phone numbers, keeping input order.
///
/// Lines that do not normalize are dropped, as are repeats of a number
/// already seen.
pub fn parse_phone_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(normalize_phone)
        .filter(|phone| seen.insert(phone.clone()))
        .collect()
}
