//! Session record types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Final result for one phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Registered,
    Unregistered,
    /// Retry budget exhausted without a terminal classification.
    Unresolved,
}

impl CheckOutcome {
    /// Short lowercase label, also used in export file names.
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Registered => "registered",
            CheckOutcome::Unregistered => "unregistered",
            CheckOutcome::Unresolved => "unresolved",
        }
    }
}

/// Tallies for one verification run.
///
/// A number lands in at most one bucket, at most once.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub registered: Vec<String>,
    pub unregistered: Vec<String>,
    pub unresolved: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            registered: Vec::new(),
            unregistered: Vec::new(),
            unresolved: Vec::new(),
            started_at: Utc::now(),
            seen: HashSet::new(),
        }
    }

    /// Record an outcome. Returns false if the number was already recorded.
    pub fn record(&mut self, phone: &str, outcome: CheckOutcome) -> bool {
        if !self.seen.insert(phone.to_string()) {
            return false;
        }

        let bucket = match outcome {
            CheckOutcome::Registered => &mut self.registered,
            CheckOutcome::Unregistered => &mut self.unregistered,
            CheckOutcome::Unresolved => &mut self.unresolved,
        };
        bucket.push(phone.to_string());
        true
    }

    pub fn numbers(&self, outcome: CheckOutcome) -> &[String] {
        match outcome {
            CheckOutcome::Registered => &self.registered,
            CheckOutcome::Unregistered => &self.unregistered,
            CheckOutcome::Unresolved => &self.unresolved,
        }
    }

    /// Numbers that reached any final outcome.
    pub fn processed(&self) -> usize {
        self.registered.len() + self.unregistered.len() + self.unresolved.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            registered: self.registered.len(),
            unregistered: self.unregistered.len(),
            unresolved: self.unresolved.len(),
            started_at: self.started_at,
        }
    }
}

/// Point-in-time counts for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub registered: usize,
    pub unregistered: usize,
    pub unresolved: usize,
    pub started_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn processed(&self) -> usize {
        self.registered + self.unregistered + self.unresolved
    }
}
