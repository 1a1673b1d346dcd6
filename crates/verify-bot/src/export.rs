//! Export of a finished run's tallies.

use crate::dispatcher::{DispatchState, RunReport};
use chrono::Utc;
use notify_client::Notifier;
use session_store::CheckOutcome;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Directory the transient files are written to.
    pub dir: PathBuf,
    /// Write a third file for numbers that exhausted their retries.
    pub include_unresolved: bool,
}

/// One written result file.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub outcome: CheckOutcome,
    pub path: PathBuf,
    pub count: usize,
}

/// Files and summary produced for a run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,
    pub summary: String,
}

/// Writes per-outcome number lists, delivers them, then removes them.
pub struct ResultExporter {
    settings: ExportSettings,
}

impl ResultExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    /// Write one file per non-empty outcome bucket and build the summary.
    #[instrument(skip(self, report), fields(session = %report.session_id))]
    pub async fn export(&self, report: &RunReport) -> std::io::Result<ExportReport> {
        tokio::fs::create_dir_all(&self.settings.dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let session = sanitize(&report.session_id);

        let mut outcomes = vec![CheckOutcome::Registered, CheckOutcome::Unregistered];
        if self.settings.include_unresolved {
            outcomes.push(CheckOutcome::Unresolved);
        }

        let mut files = Vec::new();
        for outcome in outcomes {
            let numbers = report.record.numbers(outcome);
            if numbers.is_empty() {
                continue;
            }

            let prefix = format!("{}_{}_{}_", outcome.label(), session, timestamp);
            match self.write_numbers(&prefix, numbers).await {
                Ok(path) => files.push(ExportedFile {
                    outcome,
                    path,
                    count: numbers.len(),
                }),
                Err(e) => {
                    warn!("Failed to write {} results: {}", outcome.label(), e);
                    remove_files(&files).await;
                    return Err(e);
                }
            }
        }

        info!("Exported {} result files", files.len());
        Ok(ExportReport {
            files,
            summary: render_summary(report),
        })
    }

    /// Send the summary and every file to the requester, then delete the files.
    ///
    /// Delivery and removal failures are logged; they never abort the rest.
    /// Returns the number of files delivered.
    pub async fn deliver(&self, notifier: &dyn Notifier, destination: &str, export: &ExportReport) -> usize {
        if let Err(e) = notifier.send_text(destination, &export.summary).await {
            warn!("Failed to send summary to {}: {}", destination, e);
        }

        let mut delivered = 0;
        for file in &export.files {
            let caption = format!("{}: {}", capitalize(file.outcome.label()), file.count);
            match notifier
                .send_document(destination, &file.path, Some(&caption))
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to send {}: {}", file.path.display(), e),
            }
        }

        self.cleanup(export).await;
        delivered
    }

    /// Remove the exported files.
    pub async fn cleanup(&self, export: &ExportReport) {
        remove_files(&export.files).await;
    }

    /// Write one number per line to a new, uniquely named file.
    ///
    /// The file is created exclusively, so concurrent runs never share a path.
    /// A partially written file is removed before the error is returned.
    async fn write_numbers(&self, prefix: &str, numbers: &[String]) -> std::io::Result<PathBuf> {
        let (file, path) = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".txt")
            .tempfile_in(&self.settings.dir)?
            .keep()?;

        let mut contents = numbers.join("\n");
        contents.push('\n');

        let mut file = tokio::fs::File::from_std(file);
        let written = match file.write_all(contents.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        Ok(path)
    }
}

async fn remove_files(files: &[ExportedFile]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            warn!("Failed to remove {}: {}", file.path.display(), e);
        }
    }
}

/// Final summary text for a run.
pub fn render_summary(report: &RunReport) -> String {
    let headline = match report.state {
        DispatchState::Completed => "✅ Verification completed",
        _ if report.pool_exhausted => "⛔ Verification halted: no proxies left",
        _ => "🛑 Verification stopped",
    };

    format!(
        "{}\n\n\
         ⏱ Elapsed: {}\n\
         📋 Total: {}\n\
         ✅ Registered: {}\n\
         ❌ Unregistered: {}\n\
         ⚠️ Unresolved: {}\n\
         ⏭ Not checked: {}",
        headline,
        format_elapsed(report.elapsed),
        report.total,
        report.record.registered.len(),
        report.record.unregistered.len(),
        report.record.unresolved.len(),
        report.unchecked()
    )
}

/// `1h 02m 03s`, `4m 05s` or `6s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

fn sanitize(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
