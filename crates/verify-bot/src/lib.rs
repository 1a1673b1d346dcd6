//! Batch phone-number verification engine.
//!
//! Numbers are split into batches; every number in a batch is checked
//! concurrently through the rotating proxy pool with a bounded retry loop.
//! Outcomes are tallied per session, announced through a paced output
//! queue, and exported as per-outcome files when the run ends.

pub mod checker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod output;
pub mod status;
pub mod stop;

pub use checker::{render_outcome, RetryingChecker, RunContext};
pub use dispatcher::{BatchDispatcher, DispatchSettings, DispatchState, RunReport};
pub use error::{AppError, AppResult, CheckError, DispatchError};
pub use export::{ExportReport, ExportSettings, ExportedFile, ResultExporter};
pub use output::{OutputMessage, OutputQueue, OutputSender};
pub use status::StatusReporter;
pub use stop::StopSignal;
